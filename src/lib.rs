pub mod cli;
pub mod config;
pub mod entity;
pub mod events;
pub mod filter;
pub mod output;
pub mod params;
pub mod query;

use crate::config::ServiceConfig;
use crate::entity::EntityStore;
use crate::events::{ChangePublisher, NoopPublisher, TracingPublisher};
use crate::filter::{CompiledFilter, FilterCompiler, UnrecognizedPolicy};
use anyhow::{Context, Result, bail};
pub use cli::{ColorMode, Commands, OutputFormat, cli_parse};
pub use filter::{OperatorRegistry, apply_all};
pub use query::{QueryPlan, Queryable};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Compile raw tokens and fold them onto an empty [`QueryPlan`]
pub fn build_plan<S: AsRef<str>>(
    compiler: &FilterCompiler<'_>,
    tokens: &[S],
) -> Result<(Vec<CompiledFilter>, QueryPlan), filter::FilterError> {
    let filters = compiler.compile_checked(tokens)?;
    let plan = apply_all(QueryPlan::new(), &filters);
    Ok((filters, plan))
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn,rest_filter=info",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second init (e.g. when run() is called twice in one process) is harmless
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .try_init();
}

/// Positional tokens first, then the filter-shaped pieces of the query string
fn collect_tokens(
    tokens: &[String],
    query_string: Option<&str>,
    config: &ServiceConfig,
) -> Vec<String> {
    let mut all = tokens.to_vec();
    if let Some(query) = query_string {
        all.extend(params::filter_tokens(query, &config.filters.reserved_params));
    }
    all
}

fn parse_attributes(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("Attributes must be valid JSON")?;
    if !value.is_object() {
        bail!("Attributes must be a JSON object, got: {raw}");
    }
    Ok(value)
}

fn open_store(path: &Path, config: &ServiceConfig) -> Result<EntityStore> {
    let publisher: Arc<dyn ChangePublisher> = if config.events.enabled {
        Arc::new(TracingPublisher)
    } else {
        Arc::new(NoopPublisher)
    };
    let store = EntityStore::load(path)
        .with_context(|| format!("Failed to load data file '{}'", path.display()))?;
    Ok(store.with_publisher(publisher, config.events.exchange.clone()))
}

fn save_store(store: &EntityStore, path: &Path) -> Result<()> {
    store
        .save(path)
        .with_context(|| format!("Failed to save data file '{}'", path.display()))
}

fn write_output_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write output file '{}'", path.display()))
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    if let Some(path) = output {
        write_output_file(path, text)?;
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = cli_parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }

    let config = config::load_config(cli.config.as_deref()).context("Failed to load config")?;
    let policy = if cli.strict {
        UnrecognizedPolicy::Reject
    } else {
        config.filters.unrecognized
    };
    let compiler = FilterCompiler::standard().with_policy(policy);
    let format = cli.format;
    let output = cli.output.as_deref();

    debug!(?policy, ?format, config = ?cli.config, "starting");

    match &cli.command {
        Commands::Query {
            data,
            entity,
            tokens,
            query_string,
        } => {
            let tokens = collect_tokens(tokens, query_string.as_deref(), &config);
            let (_, plan) = build_plan(&compiler, &tokens)?;
            let store = open_store(data, &config)?;
            let records = store.query(entity, &plan)?;

            let text = match format {
                OutputFormat::Text => output::format_records_text(entity, &records, &plan),
                OutputFormat::Json => output::format_records_json(entity, &records, &plan),
            };
            emit(&text, output)?;
        }
        Commands::Show { data, entity, id } => {
            let store = open_store(data, &config)?;
            let record = store.find(entity, *id)?;
            let text = match format {
                OutputFormat::Text => {
                    output::format_record_text(&format!("{entity} #{id}"), record)
                }
                OutputFormat::Json => output::format_record_json(record),
            };
            emit(&text, output)?;
        }
        Commands::Explain {
            tokens,
            query_string,
        } => {
            let tokens = collect_tokens(tokens, query_string.as_deref(), &config);
            // Report dropped tokens instead of failing, even in strict mode
            let resolutions = compiler.explain(&tokens);
            let filters: Vec<CompiledFilter> =
                resolutions.iter().filter_map(|r| r.filter.clone()).collect();
            let plan = apply_all(QueryPlan::new(), &filters);

            let text = match format {
                OutputFormat::Text => output::format_explain_text(&resolutions, &plan),
                OutputFormat::Json => output::format_explain_json(&resolutions, &plan),
            };
            emit(&text, output)?;
        }
        Commands::Operators => {
            let registry = compiler.registry();
            let text = match format {
                OutputFormat::Text => output::format_operators_text(registry),
                OutputFormat::Json => output::format_operators_json(registry),
            };
            emit(&text, output)?;
        }
        Commands::Create {
            data,
            entity,
            attributes,
        } => {
            let attributes = parse_attributes(attributes)?;
            let mut store = open_store(data, &config)?;
            let record = store.create(entity, attributes)?;
            save_store(&store, data)?;
            info!(entity = %entity, id = ?record.get("id"), "record created");

            let text = match format {
                OutputFormat::Text => output::format_record_text(&format!("Created {entity}"), &record),
                OutputFormat::Json => output::format_record_json(&record),
            };
            emit(&text, output)?;
        }
        Commands::Update {
            data,
            entity,
            id,
            attributes,
        } => {
            let attributes = parse_attributes(attributes)?;
            let mut store = open_store(data, &config)?;
            let record = store.update(entity, *id, attributes)?;
            save_store(&store, data)?;

            let text = match format {
                OutputFormat::Text => {
                    output::format_record_text(&format!("Updated {entity} #{id}"), &record)
                }
                OutputFormat::Json => output::format_record_json(&record),
            };
            emit(&text, output)?;
        }
        Commands::Delete {
            data,
            entity,
            id,
            tokens,
            query_string,
            all,
        } => {
            let mut store = open_store(data, &config)?;

            let removed = if let Some(id) = id {
                vec![store.delete(entity, *id)?]
            } else {
                let tokens = collect_tokens(tokens, query_string.as_deref(), &config);
                let (_, plan) = build_plan(&compiler, &tokens)?;
                if plan.is_empty() && !all {
                    bail!(
                        "Refusing to delete every '{entity}' record without a filter; pass --all to confirm"
                    );
                }
                store.delete_where(entity, &plan)?
            };
            save_store(&store, data)?;
            info!(entity = %entity, count = removed.len(), "records deleted");

            let removed: Vec<&Value> = removed.iter().collect();
            let text = match format {
                OutputFormat::Text => {
                    output::format_records_text(entity, &removed, &QueryPlan::new())
                }
                OutputFormat::Json => {
                    output::format_records_json(entity, &removed, &QueryPlan::new())
                }
            };
            emit(&text, output)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_tokens_appends_query_string_filters() {
        let config = ServiceConfig::default();
        let tokens = collect_tokens(
            &["age<=30".to_string()],
            Some("page=1&status=%7Ba%3Bb%7D"),
            &config,
        );
        assert_eq!(tokens, vec!["age<=30", "status={a;b}"]);
    }

    #[test]
    fn test_parse_attributes_requires_object() {
        assert!(parse_attributes(r#"{"name":"x"}"#).is_ok());
        assert!(parse_attributes("[1]").is_err());
        assert!(parse_attributes("not json").is_err());
    }
}
