use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Query and modify JSON entities with URL-style filter expressions
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "REST_FILTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'F', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the output to this file
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Fail on filter expressions no operator recognizes
    #[arg(long, global = true)]
    pub strict: bool,

    /// When to colorize output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the records of an entity that satisfy every filter
    Query {
        /// JSON/JSON5 data file mapping entity names to record arrays
        data: PathBuf,

        /// Entity (collection) name
        entity: String,

        /// Filter expressions, e.g. "age<=30" "status={active;pending}".
        /// Put `--` before expressions whose field starts with '-'
        tokens: Vec<String>,

        /// Raw query string, e.g. "age%3C%3D30&page=2"
        #[arg(long)]
        query_string: Option<String>,
    },
    /// Show a single record by id
    Show {
        data: PathBuf,
        entity: String,
        id: u64,
    },
    /// Show how each filter expression is resolved
    Explain {
        /// Filter expressions; put `--` before any that start with '-'
        tokens: Vec<String>,

        #[arg(long)]
        query_string: Option<String>,
    },
    /// List the supported filter operators in priority order
    Operators,
    /// Insert a record; the id is assigned automatically
    Create {
        data: PathBuf,
        entity: String,

        /// Attributes as a JSON object
        #[arg(long = "set")]
        attributes: String,
    },
    /// Merge attributes into an existing record
    Update {
        data: PathBuf,
        entity: String,
        id: u64,

        #[arg(long = "set")]
        attributes: String,
    },
    /// Delete one record by id, or every record matching the filters
    Delete {
        data: PathBuf,
        entity: String,

        /// Delete only the record with this id
        #[arg(long, conflicts_with_all = ["tokens", "query_string", "all"])]
        id: Option<u64>,

        /// Filter expressions; put `--` before any that start with '-'
        tokens: Vec<String>,

        #[arg(long)]
        query_string: Option<String>,

        /// Allow a bulk delete without any filter
        #[arg(long)]
        all: bool,
    },
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
