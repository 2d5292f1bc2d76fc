use crate::filter::{OperatorRegistry, TokenResolution};
use crate::query::QueryPlan;
use colored::Colorize;
use comfy_table::{Cell, Table};
use serde_json::{Value, json};
use std::fmt::Write;

fn create_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Column order: `id` first, then every other key in order of first appearance
fn record_columns(records: &[&Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        let Some(object) = record.as_object() else {
            continue;
        };
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    if let Some(pos) = columns.iter().position(|c| c == "id") {
        let id = columns.remove(pos);
        columns.insert(0, id);
    }
    columns
}

pub fn format_records_text(entity: &str, records: &[&Value], plan: &QueryPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} record{} matching {}",
        entity.bold(),
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        plan
    );

    if records.is_empty() {
        return out;
    }

    let columns = record_columns(records);
    let headers: Vec<&str> = columns.iter().map(String::as_str).collect();
    let mut table = create_table(&headers);
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|column| Cell::new(cell_text(record.get(column))))
                .collect::<Vec<_>>(),
        );
    }
    let _ = writeln!(out, "{table}");
    out
}

pub fn format_records_json(entity: &str, records: &[&Value], plan: &QueryPlan) -> String {
    serde_json::to_string_pretty(&json!({
        "entity": entity,
        "predicate": plan.to_string(),
        "count": records.len(),
        "records": records,
    }))
    .unwrap_or_else(|_| "{\"error\":\"failed to serialize records\"}".into())
}

pub fn format_record_text(heading: &str, record: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", heading.bold());
    let mut table = create_table(&["Attribute", "Value"]);
    if let Some(object) = record.as_object() {
        for (key, value) in object {
            table.add_row(vec![Cell::new(key), Cell::new(cell_text(Some(value)))]);
        }
    }
    let _ = writeln!(out, "{table}");
    out
}

pub fn format_record_json(record: &Value) -> String {
    serde_json::to_string_pretty(record)
        .unwrap_or_else(|_| "{\"error\":\"failed to serialize record\"}".into())
}

pub fn format_explain_text(resolutions: &[TokenResolution], plan: &QueryPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Tokens".bold());
    if resolutions.is_empty() {
        let _ = writeln!(out, "  (none)");
    }

    for resolution in resolutions {
        match &resolution.filter {
            Some(filter) => {
                let _ = writeln!(
                    out,
                    "  {}  -> {} (level {})  field={}  value={}",
                    resolution.token,
                    filter.operator_name().green(),
                    filter.operator().priority(),
                    filter.field(),
                    filter.value()
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "  {}  -> {}",
                    resolution.token,
                    "dropped (no operator matched)".yellow()
                );
            }
        }
    }

    let sql = plan.to_sql();
    let _ = writeln!(out, "\n{} {}", "Predicate:".bold(), plan);
    if !sql.clause.is_empty() {
        let _ = writeln!(out, "{} {}", "SQL:".bold(), sql.clause);
        let _ = writeln!(out, "{} {:?}", "Params:".bold(), sql.params);
    }
    out
}

pub fn format_explain_json(resolutions: &[TokenResolution], plan: &QueryPlan) -> String {
    let sql = plan.to_sql();
    serde_json::to_string_pretty(&json!({
        "tokens": resolutions,
        "predicate": plan.to_string(),
        "sql": {
            "clause": sql.clause,
            "params": sql.params,
        },
    }))
    .unwrap_or_else(|_| "{\"error\":\"failed to serialize explain output\"}".into())
}

pub fn format_operators_text(registry: &OperatorRegistry) -> String {
    let mut table = create_table(&["Level", "Operator", "Syntax"]);
    for op in registry.in_priority_order() {
        table.add_row(vec![
            Cell::new(op.priority()),
            Cell::new(op.name()),
            Cell::new(op.syntax()),
        ]);
    }
    format!("{table}\n")
}

pub fn format_operators_json(registry: &OperatorRegistry) -> String {
    let operators: Vec<Value> = registry
        .in_priority_order()
        .iter()
        .map(|op| {
            json!({
                "level": op.priority(),
                "name": op.name(),
                "syntax": op.syntax(),
            })
        })
        .collect();
    serde_json::to_string_pretty(&json!({ "operators": operators }))
        .unwrap_or_else(|_| "{\"error\":\"failed to serialize operators\"}".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_columns_put_id_first() {
        let a = json!({"name": "x", "id": 1});
        let b = json!({"age": 3, "id": 2});
        assert_eq!(record_columns(&[&a, &b]), vec!["id", "name", "age"]);
    }

    #[test]
    fn test_cell_text_unquotes_strings() {
        assert_eq!(cell_text(Some(&json!("abc"))), "abc");
        assert_eq!(cell_text(Some(&json!(3))), "3");
        assert_eq!(cell_text(Some(&json!(null))), "");
        assert_eq!(cell_text(None), "");
    }
}
