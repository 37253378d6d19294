// src/fetch/mod.rs

//! Extraction adapters. Each returns a fully materialised [`Table`]; none of
//! them retries.

pub mod api;
pub mod objects;
pub mod pdf;
pub mod rds;

pub use api::{list_number_of_stores, retrieve_stores_data};
pub use objects::{extract_from_s3, extract_json_table};
pub use pdf::retrieve_pdf_data;
pub use rds::{list_db_tables, read_rds_table};

use anyhow::{Context, Result};
use reqwest::Client;

use crate::table::{Table, Value};

/// Shared HTTP client for every HTTP-backed source.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("retail_etl/", env!("CARGO_PKG_VERSION")))
        .gzip(true)
        .build()
        .context("building HTTP client")
}

/// Convert one JSON scalar into a cell. Arrays and objects are kept as their
/// JSON text.
pub(crate) fn json_to_value(v: &serde_json::Value) -> Value {
    use serde_json::Value as J;
    match v {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(*b),
        J::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        J::String(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

/// Flatten a JSON object into `(column, cell)` pairs; nested objects become
/// `parent.child` columns.
pub(crate) fn flatten_object(
    prefix: Option<&str>,
    obj: &serde_json::Map<String, serde_json::Value>,
    out: &mut Vec<(String, Value)>,
) {
    for (key, value) in obj {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            serde_json::Value::Object(inner) => flatten_object(Some(&name), inner, out),
            other => out.push((name, json_to_value(other))),
        }
    }
}

/// One-row table from a JSON object.
pub(crate) fn record_table(obj: &serde_json::Map<String, serde_json::Value>) -> Result<Table> {
    let mut cells = Vec::with_capacity(obj.len());
    flatten_object(None, obj, &mut cells);
    let (headers, row): (Vec<String>, Vec<Value>) = cells.into_iter().unzip();
    Table::from_rows(headers, vec![row])
}
