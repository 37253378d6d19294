// src/fetch/objects.rs

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use reqwest::Client;
use std::collections::HashSet;
use std::io::Cursor;
use tracing::{info, instrument, warn};

use super::{json_to_value, record_table};
use crate::config::ObjectSource;
use crate::table::{infer::table_from_strings, Table, Value};

/// Download a CSV object from a public bucket and parse it.
#[instrument(level = "info", skip(client, source), fields(bucket = %source.bucket, key = %source.key))]
pub async fn extract_from_s3(client: &Client, source: &ObjectSource) -> Result<Table> {
    let url = source.url();
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?;

    let status = resp.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "unsuccessful object response");
        bail!("unsuccessful object response from {}: status {}", url, status);
    }
    info!(status = status.as_u16(), "successful object response");

    let bytes = resp
        .bytes()
        .await
        .with_context(|| format!("reading body from {}", url))?;
    read_csv(&bytes).with_context(|| format!("parsing CSV from {}", url))
}

/// Parse CSV bytes with a header row into a typed table.
pub fn read_csv(bytes: &[u8]) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(bytes));

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    table_from_strings(&headers, rows)
}

/// Download a JSON document and read it as a table.
#[instrument(level = "info", skip(client))]
pub async fn extract_json_table(client: &Client, url: &str) -> Result<Table> {
    let body: serde_json::Value = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()
        .with_context(|| format!("GET {}", url))?
        .json()
        .await
        .with_context(|| format!("decoding JSON from {}", url))?;

    let table = table_from_json(&body)?;
    info!(rows = table.len(), columns = table.width(), "read JSON table");
    Ok(table)
}

/// Accepts either a column mapping, `{"col": {"0": v, "1": v}}`, or a list of
/// records, `[{"col": v}]`.
///
/// Column mappings are aligned on their row keys; a row key missing from a
/// column gives a null. Rows come out in the order their keys are first seen.
pub fn table_from_json(body: &serde_json::Value) -> Result<Table> {
    match body {
        serde_json::Value::Object(columns) => {
            let headers: Vec<String> = columns.keys().cloned().collect();

            let mut row_keys: Vec<&str> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            for column in columns.values() {
                let Some(cells) = column.as_object() else {
                    bail!("column mapping values must be objects keyed by row");
                };
                for key in cells.keys() {
                    if seen.insert(key.as_str()) {
                        row_keys.push(key);
                    }
                }
            }

            let rows = row_keys
                .iter()
                .map(|key| {
                    columns
                        .values()
                        .map(|col| col.get(*key).map(json_to_value).unwrap_or(Value::Null))
                        .collect()
                })
                .collect();
            Table::from_rows(headers, rows)
        }
        serde_json::Value::Array(records) => {
            let frames = records
                .iter()
                .enumerate()
                .map(|(i, r)| match r.as_object() {
                    Some(obj) => record_table(obj),
                    None => bail!("record {} is not a JSON object", i),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Table::concat(frames))
        }
        _ => bail!("expected a JSON object or array of records"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn csv_with_unnamed_index_column() -> Result<()> {
        let csv = b",product_name,product_price,weight,EAN\n\
0,FurReal Dazzlin' Dimples,\xc2\xa339.99,1.6kg,7425710935115\n\
1,Tiffany Table Lamp,\xc2\xa329.99,0.48kg,487128731892\n\
2,,,,\n";
        let t = read_csv(csv)?;
        assert_eq!(t.headers[0], "Unnamed: 0");
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows[0][3], Value::from("1.6kg"));
        assert_eq!(t.rows[1][4], Value::Int(487128731892));
        assert_eq!(t.rows[2][1], Value::Null);
        Ok(())
    }

    #[test]
    fn column_oriented_json() -> Result<()> {
        let body = json!({
            "timestamp": {"0": "22:00:06", "1": "22:44:06", "10": "09:00:00", "2": "NULL"},
            "month": {"0": "9", "1": "2", "10": "4", "2": "NULL"},
            "year": {"0": "2012", "1": "1997", "10": "2001"}
        });
        let t = table_from_json(&body)?;
        assert_eq!(t.headers, vec!["timestamp", "month", "year"]);
        assert_eq!(t.len(), 4);
        // row keys keep document order, not string order
        assert_eq!(t.rows[2][0], Value::from("09:00:00"));
        assert_eq!(t.rows[3][2], Value::Null);
        Ok(())
    }

    #[test]
    fn column_oriented_json_at_full_size() -> Result<()> {
        let n = 120_000;
        let mut body = serde_json::Map::new();
        for column in ["timestamp", "month", "year", "day", "time_period", "date_uuid"] {
            let cells: serde_json::Map<String, serde_json::Value> = (0..n)
                .map(|i| (i.to_string(), json!(format!("{}-{}", column, i))))
                .collect();
            body.insert(column.to_string(), serde_json::Value::Object(cells));
        }

        let start = std::time::Instant::now();
        let t = table_from_json(&serde_json::Value::Object(body))?;
        assert!(start.elapsed() < std::time::Duration::from_secs(20));
        assert_eq!(t.len(), n);
        assert_eq!(t.width(), 6);
        assert_eq!(t.rows[n - 1][2], Value::from(format!("year-{}", n - 1)));
        Ok(())
    }

    #[test]
    fn record_oriented_json() -> Result<()> {
        let body = json!([{"a": 1}, {"a": 2, "b": "x"}]);
        let t = table_from_json(&body)?;
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.rows[0][1], Value::Null);
        assert!(table_from_json(&json!(3)).is_err());
        assert!(table_from_json(&json!({"a": 1})).is_err());
        Ok(())
    }
}
