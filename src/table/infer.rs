// src/table/infer.rs

use anyhow::Result;
use tracing::{debug, warn};

use super::{Table, Value};

/// Storage type of a whole column, shared by every sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Date,
    Time,
    Text,
}

impl ColumnType {
    fn of(value: &Value) -> Option<ColumnType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Int(_) => Some(ColumnType::Int),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Str(_) => Some(ColumnType::Text),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Time(_) => Some(ColumnType::Time),
        }
    }

    fn merge(self, other: ColumnType) -> ColumnType {
        use ColumnType::{Float, Int, Text};
        match (self, other) {
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }
}

/// Derive the type of column `idx`:
///  - nulls are ignored
///  - consistent cells keep their type, Int mixed with Float widens to Float
///  - any other mix, or an all-null column, falls back to Text
pub fn column_type(table: &Table, idx: usize) -> ColumnType {
    table
        .rows
        .iter()
        .filter_map(|r| ColumnType::of(&r[idx]))
        .reduce(ColumnType::merge)
        .unwrap_or(ColumnType::Text)
}

/// Build a typed table from string cells (CSV, PDF text).
///
/// Each column is inferred as a whole: every non-empty cell an integer gives
/// `Int`, every non-empty cell a float gives `Float`, otherwise the column
/// stays text. Empty cells, the usual missing-value spellings and non-finite numbers become null
/// and play no part in inference. Blank header names are replaced with
/// `Unnamed: <position>`. Short rows are padded with empty cells and long rows
/// are truncated.
pub fn table_from_strings(headers: &[String], rows: Vec<Vec<String>>) -> Result<Table> {
    let headers: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h.to_string()
            }
        })
        .collect();
    let width = headers.len();

    if rows.iter().any(|r| r.len() != width) {
        warn!(
            width,
            "some rows do not match the header width; padding or truncating"
        );
    }

    let mut rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|mut r| {
            r.resize(width, String::new());
            r
        })
        .collect();

    let kinds: Vec<CellKind> = (0..width)
        .map(|idx| {
            let kind = infer_column(rows.iter().map(|r| r[idx].as_str()));
            debug!(column = %headers[idx], ?kind, "inferred column");
            kind
        })
        .collect();

    let typed = rows
        .iter_mut()
        .map(|r| {
            r.iter_mut()
                .zip(&kinds)
                .map(|(cell, kind)| kind.convert(std::mem::take(cell)))
                .collect()
        })
        .collect();

    Table::from_rows(headers, typed)
}

/// Spellings of a missing value in CSV and PDF text.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    NA_TOKENS.contains(&cell.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Text,
}

impl CellKind {
    fn convert(self, raw: String) -> Value {
        let trimmed = raw.trim();
        if is_missing(trimmed) {
            return Value::Null;
        }
        match self {
            CellKind::Int => trimmed.parse().map(Value::Int).unwrap_or(Value::Str(raw)),
            CellKind::Float => match trimmed.parse::<f64>() {
                Ok(x) if x.is_finite() => Value::Float(x),
                Ok(_) => Value::Null,
                Err(_) => Value::Str(raw),
            },
            CellKind::Text => Value::Str(raw),
        }
    }
}

fn infer_column<'a>(cells: impl Iterator<Item = &'a str>) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in cells.map(str::trim).filter(|c| !is_missing(c)) {
        let this = if cell.parse::<i64>().is_ok() {
            CellKind::Int
        } else {
            match cell.parse::<f64>() {
                Ok(x) if x.is_finite() => CellKind::Float,
                // inf and friends end up null
                Ok(_) => continue,
                Err(_) => return CellKind::Text,
            }
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(CellKind::Int), CellKind::Int) => CellKind::Int,
            _ => CellKind::Float,
        });
    }
    kind.unwrap_or(CellKind::Text)
}
