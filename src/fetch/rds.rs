// src/fetch/rds.rs

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info, instrument, warn};

use crate::table::{Table, Value};

/// Names of the base tables in the `public` schema, in name order.
#[instrument(level = "info", skip(pool))]
pub async fn list_db_tables(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
                AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("listing database tables")?;

    rows.iter()
        .map(|r| r.try_get::<String, _>("table_name").context("reading table_name"))
        .collect()
}

async fn list_columns(pool: &PgPool, table_name: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
            SELECT column_name::text AS column_name
            FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
        "#,
    )
    .bind(table_name)
    .fetch_all(pool)
    .await
    .with_context(|| format!("listing columns of {}", table_name))?;

    rows.iter()
        .map(|r| r.try_get::<String, _>("column_name").context("reading column_name"))
        .collect()
}

/// Read a whole table. The table must be one [`list_db_tables`] reports.
#[instrument(level = "info", skip(pool))]
pub async fn read_rds_table(pool: &PgPool, table_name: &str) -> Result<Table> {
    let tables = list_db_tables(pool).await?;
    if !tables.iter().any(|t| t == table_name) {
        bail!(
            "table `{}` not found; available tables: {:?}",
            table_name,
            tables
        );
    }

    let headers = list_columns(pool, table_name).await?;
    let sql = format!("SELECT * FROM {}", quote_ident(table_name));
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .with_context(|| format!("reading table {}", table_name))?;

    let mut unsupported: Vec<usize> = Vec::new();
    let cells: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|i| {
                    cell_value(row, i).unwrap_or_else(|| {
                        if !unsupported.contains(&i) {
                            unsupported.push(i);
                        }
                        Value::Null
                    })
                })
                .collect()
        })
        .collect();

    for i in unsupported {
        warn!(
            table = table_name,
            column = headers.get(i).map(String::as_str).unwrap_or("?"),
            "unsupported column type, read as null"
        );
    }

    let table = Table::from_rows(headers, cells)
        .with_context(|| format!("building table from {}", table_name))?;
    info!(rows = table.len(), columns = table.width(), "read table");
    Ok(table)
}

/// Try each supported column type in turn. `None` when the column type is
/// none of them.
fn cell_value(row: &PgRow, i: usize) -> Option<Value> {
    if let Ok(v) = row.try_get::<Option<String>, _>(i) {
        return Some(v.map(Value::Str).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return Some(v.map(Value::Int).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
        return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(i) {
        return Some(v.map(|n| Value::Int(n.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
        return Some(v.map(Value::Float).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(i) {
        return Some(v.map(|n| Value::Float(n.into())).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
        return Some(v.map(Value::Bool).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(i) {
        return Some(v.map(Value::Date).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(i) {
        return Some(v.map(Value::Time).unwrap_or(Value::Null));
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(i) {
        return Some(
            v.map(|dt| Value::Str(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null),
        );
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(i) {
        return Some(v.map(|dt| Value::Str(dt.to_rfc3339())).unwrap_or(Value::Null));
    }
    None
}

/// Double-quote a Postgres identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
