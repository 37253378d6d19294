// src/load/mod.rs

//! Sinks for cleaned tables. Every upload replaces the target table wholesale.

pub mod parquet_file;
pub mod postgres;

pub use parquet_file::ParquetSink;
pub use postgres::PostgresSink;

use anyhow::Result;

use crate::table::{column_type, ColumnType, Table};

/// Where cleaned tables are written.
pub enum Sink {
    Postgres(PostgresSink),
    Parquet(ParquetSink),
}

impl Sink {
    /// Replace `table_name` with `table`, row index first.
    pub async fn upload(&self, table_name: &str, table: &Table) -> Result<()> {
        match self {
            Sink::Postgres(sink) => sink.upload(table_name, table).await,
            Sink::Parquet(sink) => sink.upload(table_name, table),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Sink::Postgres(_) => "postgres".to_string(),
            Sink::Parquet(sink) => format!("parquet:{}", sink.dir().display()),
        }
    }
}

/// Name of the leading index column: `index`, or `level_0` when the table
/// already has an `index` column.
pub fn index_label(table: &Table) -> &'static str {
    if table.column_index("index").is_some() {
        "level_0"
    } else {
        "index"
    }
}

/// `(name, type)` for every data column, in table order.
pub(crate) fn column_types(table: &Table) -> Vec<(&str, ColumnType)> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), column_type(table, i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn index_label_avoids_collisions() -> Result<()> {
        let plain = Table::from_rows(vec!["a".into()], vec![vec![Value::Int(1)]])?;
        assert_eq!(index_label(&plain), "index");
        let indexed = Table::from_rows(vec!["index".into()], vec![vec![Value::Int(1)]])?;
        assert_eq!(index_label(&indexed), "level_0");
        Ok(())
    }
}
