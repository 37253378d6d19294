// src/load/postgres.rs

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use sqlx::{query_builder::Separated, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, instrument};

use super::{column_types, index_label};
use crate::fetch::rds::quote_ident;
use crate::table::{ColumnType, Table, Value};

/// Postgres caps bind parameters per statement at 65535.
const MAX_BINDS: usize = 65_535;

pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Drop, recreate and fill `table_name` in a single transaction.
    #[instrument(level = "info", skip(self, table), fields(rows = table.len()))]
    pub async fn upload(&self, table_name: &str, table: &Table) -> Result<()> {
        self.replace(table_name, table)
            .await
            .context("error uploading data to the database")
    }

    async fn replace(&self, table_name: &str, table: &Table) -> Result<()> {
        let columns = column_types(table);
        let index = index_label(table);
        let types: Vec<ColumnType> = columns.iter().map(|(_, ty)| *ty).collect();

        let mut tx = self.pool.begin().await.context("beginning transaction")?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table_name)))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("dropping {}", table_name))?;
        sqlx::query(&create_table_sql(table_name, index, &columns))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("creating {}", table_name))?;

        let insert_prefix = insert_prefix(table_name, index, &columns);
        let pairs: Vec<(u64, &Vec<Value>)> = table.index.iter().copied().zip(&table.rows).collect();
        for (n, chunk) in pairs.chunks(rows_per_statement(columns.len())).enumerate() {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(&insert_prefix);
            qb.push_values(chunk, |mut b, (label, row)| {
                b.push_bind(*label as i64);
                for (cell, ty) in row.iter().zip(&types) {
                    bind_cell(&mut b, *ty, cell);
                }
            });
            qb.build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("inserting batch {} into {}", n, table_name))?;
            debug!(batch = n, rows = chunk.len(), "inserted batch");
        }

        tx.commit().await.context("committing upload")?;
        info!(table = table_name, rows = table.len(), "uploaded table");
        Ok(())
    }
}

pub fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Int => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Bool => "BOOLEAN",
        ColumnType::Date => "DATE",
        ColumnType::Time => "TIME",
        ColumnType::Text => "TEXT",
    }
}

pub fn create_table_sql(table_name: &str, index: &str, columns: &[(&str, ColumnType)]) -> String {
    let mut defs = vec![format!("{} BIGINT", quote_ident(index))];
    defs.extend(
        columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_ident(name), sql_type(*ty))),
    );
    format!("CREATE TABLE {} ({})", quote_ident(table_name), defs.join(", "))
}

fn insert_prefix(table_name: &str, index: &str, columns: &[(&str, ColumnType)]) -> String {
    let names: Vec<String> = std::iter::once(index)
        .chain(columns.iter().map(|(name, _)| *name))
        .map(quote_ident)
        .collect();
    format!("INSERT INTO {} ({}) ", quote_ident(table_name), names.join(", "))
}

/// Rows per INSERT so that binds, index included, stay under the limit.
pub fn rows_per_statement(data_columns: usize) -> usize {
    (MAX_BINDS / (data_columns + 1)).max(1)
}

/// Bind one cell as its column's SQL type. Nulls are bound typed so Postgres
/// accepts them for any column.
fn bind_cell<'args>(b: &mut Separated<'_, 'args, Postgres, &'static str>, ty: ColumnType, cell: &Value) {
    match ty {
        ColumnType::Int => {
            b.push_bind(match cell {
                Value::Int(i) => Some(*i),
                _ => None,
            });
        }
        ColumnType::Float => {
            b.push_bind(cell.as_f64());
        }
        ColumnType::Bool => {
            b.push_bind(match cell {
                Value::Bool(v) => Some(*v),
                _ => None,
            });
        }
        ColumnType::Date => {
            b.push_bind(match cell {
                Value::Date(d) => Some(*d),
                _ => None::<NaiveDate>,
            });
        }
        ColumnType::Time => {
            b.push_bind(match cell {
                Value::Time(t) => Some(*t),
                _ => None::<NaiveTime>,
            });
        }
        ColumnType::Text => {
            b.push_bind(cell.text().map(|s| s.into_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_leads_with_index() {
        let sql = create_table_sql(
            "dim_users",
            "index",
            &[("first_name", ColumnType::Text), ("join_date", ColumnType::Date)],
        );
        assert_eq!(
            sql,
            r#"CREATE TABLE "dim_users" ("index" BIGINT, "first_name" TEXT, "join_date" DATE)"#
        );
    }

    #[test]
    fn insert_lists_every_column() {
        let sql = insert_prefix("orders_table", "level_0", &[("product_quantity", ColumnType::Int)]);
        assert_eq!(
            sql,
            r#"INSERT INTO "orders_table" ("level_0", "product_quantity") "#
        );
    }

    #[test]
    fn batches_respect_bind_limit() {
        assert_eq!(rows_per_statement(0), 65_535);
        assert_eq!(rows_per_statement(10), 5_957);
        assert!(rows_per_statement(10) * 11 <= MAX_BINDS);
        assert_eq!(rows_per_statement(100_000), 1);
    }
}
