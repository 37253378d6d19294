// src/load/parquet_file.rs

use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, Int64Array, Int64Builder,
    StringBuilder, Time64MicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Timelike};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, instrument};

use super::{column_types, index_label};
use crate::table::{ColumnType, Table, Value};

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Writes each table to `<dir>/<table_name>.parquet`.
pub struct ParquetSink {
    dir: PathBuf,
}

impl ParquetSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating output directory {:?}", &dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, table_name: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", table_name))
    }

    /// Write the whole table, replacing any earlier file for `table_name`.
    #[instrument(level = "info", skip(self, table), fields(rows = table.len()))]
    pub fn upload(&self, table_name: &str, table: &Table) -> Result<()> {
        let batch = record_batch(table)?;
        let out_path = self.path_for(table_name);
        let temp_path = out_path.with_extension("parquet.tmp");

        let file = File::create(&temp_path)
            .with_context(|| format!("creating parquet file {:?}", &temp_path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating Arrow writer")?;
        writer.write(&batch).context("writing record batch")?;
        writer.close().context("closing parquet writer")?;

        fs::rename(&temp_path, &out_path)
            .with_context(|| format!("renaming {:?} to {:?}", &temp_path, &out_path))?;
        info!(path = %out_path.display(), "wrote parquet table");
        Ok(())
    }
}

pub fn arrow_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Int => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Date => DataType::Date32,
        ColumnType::Time => DataType::Time64(TimeUnit::Microsecond),
        ColumnType::Text => DataType::Utf8,
    }
}

/// One record batch holding the index column followed by every data column.
pub fn record_batch(table: &Table) -> Result<RecordBatch> {
    let columns = column_types(table);

    let mut fields = vec![Field::new(index_label(table), DataType::Int64, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(Int64Array::from_iter_values(
        table.index.iter().map(|i| *i as i64),
    ))];

    for (idx, (name, ty)) in columns.iter().enumerate() {
        fields.push(Field::new(*name, arrow_type(*ty), true));
        arrays.push(build_array(table, idx, *ty));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}

fn build_array(table: &Table, idx: usize, ty: ColumnType) -> ArrayRef {
    let cells = table.rows.iter().map(|r| &r[idx]);
    match ty {
        ColumnType::Int => {
            let mut b = Int64Builder::with_capacity(table.len());
            for cell in cells {
                match cell {
                    Value::Int(i) => b.append_value(*i),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnType::Float => {
            let mut b = Float64Builder::with_capacity(table.len());
            for cell in cells {
                b.append_option(cell.as_f64());
            }
            Arc::new(b.finish())
        }
        ColumnType::Bool => {
            let mut b = BooleanBuilder::with_capacity(table.len());
            for cell in cells {
                match cell {
                    Value::Bool(v) => b.append_value(*v),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnType::Date => {
            let mut b = Date32Builder::with_capacity(table.len());
            for cell in cells {
                match cell {
                    Value::Date(d) => b.append_value(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnType::Time => {
            let mut b = Time64MicrosecondBuilder::with_capacity(table.len());
            for cell in cells {
                match cell {
                    Value::Time(t) => b.append_value(
                        t.num_seconds_from_midnight() as i64 * 1_000_000
                            + (t.nanosecond() / 1_000) as i64,
                    ),
                    _ => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        ColumnType::Text => {
            let mut b = StringBuilder::new();
            for cell in cells {
                b.append_option(cell.text());
            }
            Arc::new(b.finish())
        }
    }
}
