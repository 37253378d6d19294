// src/pipeline.rs

//! Extract, clean and load each dataset, one after another.

use anyhow::{Context, Result};
use clap::ValueEnum;
use reqwest::Client;
use sqlx::PgPool;
use std::fmt;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::clean;
use crate::config::Settings;
use crate::fetch;
use crate::load::Sink;
use crate::table::Table;

/// The six source datasets, in the order a full run loads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Dataset {
    Users,
    CardDetails,
    StoreDetails,
    Products,
    Orders,
    DateTimes,
}

impl Dataset {
    pub const ALL: [Dataset; 6] = [
        Dataset::Users,
        Dataset::CardDetails,
        Dataset::StoreDetails,
        Dataset::Products,
        Dataset::Orders,
        Dataset::DateTimes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dataset::Users => "users",
            Dataset::CardDetails => "card-details",
            Dataset::StoreDetails => "store-details",
            Dataset::Products => "products",
            Dataset::Orders => "orders",
            Dataset::DateTimes => "date-times",
        }
    }

    /// Target table the cleaned dataset replaces.
    pub fn target(self, settings: &Settings) -> &str {
        let t = &settings.targets;
        match self {
            Dataset::Users => &t.users,
            Dataset::CardDetails => &t.card_details,
            Dataset::StoreDetails => &t.store_details,
            Dataset::Products => &t.products,
            Dataset::Orders => &t.orders,
            Dataset::DateTimes => &t.date_times,
        }
    }

    /// Whether extraction reads from the source database.
    pub fn needs_source_db(self) -> bool {
        matches!(self, Dataset::Users | Dataset::Orders)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything extraction needs.
pub struct Sources {
    pub client: Client,
    pub source_db: Option<PgPool>,
    pub settings: Settings,
}

impl Sources {
    fn source_db(&self) -> Result<&PgPool> {
        self.source_db
            .as_ref()
            .context("no source database configured")
    }

    /// Pull the raw table for `dataset`.
    pub async fn extract(&self, dataset: Dataset) -> Result<Table> {
        let s = &self.settings;
        match dataset {
            Dataset::Users => fetch::read_rds_table(self.source_db()?, &s.source_tables.users).await,
            Dataset::CardDetails => {
                let path = s.card_details_pdf.clone();
                tokio::task::spawn_blocking(move || fetch::retrieve_pdf_data(path)).await?
            }
            Dataset::StoreDetails => {
                let key = s.stores_api_key()?;
                fetch::retrieve_stores_data(&self.client, &s.stores_api, key).await
            }
            Dataset::Products => fetch::extract_from_s3(&self.client, &s.products).await,
            Dataset::Orders => {
                fetch::read_rds_table(self.source_db()?, &s.source_tables.orders).await
            }
            Dataset::DateTimes => fetch::extract_json_table(&self.client, &s.date_details_url).await,
        }
    }
}

/// Run the cleaner for `dataset`.
pub fn clean(dataset: Dataset, table: Table, settings: &Settings) -> Result<Table> {
    match dataset {
        Dataset::Users => clean::clean_user_data(table),
        Dataset::CardDetails => clean::clean_card_data(table),
        Dataset::StoreDetails => clean::clean_store_data(table),
        Dataset::Products => clean::convert_product_weights(table, &settings.products_weight_column),
        Dataset::Orders => clean::clean_orders_data(table),
        Dataset::DateTimes => clean::clean_date_time(table),
    }
}

/// Row counts for one dataset run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub dataset: Dataset,
    pub rows_in: usize,
    pub rows_out: usize,
}

/// Clean an extracted table and replace its target with the result.
pub async fn clean_and_load(
    dataset: Dataset,
    raw: Table,
    settings: &Settings,
    sink: &Sink,
) -> Result<RunReport> {
    let rows_in = raw.len();
    let cleaned = clean(dataset, raw, settings).with_context(|| format!("cleaning {}", dataset))?;
    let target = dataset.target(settings);
    sink.upload(target, &cleaned)
        .await
        .with_context(|| format!("loading {} into {}", dataset, target))?;
    Ok(RunReport {
        dataset,
        rows_in,
        rows_out: cleaned.len(),
    })
}

/// Extract, clean and load one dataset.
#[instrument(level = "info", skip(sources, sink), fields(dataset = %dataset))]
pub async fn run_dataset(dataset: Dataset, sources: &Sources, sink: &Sink) -> Result<RunReport> {
    let start = Instant::now();
    let raw = sources
        .extract(dataset)
        .await
        .with_context(|| format!("extracting {}", dataset))?;
    info!(rows = raw.len(), columns = raw.width(), "extracted");

    let report = clean_and_load(dataset, raw, &sources.settings, sink).await?;
    info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        elapsed = ?start.elapsed(),
        "loaded"
    );
    Ok(report)
}

/// Run `datasets` in order. The first failure stops the run.
pub async fn run_all(datasets: &[Dataset], sources: &Sources, sink: &Sink) -> Result<Vec<RunReport>> {
    info!(count = datasets.len(), sink = %sink.describe(), "starting run");
    let mut reports = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        reports.push(run_dataset(*dataset, sources, sink).await?);
    }
    info!("all datasets loaded");
    Ok(reports)
}
