use anyhow::Result;
use clap::{Parser, Subcommand};
use retail_etl::{
    config::{read_db_creds, DbCredentials, Settings},
    fetch,
    load::{ParquetSink, PostgresSink, Sink},
    pipeline::{self, Dataset, Sources},
};
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "retail_etl")]
#[command(about = "Extract retail sales data, clean it and load it into the sales database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, clean and load datasets (all of them by default)
    Run {
        /// Datasets to run, in order; repeat the flag for several
        #[arg(long = "dataset", value_enum)]
        datasets: Vec<Dataset>,

        /// Credentials for the source database
        #[arg(long, default_value = "db_creds.yaml")]
        source_creds: PathBuf,

        /// Credentials for the target database
        #[arg(long, default_value = "local_db.yaml")]
        target_creds: PathBuf,

        /// Optional settings file overriding source locations and table names
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write Parquet files to this directory instead of the target database
        #[arg(long)]
        parquet_dir: Option<PathBuf>,
    },
    /// List the tables in the source database
    ListTables {
        /// Credentials for the source database
        #[arg(long, default_value = "db_creds.yaml")]
        source_creds: PathBuf,
    },
}

enum Target {
    Database(DbCredentials),
    Files(PathBuf),
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            datasets,
            source_creds,
            target_creds,
            settings,
            parquet_dir,
        } => {
            let datasets = if datasets.is_empty() {
                Dataset::ALL.to_vec()
            } else {
                datasets
            };
            run(datasets, source_creds, target_creds, settings, parquet_dir).await
        }
        Command::ListTables { source_creds } => {
            let pool = read_db_creds(&source_creds)?.connect().await?;
            for table in fetch::list_db_tables(&pool).await? {
                println!("{}", table);
            }
            Ok(())
        }
    }
}

async fn run(
    datasets: Vec<Dataset>,
    source_creds: PathBuf,
    target_creds: PathBuf,
    settings: Option<PathBuf>,
    parquet_dir: Option<PathBuf>,
) -> Result<()> {
    let start = Instant::now();
    info!(datasets = ?datasets, "startup");

    // ─── 2) load and validate configuration ──────────────────────────
    let settings = Settings::load(settings.as_deref())?;
    if datasets.contains(&Dataset::StoreDetails) {
        settings.stores_api_key()?;
    }
    let source = if datasets.iter().any(|d| d.needs_source_db()) {
        Some(read_db_creds(&source_creds)?)
    } else {
        None
    };
    let target = match parquet_dir {
        Some(dir) => Target::Files(dir),
        None => Target::Database(read_db_creds(&target_creds)?),
    };

    // ─── 3) connect ──────────────────────────────────────────────────
    let source_db = match source {
        Some(creds) => Some(creds.connect().await?),
        None => None,
    };
    let sink = match target {
        Target::Files(dir) => Sink::Parquet(ParquetSink::new(dir)?),
        Target::Database(creds) => Sink::Postgres(PostgresSink::new(creds.connect().await?)),
    };

    let sources = Sources {
        client: fetch::http_client()?,
        source_db,
        settings,
    };

    // ─── 4) run datasets in order ────────────────────────────────────
    match pipeline::run_all(&datasets, &sources, &sink).await {
        Ok(reports) => {
            for r in &reports {
                info!(dataset = %r.dataset, rows_in = r.rows_in, rows_out = r.rows_out, "done");
            }
            info!(elapsed = ?start.elapsed(), "all done");
            Ok(())
        }
        Err(e) => {
            error!("run failed: {:#}", e);
            Err(e)
        }
    }
}
