// src/config.rs

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;

/// Environment variable that overrides `stores_api.api_key`.
pub const STORES_API_KEY_ENV: &str = "STORES_API_KEY";

const REQUIRED_KEYS: [&str; 5] = [
    "RDS_HOST",
    "RDS_USER",
    "RDS_PASSWORD",
    "RDS_PORT",
    "RDS_DATABASE",
];

/// Connection details for one Postgres database, read from a YAML file:
///
/// ```yaml
/// RDS_HOST: localhost
/// RDS_USER: postgres
/// RDS_PASSWORD: secret
/// RDS_PORT: 5432
/// RDS_DATABASE: sales_data
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Read and validate a credentials file.
pub fn read_db_creds(path: impl AsRef<Path>) -> Result<DbCredentials> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading credentials file {}", path.display()))?;
    DbCredentials::from_yaml(&text)
        .with_context(|| format!("invalid credentials in {}", path.display()))
}

impl DbCredentials {
    /// Parse the YAML mapping. Every required key must be present and non-empty.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let map: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str(text).context("credentials are not a YAML mapping")?;

        let get = |key: &str| -> Result<String> {
            match map.get(key) {
                Some(serde_yaml::Value::String(s)) if !s.trim().is_empty() => {
                    Ok(s.trim().to_string())
                }
                Some(serde_yaml::Value::Number(n)) => Ok(n.to_string()),
                Some(_) | None => Err(anyhow!("missing or empty credential `{}`", key)),
            }
        };

        let [host, user, password, port, database] = REQUIRED_KEYS.map(get);
        let port = port?;
        let port: u16 = port
            .parse()
            .with_context(|| format!("RDS_PORT `{}` is not a valid port", port))?;

        Ok(DbCredentials {
            host: host?,
            user: user?,
            password: password?,
            port,
            database: database?,
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// Open a small connection pool. The pipeline runs one query at a time.
    pub async fn connect(&self) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(self.connect_options())
            .await
            .with_context(|| {
                format!(
                    "connecting to postgres at {}:{}/{}",
                    self.host, self.port, self.database
                )
            })?;
        info!(host = %self.host, database = %self.database, "connected");
        Ok(pool)
    }
}

/// Paginated store REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresApi {
    /// Base URL; `number_stores` and `store_details/{n}` are joined onto it.
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for StoresApi {
    fn default() -> Self {
        StoresApi {
            base_url: "https://aqj7u5id95.execute-api.eu-west-1.amazonaws.com/prod/".into(),
            api_key: None,
        }
    }
}

/// A CSV object in a public bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSource {
    pub bucket: String,
    pub region: String,
    pub key: String,
}

impl Default for ObjectSource {
    fn default() -> Self {
        ObjectSource {
            bucket: "data-handling-public".into(),
            region: "eu-west-1".into(),
            key: "products.csv".into(),
        }
    }
}

impl ObjectSource {
    pub fn url(&self) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket,
            self.region,
            self.key.trim_start_matches('/')
        )
    }
}

/// Source database tables read by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTables {
    pub users: String,
    pub orders: String,
}

impl Default for SourceTables {
    fn default() -> Self {
        SourceTables {
            users: "legacy_users".into(),
            orders: "orders_table".into(),
        }
    }
}

/// Warehouse table written for each dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetTables {
    pub users: String,
    pub card_details: String,
    pub store_details: String,
    pub products: String,
    pub orders: String,
    pub date_times: String,
}

impl Default for TargetTables {
    fn default() -> Self {
        TargetTables {
            users: "dim_users".into(),
            card_details: "dim_card_details".into(),
            store_details: "dim_store_details".into(),
            products: "dim_products".into(),
            orders: "orders_table".into(),
            date_times: "dim_date_times".into(),
        }
    }
}

/// Where every dataset comes from and goes to. Any field left out of the
/// settings file keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stores_api: StoresApi,
    pub products: ObjectSource,
    pub products_weight_column: String,
    pub date_details_url: String,
    pub card_details_pdf: PathBuf,
    pub source_tables: SourceTables,
    pub targets: TargetTables,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            stores_api: StoresApi::default(),
            products: ObjectSource::default(),
            products_weight_column: "weight".into(),
            date_details_url: "https://data-handling-public.s3.eu-west-1.amazonaws.com/date_details.json"
                .into(),
            card_details_pdf: PathBuf::from("card_details.pdf"),
            source_tables: SourceTables::default(),
            targets: TargetTables::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or defaults when `None`), then apply the
    /// environment override for the API key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(p) => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading settings file {}", p.display()))?;
                Self::from_yaml(&text)
                    .with_context(|| format!("invalid settings in {}", p.display()))?
            }
            None => Settings::default(),
        };
        Ok(settings.with_api_key_override(std::env::var(STORES_API_KEY_ENV).ok()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(text).context("parsing settings YAML")
    }

    /// A non-empty override replaces whatever key the file held.
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.stores_api.api_key = Some(key);
        }
        self
    }

    pub fn stores_api_key(&self) -> Result<&str> {
        match self.stores_api.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(k),
            _ => bail!(
                "no store API key configured; set stores_api.api_key or {}",
                STORES_API_KEY_ENV
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CREDS: &str = "RDS_HOST: db.example.com\nRDS_USER: etl\nRDS_PASSWORD: hunter2\nRDS_PORT: 5432\nRDS_DATABASE: sales_data\n";

    #[test]
    fn reads_credentials_file() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(CREDS.as_bytes())?;
        let creds = read_db_creds(tmp.path())?;
        assert_eq!(creds.host, "db.example.com");
        assert_eq!(creds.port, 5432);
        assert_eq!(creds.database, "sales_data");
        assert!(!format!("{:?}", creds).contains("hunter2"));
        Ok(())
    }

    #[test]
    fn quoted_port_is_accepted() -> Result<()> {
        let creds = DbCredentials::from_yaml(&CREDS.replace("5432", "\"6543\""))?;
        assert_eq!(creds.port, 6543);
        Ok(())
    }

    #[test]
    fn missing_key_is_named() {
        let text = CREDS.replace("RDS_PASSWORD: hunter2\n", "");
        let err = DbCredentials::from_yaml(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("RDS_PASSWORD"));

        let text = CREDS.replace("etl", "\"  \"");
        let err = DbCredentials::from_yaml(&text).unwrap_err();
        assert!(format!("{:#}", err).contains("RDS_USER"));
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(DbCredentials::from_yaml(&CREDS.replace("5432", "99999")).is_err());
        assert!(DbCredentials::from_yaml(&CREDS.replace("5432", "http")).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_db_creds("/definitely/not/here.yaml").is_err());
    }

    #[test]
    fn partial_settings_keep_defaults() -> Result<()> {
        let s = Settings::from_yaml("products:\n  key: other.csv\ntargets:\n  users: users_v2\n")?;
        assert_eq!(s.products.key, "other.csv");
        assert_eq!(s.products.bucket, "data-handling-public");
        assert_eq!(
            s.products.url(),
            "https://data-handling-public.s3.eu-west-1.amazonaws.com/other.csv"
        );
        assert_eq!(s.targets.users, "users_v2");
        assert_eq!(s.targets.date_times, "dim_date_times");
        assert_eq!(Settings::from_yaml("")?, Settings::default());
        Ok(())
    }

    #[test]
    fn api_key_override() {
        let s = Settings::default();
        assert!(s.stores_api_key().is_err());
        let s = s.with_api_key_override(Some("abc".into()));
        assert_eq!(s.stores_api_key().unwrap(), "abc");
        let s = s.with_api_key_override(Some("".into()));
        assert_eq!(s.stores_api_key().unwrap(), "abc");
    }
}
