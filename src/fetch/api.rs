// src/fetch/api.rs

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use super::record_table;
use crate::config::StoresApi;
use crate::table::Table;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct StoreCount {
    number_stores: u64,
}

/// `base` with a guaranteed trailing slash, so joins append rather than replace.
fn base_url(api: &StoresApi) -> Result<Url> {
    let mut base = api.base_url.clone();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).with_context(|| format!("parsing store API URL {}", api.base_url))
}

pub fn count_url(api: &StoresApi) -> Result<Url> {
    Ok(base_url(api)?.join("number_stores")?)
}

pub fn store_url(api: &StoresApi, store: u64) -> Result<Url> {
    Ok(base_url(api)?.join(&format!("store_details/{}", store))?)
}

async fn get_json(client: &Client, url: Url, api_key: &str) -> Result<serde_json::Value> {
    client
        .get(url.clone())
        .header(API_KEY_HEADER, api_key)
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()
        .with_context(|| format!("GET {}", url))?
        .json()
        .await
        .with_context(|| format!("decoding JSON from {}", url))
}

/// How many stores the API reports.
#[instrument(level = "info", skip(client, api, api_key))]
pub async fn list_number_of_stores(client: &Client, api: &StoresApi, api_key: &str) -> Result<u64> {
    let url = count_url(api)?;
    let body = get_json(client, url, api_key).await?;
    let count: StoreCount =
        serde_json::from_value(body).context("reading number_stores from count response")?;
    info!(stores = count.number_stores, "store count");
    Ok(count.number_stores)
}

/// Fetch every store, one request per store, and stack them into one table.
#[instrument(level = "info", skip(client, api, api_key))]
pub async fn retrieve_stores_data(client: &Client, api: &StoresApi, api_key: &str) -> Result<Table> {
    let count = list_number_of_stores(client, api, api_key).await?;

    let mut frames = Vec::with_capacity(count as usize);
    for store in 0..count {
        let url = store_url(api, store)?;
        let body = get_json(client, url, api_key).await?;
        frames.push(store_table(&body).with_context(|| format!("store {}", store))?);
        debug!(store, "fetched store");
    }

    let table = Table::concat(frames);
    info!(rows = table.len(), columns = table.width(), "retrieved stores");
    Ok(table)
}

/// One store record as a one-row table.
pub fn store_table(body: &serde_json::Value) -> Result<Table> {
    match body.as_object() {
        Some(obj) => record_table(obj),
        None => bail!("store details are not a JSON object"),
    }
}
