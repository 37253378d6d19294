// src/clean/datasets.rs

//! One cleaner per source dataset. Each takes ownership of the raw table and
//! returns the cleaned one; none keeps state between calls. A column a
//! cleaner needs but the table lacks is an error, everything else that fails
//! to parse becomes null and is dropped.

use anyhow::Result;
use tracing::{info, instrument};

use super::date_parser::{clean_date_column, normalize_time};
use super::numeric::{coerce_numeric, is_digit_string, scrub_numeric};
use super::units::normalize_weight;
use crate::table::{Table, Value};

/// Leftover index columns and personal names already held in `dim_users`.
pub const ORDERS_DROPPED_COLUMNS: &[&str] = &["level_0", "1", "first_name", "last_name"];

/// Placeholder character masking digits in card numbers.
const CARD_MASK: char = '?';

fn finish(name: &str, rows_in: usize, table: &Table) {
    info!(
        cleaner = name,
        rows_in,
        rows_out = table.len(),
        dropped = rows_in - table.len(),
        "cleaned"
    );
}

/// `date_of_birth` and `join_date` to dates, then drop any row with a null.
#[instrument(level = "debug", skip_all)]
pub fn clean_user_data(mut table: Table) -> Result<Table> {
    let rows_in = table.len();
    clean_date_column(&mut table, "date_of_birth")?;
    clean_date_column(&mut table, "join_date")?;
    table.drop_nulls(None)?;
    finish("users", rows_in, &table);
    Ok(table)
}

/// Card numbers as unmasked strings, `date_payment_confirmed` to dates,
/// then drop any row with a null.
#[instrument(level = "debug", skip_all)]
pub fn clean_card_data(mut table: Table) -> Result<Table> {
    let rows_in = table.len();
    table.map_column("card_number", |v| match v.text() {
        Some(s) => Value::Str(s.replace(CARD_MASK, "")),
        None => Value::Null,
    })?;
    clean_date_column(&mut table, "date_payment_confirmed")?;
    table.drop_nulls(None)?;
    finish("card_details", rows_in, &table);
    Ok(table)
}

/// `opening_date` to dates and `staff_numbers` scrubbed to a number. Only
/// rows without a staff count are dropped; other nulls (the web store has
/// no coordinates) are kept.
#[instrument(level = "debug", skip_all)]
pub fn clean_store_data(mut table: Table) -> Result<Table> {
    let rows_in = table.len();
    clean_date_column(&mut table, "opening_date")?;
    table.map_column("staff_numbers", scrub_numeric)?;
    table.drop_nulls(Some(&["staff_numbers"]))?;
    finish("store_details", rows_in, &table);
    Ok(table)
}

/// Convert `column` to kilograms, then run [`clean_products_data`].
#[instrument(level = "debug", skip(table))]
pub fn convert_product_weights(mut table: Table, column: &str) -> Result<Table> {
    table.map_column(column, normalize_weight)?;
    clean_products_data(table)
}

/// `date_added` to dates, drop any row with a null, renumber the rows.
#[instrument(level = "debug", skip_all)]
pub fn clean_products_data(mut table: Table) -> Result<Table> {
    let rows_in = table.len();
    clean_date_column(&mut table, "date_added")?;
    table.drop_nulls(None)?;
    table.reset_index();
    finish("products", rows_in, &table);
    Ok(table)
}

/// Drop [`ORDERS_DROPPED_COLUMNS`], keep only rows whose `card_number` is all
/// digits, then drop any row with a null.
#[instrument(level = "debug", skip_all)]
pub fn clean_orders_data(mut table: Table) -> Result<Table> {
    let rows_in = table.len();
    table.drop_columns(ORDERS_DROPPED_COLUMNS);
    table.map_column("card_number", |v| {
        v.text()
            .filter(|s| is_digit_string(s))
            .map(|s| Value::Str(s.into_owned()))
            .unwrap_or(Value::Null)
    })?;
    table.drop_nulls(None)?;
    finish("orders", rows_in, &table);
    Ok(table)
}

/// `month`, `year` and `day` to numbers, `timestamp` to a time of day; drop
/// any row with a null and renumber the rows.
#[instrument(level = "debug", skip_all)]
pub fn clean_date_time(mut table: Table) -> Result<Table> {
    let rows_in = table.len();
    for column in ["month", "year", "day"] {
        table.map_column(column, coerce_numeric)?;
    }
    table.map_column("timestamp", normalize_time)?;
    table.drop_nulls(None)?;
    table.reset_index();
    finish("date_times", rows_in, &table);
    Ok(table)
}
