// src/clean/date_parser.rs

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::table::{Table, Value};

/// A named way of reading a date out of a string.
pub struct DateTier {
    pub name: &'static str,
    pub parse: fn(&str) -> Option<NaiveDate>,
}

/// Tried top to bottom, first success wins. Later tiers are looser, so the
/// order matters: a value that fits a strict shape must never reach the
/// best-effort tier.
pub static DATE_TIERS: &[DateTier] = &[
    DateTier {
        name: "YYYY-MM-DD",
        parse: parse_iso,
    },
    DateTier {
        name: "YYYY Month DD",
        parse: parse_year_month_day,
    },
    DateTier {
        name: "Month YYYY DD",
        parse: parse_month_year_day,
    },
    DateTier {
        name: "best-effort",
        parse: parse_best_effort,
    },
];

static ISO_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));
static YEAR_MONTH_DAY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}\s+[A-Za-z]+\s+\d{1,2}$").expect("static regex"));
static MONTH_YEAR_DAY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+\s+\d{4}\s+\d{1,2}$").expect("static regex"));

fn parse_iso(s: &str) -> Option<NaiveDate> {
    if !ISO_SHAPE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_year_month_day(s: &str) -> Option<NaiveDate> {
    if !YEAR_MONTH_DAY_SHAPE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y %B %d").ok()
}

fn parse_month_year_day(s: &str) -> Option<NaiveDate> {
    if !MONTH_YEAR_DAY_SHAPE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%B %Y %d").ok()
}

const LOOSE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%Y %m %d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%Y-%b-%d",
    "%d-%b-%Y",
];

const LOOSE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_best_effort(s: &str) -> Option<NaiveDate> {
    if let Some(d) = LOOSE_DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    if let Some(dt) = LOOSE_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse `s` with the first tier that accepts it; `None` if none do.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_TIERS.iter().find_map(|tier| (tier.parse)(s))
}

/// Cell-level date normalisation. Dates pass through untouched.
pub fn normalize_date(value: &Value) -> Value {
    match value {
        Value::Date(_) => value.clone(),
        Value::Null => Value::Null,
        other => other
            .text()
            .and_then(|s| parse_date(&s))
            .map(Value::Date)
            .unwrap_or(Value::Null),
    }
}

/// Strict `HH:MM:SS`.
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S").ok()
}

/// Cell-level time normalisation. Times pass through untouched.
pub fn normalize_time(value: &Value) -> Value {
    match value {
        Value::Time(_) => value.clone(),
        Value::Str(s) => parse_time(s).map(Value::Time).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Normalise `column` to dates and drop the rows that did not parse.
/// Returns how many rows were dropped.
pub fn clean_date_column(table: &mut Table, column: &str) -> Result<usize> {
    table.map_column(column, normalize_date)?;
    let dropped = table.drop_nulls(Some(&[column]))?;
    debug!(column, dropped, "normalised date column");
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn three_shapes_agree() {
        let expected = Some(ymd(2023, 5, 14));
        assert_eq!(parse_date("2023-05-14"), expected);
        assert_eq!(parse_date("2023 May 14"), expected);
        assert_eq!(parse_date("May 2023 14"), expected);
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date(""), None);
    }

    fn first_tier(s: &str) -> Option<&'static str> {
        DATE_TIERS
            .iter()
            .find(|tier| (tier.parse)(s).is_some())
            .map(|tier| tier.name)
    }

    #[test]
    fn tiers_are_tried_in_order() {
        assert_eq!(first_tier("2023-05-14"), Some("YYYY-MM-DD"));
        assert_eq!(first_tier("1968 October 16"), Some("YYYY Month DD"));
        assert_eq!(first_tier("July 2005 26"), Some("Month YYYY DD"));
        assert_eq!(first_tier("2005/07/26"), Some("best-effort"));
        assert_eq!(first_tier("GONLVTR3UP"), None);

        let names: Vec<&str> = DATE_TIERS.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["YYYY-MM-DD", "YYYY Month DD", "Month YYYY DD", "best-effort"]
        );
    }

    #[test]
    fn strict_tiers_reject_loose_shapes() {
        assert_eq!(parse_iso("2023-5-4"), None);
        assert_eq!(parse_year_month_day("May 2023 14"), None);
        assert_eq!(parse_month_year_day("2023 May 14"), None);
        // the loose tier still recovers it
        assert_eq!(parse_date("2023-5-4"), Some(ymd(2023, 5, 4)));
    }

    #[test]
    fn best_effort_formats() {
        assert_eq!(parse_date("2011/08/22"), Some(ymd(2011, 8, 22)));
        assert_eq!(parse_date("08/22/2011"), Some(ymd(2011, 8, 22)));
        assert_eq!(parse_date("22 August 2011"), Some(ymd(2011, 8, 22)));
        assert_eq!(parse_date("2011-08-22 10:15:00"), Some(ymd(2011, 8, 22)));
        assert_eq!(parse_date("2011-08-22T10:15:00+01:00"), Some(ymd(2011, 8, 22)));
        assert_eq!(parse_date("2011-02-30"), None);
    }

    #[test]
    fn cell_normalisation() {
        let d = ymd(1999, 1, 2);
        assert_eq!(normalize_date(&Value::Date(d)), Value::Date(d));
        assert_eq!(normalize_date(&Value::from("1999 January 02")), Value::Date(d));
        assert_eq!(normalize_date(&Value::from("NULL")), Value::Null);
        assert_eq!(normalize_date(&Value::Null), Value::Null);
    }

    #[test]
    fn strict_times() {
        assert_eq!(
            parse_time("22:00:06"),
            NaiveTime::from_hms_opt(22, 0, 6)
        );
        assert_eq!(parse_time("22:00"), None);
        assert_eq!(parse_time("NULL"), None);
        assert_eq!(normalize_time(&Value::Int(5)), Value::Null);
    }

    #[test]
    fn drops_unparseable_rows() -> Result<()> {
        let mut t = Table::from_rows(
            vec!["d".into()],
            vec![
                vec![Value::from("2020-01-01")],
                vec![Value::from("bogus")],
                vec![Value::from("2020 March 3")],
            ],
        )?;
        assert_eq!(clean_date_column(&mut t, "d")?, 1);
        assert_eq!(t.index, vec![0, 2]);
        assert_eq!(t.rows[1][0], Value::Date(ymd(2020, 3, 3)));
        Ok(())
    }
}
