// src/table/value.rs

use chrono::{NaiveDate, NaiveTime};
use std::borrow::Cow;
use std::fmt;

/// One cell of a [`Table`](super::Table).
///
/// Extractors produce `Null`, `Bool`, `Int`, `Float` and `Str`; the cleaners
/// replace raw cells with canonical `Date`, `Time` and numeric values.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String form of the cell, `None` for null.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Str(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    /// Numeric view of the cell; strings are not parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            // f64's Display already drops the trailing ".0" of whole numbers
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_forms() {
        assert_eq!(Value::Null.text(), None);
        assert_eq!(Value::Int(42).text().as_deref(), Some("42"));
        assert_eq!(Value::Float(12.0).text().as_deref(), Some("12"));
        assert_eq!(Value::Float(0.25).text().as_deref(), Some("0.25"));
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2023, 5, 14).unwrap())
                .text()
                .as_deref(),
            Some("2023-05-14")
        );
        assert_eq!(
            Value::Time(NaiveTime::from_hms_opt(7, 3, 9).unwrap())
                .text()
                .as_deref(),
            Some("07:03:09")
        );
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::from(Some(1.5)), Value::Float(1.5));
    }
}
