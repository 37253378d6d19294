// src/clean/numeric.rs

use anyhow::Result;

use crate::table::{Table, Value};

/// Remove every character that is not an ASCII digit.
pub fn strip_non_digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// True when `s` parses as a floating point number (surrounding whitespace allowed).
pub fn is_numeric_string(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok()
}

/// True when `s` is non-empty and made only of ASCII digits.
pub fn is_digit_string(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `s` as an integer, falling back to a float for values that are
/// numeric but not integral (or too wide for `i64`). `None` when `s` is not
/// a number at all.
pub fn to_numeric_or_null(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Int(i));
    }
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 => {
            Some(Value::Int(x as i64))
        }
        Ok(x) if x.is_finite() => Some(Value::Float(x)),
        _ => None,
    }
}

/// Cell-level numeric coercion: numbers pass through, strings are parsed,
/// everything else becomes null.
pub fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::Int(_) => value.clone(),
        Value::Float(x) if x.is_finite() => value.clone(),
        Value::Str(s) => to_numeric_or_null(s).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Scrub a cell down to its digits and parse the result.
pub fn scrub_numeric(value: &Value) -> Value {
    value
        .text()
        .and_then(|s| to_numeric_or_null(&strip_non_digits(&s)))
        .unwrap_or(Value::Null)
}

/// Replace every null in `column` with `value`, returning the new table.
pub fn fill_nulls(mut table: Table, column: &str, value: Value) -> Result<Table> {
    table.fill_nulls(column, &value)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_everything_but_digits() {
        assert_eq!(strip_non_digits("A12B"), "12");
        assert_eq!(strip_non_digits("J78"), "78");
        assert_eq!(strip_non_digits("3n9"), "39");
        assert_eq!(strip_non_digits("abc"), "");
        // non-ASCII digits are not digits here
        assert_eq!(strip_non_digits("٣4"), "4");
        assert_eq!(strip_non_digits("+44 (0)20-7946"), "440207946");
    }

    #[test]
    fn numeric_predicates() {
        assert!(is_numeric_string("1.5"));
        assert!(is_numeric_string(" 42 "));
        assert!(is_numeric_string("-3e2"));
        assert!(!is_numeric_string("2 x 3"));
        assert!(!is_numeric_string(""));

        assert!(is_digit_string("4971858637664481"));
        assert!(!is_digit_string("4971-8586"));
        assert!(!is_digit_string(""));
    }

    #[test]
    fn numeric_or_null() {
        assert_eq!(to_numeric_or_null("12"), Some(Value::Int(12)));
        assert_eq!(to_numeric_or_null("2.0"), Some(Value::Int(2)));
        assert_eq!(to_numeric_or_null("2.5"), Some(Value::Float(2.5)));
        assert_eq!(to_numeric_or_null(""), None);
        assert_eq!(to_numeric_or_null("NULL"), None);
        assert_eq!(to_numeric_or_null("nan"), None);
    }

    #[test]
    fn scrubbed_cells() {
        assert_eq!(scrub_numeric(&Value::from("A12B")), Value::Int(12));
        assert_eq!(scrub_numeric(&Value::from("abc")), Value::Null);
        assert_eq!(scrub_numeric(&Value::Int(30)), Value::Int(30));
        assert_eq!(scrub_numeric(&Value::Null), Value::Null);
    }

    #[test]
    fn coerced_cells() {
        assert_eq!(coerce_numeric(&Value::from("7")), Value::Int(7));
        assert_eq!(coerce_numeric(&Value::from("July")), Value::Null);
        assert_eq!(coerce_numeric(&Value::Int(2019)), Value::Int(2019));
        assert_eq!(coerce_numeric(&Value::Bool(true)), Value::Null);
    }

    #[test]
    fn fill_is_not_a_drop() -> Result<()> {
        let t = Table::from_rows(
            vec!["lat".into()],
            vec![vec![Value::Null], vec![Value::Float(51.5)]],
        )?;
        let t = fill_nulls(t, "lat", Value::Float(0.0))?;
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows[0][0], Value::Float(0.0));
        assert!(fill_nulls(t, "missing", Value::Null).is_err());
        Ok(())
    }
}
