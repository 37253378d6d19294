// src/clean/units.rs

use crate::table::Value;

/// Mass or volume suffixes understood by [`parse_kg`], in match priority,
/// with the `(multiplier, divisor)` that takes the quantity to kilograms.
///
/// `kg` must be tested before `g`, and `ml` before `l`, since the shorter
/// suffix is a tail of the longer one.
pub const UNIT_SUFFIXES: &[(&str, f64, f64)] = &[
    ("kg", 1.0, 1.0),
    ("g", 1.0, 1000.0),
    ("ml", 1.0, 1000.0),
    ("l", 1.0, 1.0),
    ("oz", 28.3495, 1000.0),
];

/// Convert a weight expression such as `"500g"`, `"1.2kg"` or `"12 x 100g"`
/// into kilograms. Volumes are treated as water (1 ml = 1 g).
///
/// Returns `None` for an unknown suffix, an unreadable quantity, or a
/// negative or non-finite result.
pub fn parse_kg(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (number, mul, div) = UNIT_SUFFIXES.iter().find_map(|(suffix, mul, div)| {
        raw.strip_suffix(*suffix).map(|rest| (rest, *mul, *div))
    })?;

    let kg = quantity(number)? * mul / div;
    (kg.is_finite() && kg >= 0.0).then_some(kg)
}

/// A plain number, or exactly two numbers joined by `x`.
fn quantity(s: &str) -> Option<f64> {
    if s.contains('x') {
        let factors: Vec<&str> = s.split('x').collect();
        if factors.len() != 2 {
            return None;
        }
        let a = parse_float(factors[0])?;
        let b = parse_float(factors[1])?;
        return Some(a * b);
    }
    parse_float(s)
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Cell-level weight normalisation. Numbers are already kilograms and pass
/// through; strings go through [`parse_kg`].
pub fn normalize_weight(value: &Value) -> Value {
    match value {
        Value::Int(_) | Value::Float(_) => value
            .as_f64()
            .filter(|kg| kg.is_finite() && *kg >= 0.0)
            .map(Value::Float)
            .unwrap_or(Value::Null),
        Value::Str(s) => parse_kg(s).map(Value::Float).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn known_units() {
        assert_eq!(parse_kg("2kg"), Some(2.0));
        assert_eq!(parse_kg("500g"), Some(0.5));
        assert!(close(parse_kg("2 x 200g"), 0.4));
        assert!(close(parse_kg("16oz"), 0.453592));
        assert_eq!(parse_kg("750ml"), Some(0.75));
        assert_eq!(parse_kg("1.5l"), Some(1.5));
        assert!(close(parse_kg("12 x 100g"), 1.2));
        assert!(close(parse_kg("3x2kg"), 6.0));
        assert_eq!(parse_kg(" 1kg "), Some(1.0));
    }

    #[test]
    fn unknown_or_broken_values() {
        assert_eq!(parse_kg("77g ."), None);
        assert_eq!(parse_kg("9GO9NZ5JTL"), None);
        assert_eq!(parse_kg("5 lb"), None);
        assert_eq!(parse_kg("12"), None);
        assert_eq!(parse_kg(""), None);
        assert_eq!(parse_kg("kg"), None);
        assert_eq!(parse_kg("-5g"), None);
        assert_eq!(parse_kg("2 x 3 x 4g"), None);
        assert_eq!(parse_kg("nang"), None);
    }

    #[test]
    fn suffix_priority() {
        // "mg" ends in "g" and is read as grams of an unparseable quantity
        assert_eq!(parse_kg("5mg"), None);
        // "ml" must not be read as litres
        assert_eq!(parse_kg("100ml"), Some(0.1));
    }

    #[test]
    fn cells() {
        assert_eq!(normalize_weight(&Value::from("500g")), Value::Float(0.5));
        assert_eq!(normalize_weight(&Value::Float(0.5)), Value::Float(0.5));
        assert_eq!(normalize_weight(&Value::Int(2)), Value::Float(2.0));
        assert_eq!(normalize_weight(&Value::from("junk")), Value::Null);
        assert_eq!(normalize_weight(&Value::Null), Value::Null);
    }
}
