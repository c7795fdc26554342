//! Field predicates used by the rule engine
//!
//! Each predicate answers a yes/no question about a raw JSON value. They never
//! allocate error messages; the engine in [`super::rules`] decides what to
//! report.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

pub const DEFAULT_MIN_LENGTH: usize = 1;
pub const DEFAULT_MAX_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    /// Something before the @, something after it, and a dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// A value counts as present unless it is null or a blank string.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

pub fn is_valid_email(value: &Value) -> bool {
    value.as_str().is_some_and(|s| EMAIL_REGEX.is_match(s))
}

/// At least 8 characters with at least one letter and one digit
pub fn is_valid_password(value: &Value) -> bool {
    let Some(password) = value.as_str() else {
        return false;
    };
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return false;
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    has_letter && has_digit
}

/// Textual value whose length lies within `[min_length, max_length]`
pub fn is_valid_string(value: &Value, min_length: usize, max_length: usize) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let len = s.chars().count();
    len >= min_length && len <= max_length
}

/// Value that coerces to a finite number inside the optional bounds
pub fn is_valid_number(value: &Value, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(num) = coerce_number(value) else {
        return false;
    };
    if min.is_some_and(|min| num < min) {
        return false;
    }
    if max.is_some_and(|max| num > max) {
        return false;
    }
    true
}

/// Permissive numeric coercion.
///
/// Accepts JSON numbers, numeric strings (surrounding whitespace, sign,
/// exponent and `0x`/`0o`/`0b` prefixes allowed, blank is zero), booleans as
/// 1/0 and single-element arrays by their element. Everything else, and any
/// non-finite result, is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => Some(0.0),
            // arrays coerce through their text form, where null is blank
            // and a boolean is a word
            [Value::Null] => Some(0.0),
            [Value::Bool(_)] | [Value::Object(_)] => None,
            [single] => coerce_number(single),
            _ => None,
        },
        Value::Object(_) => None,
    };
    num.filter(|n| n.is_finite())
}

/// Parse a numeric string the same way [`coerce_number`] treats strings.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&trimmed[2..], radix)
            .ok()
            .map(|n| n as f64);
    }

    // f64::from_str also knows "inf" and "nan", which are not numbers here
    let is_decimal = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !is_decimal {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a bound the way it appears in messages: `18`, not `18.0`
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
