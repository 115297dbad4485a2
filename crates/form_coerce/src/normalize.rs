use form_schema::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::options::CoerceOptions;

/// Maps the empty string to `Undefined`; everything else passes through.
#[must_use]
pub fn normalize_string(value: Value) -> Value {
    normalize_string_with(value, Value::String)
}

/// Like [`normalize_string`], but hands non-empty strings to `transform`.
pub fn normalize_string_with(value: Value, transform: impl FnOnce(String) -> Value) -> Value {
    match value {
        Value::String(text) if text.is_empty() => Value::Undefined,
        Value::String(text) => transform(text),
        other => other,
    }
}

/// Maps an empty upload (no name, no bytes) to `Undefined`.
#[must_use]
pub fn normalize_file(value: Value, options: &CoerceOptions) -> Value {
    match value {
        Value::File(file) if options.file_inputs && file.is_empty_upload() => Value::Undefined,
        other => other,
    }
}

/// Wraps single values into a one-element array and absent ones into `[]`.
#[must_use]
pub fn normalize_array(value: Value, options: &CoerceOptions) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Undefined => Value::Array(Vec::new()),
        Value::String(_) | Value::File(_) => {
            match normalize_file(normalize_string(value), options) {
                Value::Undefined => Value::Array(Vec::new()),
                single => Value::Array(vec![single]),
            }
        }
        single => Value::Array(vec![single]),
    }
}

/// Decimal or exponent notation with surrounding whitespace trimmed.
///
/// Whitespace-only text, infinities and anything else that is not a finite
/// number become NaN so the number node reports them.
#[must_use]
pub fn parse_number(text: String) -> Value {
    let parsed = text
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite());
    Value::Number(parsed.unwrap_or(f64::NAN))
}

/// Only `"on"`, the value browsers send for a checked checkbox, becomes
/// `true`. Other strings are left for the boolean node to reject.
#[must_use]
pub fn parse_boolean(text: String) -> Value {
    if text == "on" {
        Value::Bool(true)
    } else {
        Value::String(text)
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
#[must_use]
pub fn parse_date(text: String) -> Value {
    let trimmed = text.trim();
    if let Ok(timestamp) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Value::Date(timestamp);
    }
    match Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        Ok(date) => Value::Date(date.midnight().assume_utc()),
        Err(_) => Value::String(text),
    }
}

#[must_use]
pub fn parse_bigint(text: String) -> Value {
    match text.trim().parse::<i128>() {
        Ok(value) => Value::BigInt(value),
        Err(_) => Value::String(text),
    }
}
