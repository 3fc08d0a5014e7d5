//! Percent-decoding and scalar parsing.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::binding::TimestampFormat;
use crate::coerce::timestamp;
use crate::model::{Value, ValueKind};

/// A raw wire string could not be converted to the target kind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoercionError {
    #[error("invalid percent-encoding in `{0}`")]
    InvalidPercentEncoding(String),

    #[error("percent-decoded `{0}` is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("`{value}` is not a valid {kind}")]
    InvalidLiteral { kind: String, value: String },

    #[error("`{value}` is not one of [{}]", allowed.join(", "))]
    NotInEnum { value: String, allowed: Vec<String> },

    #[error("`{value}` is not a valid {format} timestamp")]
    InvalidTimestamp { format: TimestampFormat, value: String },

    #[error("invalid base64 `{0}`")]
    InvalidBase64(String),

    #[error("malformed list value `{0}`")]
    MalformedList(String),

    #[error("expected a single value, found {0}")]
    TooManyValues(usize),

    #[error("{0} cannot be read from a string")]
    UnsupportedKind(String),
}

/// Percent-decode `input`, rejecting `%` not followed by two hex digits.
pub fn percent_decode(input: &str) -> Result<Cow<'_, str>, CoercionError> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(CoercionError::InvalidPercentEncoding(input.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_encoding::percent_decode_str(input)
        .decode_utf8()
        .map_err(|_| CoercionError::InvalidUtf8(input.to_string()))
}

/// Parse an already-decoded wire string as a scalar of `kind`.
///
/// Number parsing is locale independent; floats additionally accept
/// `NaN`, `Infinity` and `-Infinity`.
pub fn parse_scalar(
    raw: &str,
    kind: &ValueKind,
    format: Option<TimestampFormat>,
) -> Result<Value, CoercionError> {
    let invalid = || CoercionError::InvalidLiteral {
        kind: kind.to_string(),
        value: raw.to_string(),
    };

    let value = match kind {
        ValueKind::Boolean => match raw {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => return Err(invalid()),
        },
        ValueKind::Byte => Value::Byte(raw.parse().map_err(|_| invalid())?),
        ValueKind::Short => Value::Short(raw.parse().map_err(|_| invalid())?),
        ValueKind::Integer => Value::Integer(raw.parse().map_err(|_| invalid())?),
        ValueKind::Long => Value::Long(raw.parse().map_err(|_| invalid())?),
        ValueKind::Float => Value::Float(parse_float(raw).ok_or_else(invalid)? as f32),
        ValueKind::Double => Value::Double(parse_float(raw).ok_or_else(invalid)?),
        ValueKind::String => Value::String(raw.to_string()),
        ValueKind::Enum(allowed) => {
            if !allowed.iter().any(|v| v == raw) {
                return Err(CoercionError::NotInEnum {
                    value: raw.to_string(),
                    allowed: allowed.clone(),
                });
            }
            Value::String(raw.to_string())
        }
        ValueKind::Timestamp => Value::Timestamp(timestamp::parse(
            raw,
            format.unwrap_or(TimestampFormat::DateTime),
        )?),
        ValueKind::Blob => Value::Blob(
            BASE64
                .decode(raw)
                .map_err(|_| CoercionError::InvalidBase64(raw.to_string()))?,
        ),
        ValueKind::List(_) | ValueKind::Set(_) | ValueKind::Map(_) | ValueKind::Structure(_) => {
            return Err(CoercionError::UnsupportedKind(kind.to_string()))
        }
    };
    Ok(value)
}

fn parse_float(raw: &str) -> Option<f64> {
    match raw {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        // Rust also accepts "inf"/"nan" spellings; the wire format does not.
        _ if raw.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => raw.parse().ok(),
    }
}

/// Append `value` unless an equal value is already present.
pub fn push_unique(items: &mut Vec<Value>, value: Value) {
    if !items.contains(&value) {
        items.push(value);
    }
}
