//! Header value coercion.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderValue};

use crate::binding::{MemberBinding, TimestampFormat};
use crate::coerce::primitive::{parse_scalar, percent_decode, push_unique, CoercionError};
use crate::model::{Value, ValueKind};

/// Split a comma-separated header list.
///
/// Items may be double-quoted to contain commas; inside quotes `\` escapes
/// the next character. Unquoted items are trimmed.
pub fn split_list(raw: &str) -> Result<Vec<String>, CoercionError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let malformed = || CoercionError::MalformedList(raw.to_string());
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut closed_quote = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    in_quotes = false;
                    closed_quote = true;
                }
                '\\' => current.push(chars.next().ok_or_else(malformed)?),
                _ => current.push(c),
            }
            continue;
        }
        match c {
            ',' => {
                items.push(finish_item(&current, closed_quote));
                current.clear();
                closed_quote = false;
            }
            '"' if !closed_quote && current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            c if closed_quote && !c.is_whitespace() => return Err(malformed()),
            _ if closed_quote => {}
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(malformed());
    }
    items.push(finish_item(&current, closed_quote));
    Ok(items)
}

fn finish_item(current: &str, quoted: bool) -> String {
    if quoted {
        current.to_string()
    } else {
        current.trim().to_string()
    }
}

/// Split a list of IMF-fixdates. Every date contains one comma, so the
/// comma-separated pieces are re-paired.
pub fn split_http_dates(raw: &str) -> Result<Vec<String>, CoercionError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let pieces: Vec<&str> = raw.split(',').map(str::trim).collect();
    if pieces.len() % 2 != 0 {
        return Err(CoercionError::MalformedList(raw.to_string()));
    }
    Ok(pieces
        .chunks(2)
        .map(|pair| format!("{}, {}", pair[0], pair[1]))
        .collect())
}

fn header_str(value: &HeaderValue) -> Result<&str, CoercionError> {
    value
        .to_str()
        .map_err(|_| CoercionError::InvalidUtf8(String::from_utf8_lossy(value.as_bytes()).into_owned()))
}

fn coerce_item(raw: &str, kind: &ValueKind, format: Option<TimestampFormat>) -> Result<Value, CoercionError> {
    let decoded = percent_decode(raw)?;
    parse_scalar(&decoded, kind, format)
}

/// Read the member bound to header `binding.wire_name`.
///
/// Repeated header lines are concatenated in order for list and set
/// targets; a scalar target must appear at most once.
pub fn read_header(headers: &HeaderMap, binding: &MemberBinding) -> Result<Option<Value>, CoercionError> {
    let name = binding.wire_name.to_ascii_lowercase();
    let values = headers
        .get_all(name.as_str())
        .iter()
        .map(header_str)
        .collect::<Result<Vec<_>, _>>()?;

    if values.is_empty() {
        return Ok(None);
    }

    let format = binding.timestamp_format;
    match &binding.kind {
        ValueKind::List(item) | ValueKind::Set(item) => {
            let unique = matches!(binding.kind, ValueKind::Set(_));
            let mut items = Vec::new();
            for raw in values {
                let parts = if **item == ValueKind::Timestamp && format == Some(TimestampFormat::HttpDate) {
                    split_http_dates(raw)?
                } else {
                    split_list(raw)?
                };
                for part in parts {
                    let value = coerce_item(&part, item, format)?;
                    if unique {
                        push_unique(&mut items, value);
                    } else {
                        items.push(value);
                    }
                }
            }
            Ok(Some(Value::List(items)))
        }
        kind => {
            if values.len() > 1 {
                return Err(CoercionError::TooManyValues(values.len()));
            }
            coerce_item(values[0], kind, format).map(Some)
        }
    }
}

/// Collect every header starting with `binding.wire_name` into a map keyed
/// by the rest of the (lower-cased) header name.
///
/// String-valued maps keep the first value seen for a key; list-valued
/// maps append every value.
pub fn read_prefix_headers(
    headers: &HeaderMap,
    binding: &MemberBinding,
) -> Result<Option<Value>, CoercionError> {
    let prefix = binding.wire_name.to_ascii_lowercase();
    let value_kind = match &binding.kind {
        ValueKind::Map(value) => value.as_ref(),
        other => return Err(CoercionError::UnsupportedKind(other.to_string())),
    };

    let mut map: BTreeMap<String, Value> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let Some(key) = name.as_str().strip_prefix(prefix.as_str()) else {
            continue;
        };
        let raw = header_str(value)?;
        match value_kind {
            ValueKind::List(item) | ValueKind::Set(item) => {
                let unique = matches!(value_kind, ValueKind::Set(_));
                let entry = map
                    .entry(key.to_string())
                    .or_insert_with(|| Value::List(Vec::new()));
                if let Value::List(items) = entry {
                    for part in split_list(raw)? {
                        let value = coerce_item(&part, item, None)?;
                        if unique {
                            push_unique(items, value);
                        } else {
                            items.push(value);
                        }
                    }
                }
            }
            kind => {
                let value = coerce_item(raw, kind, None)?;
                map.entry(key.to_string()).or_insert(value);
            }
        }
    }

    if map.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Map(map)))
    }
}
