//! Query string parsing and multi-value accumulation.
//!
//! # Accumulation Rules
//! - Scalar member on a repeated key: first occurrence wins
//! - List member: every occurrence appended in encounter order
//! - Set member: as list, later duplicates dropped
//! - Query-params map of strings: first occurrence of each key wins
//! - Query-params map of lists/sets: every occurrence appended per key

use std::collections::BTreeMap;

use crate::binding::MemberBinding;
use crate::coerce::primitive::{parse_scalar, percent_decode, push_unique, CoercionError};
use crate::error::RequestRejection;
use crate::model::{Value, ValueKind};

/// Split a raw query string into percent-decoded `(key, value)` pairs in
/// encounter order. `+` is kept literally; a key without `=` has an empty
/// value.
pub fn parse_query_string(query: &str) -> Result<Vec<(String, String)>, RequestRejection> {
    let mut pairs = Vec::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(raw_key).map_err(|source| RequestRejection::QueryParse {
            key: raw_key.to_string(),
            source,
        })?;
        let value = percent_decode(raw_value).map_err(|source| RequestRejection::QueryParse {
            key: key.to_string(),
            source,
        })?;
        pairs.push((key.into_owned(), value.into_owned()));
    }
    Ok(pairs)
}

fn coerce(key: &str, raw: &str, kind: &ValueKind, binding: &MemberBinding) -> Result<Value, RequestRejection> {
    parse_scalar(raw, kind, binding.timestamp_format).map_err(|source| RequestRejection::QueryParse {
        key: key.to_string(),
        source,
    })
}

/// Read the member bound to query key `binding.wire_name`.
pub fn read_query(pairs: &[(String, String)], binding: &MemberBinding) -> Result<Option<Value>, RequestRejection> {
    let key = binding.wire_name.as_str();
    let mut values = pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str());

    match &binding.kind {
        ValueKind::List(item) | ValueKind::Set(item) => {
            let unique = matches!(binding.kind, ValueKind::Set(_));
            let mut items = Vec::new();
            for raw in values {
                let value = coerce(key, raw, item, binding)?;
                if unique {
                    push_unique(&mut items, value);
                } else {
                    items.push(value);
                }
            }
            Ok((!items.is_empty()).then_some(Value::List(items)))
        }
        kind => match values.next() {
            Some(raw) => coerce(key, raw, kind, binding).map(Some),
            None => Ok(None),
        },
    }
}

/// Collect the whole query string into the query-params map member.
pub fn read_query_params(
    pairs: &[(String, String)],
    binding: &MemberBinding,
) -> Result<Option<Value>, RequestRejection> {
    let value_kind = match &binding.kind {
        ValueKind::Map(value) => value.as_ref(),
        other => {
            return Err(RequestRejection::QueryParse {
                key: binding.wire_name.clone(),
                source: CoercionError::UnsupportedKind(other.to_string()),
            })
        }
    };

    let mut map: BTreeMap<String, Value> = BTreeMap::new();
    for (key, raw) in pairs {
        match value_kind {
            ValueKind::List(item) | ValueKind::Set(item) => {
                let unique = matches!(value_kind, ValueKind::Set(_));
                let value = coerce(key, raw, item, binding)?;
                let entry = map.entry(key.clone()).or_insert_with(|| Value::List(Vec::new()));
                if let Value::List(items) = entry {
                    if unique {
                        push_unique(items, value);
                    } else {
                        items.push(value);
                    }
                }
            }
            kind => {
                if !map.contains_key(key) {
                    map.insert(key.clone(), coerce(key, raw, kind, binding)?);
                }
            }
        }
    }

    Ok((!map.is_empty()).then_some(Value::Map(map)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Location, TimestampFormat};

    fn binding(name: &str, kind: ValueKind, location: Location) -> MemberBinding {
        MemberBinding {
            member: name.into(),
            location,
            wire_name: name.into(),
            timestamp_format: kind.involves_timestamp().then_some(TimestampFormat::DateTime),
            kind,
            required: false,
        }
    }

    fn strings(values: &[&str]) -> Value {
        Value::List(values.iter().map(|v| Value::from(*v)).collect())
    }

    #[test]
    fn test_parse_query_string() {
        let pairs = parse_query_string("a=1&b=x%20y&flag&&c=d%3De&p=a+b").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x y".to_string()),
                ("flag".to_string(), String::new()),
                ("c".to_string(), "d=e".to_string()),
                ("p".to_string(), "a+b".to_string()),
            ]
        );
        assert!(matches!(
            parse_query_string("ok=1&bad=%G1"),
            Err(RequestRejection::QueryParse { ref key, .. }) if key == "bad"
        ));
    }

    #[test]
    fn test_scalar_first_occurrence_wins() {
        let pairs = parse_query_string("n=1&n=2").unwrap();
        let b = binding("n", ValueKind::Integer, Location::Query);
        assert_eq!(read_query(&pairs, &b).unwrap(), Some(Value::Integer(1)));

        let missing = binding("m", ValueKind::Integer, Location::Query);
        assert_eq!(read_query(&pairs, &missing).unwrap(), None);
    }

    #[test]
    fn test_list_and_set_accumulation() {
        let pairs = parse_query_string("t=b&t=a&t=b").unwrap();
        let list = binding("t", ValueKind::list_of(ValueKind::String), Location::Query);
        assert_eq!(read_query(&pairs, &list).unwrap(), Some(strings(&["b", "a", "b"])));

        let set = binding("t", ValueKind::set_of(ValueKind::String), Location::Query);
        assert_eq!(read_query(&pairs, &set).unwrap(), Some(strings(&["b", "a"])));
    }

    #[test]
    fn test_query_coercion_errors() {
        let pairs = parse_query_string("n=abc").unwrap();
        let b = binding("n", ValueKind::Integer, Location::Query);
        assert!(matches!(read_query(&pairs, &b), Err(RequestRejection::QueryParse { .. })));

        let pairs = parse_query_string("when=2019-12-16T23%3A48%3A18Z").unwrap();
        let b = binding("when", ValueKind::Timestamp, Location::Query);
        assert!(matches!(read_query(&pairs, &b).unwrap(), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_query_params_string_map_first_wins() {
        let pairs = parse_query_string("k=v1&k=v2").unwrap();
        let b = binding("params", ValueKind::map_of(ValueKind::String), Location::QueryParams);
        let mut expected = BTreeMap::new();
        expected.insert("k".to_string(), Value::from("v1"));
        assert_eq!(read_query_params(&pairs, &b).unwrap(), Some(Value::Map(expected)));
    }

    #[test]
    fn test_query_params_list_map_appends() {
        let pairs = parse_query_string("k=v1&k=v2&j=x").unwrap();
        let b = binding(
            "params",
            ValueKind::map_of(ValueKind::list_of(ValueKind::String)),
            Location::QueryParams,
        );
        let mut expected = BTreeMap::new();
        expected.insert("k".to_string(), strings(&["v1", "v2"]));
        expected.insert("j".to_string(), strings(&["x"]));
        assert_eq!(read_query_params(&pairs, &b).unwrap(), Some(Value::Map(expected)));

        let set = binding(
            "params",
            ValueKind::map_of(ValueKind::set_of(ValueKind::String)),
            Location::QueryParams,
        );
        let pairs = parse_query_string("k=v1&k=v1&k=v2").unwrap();
        let mut expected = BTreeMap::new();
        expected.insert("k".to_string(), strings(&["v1", "v2"]));
        assert_eq!(read_query_params(&pairs, &set).unwrap(), Some(Value::Map(expected)));
    }

    #[test]
    fn test_query_params_empty() {
        let b = binding("params", ValueKind::map_of(ValueKind::String), Location::QueryParams);
        assert_eq!(read_query_params(&[], &b).unwrap(), None);
    }
}
