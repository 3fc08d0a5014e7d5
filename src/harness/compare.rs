//! Comparison of actual messages against vector expectations.
//!
//! Every check returns `Err(reason)` describing the first mismatch.

use std::collections::BTreeMap;

use axum::http::HeaderMap;

use crate::coerce::percent_decode;
use crate::model::Value;

/// Structural equality where NaN equals NaN of the same width, so a vector
/// can expect a NaN member.
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
        (Value::Double(a), Value::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(a), Value::Map(b)) | (Value::Structure(a), Value::Structure(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && values_equal(va, vb))
        }
        _ => expected == actual,
    }
}

/// Every expected header is present with the same value. Repeated actual
/// values are joined with `", "` before comparing.
pub fn headers_match(expected: &BTreeMap<String, String>, actual: &HeaderMap) -> Result<(), String> {
    for (name, value) in expected {
        let name = name.to_ascii_lowercase();
        let values: Vec<&str> = actual
            .get_all(name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if values.is_empty() {
            return Err(format!("missing header `{}`", name));
        }
        let joined = values.join(", ");
        if &joined != value {
            return Err(format!("header `{}` is `{}`, expected `{}`", name, joined, value));
        }
    }
    Ok(())
}

pub fn headers_present(required: &[String], actual: &HeaderMap) -> Result<(), String> {
    match required
        .iter()
        .find(|name| !actual.contains_key(name.to_ascii_lowercase().as_str()))
    {
        Some(name) => Err(format!("required header `{}` is absent", name)),
        None => Ok(()),
    }
}

pub fn headers_absent(forbidden: &[String], actual: &HeaderMap) -> Result<(), String> {
    match forbidden
        .iter()
        .find(|name| actual.contains_key(name.to_ascii_lowercase().as_str()))
    {
        Some(name) => Err(format!("forbidden header `{}` is present", name)),
        None => Ok(()),
    }
}

/// `key` requires the name only; `key=value` requires the exact pair.
/// Components are written percent-encoded, the same way they appear on the
/// wire, and are decoded before comparing against the parsed pairs.
pub fn query_present(required: &[String], actual: &[(String, String)]) -> Result<(), String> {
    for component in required {
        let found = match component.split_once('=') {
            Some((key, value)) => {
                let key = decode_component(key)?;
                let value = decode_component(value)?;
                actual.iter().any(|(k, v)| *k == key && *v == value)
            }
            None => {
                let key = decode_component(component)?;
                actual.iter().any(|(k, _)| *k == key)
            }
        };
        if !found {
            return Err(format!("required query parameter `{}` is absent", component));
        }
    }
    Ok(())
}

pub fn query_absent(forbidden: &[String], actual: &[(String, String)]) -> Result<(), String> {
    for component in forbidden {
        let key = decode_component(component)?;
        if actual.iter().any(|(k, _)| *k == key) {
            return Err(format!("forbidden query parameter `{}` is present", component));
        }
    }
    Ok(())
}

fn decode_component(raw: &str) -> Result<String, String> {
    percent_decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| format!("vector query component `{}` does not decode: {}", raw, e))
}

/// Compare bodies after canonicalising by media type.
pub fn body_matches(expected: &str, actual: &[u8], media_type: Option<&str>) -> Result<(), String> {
    let media = media_type
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let equal = if expected.is_empty() || actual.is_empty() {
        expected.as_bytes() == actual
    } else if media == "application/json" || media.starts_with("application/x-amz-json") {
        let expected: serde_json::Value =
            serde_json::from_str(expected).map_err(|e| format!("expected body is not JSON: {}", e))?;
        let actual: serde_json::Value =
            serde_json::from_slice(actual).map_err(|e| format!("actual body is not JSON: {}", e))?;
        expected == actual
    } else if media == "application/x-www-form-urlencoded" {
        sorted_pairs(expected.as_bytes()) == sorted_pairs(actual)
    } else if media == "application/xml" || media == "text/xml" {
        let actual = String::from_utf8_lossy(actual);
        strip_xml_whitespace(expected) == strip_xml_whitespace(&actual)
    } else {
        expected.as_bytes() == actual
    };

    if equal {
        Ok(())
    } else {
        Err(format!(
            "body is `{}`, expected `{}`",
            String::from_utf8_lossy(actual),
            expected
        ))
    }
}

fn sorted_pairs(body: &[u8]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(body).into_owned().collect();
    pairs.sort();
    pairs
}

/// Drop whitespace-only text between tags.
fn strip_xml_whitespace(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut pending = String::new();
    let mut after_tag = false;
    for c in xml.chars() {
        match c {
            '<' => {
                if !(after_tag && pending.trim().is_empty()) {
                    out.push_str(&pending);
                }
                pending.clear();
                out.push('<');
                after_tag = false;
            }
            '>' => {
                out.push('>');
                after_tag = true;
            }
            _ if after_tag => pending.push(c),
            _ => out.push(c),
        }
    }
    out.push_str(pending.trim());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_header_subset() {
        let actual = headers(&[("x-a", "1"), ("x-list", "a"), ("x-list", "b"), ("x-extra", "z")]);
        let mut expected = BTreeMap::new();
        expected.insert("X-A".to_string(), "1".to_string());
        expected.insert("X-List".to_string(), "a, b".to_string());
        assert!(headers_match(&expected, &actual).is_ok());

        expected.insert("X-A".to_string(), "2".to_string());
        assert!(headers_match(&expected, &actual).is_err());

        expected.clear();
        expected.insert("X-Missing".to_string(), "1".to_string());
        assert_eq!(
            headers_match(&expected, &actual).unwrap_err(),
            "missing header `x-missing`"
        );
    }

    #[test]
    fn test_required_and_forbidden_headers() {
        let actual = headers(&[("content-type", "application/json")]);
        assert!(headers_present(&["Content-Type".to_string()], &actual).is_ok());
        assert!(headers_present(&["X-A".to_string()], &actual).is_err());
        assert!(headers_absent(&["X-A".to_string()], &actual).is_ok());
        assert!(headers_absent(&["content-type".to_string()], &actual).is_err());
    }

    #[test]
    fn test_query_requirements() {
        let actual = vec![
            ("a".to_string(), "1".to_string()),
            ("flag".to_string(), "".to_string()),
        ];
        assert!(query_present(&["a".to_string(), "a=1".to_string(), "flag".to_string()], &actual).is_ok());
        assert!(query_present(&["a=2".to_string()], &actual).is_err());
        assert!(query_absent(&["b".to_string()], &actual).is_ok());
        assert!(query_absent(&["a".to_string()], &actual).is_err());
    }

    #[test]
    fn test_encoded_query_requirements_are_decoded() {
        let actual = vec![
            ("other".to_string(), "x y".to_string()),
            ("a b".to_string(), "1".to_string()),
        ];
        assert!(query_present(&["other=x%20y".to_string(), "a%20b".to_string()], &actual).is_ok());
        assert!(query_present(&["other=x%20z".to_string()], &actual).is_err());
        assert!(query_absent(&["a%20b".to_string()], &actual).is_err());
        assert!(query_absent(&["a%20c".to_string()], &actual).is_ok());
        assert!(query_present(&["bad%zz".to_string()], &actual)
            .unwrap_err()
            .contains("does not decode"));
    }

    #[test]
    fn test_nan_members_compare_equal() {
        let nan = |d: f64, f: f32| {
            let mut fields = BTreeMap::new();
            fields.insert("d".to_string(), Value::Double(d));
            fields.insert("list".to_string(), Value::List(vec![Value::Float(f)]));
            Value::Structure(fields)
        };
        assert!(values_equal(&nan(f64::NAN, f32::NAN), &nan(f64::NAN, f32::NAN)));
        assert!(!values_equal(&nan(f64::NAN, f32::NAN), &nan(1.0, f32::NAN)));
        assert!(!values_equal(&nan(1.0, 2.0), &nan(1.0, f32::NAN)));
        assert!(values_equal(&nan(1.0, 2.0), &nan(1.0, 2.0)));
        assert!(!values_equal(&Value::Double(f64::NAN), &Value::Float(f32::NAN)));
    }

    #[test]
    fn test_json_bodies_compare_structurally() {
        assert!(body_matches(r#"{"a": 1, "b": [true]}"#, br#"{"b":[true],"a":1}"#, Some("application/json")).is_ok());
        assert!(body_matches(r#"{"a": 1}"#, br#"{"a":2}"#, Some("application/json")).is_err());
        assert!(body_matches("{}", b"not json", Some("application/json")).is_err());
    }

    #[test]
    fn test_form_bodies_ignore_order() {
        assert!(body_matches(
            "Action=Op&b=2&a=1",
            b"a=1&Action=Op&b=2",
            Some("application/x-www-form-urlencoded")
        )
        .is_ok());
    }

    #[test]
    fn test_xml_whitespace() {
        assert!(body_matches(
            "<Root>\n  <A>x y</A>\n</Root>\n",
            b"<Root><A>x y</A></Root>",
            Some("application/xml")
        )
        .is_ok());
        assert!(body_matches("<A>x</A>", b"<A>y</A>", Some("application/xml")).is_err());
    }

    #[test]
    fn test_other_bodies_compare_bytes() {
        assert!(body_matches("raw", b"raw", Some("application/octet-stream")).is_ok());
        assert!(body_matches("raw", b"", Some("application/octet-stream")).is_err());
        assert!(body_matches("", b"", None).is_ok());
    }
}
