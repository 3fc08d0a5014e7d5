//! `application/x-www-form-urlencoded` codec for awsQuery and ec2Query.
//!
//! Lists are `Name.member.N` (awsQuery) or `Name.N` (ec2Query), 1-based;
//! both spellings are accepted on decode. Nested structures are dotted:
//! `Outer.Inner`. Maps are not supported.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use url::form_urlencoded;

use crate::binding::{document_binding, Location, MemberBinding, Protocol, ProtocolDefaults, TimestampFormat};
use crate::codec::{BodyCodec, CodecError};
use crate::coerce::{parse_scalar, timestamp};
use crate::model::{Shape, ShapeBuilder, Value, ValueKind};

/// Keys every query-protocol request carries that are not input members.
const ENVELOPE_KEYS: [&str; 2] = ["Action", "Version"];

#[derive(Debug, Clone)]
pub struct FormCodec {
    content_type: &'static str,
    defaults: ProtocolDefaults,
    flattened_lists: bool,
}

impl FormCodec {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            content_type: protocol.content_type(),
            defaults: protocol.defaults(),
            flattened_lists: protocol == Protocol::Ec2Query,
        }
    }

    fn format(&self, format: Option<TimestampFormat>) -> TimestampFormat {
        format.unwrap_or_else(|| self.defaults.timestamp_format(Location::Document))
    }

    fn nested(&self, shape: &Shape) -> Vec<MemberBinding> {
        shape
            .members
            .iter()
            .map(|member| document_binding(member, &self.defaults))
            .collect()
    }

    fn read_members(
        &self,
        prefix: &str,
        members: &[&MemberBinding],
        pairs: &[(String, String)],
    ) -> Result<BTreeMap<String, Value>, CodecError> {
        let mut fields = BTreeMap::new();
        for binding in members {
            let key = format!("{}{}", prefix, binding.member);
            if let Some(value) = self.read(&key, &binding.kind, binding.timestamp_format, pairs)? {
                fields.insert(binding.member.clone(), value);
            }
        }
        Ok(fields)
    }

    fn read(
        &self,
        key: &str,
        kind: &ValueKind,
        format: Option<TimestampFormat>,
        pairs: &[(String, String)],
    ) -> Result<Option<Value>, CodecError> {
        let dotted = format!("{}.", key);
        match kind {
            ValueKind::List(item) | ValueKind::Set(item) => {
                let mut indexed: BTreeMap<usize, String> = BTreeMap::new();
                for (k, _) in pairs {
                    let Some(rest) = k.strip_prefix(dotted.as_str()) else {
                        continue;
                    };
                    let (marker, rest) = match rest.strip_prefix("member.") {
                        Some(rest) => ("member.", rest),
                        None => ("", rest),
                    };
                    let digits = rest.split('.').next().unwrap_or_default();
                    let index: usize = digits.parse().map_err(|_| CodecError::TypeMismatch {
                        path: k.clone(),
                        expected: "a 1-based list index".into(),
                    })?;
                    indexed
                        .entry(index)
                        .or_insert_with(|| format!("{}{}{}", dotted, marker, index));
                }

                if indexed.is_empty() {
                    let empty = pairs.iter().any(|(k, v)| k == key && v.is_empty());
                    return Ok(empty.then(|| Value::List(Vec::new())));
                }

                let unique = matches!(kind, ValueKind::Set(_));
                let mut values = Vec::with_capacity(indexed.len());
                for item_key in indexed.values() {
                    let Some(value) = self.read(item_key, item, format, pairs)? else {
                        continue;
                    };
                    if unique && values.contains(&value) {
                        return Err(CodecError::DuplicateSetItem { path: key.to_string() });
                    }
                    values.push(value);
                }
                Ok(Some(Value::List(values)))
            }
            ValueKind::Map(_) => {
                if pairs.iter().any(|(k, _)| k == key || k.starts_with(dotted.as_str())) {
                    return Err(CodecError::Unsupported {
                        path: key.to_string(),
                        kind: kind.to_string(),
                    });
                }
                Ok(None)
            }
            ValueKind::Structure(shape) => {
                let nested = self.nested(shape);
                let refs: Vec<&MemberBinding> = nested.iter().collect();
                let fields = self.read_members(&dotted, &refs, pairs)?;
                Ok((!fields.is_empty()).then_some(Value::Structure(fields)))
            }
            scalar => {
                let Some((_, raw)) = pairs.iter().find(|(k, _)| k == key) else {
                    return Ok(None);
                };
                let format = scalar.involves_timestamp().then(|| self.format(format));
                parse_scalar(raw, scalar, format)
                    .map(Some)
                    .map_err(|source| CodecError::Coercion {
                        path: key.to_string(),
                        source,
                    })
            }
        }
    }

    fn write(
        &self,
        key: &str,
        value: &Value,
        kind: &ValueKind,
        format: Option<TimestampFormat>,
        out: &mut form_urlencoded::Serializer<'_, String>,
    ) -> Result<(), CodecError> {
        match (kind, value) {
            (ValueKind::List(item) | ValueKind::Set(item), Value::List(items)) => {
                if items.is_empty() {
                    out.append_pair(key, "");
                }
                for (i, v) in items.iter().enumerate() {
                    let item_key = if self.flattened_lists {
                        format!("{}.{}", key, i + 1)
                    } else {
                        format!("{}.member.{}", key, i + 1)
                    };
                    self.write(&item_key, v, item, format, out)?;
                }
            }
            (ValueKind::Structure(shape), Value::Structure(fields)) => {
                for binding in self.nested(shape) {
                    if let Some(v) = fields.get(&binding.member) {
                        let nested_key = format!("{}.{}", key, binding.member);
                        self.write(&nested_key, v, &binding.kind, binding.timestamp_format, out)?;
                    }
                }
            }
            (ValueKind::Map(_), _) => {
                return Err(CodecError::Unsupported {
                    path: key.to_string(),
                    kind: kind.to_string(),
                })
            }
            _ => {
                let text = self.scalar_text(key, value, kind, format)?;
                out.append_pair(key, &text);
            }
        }
        Ok(())
    }

    fn scalar_text(
        &self,
        key: &str,
        value: &Value,
        kind: &ValueKind,
        format: Option<TimestampFormat>,
    ) -> Result<String, CodecError> {
        let text = match (kind, value) {
            (ValueKind::Boolean, Value::Boolean(b)) => b.to_string(),
            (ValueKind::Byte, Value::Byte(v)) => v.to_string(),
            (ValueKind::Short, Value::Short(v)) => v.to_string(),
            (ValueKind::Integer, Value::Integer(v)) => v.to_string(),
            (ValueKind::Long, Value::Long(v)) => v.to_string(),
            (ValueKind::Float, Value::Float(v)) => float_text(f64::from(*v)),
            (ValueKind::Double, Value::Double(v)) => float_text(*v),
            (ValueKind::String | ValueKind::Enum(_), Value::String(s)) => s.clone(),
            (ValueKind::Timestamp, Value::Timestamp(ts)) => timestamp::format(ts, self.format(format)),
            (ValueKind::Blob, Value::Blob(bytes)) => BASE64.encode(bytes),
            _ => {
                return Err(CodecError::TypeMismatch {
                    path: key.to_string(),
                    expected: kind.to_string(),
                })
            }
        };
        Ok(text)
    }
}

fn float_text(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "Infinity".into()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".into()
    } else {
        v.to_string()
    }
}

impl BodyCodec for FormCodec {
    fn content_type(&self) -> &str {
        self.content_type
    }

    fn decode(
        &self,
        shape: &Arc<Shape>,
        members: &[&MemberBinding],
        body: &[u8],
    ) -> Result<ShapeBuilder, CodecError> {
        std::str::from_utf8(body).map_err(|_| CodecError::NotUtf8)?;
        let pairs: Vec<(String, String)> = form_urlencoded::parse(body)
            .into_owned()
            .filter(|(k, _)| !ENVELOPE_KEYS.contains(&k.as_str()))
            .collect();

        let mut builder = ShapeBuilder::new(shape.clone());
        for (member, value) in self.read_members("", members, &pairs)? {
            builder.set(member, value);
        }
        Ok(builder)
    }

    fn encode(
        &self,
        members: &[&MemberBinding],
        fields: &BTreeMap<String, Value>,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for binding in members {
            if let Some(value) = fields.get(&binding.member) {
                self.write(&binding.member, value, &binding.kind, binding.timestamp_format, &mut out)?;
            }
        }
        Ok(out.finish().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{resolve_shape, ShapeRole};
    use crate::model::{Member, ShapeId};
    use chrono::DateTime;

    fn request_shape() -> Arc<Shape> {
        let nested = Shape::new(
            ShapeId::new("test", "Nested"),
            vec![
                Member::new("Label", ValueKind::String),
                Member::new("Values", ValueKind::list_of(ValueKind::Integer)),
            ],
        );
        Shape::new(
            ShapeId::new("test", "Input"),
            vec![
                Member::new("Name", ValueKind::String),
                Member::new("Count", ValueKind::Integer),
                Member::new("Tags", ValueKind::list_of(ValueKind::String)),
                Member::new("Unique", ValueKind::set_of(ValueKind::String)),
                Member::new("When", ValueKind::Timestamp),
                Member::new("Nested", ValueKind::Structure(nested)),
                Member::new("Attrs", ValueKind::map_of(ValueKind::String)),
            ],
        )
    }

    fn decode(protocol: Protocol, body: &str) -> Result<Value, CodecError> {
        let shape = request_shape();
        let bindings = resolve_shape(&shape, &protocol.defaults(), ShapeRole::Input).unwrap();
        FormCodec::new(protocol)
            .decode(&shape, &bindings.document(), body.as_bytes())
            .map(|b| b.build_unchecked())
    }

    fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
        value.as_structure().and_then(|f| f.get(name))
    }

    #[test]
    fn test_decode_query_body() {
        let value = decode(
            Protocol::AwsQuery,
            "Action=Op&Version=2020-01-08&Name=a+b&Count=3\
             &Tags.member.2=second&Tags.member.1=first\
             &When=2019-12-16T23%3A48%3A18Z&Nested.Label=x&Nested.Values.member.1=7",
        )
        .unwrap();

        assert_eq!(field(&value, "Name"), Some(&Value::from("a b")));
        assert_eq!(field(&value, "Count"), Some(&Value::Integer(3)));
        assert_eq!(
            field(&value, "Tags"),
            Some(&Value::List(vec![Value::from("first"), Value::from("second")]))
        );
        assert_eq!(
            field(&value, "When"),
            Some(&Value::Timestamp(DateTime::from_timestamp(1_576_540_098, 0).unwrap()))
        );
        let nested = field(&value, "Nested").unwrap();
        assert_eq!(field(nested, "Label"), Some(&Value::from("x")));
        assert_eq!(field(nested, "Values"), Some(&Value::List(vec![Value::Integer(7)])));
        assert_eq!(field(&value, "Action"), None);
    }

    #[test]
    fn test_decode_flattened_and_empty_lists() {
        let value = decode(Protocol::Ec2Query, "Tags.1=a&Tags.2=b&Unique=").unwrap();
        assert_eq!(
            field(&value, "Tags"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(field(&value, "Unique"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode(Protocol::AwsQuery, "Count=x"), Err(CodecError::Coercion { .. })));
        assert!(matches!(decode(Protocol::AwsQuery, "Tags.member.x=a"), Err(CodecError::TypeMismatch { .. })));
        assert!(matches!(
            decode(Protocol::AwsQuery, "Unique.member.1=a&Unique.member.2=a"),
            Err(CodecError::DuplicateSetItem { .. })
        ));
        assert!(matches!(
            decode(Protocol::AwsQuery, "Attrs.entry.1.key=k"),
            Err(CodecError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_encode() {
        let shape = request_shape();
        let bindings = resolve_shape(&shape, &Protocol::AwsQuery.defaults(), ShapeRole::Output).unwrap();

        let mut nested = BTreeMap::new();
        nested.insert("Label".to_string(), Value::from("x y"));
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), Value::from("n"));
        fields.insert("Tags".to_string(), Value::List(vec![Value::from("a"), Value::from("b")]));
        fields.insert("Unique".to_string(), Value::List(Vec::new()));
        fields.insert("Nested".to_string(), Value::Structure(nested));

        let query = FormCodec::new(Protocol::AwsQuery)
            .encode(&bindings.document(), &fields)
            .unwrap();
        assert_eq!(
            String::from_utf8(query).unwrap(),
            "Name=n&Tags.member.1=a&Tags.member.2=b&Unique=&Nested.Label=x+y"
        );

        let ec2 = FormCodec::new(Protocol::Ec2Query)
            .encode(&bindings.document(), &fields)
            .unwrap();
        assert!(String::from_utf8(ec2).unwrap().contains("Tags.1=a&Tags.2=b"));
    }
}
