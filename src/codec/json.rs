//! JSON document codec for restJson1, awsJson1_0 and awsJson1_1.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};

use crate::binding::{document_binding, Location, MemberBinding, Protocol, ProtocolDefaults, TimestampFormat};
use crate::codec::{BodyCodec, CodecError};
use crate::coerce::{parse_scalar, timestamp, CoercionError};
use crate::model::{Shape, ShapeBuilder, Value, ValueKind};

const NON_FINITE: [&str; 3] = ["NaN", "Infinity", "-Infinity"];

#[derive(Debug, Clone)]
pub struct JsonCodec {
    content_type: &'static str,
    defaults: ProtocolDefaults,
}

impl JsonCodec {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            content_type: protocol.content_type(),
            defaults: protocol.defaults(),
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
        path: &str,
        members: &[&MemberBinding],
        object: &Map<String, Json>,
    ) -> Result<BTreeMap<String, Value>, CodecError> {
        let mut fields = BTreeMap::new();
        for binding in members {
            match object.get(&binding.wire_name) {
                None | Some(Json::Null) => continue,
                Some(json) => {
                    let path = format!("{}.{}", path, binding.wire_name);
                    let value = self.read(&path, json, &binding.kind, binding.timestamp_format)?;
                    fields.insert(binding.member.clone(), value);
                }
            }
        }
        Ok(fields)
    }

    fn read(
        &self,
        path: &str,
        json: &Json,
        kind: &ValueKind,
        format: Option<TimestampFormat>,
    ) -> Result<Value, CodecError> {
        let wrong = || mismatch(path, kind);
        let coercion = |source: CoercionError| CodecError::Coercion {
            path: path.to_string(),
            source,
        };

        let value = match (kind, json) {
            (ValueKind::Boolean, Json::Bool(b)) => Value::Boolean(*b),
            (ValueKind::Byte, Json::Number(n)) => {
                Value::Byte(n.as_i64().and_then(|v| i8::try_from(v).ok()).ok_or_else(wrong)?)
            }
            (ValueKind::Short, Json::Number(n)) => {
                Value::Short(n.as_i64().and_then(|v| i16::try_from(v).ok()).ok_or_else(wrong)?)
            }
            (ValueKind::Integer, Json::Number(n)) => {
                Value::Integer(n.as_i64().and_then(|v| i32::try_from(v).ok()).ok_or_else(wrong)?)
            }
            (ValueKind::Long, Json::Number(n)) => Value::Long(n.as_i64().ok_or_else(wrong)?),
            (ValueKind::Float, Json::Number(n)) => Value::Float(n.as_f64().ok_or_else(wrong)? as f32),
            (ValueKind::Double, Json::Number(n)) => Value::Double(n.as_f64().ok_or_else(wrong)?),
            (ValueKind::Float | ValueKind::Double, Json::String(s)) if NON_FINITE.contains(&s.as_str()) => {
                parse_scalar(s, kind, None).map_err(coercion)?
            }
            (ValueKind::String, Json::String(s)) => Value::String(s.clone()),
            (ValueKind::Enum(_) | ValueKind::Blob, Json::String(s)) => parse_scalar(s, kind, None).map_err(coercion)?,
            (ValueKind::Timestamp, Json::Number(n)) if self.format(format) == TimestampFormat::EpochSeconds => {
                Value::Timestamp(n.as_f64().and_then(timestamp::from_epoch_f64).ok_or_else(wrong)?)
            }
            (ValueKind::Timestamp, Json::String(s)) if self.format(format) != TimestampFormat::EpochSeconds => {
                Value::Timestamp(timestamp::parse(s, self.format(format)).map_err(coercion)?)
            }
            (ValueKind::List(item), Json::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, json) in items.iter().enumerate() {
                    values.push(self.read(&format!("{}[{}]", path, i), json, item, format)?);
                }
                Value::List(values)
            }
            (ValueKind::Set(item), Json::Array(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for (i, json) in items.iter().enumerate() {
                    let value = self.read(&format!("{}[{}]", path, i), json, item, format)?;
                    if values.contains(&value) {
                        return Err(CodecError::DuplicateSetItem {
                            path: path.to_string(),
                        });
                    }
                    values.push(value);
                }
                Value::List(values)
            }
            (ValueKind::Map(item), Json::Object(object)) => {
                let mut entries = BTreeMap::new();
                for (key, json) in object.iter().filter(|(_, v)| !v.is_null()) {
                    let value = self.read(&format!("{}.{}", path, key), json, item, format)?;
                    entries.insert(key.clone(), value);
                }
                Value::Map(entries)
            }
            (ValueKind::Structure(shape), Json::Object(object)) => {
                let nested = self.nested(shape);
                let refs: Vec<&MemberBinding> = nested.iter().collect();
                Value::Structure(self.read_members(path, &refs, object)?)
            }
            _ => return Err(wrong()),
        };
        Ok(value)
    }

    fn write_members(
        &self,
        path: &str,
        members: &[&MemberBinding],
        fields: &BTreeMap<String, Value>,
    ) -> Result<Map<String, Json>, CodecError> {
        let mut object = Map::new();
        for binding in members {
            if let Some(value) = fields.get(&binding.member) {
                let path = format!("{}.{}", path, binding.wire_name);
                let json = self.write(&path, value, &binding.kind, binding.timestamp_format)?;
                object.insert(binding.wire_name.clone(), json);
            }
        }
        Ok(object)
    }

    fn write(
        &self,
        path: &str,
        value: &Value,
        kind: &ValueKind,
        format: Option<TimestampFormat>,
    ) -> Result<Json, CodecError> {
        let json = match (kind, value) {
            (ValueKind::Boolean, Value::Boolean(b)) => Json::Bool(*b),
            (ValueKind::Byte, Value::Byte(v)) => Json::from(*v),
            (ValueKind::Short, Value::Short(v)) => Json::from(*v),
            (ValueKind::Integer, Value::Integer(v)) => Json::from(*v),
            (ValueKind::Long, Value::Long(v)) => Json::from(*v),
            (ValueKind::Float, Value::Float(v)) => float(f64::from(*v)),
            (ValueKind::Double, Value::Double(v)) => float(*v),
            (ValueKind::String | ValueKind::Enum(_), Value::String(s)) => Json::String(s.clone()),
            (ValueKind::Timestamp, Value::Timestamp(ts)) => match self.format(format) {
                TimestampFormat::EpochSeconds if ts.timestamp_subsec_nanos() == 0 => Json::from(ts.timestamp()),
                TimestampFormat::EpochSeconds => {
                    float(ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1e9)
                }
                other => Json::String(timestamp::format(ts, other)),
            },
            (ValueKind::Blob, Value::Blob(bytes)) => Json::String(BASE64.encode(bytes)),
            (ValueKind::List(item) | ValueKind::Set(item), Value::List(items)) => Json::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.write(&format!("{}[{}]", path, i), v, item, format))
                    .collect::<Result<_, _>>()?,
            ),
            (ValueKind::Map(item), Value::Map(entries)) => {
                let mut object = Map::new();
                for (key, v) in entries {
                    object.insert(key.clone(), self.write(&format!("{}.{}", path, key), v, item, format)?);
                }
                Json::Object(object)
            }
            (ValueKind::Structure(shape), Value::Structure(fields)) => {
                let nested = self.nested(shape);
                let refs: Vec<&MemberBinding> = nested.iter().collect();
                Json::Object(self.write_members(path, &refs, fields)?)
            }
            _ => return Err(mismatch(path, kind)),
        };
        Ok(json)
    }
}

fn mismatch(path: &str, kind: &ValueKind) -> CodecError {
    CodecError::TypeMismatch {
        path: path.to_string(),
        expected: kind.to_string(),
    }
}

fn float(v: f64) -> Json {
    if v.is_nan() {
        Json::String("NaN".into())
    } else if v == f64::INFINITY {
        Json::String("Infinity".into())
    } else if v == f64::NEG_INFINITY {
        Json::String("-Infinity".into())
    } else {
        Number::from_f64(v).map_or(Json::Null, Json::Number)
    }
}

impl BodyCodec for JsonCodec {
    fn content_type(&self) -> &str {
        self.content_type
    }

    fn decode(
        &self,
        shape: &Arc<Shape>,
        members: &[&MemberBinding],
        body: &[u8],
    ) -> Result<ShapeBuilder, CodecError> {
        let mut builder = ShapeBuilder::new(shape.clone());
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(builder);
        }

        let json: Json = serde_json::from_slice(body)?;
        let Json::Object(object) = json else {
            return Err(CodecError::TypeMismatch {
                path: shape.id.name().to_string(),
                expected: "object".into(),
            });
        };
        for (member, value) in self.read_members(shape.id.name(), members, &object)? {
            builder.set(member, value);
        }
        Ok(builder)
    }

    fn encode(
        &self,
        members: &[&MemberBinding],
        fields: &BTreeMap<String, Value>,
    ) -> Result<Vec<u8>, CodecError> {
        let object = self.write_members("", members, fields)?;
        Ok(serde_json::to_vec(&Json::Object(object))?)
    }
}
