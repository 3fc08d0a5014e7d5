//! Build expected typed values from a vector's literal params.
//!
//! Params are keyed by member name. Timestamps are epoch seconds, blobs
//! are UTF-8 text, floats may be `"NaN"`, `"Infinity"` or `"-Infinity"`.

use std::collections::BTreeMap;

use serde_json::Value as Json;
use thiserror::Error;

use crate::coerce::timestamp::from_epoch_f64;
use crate::model::{Shape, Value, ValueKind};

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("params `{path}`: expected {expected}")]
    TypeMismatch { path: String, expected: String },

    #[error("params `{path}`: `{member}` is not a member of {shape}")]
    UnknownMember {
        path: String,
        member: String,
        shape: String,
    },
}

/// Convert `params` into a structure value of `shape`. `null` is an empty
/// structure.
pub fn value_from_params(shape: &Shape, params: &Json) -> Result<Value, ParamsError> {
    match params {
        Json::Null => Ok(Value::Structure(BTreeMap::new())),
        Json::Object(object) => structure(shape.id.name(), shape, object),
        _ => Err(ParamsError::TypeMismatch {
            path: shape.id.name().to_string(),
            expected: "object".into(),
        }),
    }
}

fn structure(path: &str, shape: &Shape, object: &serde_json::Map<String, Json>) -> Result<Value, ParamsError> {
    let mut fields = BTreeMap::new();
    for (name, json) in object {
        let member = shape.member(name).ok_or_else(|| ParamsError::UnknownMember {
            path: path.to_string(),
            member: name.clone(),
            shape: shape.id.to_string(),
        })?;
        fields.insert(name.clone(), convert(&format!("{}.{}", path, name), &member.kind, json)?);
    }
    Ok(Value::Structure(fields))
}

fn convert(path: &str, kind: &ValueKind, json: &Json) -> Result<Value, ParamsError> {
    let mismatch = || ParamsError::TypeMismatch {
        path: path.to_string(),
        expected: kind.to_string(),
    };
    let int = |json: &Json| json.as_i64().ok_or_else(mismatch);

    let value = match (kind, json) {
        (ValueKind::Boolean, Json::Bool(b)) => Value::Boolean(*b),
        (ValueKind::Byte, _) => Value::Byte(i8::try_from(int(json)?).map_err(|_| mismatch())?),
        (ValueKind::Short, _) => Value::Short(i16::try_from(int(json)?).map_err(|_| mismatch())?),
        (ValueKind::Integer, _) => Value::Integer(i32::try_from(int(json)?).map_err(|_| mismatch())?),
        (ValueKind::Long, _) => Value::Long(int(json)?),
        (ValueKind::Float | ValueKind::Double, _) => {
            let v = match json {
                Json::Number(n) => n.as_f64().ok_or_else(mismatch)?,
                Json::String(s) if s == "NaN" => f64::NAN,
                Json::String(s) if s == "Infinity" => f64::INFINITY,
                Json::String(s) if s == "-Infinity" => f64::NEG_INFINITY,
                _ => return Err(mismatch()),
            };
            if *kind == ValueKind::Float {
                Value::Float(v as f32)
            } else {
                Value::Double(v)
            }
        }
        (ValueKind::String | ValueKind::Enum(_), Json::String(s)) => Value::String(s.clone()),
        (ValueKind::Timestamp, Json::Number(n)) => {
            Value::Timestamp(n.as_f64().and_then(from_epoch_f64).ok_or_else(mismatch)?)
        }
        (ValueKind::Blob, Json::String(s)) => Value::Blob(s.as_bytes().to_vec()),
        (ValueKind::List(item) | ValueKind::Set(item), Json::Array(items)) => Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, json)| convert(&format!("{}[{}]", path, i), item, json))
                .collect::<Result<_, _>>()?,
        ),
        (ValueKind::Map(item), Json::Object(object)) => Value::Map(
            object
                .iter()
                .map(|(key, json)| Ok((key.clone(), convert(&format!("{}.{}", path, key), item, json)?)))
                .collect::<Result<_, _>>()?,
        ),
        (ValueKind::Structure(shape), Json::Object(object)) => structure(path, shape, object)?,
        _ => return Err(mismatch()),
    };
    Ok(value)
}
