//! Typed values, the per-invocation builder, and modeled error values.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::RequestRejection;
use crate::model::shape::{Shape, ShapeId};

/// A typed value flowing between the wire and the operation handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Structure(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view used for status codes.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_structure(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Structure(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Accumulates member values for one structure before validation.
///
/// Later `set` calls overwrite earlier ones, which is how explicit HTTP
/// bindings take precedence over values produced by the body decoder.
#[derive(Debug, Clone)]
pub struct ShapeBuilder {
    shape: Arc<Shape>,
    fields: BTreeMap<String, Value>,
}

impl ShapeBuilder {
    pub fn new(shape: Arc<Shape>) -> Self {
        Self {
            shape,
            fields: BTreeMap::new(),
        }
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn set(&mut self, member: impl Into<String>, value: Value) {
        self.fields.insert(member.into(), value);
    }

    pub fn get(&self, member: &str) -> Option<&Value> {
        self.fields.get(member)
    }

    /// Validate required members and produce the structure value.
    pub fn build(self) -> Result<Value, RequestRejection> {
        let missing: Vec<String> = self
            .shape
            .members
            .iter()
            .filter(|m| m.required && !self.fields.contains_key(&m.name))
            .map(|m| m.name.clone())
            .collect();

        if !missing.is_empty() {
            return Err(RequestRejection::BuilderValidation {
                shape: self.shape.id.to_string(),
                missing,
            });
        }

        Ok(Value::Structure(self.fields))
    }

    /// Produce the structure value without checking required members.
    pub fn build_unchecked(self) -> Value {
        Value::Structure(self.fields)
    }
}

/// A modeled error returned by an operation handler.
///
/// `shape` selects the error variant of the operation; `value` holds its
/// members as a structure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub shape: ShapeId,
    pub value: Value,
}

impl ErrorValue {
    pub fn new(shape: ShapeId, fields: BTreeMap<String, Value>) -> Self {
        Self {
            shape,
            value: Value::Structure(fields),
        }
    }
}
