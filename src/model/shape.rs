//! Shape definitions consumed from the schema provider.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::binding::TimestampFormat;
use crate::error::GenerationError;

/// Absolute shape identifier (`namespace#Name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId {
    namespace: String,
    name: String,
}

impl ShapeId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ShapeId {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(GenerationError::InvalidShapeId(s.to_string())),
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)
    }
}

/// The type of value a member targets.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    /// String constrained to a closed set of values.
    Enum(Vec<String>),
    Timestamp,
    Blob,
    List(Box<ValueKind>),
    /// List whose items are unique; first occurrence wins.
    Set(Box<ValueKind>),
    /// String-keyed map.
    Map(Box<ValueKind>),
    Structure(Arc<Shape>),
}

impl ValueKind {
    pub fn list_of(item: ValueKind) -> Self {
        ValueKind::List(Box::new(item))
    }

    pub fn set_of(item: ValueKind) -> Self {
        ValueKind::Set(Box::new(item))
    }

    pub fn map_of(value: ValueKind) -> Self {
        ValueKind::Map(Box::new(value))
    }

    /// True for kinds that can be written as a single string on the wire.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            ValueKind::List(_) | ValueKind::Set(_) | ValueKind::Map(_) | ValueKind::Structure(_)
        )
    }

    /// Item kind of a list or set.
    pub fn item(&self) -> Option<&ValueKind> {
        match self {
            ValueKind::List(item) | ValueKind::Set(item) => Some(item),
            _ => None,
        }
    }

    /// True if this kind, or the item kind of a collection, is a timestamp.
    pub fn involves_timestamp(&self) -> bool {
        match self {
            ValueKind::Timestamp => true,
            ValueKind::List(item) | ValueKind::Set(item) | ValueKind::Map(item) => {
                item.involves_timestamp()
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Boolean => write!(f, "boolean"),
            ValueKind::Byte => write!(f, "byte"),
            ValueKind::Short => write!(f, "short"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Long => write!(f, "long"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Double => write!(f, "double"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Enum(_) => write!(f, "enum"),
            ValueKind::Timestamp => write!(f, "timestamp"),
            ValueKind::Blob => write!(f, "blob"),
            ValueKind::List(item) => write!(f, "list<{}>", item),
            ValueKind::Set(item) => write!(f, "set<{}>", item),
            ValueKind::Map(value) => write!(f, "map<string, {}>", value),
            ValueKind::Structure(shape) => write!(f, "{}", shape.id),
        }
    }
}

/// HTTP binding traits attached to a member.
///
/// At most one location trait is expected per member; the resolver rejects
/// members that carry more than one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberTraits {
    pub http_header: Option<String>,
    pub http_prefix_headers: Option<String>,
    pub http_query: Option<String>,
    pub http_query_params: bool,
    pub http_label: bool,
    pub http_payload: bool,
    pub http_response_code: bool,
    pub timestamp_format: Option<TimestampFormat>,
    /// Document key override for JSON bodies.
    pub json_name: Option<String>,
}

/// A member of a structure shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub kind: ValueKind,
    pub required: bool,
    pub traits: MemberTraits,
}

impl Member {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            traits: MemberTraits::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn header(mut self, name: impl Into<String>) -> Self {
        self.traits.http_header = Some(name.into());
        self
    }

    pub fn prefix_headers(mut self, prefix: impl Into<String>) -> Self {
        self.traits.http_prefix_headers = Some(prefix.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>) -> Self {
        self.traits.http_query = Some(name.into());
        self
    }

    pub fn query_params(mut self) -> Self {
        self.traits.http_query_params = true;
        self
    }

    pub fn label(mut self) -> Self {
        self.traits.http_label = true;
        self
    }

    pub fn payload(mut self) -> Self {
        self.traits.http_payload = true;
        self
    }

    pub fn response_code(mut self) -> Self {
        self.traits.http_response_code = true;
        self
    }

    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.traits.timestamp_format = Some(format);
        self
    }

    pub fn json_name(mut self, name: impl Into<String>) -> Self {
        self.traits.json_name = Some(name.into());
        self
    }
}

/// A structure shape: an input, output, error, or nested structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub members: Vec<Member>,
}

impl Shape {
    pub fn new(id: ShapeId, members: Vec<Member>) -> Arc<Self> {
        Arc::new(Self { id, members })
    }

    /// A structure with no members.
    pub fn empty(id: ShapeId) -> Arc<Self> {
        Self::new(id, Vec::new())
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_id_parse() {
        let id: ShapeId = "example.rest#GetWidget".parse().unwrap();
        assert_eq!(id.namespace(), "example.rest");
        assert_eq!(id.name(), "GetWidget");
        assert_eq!(id.to_string(), "example.rest#GetWidget");

        assert!("GetWidget".parse::<ShapeId>().is_err());
        assert!("#GetWidget".parse::<ShapeId>().is_err());
    }

    #[test]
    fn test_kind_classification() {
        assert!(ValueKind::Timestamp.is_scalar());
        assert!(!ValueKind::list_of(ValueKind::String).is_scalar());
        assert!(ValueKind::set_of(ValueKind::Timestamp).involves_timestamp());
        assert!(!ValueKind::map_of(ValueKind::String).involves_timestamp());
        assert_eq!(ValueKind::map_of(ValueKind::list_of(ValueKind::String)).to_string(), "map<string, list<string>>");
    }
}
