//! Metadata attached to `http::Extensions` of serialized responses.

use std::fmt;

use crate::model::ShapeId;

/// Identity of the operation that produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationExtension {
    pub namespace: String,
    pub operation: String,
}

impl OperationExtension {
    pub fn new(id: &ShapeId) -> Self {
        Self {
            namespace: id.namespace().to_string(),
            operation: id.name().to_string(),
        }
    }
}

impl fmt::Display for OperationExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.operation)
    }
}

/// Name of the modeled error a response was serialized from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeledErrorExtension {
    pub shape: ShapeId,
}

impl ModeledErrorExtension {
    pub fn name(&self) -> &str {
        self.shape.name()
    }
}
