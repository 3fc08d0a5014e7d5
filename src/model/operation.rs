//! Operation schema and error variants.

use std::sync::Arc;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::binding::Protocol;
use crate::model::shape::{Shape, ShapeId};

/// Whether an error is the caller's fault or the service's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultKind {
    Client,
    Server,
}

impl FaultKind {
    pub fn default_status(self) -> u16 {
        match self {
            FaultKind::Client => 400,
            FaultKind::Server => 500,
        }
    }
}

/// One modeled error of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorVariant {
    pub shape: Arc<Shape>,
    /// Explicit `@httpError` code, if any.
    pub http_status: Option<u16>,
    pub fault: FaultKind,
}

impl ErrorVariant {
    pub fn new(shape: Arc<Shape>, fault: FaultKind) -> Self {
        Self {
            shape,
            http_status: None,
            fault,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Explicit code if present, otherwise the fault default.
    pub fn status(&self) -> u16 {
        self.http_status.unwrap_or_else(|| self.fault.default_status())
    }
}

/// Fully resolved description of one operation.
#[derive(Debug, Clone)]
pub struct OperationSchema {
    pub id: ShapeId,
    pub protocol: Protocol,
    pub method: Method,
    /// URI pattern, e.g. `/widgets/{id}?type=gadget`.
    pub uri: String,
    pub input: Arc<Shape>,
    pub output: Arc<Shape>,
    pub errors: Vec<ErrorVariant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_resolution() {
        let shape = Shape::empty(ShapeId::new("example", "Throttled"));

        let client = ErrorVariant::new(shape.clone(), FaultKind::Client);
        assert_eq!(client.status(), 400);

        let server = ErrorVariant::new(shape.clone(), FaultKind::Server);
        assert_eq!(server.status(), 500);

        let explicit = ErrorVariant::new(shape, FaultKind::Client).with_status(429);
        assert_eq!(explicit.status(), 429);
    }
}
