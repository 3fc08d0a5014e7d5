//! Conformance test vectors.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the engine a vector exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Parse a literal request and compare the typed input.
    Request,
    /// Serialize typed params and compare the literal response.
    Response,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Request => write!(f, "request"),
            Action::Response => write!(f, "response"),
        }
    }
}

/// A literal, protocol-tagged request or response case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestVector {
    pub id: String,
    /// Protocol shape id, e.g. `aws.protocols#restJson1`.
    pub protocol: String,
    /// Operation name within the service under test.
    pub operation: String,
    pub action: Action,
    #[serde(default)]
    pub method: Option<String>,
    /// Request path with labels already filled in.
    #[serde(default)]
    pub uri: Option<String>,
    /// Raw `k=v` query components, joined with `&`.
    #[serde(default)]
    pub query: Vec<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub body_media_type: Option<String>,
    /// Expected input (request) or serialized value (response), keyed by
    /// member name.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Absolute shape id of the error a response vector serializes.
    #[serde(default)]
    pub error_shape: Option<String>,
    #[serde(default)]
    pub require_headers: Vec<String>,
    #[serde(default)]
    pub forbid_headers: Vec<String>,
    #[serde(default)]
    pub require_query: Vec<String>,
    #[serde(default)]
    pub forbid_query: Vec<String>,
}

impl TestVector {
    fn new(id: &str, protocol: &str, operation: &str, action: Action) -> Self {
        Self {
            id: id.to_string(),
            protocol: protocol.to_string(),
            operation: operation.to_string(),
            action,
            method: None,
            uri: None,
            query: Vec::new(),
            status: None,
            headers: BTreeMap::new(),
            body: None,
            body_media_type: None,
            params: serde_json::Value::Null,
            error_shape: None,
            require_headers: Vec::new(),
            forbid_headers: Vec::new(),
            require_query: Vec::new(),
            forbid_query: Vec::new(),
        }
    }

    pub fn request(id: &str, protocol: &str, operation: &str, method: &str, uri: &str) -> Self {
        let mut vector = Self::new(id, protocol, operation, Action::Request);
        vector.method = Some(method.to_string());
        vector.uri = Some(uri.to_string());
        vector
    }

    pub fn response(id: &str, protocol: &str, operation: &str, status: u16) -> Self {
        let mut vector = Self::new(id, protocol, operation, Action::Response);
        vector.status = Some(status);
        vector
    }

    pub fn with_query(mut self, components: &[&str]) -> Self {
        self.query.extend(components.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: &str, media_type: &str) -> Self {
        self.body = Some(body.to_string());
        self.body_media_type = Some(media_type.to_string());
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_error_shape(mut self, shape: &str) -> Self {
        self.error_shape = Some(shape.to_string());
        self
    }

    pub fn requiring_headers(mut self, names: &[&str]) -> Self {
        self.require_headers.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn forbidding_headers(mut self, names: &[&str]) -> Self {
        self.forbid_headers.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn requiring_query(mut self, components: &[&str]) -> Self {
        self.require_query.extend(components.iter().map(|c| c.to_string()));
        self
    }

    pub fn forbidding_query(mut self, keys: &[&str]) -> Self {
        self.forbid_query.extend(keys.iter().map(|k| k.to_string()));
        self
    }
}

#[derive(Debug, Error)]
pub enum VectorFileError {
    #[error("failed to read vector file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse vector file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a JSON array of vectors.
pub fn load_vectors(path: &Path) -> Result<Vec<TestVector>, VectorFileError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
