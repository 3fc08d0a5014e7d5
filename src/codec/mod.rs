//! Structured-body codecs.
//!
//! # Data Flow
//! ```text
//! request body bytes
//!     → BodyCodec::decode (document members only)
//!     → ShapeBuilder (explicit HTTP bindings are applied on top)
//!
//! output / error structure
//!     → BodyCodec::encode (document members only)
//!     → response body bytes
//! ```
//!
//! # Design Decisions
//! - The request parser and response serializer only see the `BodyCodec`
//!   trait; the document format is opaque to them
//! - XML is not built in: `for_protocol` returns `None` for restXml and the
//!   caller supplies its own codec
//! - Members absent from a document are left unset, never defaulted

pub mod form;
pub mod json;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::binding::{BodyStyle, MemberBinding, Protocol};
use crate::coerce::CoercionError;
use crate::model::{Shape, ShapeBuilder, Value};

pub use form::FormCodec;
pub use json::JsonCodec;

/// Failure while decoding or encoding a document body.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is not valid UTF-8")]
    NotUtf8,

    #[error("`{path}`: expected {expected}")]
    TypeMismatch { path: String, expected: String },

    #[error("`{path}`: {source}")]
    Coercion {
        path: String,
        #[source]
        source: CoercionError,
    },

    #[error("`{path}`: duplicate set item")]
    DuplicateSetItem { path: String },

    #[error("`{path}`: {kind} is not supported by this codec")]
    Unsupported { path: String, kind: String },
}

/// Encoder/decoder for the document part of a message body.
pub trait BodyCodec: Send + Sync + fmt::Debug {
    /// Media type of encoded bodies, without parameters.
    fn content_type(&self) -> &str;

    /// Decode `body` into a builder for `shape`, filling only `members`.
    fn decode(
        &self,
        shape: &Arc<Shape>,
        members: &[&MemberBinding],
        body: &[u8],
    ) -> Result<ShapeBuilder, CodecError>;

    /// Encode the `members` present in `fields`.
    fn encode(
        &self,
        members: &[&MemberBinding],
        fields: &BTreeMap<String, Value>,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Built-in codec for `protocol`, if there is one.
pub fn for_protocol(protocol: Protocol) -> Option<Arc<dyn BodyCodec>> {
    match protocol.body_style() {
        BodyStyle::Json => Some(Arc::new(JsonCodec::new(protocol))),
        BodyStyle::Form => Some(Arc::new(FormCodec::new(protocol))),
        BodyStyle::Xml => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_protocol() {
        let json = for_protocol(Protocol::RestJson1).unwrap();
        assert_eq!(json.content_type(), "application/json");

        let aws_json = for_protocol(Protocol::AwsJson1_1).unwrap();
        assert_eq!(aws_json.content_type(), "application/x-amz-json-1.1");

        let query = for_protocol(Protocol::AwsQuery).unwrap();
        assert_eq!(query.content_type(), "application/x-www-form-urlencoded");

        assert!(for_protocol(Protocol::RestXml).is_none());
    }
}
