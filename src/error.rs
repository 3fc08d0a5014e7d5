//! Error taxonomy.
//!
//! - `GenerationError`: fatal, raised while resolving an operation schema,
//!   before any request is processed.
//! - `RequestRejection`: a request could not be turned into a typed input.
//! - `SerializeError`: a typed output or error could not be turned into a
//!   response.
//! - `UnsupportedBinding`: non-fatal; the binding is accepted but not applied.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::binding::Location;
use crate::codec::CodecError;
use crate::coerce::CoercionError;

/// Header naming the error kind on rejection responses.
pub const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Schema problems detected at generation time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("invalid shape id `{0}`")]
    InvalidShapeId(String),

    #[error("unknown protocol `{0}`")]
    UnknownProtocol(String),

    #[error("protocol `{0}` has no built-in body codec")]
    NoBuiltinCodec(String),

    #[error("malformed URI pattern `{pattern}`: {reason}")]
    MalformedUriPattern { pattern: String, reason: String },

    #[error("member `{member}` of `{shape}` carries more than one HTTP binding trait")]
    ConflictingBindings { shape: String, member: String },

    #[error("`{shape}` binds {location} name `{name}` more than once")]
    DuplicateWireName {
        shape: String,
        location: Location,
        name: String,
    },

    #[error("`{shape}` has more than one query-params member")]
    MultipleQueryParams { shape: String },

    #[error("query-params member `{member}` of `{shape}` must target map<string, string | list<string> | set<string>>, found {kind}")]
    InvalidQueryParamsTarget {
        shape: String,
        member: String,
        kind: String,
    },

    #[error("response-code member `{member}` of `{shape}` must target an integer")]
    InvalidResponseCodeTarget { shape: String, member: String },

    #[error("`{shape}` has more than one response-code member")]
    MultipleResponseCode { shape: String },

    #[error("`{shape}` has more than one payload member")]
    MultiplePayloads { shape: String },

    #[error("`{shape}` binds `{member}` to the payload alongside document members")]
    PayloadWithDocument { shape: String, member: String },

    #[error("member `{member}` of `{shape}` cannot be bound to {location} as {kind}")]
    InvalidLocationTarget {
        shape: String,
        member: String,
        location: Location,
        kind: String,
    },

    #[error("URI pattern `{pattern}` label `{label}` has no matching member")]
    UnboundLabel { pattern: String, label: String },

    #[error("label member `{member}` does not appear in URI pattern `{pattern}`")]
    MissingLabel { pattern: String, member: String },

    #[error("error shape `{shape}` is declared more than once")]
    DuplicateErrorVariant { shape: String },

    #[error("error shape `{shape}` declares HTTP status {status}, outside 100..=599")]
    InvalidErrorStatus { shape: String, status: u16 },
}

/// Typed, recoverable failure while parsing a request.
#[derive(Debug, Error)]
pub enum RequestRejection {
    #[error("{method} {path} does not match operation route `{route}`")]
    RoutingMismatch {
        method: String,
        path: String,
        route: String,
    },

    #[error("request has no query string but the operation requires one")]
    MissingQueryString,

    #[error("failed to parse header `{header}`: {source}")]
    HeaderParse {
        header: String,
        #[source]
        source: CoercionError,
    },

    #[error("failed to parse query parameter `{key}`: {source}")]
    QueryParse {
        key: String,
        #[source]
        source: CoercionError,
    },

    #[error("failed to parse URI label `{label}`: {source}")]
    LabelParse {
        label: String,
        #[source]
        source: CoercionError,
    },

    #[error("expected content type `{expected}`, found {}", found.as_deref().unwrap_or("none"))]
    ContentTypeMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("failed to deserialize request body: {0}")]
    BodyDeserialize(#[from] CodecError),

    #[error("`{shape}` is missing required members: {}", missing.join(", "))]
    BuilderValidation { shape: String, missing: Vec<String> },

    #[error("failed to buffer request body: {0}")]
    BufferBody(String),
}

impl RequestRejection {
    /// Short kind name used in metrics and the error type header.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestRejection::RoutingMismatch { .. } => "RoutingMismatch",
            RequestRejection::MissingQueryString => "MissingQueryString",
            RequestRejection::HeaderParse { .. } => "HeaderParseError",
            RequestRejection::QueryParse { .. } => "QueryParseError",
            RequestRejection::LabelParse { .. } => "LabelParseError",
            RequestRejection::ContentTypeMismatch { .. } => "UnsupportedMediaType",
            RequestRejection::BodyDeserialize(_) => "BodyDeserializeError",
            RequestRejection::BuilderValidation { .. } => "BuilderValidationError",
            RequestRejection::BufferBody(_) => "BufferBodyError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RequestRejection::RoutingMismatch { .. } => StatusCode::NOT_FOUND,
            RequestRejection::ContentTypeMismatch { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RequestRejection::BufferBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RequestRejection {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(ERROR_TYPE_HEADER, self.kind())],
            self.to_string(),
        )
            .into_response()
    }
}

/// Failure while assembling a response.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("response-code member `{member}` is not set")]
    MissingResponseCode { member: String },

    #[error("response-code member `{member}` holds {code}, outside 100..=599")]
    InvalidResponseCode { member: String, code: i64 },

    #[error("`{0}` is not an error of this operation")]
    UnknownErrorVariant(String),

    #[error("error shape `{shape}` has HTTP status {status}, outside 100..=599")]
    InvalidErrorStatus { shape: String, status: u16 },

    #[error("expected a structure value for `{0}`")]
    NotAStructure(String),

    #[error("failed to encode body: {0}")]
    Encode(#[from] CodecError),

    #[error("failed to build response: {0}")]
    Http(#[from] axum::http::Error),
}

impl IntoResponse for SerializeError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Response serialization failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(ERROR_TYPE_HEADER, "InternalFailure")],
            "internal failure",
        )
            .into_response()
    }
}

/// An output binding the serializer accepts but does not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedBinding {
    pub shape: String,
    pub member: String,
    pub location: Location,
}

impl std::fmt::Display for UnsupportedBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} binding of `{}` on `{}` is not applied to responses",
            self.location, self.member, self.shape
        )
    }
}
