//! HTTP wire-binding engine.
//!
//! Maps HTTP requests onto typed operation inputs and typed outputs and
//! modeled errors back onto HTTP responses, for REST-style protocols
//! (restJson1, restXml) and RPC-style ones (awsJson1_0, awsJson1_1,
//! awsQuery, ec2Query). A conformance harness checks both directions
//! against literal test vectors.

// Schema and binding resolution
pub mod binding;
pub mod model;
pub mod uri;

// Wire encodings
pub mod codec;
pub mod coerce;

// Request and response paths
pub mod error;
pub mod http;
pub mod request;
pub mod response;

// Cross-cutting concerns
pub mod config;
pub mod harness;
pub mod observability;

pub use binding::{Protocol, ResolvedOperation};
pub use config::EngineConfig;
pub use error::{GenerationError, RequestRejection, SerializeError};
pub use http::OperationService;
pub use model::{ErrorValue, OperationSchema, Value};
