//! Response serialization subsystem.
//!
//! # Data Flow
//! ```text
//! handler result
//!     Ok(output)  → serialize_output
//!                     → status: 200 or the response-code member
//!                     → body: document members through the codec
//!                     → OperationExtension
//!     Err(error)  → serialize_error
//!                     → variant lookup by shape id
//!                     → status: explicit per variant, else fault default
//!                     → X-Amzn-Errortype (JSON protocols)
//!                     → ModeledErrorExtension
//!     → Response<Bytes> or SerializeError
//! ```
//!
//! # Design Decisions
//! - A response-code member that is unset or out of range fails the
//!   response instead of falling back to 200
//! - Output header and payload bindings are a known gap; see
//!   `ResolvedOperation::unsupported`

pub mod extension;
pub mod serializer;

pub use extension::{ModeledErrorExtension, OperationExtension};
pub use serializer::ResponseSerializer;
