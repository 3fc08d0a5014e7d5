//! Binding resolution subsystem.
//!
//! # Data Flow
//! ```text
//! OperationSchema (from schema provider)
//!     → protocol.rs (timestamp defaults, content type, body style)
//!     → resolver.rs (member → Location + wire name + format)
//!     → ResolvedOperation (immutable, shared by parser and serializer)
//! ```
//!
//! # Design Decisions
//! - Resolution runs once per operation, never per request
//! - Every schema problem is a `GenerationError`; nothing is served from a
//!   schema that failed to resolve

pub mod protocol;
pub mod resolver;

pub use protocol::{BodyStyle, Protocol, ProtocolDefaults, TimestampFormat};
pub use resolver::{
    document_binding, resolve, resolve_shape, Location, MemberBinding, ResolvedError,
    ResolvedOperation, ShapeBindings, ShapeRole,
};
