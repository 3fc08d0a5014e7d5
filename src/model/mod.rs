//! Schema and value model.
//!
//! # Data Flow
//! ```text
//! schema provider (already resolved)
//!     → shape.rs (ShapeId, Shape, Member, MemberTraits, ValueKind)
//!     → operation.rs (OperationSchema, ErrorVariant)
//!     → binding resolver
//!
//! per invocation:
//!     ShapeBuilder (filled by codec + bindings)
//!     → build() → Value::Structure
//! ```
//!
//! # Design Decisions
//! - Shapes are immutable and shared through `Arc`
//! - Structures and maps are `BTreeMap`s so encoding order is deterministic
//! - Values are dynamically typed; the shape's `ValueKind` drives coercion

pub mod operation;
pub mod shape;
pub mod value;

pub use operation::{ErrorVariant, FaultKind, OperationSchema};
pub use shape::{Member, MemberTraits, Shape, ShapeId, ValueKind};
pub use value::{ErrorValue, ShapeBuilder, Value};
