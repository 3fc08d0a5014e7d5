//! Wire string coercion.
//!
//! # Data Flow
//! ```text
//! raw header / query / label text
//!     → primitive.rs (percent-decode, then parse by ValueKind)
//!     → timestamp.rs (date-time, http-date, epoch-seconds)
//!     → header.rs / query.rs (lists, sets, maps, repeated values)
//!     → Value
//! ```
//!
//! # Design Decisions
//! - Locale independent: only the exact wire spellings are accepted
//! - Every failure is a `CoercionError`; callers attach the header, key or
//!   label name when turning it into a rejection

pub mod header;
pub mod primitive;
pub mod query;
pub mod timestamp;

pub use primitive::{parse_scalar, percent_decode, push_unique, CoercionError};
