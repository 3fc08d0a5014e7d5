//! URI pattern subsystem.
//!
//! # Data Flow
//! ```text
//! Operation URI pattern (at resolution time)
//!     → pattern.rs (tokenize into literal / label / greedy-label segments)
//!     → matcher.rs (compile into a LabelMatcher)
//!
//! Request path (per invocation)
//!     → LabelMatcher::match_path
//!     → Return: raw label values, or None when the path does not match
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once, immutable afterwards
//! - No regex and no backtracking: one pass over path components
//! - Only per-operation matching; choosing the operation is the caller's job

pub mod matcher;
pub mod pattern;

pub use matcher::LabelMatcher;
pub use pattern::{QueryLiteral, Segment, UriPattern};
