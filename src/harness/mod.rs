//! Conformance harness.
//!
//! # Data Flow
//! ```text
//! corpus.rs / vector files (JSON)
//!     → runner.rs Harness (protocol filter, disabled ids)
//!         → request vectors: RequestParser → compare with params.rs value
//!         → response vectors: params.rs value → ResponseSerializer
//!                             → compare.rs (status, headers, body)
//!     → registry.rs expected failures
//!     → SuiteReport
//! ```
//!
//! # Responsibilities
//! - Describe request and response vectors
//! - Run them against a resolved service
//! - Classify outcomes against the expected-failure registry
//!
//! # Design Decisions
//! - A listed vector that passes fails the run, so the registry never
//!   goes stale
//! - Bodies are compared after canonicalisation by media type

pub mod compare;
pub mod corpus;
pub mod params;
pub mod registry;
pub mod runner;
pub mod vector;

pub use params::{value_from_params, ParamsError};
pub use registry::{ExpectedFailureEntry, ExpectedFailures};
pub use runner::{check, Harness, Outcome, ServiceUnderTest, SuiteReport, VectorResult};
pub use vector::{load_vectors, Action, TestVector, VectorFileError};
