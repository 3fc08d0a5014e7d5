//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body> (axum / hyper)
//!     → service.rs OperationService
//!         → request::buffer_request
//!         → RequestParser::parse
//!         → handler(input) → Result<output, ErrorValue>
//!         → ResponseSerializer
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - One service per operation; choosing the operation for a request is
//!   the router's job (`axum::Router::route_service`)

pub mod service;

pub use service::{HandlerFuture, OperationService};
