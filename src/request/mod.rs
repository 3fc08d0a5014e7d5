//! Request parsing subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → body.rs (buffer fully, enforce size limit)
//!     → parser.rs
//!         1. method + path shape check
//!         2. body: document codec or payload
//!         3. header / prefix-header bindings (overwrite)
//!         4. label bindings
//!         5. query literals, query / query-params bindings
//!         6. ShapeBuilder::build (required members)
//!     → Value::Structure or RequestRejection
//! ```

pub mod body;
pub mod parser;

pub use body::buffer_request;
pub use parser::RequestParser;
