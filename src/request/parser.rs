//! Per-operation request parser.
//!
//! # Responsibilities
//! - Reject requests whose method or path do not fit the operation
//! - Decode the document (or payload) part of the body
//! - Apply header, prefix-header, label and query bindings on top
//! - Validate required members
//!
//! # Design Decisions
//! - Explicit bindings are applied after the body decode so they always
//!   overwrite a document value for the same member
//! - Path shape is checked before the body is decoded, so a request for a
//!   different route is a `RoutingMismatch` even if its body is malformed;
//!   label values are still coerced after headers
//! - Parsing is a pure function of the operation and the buffered request

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, Request};

use crate::binding::{Location, ResolvedOperation};
use crate::codec::{BodyCodec, CodecError};
use crate::coerce::header::{read_header, read_prefix_headers};
use crate::coerce::query::{parse_query_string, read_query, read_query_params};
use crate::coerce::{parse_scalar, percent_decode};
use crate::error::RequestRejection;
use crate::model::{ShapeBuilder, Value, ValueKind};
use crate::observability::metrics;
use crate::uri::LabelMatcher;

/// Turns buffered HTTP requests into typed input values for one operation.
#[derive(Debug, Clone)]
pub struct RequestParser {
    operation: Arc<ResolvedOperation>,
    codec: Arc<dyn BodyCodec>,
    matcher: LabelMatcher,
}

impl RequestParser {
    pub fn new(operation: Arc<ResolvedOperation>, codec: Arc<dyn BodyCodec>) -> Self {
        let matcher = LabelMatcher::new(&operation.pattern);
        Self {
            operation,
            codec,
            matcher,
        }
    }

    pub fn operation(&self) -> &Arc<ResolvedOperation> {
        &self.operation
    }

    /// Parse `request` into the operation's input structure.
    pub fn parse(&self, request: &Request<Bytes>) -> Result<Value, RequestRejection> {
        let operation = self.operation.schema.id.name();
        let result = self.parse_input(request);
        match &result {
            Ok(_) => {
                tracing::debug!(operation = %operation, path = %request.uri().path(), "Request parsed");
                metrics::record_request(operation, "ok");
            }
            Err(rejection) => {
                tracing::debug!(
                    operation = %operation,
                    path = %request.uri().path(),
                    kind = rejection.kind(),
                    error = %rejection,
                    "Request rejected"
                );
                metrics::record_request(operation, rejection.kind());
            }
        }
        result
    }

    fn parse_input(&self, request: &Request<Bytes>) -> Result<Value, RequestRejection> {
        if request.method() != self.operation.schema.method {
            return Err(self.routing_mismatch(request));
        }
        let Some(labels) = self.matcher.match_path(request.uri().path()) else {
            return Err(self.routing_mismatch(request));
        };

        let input = &self.operation.input;
        let mut builder = self.read_body(request)?;

        for binding in input.at(Location::Header) {
            let value = read_header(request.headers(), binding).map_err(|source| {
                RequestRejection::HeaderParse {
                    header: binding.wire_name.clone(),
                    source,
                }
            })?;
            if let Some(value) = value {
                builder.set(binding.member.clone(), value);
            }
        }
        for binding in input.at(Location::PrefixHeaders) {
            let value = read_prefix_headers(request.headers(), binding).map_err(|source| {
                RequestRejection::HeaderParse {
                    header: binding.wire_name.clone(),
                    source,
                }
            })?;
            if let Some(value) = value {
                builder.set(binding.member.clone(), value);
            }
        }

        for (label, raw) in labels {
            let Some(binding) = input.at(Location::Label).find(|b| b.wire_name == label) else {
                continue;
            };
            let value = percent_decode(&raw)
                .and_then(|decoded| parse_scalar(&decoded, &binding.kind, binding.timestamp_format))
                .map_err(|source| RequestRejection::LabelParse { label, source })?;
            builder.set(binding.member.clone(), value);
        }

        match request.uri().query() {
            None => {
                let required = input
                    .at(Location::Query)
                    .chain(input.at(Location::QueryParams))
                    .any(|b| b.required);
                if self.matcher.requires_query() || required {
                    return Err(RequestRejection::MissingQueryString);
                }
            }
            Some(query) => {
                let pairs = parse_query_string(query)?;
                if !self.matcher.match_query(&pairs) {
                    return Err(self.routing_mismatch(request));
                }
                for binding in input.at(Location::Query) {
                    if let Some(value) = read_query(&pairs, binding)? {
                        builder.set(binding.member.clone(), value);
                    }
                }
                for binding in input.at(Location::QueryParams) {
                    if let Some(value) = read_query_params(&pairs, binding)? {
                        builder.set(binding.member.clone(), value);
                    }
                }
            }
        }

        builder.build()
    }

    fn read_body(&self, request: &Request<Bytes>) -> Result<ShapeBuilder, RequestRejection> {
        let input = &self.operation.input;
        let mut builder = ShapeBuilder::new(input.shape.clone());
        let body = request.body();
        if body.is_empty() {
            return Ok(builder);
        }

        if let Some(payload) = input.payload() {
            let value = match &payload.kind {
                ValueKind::Blob => Value::Blob(body.to_vec()),
                ValueKind::String => Value::String(
                    std::str::from_utf8(body)
                        .map_err(|_| CodecError::NotUtf8)?
                        .to_string(),
                ),
                ValueKind::Enum(_) => {
                    let text = std::str::from_utf8(body).map_err(|_| CodecError::NotUtf8)?;
                    parse_scalar(text, &payload.kind, None).map_err(|source| CodecError::Coercion {
                        path: payload.member.clone(),
                        source,
                    })?
                }
                ValueKind::Structure(shape) => {
                    self.check_content_type(request)?;
                    let members: Vec<_> = input.payload_members.iter().collect();
                    self.codec.decode(shape, &members, body)?.build_unchecked()
                }
                other => {
                    return Err(CodecError::Unsupported {
                        path: payload.member.clone(),
                        kind: other.to_string(),
                    }
                    .into())
                }
            };
            builder.set(payload.member.clone(), value);
            return Ok(builder);
        }

        if input.has_document() {
            self.check_content_type(request)?;
            builder = self.codec.decode(&input.shape, &input.document(), body)?;
        }
        Ok(builder)
    }

    fn check_content_type(&self, request: &Request<Bytes>) -> Result<(), RequestRejection> {
        let expected = self.codec.content_type();
        let found = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let matches = found
            .and_then(|v| v.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case(expected));
        if matches {
            Ok(())
        } else {
            Err(RequestRejection::ContentTypeMismatch {
                expected: expected.to_string(),
                found: found.map(str::to_string),
            })
        }
    }

    fn routing_mismatch(&self, request: &Request<Bytes>) -> RequestRejection {
        RequestRejection::RoutingMismatch {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            route: self.operation.route(),
        }
    }
}
