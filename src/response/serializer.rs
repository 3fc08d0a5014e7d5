//! Output and error serialization.
//!
//! Header, prefix-header and payload bindings of outputs and errors are not
//! applied: their values are left out of the response and counted.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, Response, StatusCode};

use crate::binding::{Location, ResolvedOperation, ShapeBindings};
use crate::codec::BodyCodec;
use crate::error::{SerializeError, ERROR_TYPE_HEADER};
use crate::model::{ErrorValue, Value};
use crate::observability::metrics;
use crate::response::extension::{ModeledErrorExtension, OperationExtension};

/// Turns typed outputs and modeled errors into HTTP responses for one
/// operation.
#[derive(Debug, Clone)]
pub struct ResponseSerializer {
    operation: Arc<ResolvedOperation>,
    codec: Arc<dyn BodyCodec>,
}

impl ResponseSerializer {
    pub fn new(operation: Arc<ResolvedOperation>, codec: Arc<dyn BodyCodec>) -> Self {
        Self { operation, codec }
    }

    pub fn serialize_output(&self, output: &Value) -> Result<Response<Bytes>, SerializeError> {
        let result = self.output_response(output);
        self.record(&result, "output");
        result
    }

    pub fn serialize_error(&self, error: &ErrorValue) -> Result<Response<Bytes>, SerializeError> {
        let result = self.error_response(error);
        self.record(&result, "error");
        result
    }

    fn record(&self, result: &Result<Response<Bytes>, SerializeError>, kind: &str) {
        let operation = self.operation.schema.id.name();
        match result {
            Ok(response) => {
                tracing::debug!(operation = %operation, kind, status = %response.status(), "Response serialized");
                metrics::record_response(operation, kind);
            }
            Err(e) => {
                tracing::debug!(operation = %operation, kind, error = %e, "Response serialization failed");
                metrics::record_response(operation, "serialize_error");
            }
        }
    }

    fn output_response(&self, output: &Value) -> Result<Response<Bytes>, SerializeError> {
        let bindings = &self.operation.output;
        let fields = structure(output, bindings)?;

        let status = match bindings.response_code() {
            None => StatusCode::OK,
            Some(binding) => {
                let value = fields.get(&binding.member).ok_or_else(|| SerializeError::MissingResponseCode {
                    member: binding.member.clone(),
                })?;
                let code = value.as_i64().ok_or_else(|| SerializeError::MissingResponseCode {
                    member: binding.member.clone(),
                })?;
                u16::try_from(code)
                    .ok()
                    .filter(|c| (100..=599).contains(c))
                    .and_then(|c| StatusCode::from_u16(c).ok())
                    .ok_or_else(|| SerializeError::InvalidResponseCode {
                        member: binding.member.clone(),
                        code,
                    })?
            }
        };

        self.skip_unsupported(bindings, fields);
        let body = self.encode_document(bindings, fields)?;

        let mut builder = Response::builder()
            .status(status)
            .extension(OperationExtension::new(&self.operation.schema.id));
        if !body.is_empty() {
            builder = builder.header(header::CONTENT_TYPE, self.codec.content_type());
        }
        Ok(builder.body(Bytes::from(body))?)
    }

    fn error_response(&self, error: &ErrorValue) -> Result<Response<Bytes>, SerializeError> {
        let resolved = self
            .operation
            .error(&error.shape)
            .ok_or_else(|| SerializeError::UnknownErrorVariant(error.shape.to_string()))?;
        let fields = structure(&error.value, &resolved.bindings)?;

        self.skip_unsupported(&resolved.bindings, fields);
        let body = self.encode_document(&resolved.bindings, fields)?;

        let status = resolved.variant.status();
        let status = Some(status)
            .filter(|s| (100..=599).contains(s))
            .and_then(|s| StatusCode::from_u16(s).ok())
            .ok_or_else(|| SerializeError::InvalidErrorStatus {
                shape: error.shape.to_string(),
                status,
            })?;
        let mut builder = Response::builder()
            .status(status)
            .extension(OperationExtension::new(&self.operation.schema.id))
            .extension(ModeledErrorExtension {
                shape: error.shape.clone(),
            });
        if self.operation.schema.protocol.sends_error_type_header() {
            builder = builder.header(ERROR_TYPE_HEADER, error.shape.name());
        }
        if !body.is_empty() {
            builder = builder.header(header::CONTENT_TYPE, self.codec.content_type());
        }
        Ok(builder.body(Bytes::from(body))?)
    }

    fn encode_document(
        &self,
        bindings: &ShapeBindings,
        fields: &BTreeMap<String, Value>,
    ) -> Result<Vec<u8>, SerializeError> {
        let document = bindings.document();
        if document.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.codec.encode(&document, fields)?)
    }

    fn skip_unsupported(&self, bindings: &ShapeBindings, fields: &BTreeMap<String, Value>) {
        let operation = self.operation.schema.id.name();
        for binding in &bindings.bindings {
            let unsupported = matches!(
                binding.location,
                Location::Header | Location::PrefixHeaders | Location::Payload
            );
            if unsupported && fields.contains_key(&binding.member) {
                tracing::debug!(
                    operation = %operation,
                    member = %binding.member,
                    location = %binding.location,
                    "Binding not applied to response"
                );
                metrics::record_unsupported_binding(operation, binding.location);
            }
        }
    }
}

fn structure<'a>(value: &'a Value, bindings: &ShapeBindings) -> Result<&'a BTreeMap<String, Value>, SerializeError> {
    value
        .as_structure()
        .ok_or_else(|| SerializeError::NotAStructure(bindings.shape.id.to_string()))
}
