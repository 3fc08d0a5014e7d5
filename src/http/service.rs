//! Per-operation `tower::Service`.
//!
//! # Responsibilities
//! - Buffer the request body under the configured limit
//! - Parse the request into the operation input
//! - Invoke the operation handler
//! - Serialize the output or modeled error
//! - Turn every rejection and serialization failure into a response
//!
//! # Design Decisions
//! - The service never fails: `Error = Infallible`, so it mounts directly
//!   with `axum::Router::route_service`
//! - Cloning is cheap; all state sits behind `Arc`

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;
use tower::Service;

use crate::binding::ResolvedOperation;
use crate::codec::{self, BodyCodec};
use crate::config::LimitsConfig;
use crate::error::GenerationError;
use crate::model::{ErrorValue, OperationSchema, Value};
use crate::request::{buffer_request, RequestParser};
use crate::response::ResponseSerializer;

/// Future returned by an operation handler.
pub type HandlerFuture = BoxFuture<'static, Result<Value, ErrorValue>>;

type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// One operation served over HTTP: parse → handler → serialize.
#[derive(Clone)]
pub struct OperationService {
    parser: RequestParser,
    serializer: ResponseSerializer,
    handler: Handler,
    body_limit: usize,
}

impl OperationService {
    pub fn new<F, Fut>(operation: Arc<ResolvedOperation>, codec: Arc<dyn BodyCodec>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ErrorValue>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |input| -> HandlerFuture { Box::pin(handler(input)) });
        Self {
            parser: RequestParser::new(operation.clone(), codec.clone()),
            serializer: ResponseSerializer::new(operation, codec),
            handler,
            body_limit: LimitsConfig::default().max_body_size,
        }
    }

    /// Resolve `schema` and serve it with the protocol's built-in codec.
    pub fn from_schema<F, Fut>(schema: OperationSchema, handler: F) -> Result<Self, GenerationError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ErrorValue>> + Send + 'static,
    {
        let codec = codec::for_protocol(schema.protocol)
            .ok_or_else(|| GenerationError::NoBuiltinCodec(schema.protocol.id().to_string()))?;
        let operation = Arc::new(ResolvedOperation::resolve(schema)?);
        Ok(Self::new(operation, codec, handler))
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn operation(&self) -> &Arc<ResolvedOperation> {
        self.parser.operation()
    }

    /// Run one request through the operation.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let request = match buffer_request(request, self.body_limit).await {
            Ok(request) => request,
            Err(rejection) => return rejection.into_response(),
        };
        let input = match self.parser.parse(&request) {
            Ok(input) => input,
            Err(rejection) => return rejection.into_response(),
        };

        let result = match (self.handler)(input).await {
            Ok(output) => self.serializer.serialize_output(&output),
            Err(error) => self.serializer.serialize_error(&error),
        };
        match result {
            Ok(response) => response.map(Body::from),
            Err(e) => e.into_response(),
        }
    }
}

impl fmt::Debug for OperationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationService")
            .field("route", &self.operation().route())
            .field("body_limit", &self.body_limit)
            .finish_non_exhaustive()
    }
}

impl Service<Request<Body>> for OperationService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(request).await) })
    }
}
