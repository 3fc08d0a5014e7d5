//! Request body buffering.

use axum::body::{Body, Bytes};
use axum::http::Request;

use crate::error::RequestRejection;

/// Buffer the whole body, failing if it exceeds `limit` bytes.
pub async fn buffer_request(request: Request<Body>, limit: usize) -> Result<Request<Bytes>, RequestRejection> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| RequestRejection::BufferBody(e.to_string()))?;
    Ok(Request::from_parts(parts, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_within_limit() {
        let request = Request::builder().uri("/").body(Body::from("hello")).unwrap();
        let buffered = buffer_request(request, 16).await.unwrap();
        assert_eq!(buffered.body().as_ref(), b"hello");
        assert_eq!(buffered.uri().path(), "/");
    }

    #[tokio::test]
    async fn test_buffer_over_limit() {
        let request = Request::builder().uri("/").body(Body::from("hello world")).unwrap();
        let rejection = buffer_request(request, 4).await.unwrap_err();
        assert!(matches!(rejection, RequestRejection::BufferBody(_)));
        assert_eq!(rejection.status(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }
}
