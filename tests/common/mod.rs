//! Shared utilities for integration tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::Method;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use wire_binding::binding::Protocol;
use wire_binding::model::{ErrorValue, ErrorVariant, FaultKind, Member, OperationSchema, Shape, ShapeId, Value, ValueKind};
use wire_binding::OperationService;

/// `PUT /widgets/{id}`: echoes the widget back with a 201, or a modeled
/// 404 for the id `missing`.
pub fn widget_schema() -> OperationSchema {
    OperationSchema {
        id: ShapeId::new("test.widgets", "PutWidget"),
        protocol: Protocol::RestJson1,
        method: Method::PUT,
        uri: "/widgets/{id}".into(),
        input: Shape::new(
            ShapeId::new("test.widgets", "PutWidgetInput"),
            vec![
                Member::new("id", ValueKind::String).label().required(),
                Member::new("color", ValueKind::String).header("X-Color"),
                Member::new("name", ValueKind::String).required(),
            ],
        ),
        output: Shape::new(
            ShapeId::new("test.widgets", "PutWidgetOutput"),
            vec![
                Member::new("status", ValueKind::Integer).response_code(),
                Member::new("id", ValueKind::String),
                Member::new("name", ValueKind::String),
                Member::new("color", ValueKind::String),
            ],
        ),
        errors: vec![ErrorVariant::new(
            Shape::new(
                ShapeId::new("test.widgets", "WidgetNotFound"),
                vec![Member::new("message", ValueKind::String)],
            ),
            FaultKind::Client,
        )
        .with_status(404)],
    }
}

pub async fn put_widget(input: Value) -> Result<Value, ErrorValue> {
    let mut fields = input.as_structure().cloned().unwrap_or_default();
    if fields.get("id").and_then(Value::as_str) == Some("missing") {
        let mut error = BTreeMap::new();
        error.insert("message".to_string(), Value::from("no widget `missing`"));
        return Err(ErrorValue::new(ShapeId::new("test.widgets", "WidgetNotFound"), error));
    }
    fields.insert("status".to_string(), Value::Integer(201));
    Ok(Value::Structure(fields))
}

pub fn widget_router() -> Router {
    let service = OperationService::from_schema(widget_schema(), put_widget).unwrap();
    Router::new().route_service("/widgets/{id}", service)
}

/// Serve `router` on an ephemeral port.
pub async fn start_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Send one HTTP/1.1 request and return `(status, headers, body)`.
pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> (u16, Vec<(String, String)>, String) {
    let mut request = format!("{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n", method, path, addr);
    for (name, value) in headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();

    let (head, body) = text.split_once("\r\n\r\n").unwrap();
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    (status, headers, body.to_string())
}

#[allow(dead_code)]
pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}
