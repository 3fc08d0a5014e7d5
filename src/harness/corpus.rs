//! Built-in restJson1 conformance corpus.
//!
//! One service, `example.rest#RestJsonBindings`, exercising every binding
//! location, plus the curated list of its vectors that are known to fail.

use axum::http::Method;
use serde_json::json;

use crate::binding::{Protocol, TimestampFormat};
use crate::codec;
use crate::error::GenerationError;
use crate::harness::registry::ExpectedFailureEntry;
use crate::harness::runner::ServiceUnderTest;
use crate::harness::vector::{Action, TestVector};
use crate::model::{ErrorVariant, FaultKind, Member, OperationSchema, Shape, ShapeId, ValueKind};

pub const SERVICE_ID: &str = "example.rest#RestJsonBindings";

const NAMESPACE: &str = "example.rest";

fn id(name: &str) -> ShapeId {
    ShapeId::new(NAMESPACE, name)
}

fn operation(name: &str, method: Method, uri: &str, input: Vec<Member>, output: Vec<Member>) -> OperationSchema {
    OperationSchema {
        id: id(name),
        protocol: Protocol::RestJson1,
        method,
        uri: uri.to_string(),
        input: Shape::new(id(&format!("{}Input", name)), input),
        output: Shape::new(id(&format!("{}Output", name)), output),
        errors: Vec::new(),
    }
}

fn schemas() -> Vec<OperationSchema> {
    let mut document = operation(
        "JsonDocument",
        Method::POST,
        "/documents/{id}",
        vec![
            Member::new("id", ValueKind::String).label().required(),
            Member::new("token", ValueKind::String).header("X-Token"),
            Member::new("name", ValueKind::String).required(),
            Member::new("count", ValueKind::Integer),
            Member::new("tags", ValueKind::list_of(ValueKind::String)),
            Member::new("created", ValueKind::Timestamp),
        ],
        vec![
            Member::new("id", ValueKind::String),
            Member::new("name", ValueKind::String),
            Member::new("created", ValueKind::Timestamp),
        ],
    );
    document.errors = vec![
        ErrorVariant::new(
            Shape::new(id("InvalidWidget"), vec![Member::new("message", ValueKind::String)]),
            FaultKind::Client,
        )
        .with_status(422),
        ErrorVariant::new(
            Shape::new(id("ServiceUnavailable"), vec![Member::new("message", ValueKind::String)]),
            FaultKind::Server,
        ),
    ];

    vec![
        operation(
            "HttpLabels",
            Method::GET,
            "/HttpLabels/{string}/{integer}/{boolean}/{timestamp}",
            vec![
                Member::new("string", ValueKind::String).label().required(),
                Member::new("integer", ValueKind::Integer).label().required(),
                Member::new("boolean", ValueKind::Boolean).label().required(),
                Member::new("timestamp", ValueKind::Timestamp).label().required(),
            ],
            Vec::new(),
        ),
        operation(
            "GreedyLabelWithSuffix",
            Method::GET,
            "/greedy/{prefix}/{proxy+}/tail",
            vec![
                Member::new("prefix", ValueKind::String).label().required(),
                Member::new("proxy", ValueKind::String).label().required(),
            ],
            Vec::new(),
        ),
        operation(
            "QueryParamsAsStringMap",
            Method::GET,
            "/StringMap",
            vec![Member::new("params", ValueKind::map_of(ValueKind::String)).query_params()],
            Vec::new(),
        ),
        operation(
            "QueryParamsAsStringListMap",
            Method::GET,
            "/StringListMap",
            vec![
                Member::new("qux", ValueKind::String).query("qux"),
                Member::new("params", ValueKind::map_of(ValueKind::list_of(ValueKind::String))).query_params(),
            ],
            Vec::new(),
        ),
        operation(
            "HttpHeaders",
            Method::GET,
            "/HttpHeaders",
            vec![
                Member::new("string", ValueKind::String).header("X-String"),
                Member::new("integer", ValueKind::Integer).header("X-Integer"),
                Member::new("booleanList", ValueKind::list_of(ValueKind::Boolean)).header("X-BooleanList"),
                Member::new("timestamp", ValueKind::Timestamp).header("X-Timestamp"),
                Member::new("epoch", ValueKind::Timestamp)
                    .header("X-Epoch")
                    .timestamp_format(TimestampFormat::EpochSeconds),
                Member::new("enum", ValueKind::Enum(vec!["Foo".into(), "Bar".into()])).header("X-Enum"),
                Member::new("prefixed", ValueKind::map_of(ValueKind::String)).prefix_headers("X-Foo-"),
            ],
            Vec::new(),
        ),
        document,
        operation(
            "ResponseCode",
            Method::GET,
            "/ResponseCode",
            Vec::new(),
            vec![
                Member::new("status", ValueKind::Integer).response_code(),
                Member::new("message", ValueKind::String),
            ],
        ),
        operation(
            "OutputHeaders",
            Method::GET,
            "/OutputHeaders",
            Vec::new(),
            vec![
                Member::new("etag", ValueKind::String).header("ETag"),
                Member::new("id", ValueKind::String),
            ],
        ),
        operation(
            "OutputPayload",
            Method::GET,
            "/OutputPayload",
            Vec::new(),
            vec![Member::new("data", ValueKind::Blob).payload()],
        ),
    ]
}

/// The corpus service with every operation resolved.
pub fn service() -> Result<ServiceUnderTest, GenerationError> {
    let protocol = Protocol::RestJson1;
    let codec = codec::for_protocol(protocol)
        .ok_or_else(|| GenerationError::NoBuiltinCodec(protocol.id().to_string()))?;
    schemas()
        .into_iter()
        .try_fold(ServiceUnderTest::new(SERVICE_ID, protocol, codec), |service, schema| {
            service.with_operation(schema)
        })
}

pub fn vectors() -> Vec<TestVector> {
    let json = Protocol::RestJson1.id();
    vec![
        TestVector::request(
            "RestJsonHttpLabels",
            json,
            "HttpLabels",
            "GET",
            "/HttpLabels/hello%20world/5/true/2019-12-16T23%3A48%3A18Z",
        )
        .with_params(json!({
            "string": "hello world",
            "integer": 5,
            "boolean": true,
            "timestamp": 1576540098
        })),
        TestVector::request(
            "RestJsonGreedyLabelWithSuffix",
            json,
            "GreedyLabelWithSuffix",
            "GET",
            "/greedy/a/x/y%2Fz/tail",
        )
        .with_params(json!({"prefix": "a", "proxy": "x/y/z"})),
        TestVector::request("RestJsonQueryParamsStringMapFirstWins", json, "QueryParamsAsStringMap", "GET", "/StringMap")
            .with_query(&["k=v1", "k=v2", "other=x%20y"])
            .with_params(json!({"params": {"k": "v1", "other": "x y"}}))
            .requiring_query(&["k", "k=v1", "other=x%20y"])
            .forbidding_query(&["absent"]),
        TestVector::request(
            "RestJsonQueryParamsStringListMapIncludesNamedKeys",
            json,
            "QueryParamsAsStringListMap",
            "GET",
            "/StringListMap",
        )
        .with_query(&["qux=named", "k=v1", "k=v2"])
        .with_params(json!({
            "qux": "named",
            "params": {"qux": ["named"], "k": ["v1", "v2"]}
        })),
        TestVector::request("RestJsonHttpHeaders", json, "HttpHeaders", "GET", "/HttpHeaders")
            .with_header("X-String", "value%3Dfoo")
            .with_header("X-Integer", "123")
            .with_header("X-BooleanList", "true, false, true")
            .with_header("X-Timestamp", "Mon, 16 Dec 2019 23:48:18 GMT")
            .with_header("X-Epoch", "1576540098")
            .with_header("X-Enum", "Foo")
            .with_header("X-Foo-Abc", "abc value")
            .with_params(json!({
                "string": "value=foo",
                "integer": 123,
                "booleanList": [true, false, true],
                "timestamp": 1576540098,
                "epoch": 1576540098,
                "enum": "Foo",
                "prefixed": {"abc": "abc value"}
            }))
            .requiring_headers(&["X-String"])
            .forbidding_headers(&["X-Absent"]),
        TestVector::request("RestJsonDocumentWithHeader", json, "JsonDocument", "POST", "/documents/d1")
            .with_header("Content-Type", "application/json")
            .with_header("X-Token", "t-1")
            .with_body(
                r#"{"name":"widget","count":2,"tags":["a","b"],"created":1576540098}"#,
                "application/json",
            )
            .with_params(json!({
                "id": "d1",
                "token": "t-1",
                "name": "widget",
                "count": 2,
                "tags": ["a", "b"],
                "created": 1576540098
            })),
        TestVector::response("RestJsonDocumentOutput", json, "JsonDocument", 200)
            .with_header("Content-Type", "application/json")
            .with_body(
                r#"{"id": "d1", "name": "widget", "created": 1576540098}"#,
                "application/json",
            )
            .with_params(json!({"id": "d1", "name": "widget", "created": 1576540098})),
        TestVector::response("RestJsonInvalidWidgetError", json, "JsonDocument", 422)
            .with_error_shape("example.rest#InvalidWidget")
            .with_header("X-Amzn-Errortype", "InvalidWidget")
            .with_body(r#"{"message": "bad widget"}"#, "application/json")
            .with_params(json!({"message": "bad widget"})),
        TestVector::response("RestJsonServiceUnavailableError", json, "JsonDocument", 500)
            .with_error_shape("example.rest#ServiceUnavailable")
            .with_header("X-Amzn-Errortype", "ServiceUnavailable")
            .with_body(r#"{"message": "try later"}"#, "application/json")
            .with_params(json!({"message": "try later"})),
        TestVector::response("RestJsonResponseCode", json, "ResponseCode", 201)
            .with_body(r#"{"message": "created"}"#, "application/json")
            .with_params(json!({"status": 201, "message": "created"}))
            .forbidding_headers(&["X-Amzn-Errortype"]),
        TestVector::response("RestJsonOutputHeaders", json, "OutputHeaders", 200)
            .with_header("ETag", "abc")
            .with_body(r#"{"id": "x"}"#, "application/json")
            .with_params(json!({"etag": "abc", "id": "x"})),
        TestVector::response("RestJsonOutputPayload", json, "OutputPayload", 200)
            .with_body("raw", "application/octet-stream")
            .with_params(json!({"data": "raw"})),
        TestVector::request(
            "RestXmlHttpLabels",
            Protocol::RestXml.id(),
            "HttpLabels",
            "GET",
            "/HttpLabels/a/1/false/2019-12-16T23%3A48%3A18Z",
        )
        .with_params(json!({
            "string": "a",
            "integer": 1,
            "boolean": false,
            "timestamp": 1576540098
        })),
    ]
}

/// Vectors of this corpus that fail because output headers and payloads
/// are not written.
pub fn known_failures() -> Vec<ExpectedFailureEntry> {
    ["RestJsonOutputHeaders", "RestJsonOutputPayload"]
        .into_iter()
        .map(|test_id| ExpectedFailureEntry::new(SERVICE_ID, test_id, Action::Response))
        .collect()
}
