//! Run vectors against a service and report.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{Method, Request};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::binding::{Protocol, ResolvedOperation};
use crate::codec::BodyCodec;
use crate::coerce::query::parse_query_string;
use crate::config::HarnessConfig;
use crate::error::GenerationError;
use crate::harness::compare;
use crate::harness::params::value_from_params;
use crate::harness::registry::{ExpectedFailureEntry, ExpectedFailures};
use crate::harness::vector::{Action, TestVector};
use crate::model::{ErrorValue, OperationSchema, ShapeId};
use crate::observability::metrics::record_vector;
use crate::request::RequestParser;
use crate::response::ResponseSerializer;

/// A service's resolved operations plus the codec its protocol uses.
#[derive(Debug, Clone)]
pub struct ServiceUnderTest {
    pub service_id: String,
    pub protocol: Protocol,
    pub codec: Arc<dyn BodyCodec>,
    operations: BTreeMap<String, Arc<ResolvedOperation>>,
}

impl ServiceUnderTest {
    pub fn new(service_id: impl Into<String>, protocol: Protocol, codec: Arc<dyn BodyCodec>) -> Self {
        Self {
            service_id: service_id.into(),
            protocol,
            codec,
            operations: BTreeMap::new(),
        }
    }

    /// Resolve and register an operation under its shape name.
    pub fn with_operation(mut self, schema: OperationSchema) -> Result<Self, GenerationError> {
        let name = schema.id.name().to_string();
        self.operations
            .insert(name, Arc::new(ResolvedOperation::resolve(schema)?));
        Ok(self)
    }

    pub fn operation(&self, name: &str) -> Option<&Arc<ResolvedOperation>> {
        self.operations.get(name)
    }
}

/// Result of one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(String),
    /// Failed, and listed as a known failure.
    ExpectedFailure(String),
    /// Listed as a known failure but passed.
    UnexpectedPass,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Passed | Outcome::ExpectedFailure(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::ExpectedFailure(_) => "expected_failure",
            Outcome::UnexpectedPass => "unexpected_pass",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Failed(reason) | Outcome::ExpectedFailure(reason) => {
                write!(f, "{}: {}", self.label(), reason)
            }
            _ => f.write_str(self.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorResult {
    pub id: String,
    pub action: Action,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Summary of one service's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub case_count: usize,
    pub pass_count: usize,
    /// Vectors filtered out by protocol or disabled by id.
    pub skipped: usize,
    pub failures: Vec<String>,
    pub results: Vec<VectorResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }
}

/// Runs vectors with a configured filter and expected-failure registry.
#[derive(Debug, Clone)]
pub struct Harness {
    protocols: Option<Vec<String>>,
    disabled: Vec<String>,
    expected: ExpectedFailures,
}

impl Harness {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            protocols: config.protocols.clone(),
            disabled: config.disabled_tests.clone(),
            expected: config.expected_failures.iter().cloned().collect(),
        }
    }

    pub fn with_expected_failures(mut self, entries: impl IntoIterator<Item = ExpectedFailureEntry>) -> Self {
        self.expected.extend(entries);
        self
    }

    pub fn expected_failures(&self) -> &ExpectedFailures {
        &self.expected
    }

    /// A vector runs when its protocol passes the filter and its id is not
    /// disabled. The configured allow-list replaces the service protocol.
    fn selects(&self, service: &ServiceUnderTest, vector: &TestVector) -> bool {
        let protocol_ok = match &self.protocols {
            Some(allowed) => allowed.iter().any(|p| p == &vector.protocol),
            None => vector.protocol == service.protocol.id(),
        };
        protocol_ok && !self.disabled.iter().any(|id| id == &vector.id)
    }

    pub fn run(&self, service: &ServiceUnderTest, vectors: &[TestVector]) -> SuiteReport {
        let mut report = SuiteReport {
            suite: service.service_id.clone(),
            case_count: 0,
            pass_count: 0,
            skipped: 0,
            failures: Vec::new(),
            results: Vec::new(),
        };

        for vector in vectors {
            if !self.selects(service, vector) {
                debug!(vector = %vector.id, protocol = %vector.protocol, "Skipping vector");
                report.skipped += 1;
                record_vector("skipped");
                continue;
            }

            let expected = self
                .expected
                .contains(&service.service_id, &vector.id, vector.action);
            let outcome = match (check(service, vector), expected) {
                (Ok(()), false) => Outcome::Passed,
                (Err(reason), false) => Outcome::Failed(reason),
                (Err(reason), true) => Outcome::ExpectedFailure(reason),
                (Ok(()), true) => Outcome::UnexpectedPass,
            };

            match &outcome {
                Outcome::Failed(reason) => {
                    warn!(vector = %vector.id, action = %vector.action, reason = %reason, "Vector failed");
                    report.failures.push(format!("{} ({}): {}", vector.id, vector.action, reason));
                }
                Outcome::UnexpectedPass => {
                    warn!(
                        vector = %vector.id,
                        action = %vector.action,
                        "Vector listed as an expected failure passed; remove the entry"
                    );
                    report
                        .failures
                        .push(format!("{} ({}): unexpectedly passed", vector.id, vector.action));
                }
                _ => debug!(vector = %vector.id, outcome = outcome.label(), "Vector finished"),
            }

            record_vector(outcome.label());
            report.case_count += 1;
            if outcome.is_success() {
                report.pass_count += 1;
            }
            report.results.push(VectorResult {
                id: vector.id.clone(),
                action: vector.action,
                outcome,
            });
        }

        info!(
            suite = %report.suite,
            cases = report.case_count,
            passed = report.pass_count,
            skipped = report.skipped,
            failures = report.failures.len(),
            "Conformance run complete"
        );
        report
    }
}

/// Check one vector, ignoring the expected-failure registry.
pub fn check(service: &ServiceUnderTest, vector: &TestVector) -> Result<(), String> {
    let operation = service
        .operation(&vector.operation)
        .ok_or_else(|| format!("unknown operation `{}`", vector.operation))?;
    match vector.action {
        Action::Request => check_request(service, operation, vector),
        Action::Response => check_response(service, operation, vector),
    }
}

fn check_request(
    service: &ServiceUnderTest,
    operation: &Arc<ResolvedOperation>,
    vector: &TestVector,
) -> Result<(), String> {
    let request = build_request(vector)?;

    compare::headers_present(&vector.require_headers, request.headers())?;
    compare::headers_absent(&vector.forbid_headers, request.headers())?;
    let query = parse_query_string(request.uri().query().unwrap_or(""))
        .map_err(|e| format!("vector query does not parse: {}", e))?;
    compare::query_present(&vector.require_query, &query)?;
    compare::query_absent(&vector.forbid_query, &query)?;

    let parser = RequestParser::new(operation.clone(), service.codec.clone());
    let actual = parser
        .parse(&request)
        .map_err(|e| format!("request rejected: {}", e))?;
    let expected =
        value_from_params(&operation.schema.input, &vector.params).map_err(|e| e.to_string())?;

    if compare::values_equal(&expected, &actual) {
        Ok(())
    } else {
        Err(format!("parsed {:?}, expected {:?}", actual, expected))
    }
}

fn check_response(
    service: &ServiceUnderTest,
    operation: &Arc<ResolvedOperation>,
    vector: &TestVector,
) -> Result<(), String> {
    let serializer = ResponseSerializer::new(operation.clone(), service.codec.clone());

    let response = match &vector.error_shape {
        Some(shape) => {
            let id: ShapeId = shape
                .parse()
                .map_err(|e| format!("invalid error shape `{}`: {}", shape, e))?;
            let variant = operation
                .error(&id)
                .ok_or_else(|| format!("`{}` is not an error of {}", id, operation.schema.id))?;
            let value = value_from_params(&variant.variant.shape, &vector.params)
                .map_err(|e| e.to_string())?;
            serializer.serialize_error(&ErrorValue { shape: id, value })
        }
        None => {
            let output = value_from_params(&operation.schema.output, &vector.params)
                .map_err(|e| e.to_string())?;
            serializer.serialize_output(&output)
        }
    }
    .map_err(|e| format!("serialization failed: {}", e))?;

    if let Some(status) = vector.status {
        if response.status().as_u16() != status {
            return Err(format!("status is {}, expected {}", response.status().as_u16(), status));
        }
    }
    compare::headers_match(&vector.headers, response.headers())?;
    compare::headers_present(&vector.require_headers, response.headers())?;
    compare::headers_absent(&vector.forbid_headers, response.headers())?;

    if let Some(body) = &vector.body {
        let media_type = vector.body_media_type.as_deref().or_else(|| {
            response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
        });
        compare::body_matches(body, response.body(), media_type)?;
    }
    Ok(())
}

fn build_request(vector: &TestVector) -> Result<Request<Bytes>, String> {
    let method: Method = vector
        .method
        .as_deref()
        .unwrap_or("GET")
        .parse()
        .map_err(|_| format!("invalid method in vector `{}`", vector.id))?;
    let mut uri = vector.uri.clone().unwrap_or_else(|| "/".to_string());
    if !vector.query.is_empty() {
        uri.push('?');
        uri.push_str(&vector.query.join("&"));
    }

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in &vector.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Bytes::from(vector.body.clone().unwrap_or_default()))
        .map_err(|e| format!("invalid request in vector `{}`: {}", vector.id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::model::{Member, Shape, ValueKind};
    use serde_json::json;

    fn service() -> ServiceUnderTest {
        let schema = OperationSchema {
            id: ShapeId::new("test", "GetThing"),
            protocol: Protocol::RestJson1,
            method: Method::GET,
            uri: "/things/{id}".into(),
            input: Shape::new(
                ShapeId::new("test", "GetThingInput"),
                vec![Member::new("id", ValueKind::String).label().required()],
            ),
            output: Shape::new(
                ShapeId::new("test", "GetThingOutput"),
                vec![Member::new("name", ValueKind::String)],
            ),
            errors: Vec::new(),
        };
        let codec = codec::for_protocol(Protocol::RestJson1).unwrap();
        ServiceUnderTest::new("test#Things", Protocol::RestJson1, codec)
            .with_operation(schema)
            .unwrap()
    }

    fn vectors() -> Vec<TestVector> {
        let protocol = Protocol::RestJson1.id();
        vec![
            TestVector::request("GetThingRequest", protocol, "GetThing", "GET", "/things/a%2Fb")
                .with_params(json!({"id": "a/b"})),
            TestVector::response("GetThingResponse", protocol, "GetThing", 200)
                .with_body(r#"{"name": "n"}"#, "application/json")
                .with_params(json!({"name": "n"})),
            TestVector::response("GetThingWrongStatus", protocol, "GetThing", 204)
                .with_params(json!({"name": "n"})),
            TestVector::request("XmlOnly", Protocol::RestXml.id(), "GetThing", "GET", "/things/a"),
        ]
    }

    #[test]
    fn test_run_counts_and_filters() {
        let report = Harness::new(&HarnessConfig::default()).run(&service(), &vectors());
        assert_eq!(report.case_count, 3);
        assert_eq!(report.pass_count, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].starts_with("GetThingWrongStatus (response): status is 200"));
        assert!(!report.all_passed());
    }

    #[test]
    fn test_expected_failure_and_unexpected_pass() {
        let harness = Harness::new(&HarnessConfig::default()).with_expected_failures([
            ExpectedFailureEntry::new("test#Things", "GetThingWrongStatus", Action::Response),
        ]);
        let report = harness.run(&service(), &vectors());
        assert!(report.all_passed());
        assert!(matches!(report.results[2].outcome, Outcome::ExpectedFailure(_)));

        let harness = harness.with_expected_failures([ExpectedFailureEntry::new(
            "test#Things",
            "GetThingRequest",
            Action::Request,
        )]);
        let report = harness.run(&service(), &vectors());
        assert_eq!(report.results[0].outcome, Outcome::UnexpectedPass);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_protocol_allow_list_and_disabled() {
        let config = HarnessConfig {
            protocols: Some(vec![Protocol::RestXml.id().to_string()]),
            disabled_tests: Vec::new(),
            expected_failures: Vec::new(),
        };
        let report = Harness::new(&config).run(&service(), &vectors());
        assert_eq!(report.case_count, 1);
        assert_eq!(report.skipped, 3);

        let config = HarnessConfig {
            protocols: None,
            disabled_tests: vec!["GetThingWrongStatus".to_string()],
            expected_failures: Vec::new(),
        };
        let report = Harness::new(&config).run(&service(), &vectors());
        assert!(report.all_passed());
        assert_eq!(report.skipped, 2);
    }

    fn floats_service() -> ServiceUnderTest {
        let schema = OperationSchema {
            id: ShapeId::new("test", "GetFloats"),
            protocol: Protocol::RestJson1,
            method: Method::GET,
            uri: "/floats".into(),
            input: Shape::new(
                ShapeId::new("test", "GetFloatsInput"),
                vec![
                    Member::new("d", ValueKind::Double).query("d"),
                    Member::new("tag", ValueKind::String).query("tag"),
                ],
            ),
            output: Shape::new(ShapeId::new("test", "GetFloatsOutput"), Vec::new()),
            errors: Vec::new(),
        };
        let codec = codec::for_protocol(Protocol::RestJson1).unwrap();
        ServiceUnderTest::new("test#Floats", Protocol::RestJson1, codec)
            .with_operation(schema)
            .unwrap()
    }

    #[test]
    fn test_nan_query_member_passes() {
        let vector = TestVector::request("NaNQuery", Protocol::RestJson1.id(), "GetFloats", "GET", "/floats")
            .with_query(&["d=NaN"])
            .with_params(json!({"d": "NaN"}));
        assert_eq!(check(&floats_service(), &vector), Ok(()));

        let vector = vector.with_params(json!({"d": 1.5}));
        assert!(check(&floats_service(), &vector).unwrap_err().starts_with("parsed"));
    }

    #[test]
    fn test_encoded_query_requirement_matches_decoded_pair() {
        let vector = TestVector::request("EncodedQuery", Protocol::RestJson1.id(), "GetFloats", "GET", "/floats")
            .with_query(&["tag=x%20y"])
            .with_params(json!({"tag": "x y"}))
            .requiring_query(&["tag=x%20y"])
            .forbidding_query(&["d"]);
        assert_eq!(check(&floats_service(), &vector), Ok(()));

        let vector = vector.forbidding_query(&["tag"]);
        assert_eq!(
            check(&floats_service(), &vector).unwrap_err(),
            "forbidden query parameter `tag` is present"
        );
    }

    #[test]
    fn test_unknown_operation() {
        let vector = TestVector::request("Nope", Protocol::RestJson1.id(), "Missing", "GET", "/");
        assert_eq!(check(&service(), &vector).unwrap_err(), "unknown operation `Missing`");
    }

    #[test]
    fn test_report_serializes_outcome_tag() {
        let result = VectorResult {
            id: "V".into(),
            action: Action::Response,
            outcome: Outcome::Failed("why".into()),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"id": "V", "action": "response", "outcome": "failed", "reason": "why"})
        );
    }
}
