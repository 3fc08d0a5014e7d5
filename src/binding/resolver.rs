//! Member-to-location classification and format resolution.
//!
//! # Responsibilities
//! - Classify every member to exactly one wire location
//! - Resolve timestamp formats (member trait > location default > global)
//! - Reject schemas the engine cannot bind (duplicate wire names, illegal
//!   query-params targets, labels missing from the URI pattern)
//!
//! # Design Decisions
//! - Location is a closed enum; every consumer matches it exhaustively
//! - Output header/payload bindings resolve successfully but are recorded as
//!   unsupported, so the serializer can skip them without failing

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::binding::protocol::{ProtocolDefaults, TimestampFormat};
use crate::error::{GenerationError, UnsupportedBinding};
use crate::model::{ErrorVariant, Member, OperationSchema, Shape, ShapeId, ValueKind};
use crate::uri::UriPattern;

/// Part of an HTTP message a member is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Header,
    PrefixHeaders,
    Query,
    QueryParams,
    Label,
    Payload,
    Document,
    ResponseCode,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Location::Header => "header",
            Location::PrefixHeaders => "prefix-headers",
            Location::Query => "query",
            Location::QueryParams => "query-params",
            Location::Label => "label",
            Location::Payload => "payload",
            Location::Document => "document",
            Location::ResponseCode => "response-code",
        };
        f.write_str(name)
    }
}

/// Which side of the exchange a shape describes.
///
/// Input-only traits (query, label) are ignored on outputs and errors;
/// response codes are ignored on inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRole {
    Input,
    Output,
    Error,
}

/// Resolved binding of one member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberBinding {
    pub member: String,
    pub location: Location,
    /// Header name, header prefix, query key, label name or document key.
    pub wire_name: String,
    pub kind: ValueKind,
    pub required: bool,
    pub timestamp_format: Option<TimestampFormat>,
}

/// Resolve the binding of a single member.
pub fn resolve(
    shape: &Shape,
    member: &Member,
    defaults: &ProtocolDefaults,
    role: ShapeRole,
) -> Result<MemberBinding, GenerationError> {
    let traits = &member.traits;
    let mut locations: Vec<(Location, String)> = Vec::new();

    if let Some(name) = &traits.http_header {
        locations.push((Location::Header, name.clone()));
    }
    if let Some(prefix) = &traits.http_prefix_headers {
        locations.push((Location::PrefixHeaders, prefix.clone()));
    }
    if traits.http_payload {
        locations.push((Location::Payload, member.name.clone()));
    }
    if role == ShapeRole::Input {
        if let Some(name) = &traits.http_query {
            locations.push((Location::Query, name.clone()));
        }
        if traits.http_query_params {
            locations.push((Location::QueryParams, member.name.clone()));
        }
        if traits.http_label {
            locations.push((Location::Label, member.name.clone()));
        }
    } else if traits.http_response_code {
        locations.push((Location::ResponseCode, member.name.clone()));
    }

    let (location, wire_name) = match locations.len() {
        0 => (
            Location::Document,
            traits.json_name.clone().unwrap_or_else(|| member.name.clone()),
        ),
        1 => locations.remove(0),
        _ => {
            return Err(GenerationError::ConflictingBindings {
                shape: shape.id.to_string(),
                member: member.name.clone(),
            })
        }
    };

    check_target(shape, member, location)?;

    let timestamp_format = if member.kind.involves_timestamp() {
        Some(
            traits
                .timestamp_format
                .unwrap_or_else(|| defaults.timestamp_format(location)),
        )
    } else {
        None
    };

    Ok(MemberBinding {
        member: member.name.clone(),
        location,
        wire_name,
        kind: member.kind.clone(),
        required: member.required,
        timestamp_format,
    })
}

fn check_target(shape: &Shape, member: &Member, location: Location) -> Result<(), GenerationError> {
    let kind = &member.kind;
    let scalar_or_collection = kind.is_scalar() || kind.item().is_some_and(ValueKind::is_scalar);

    let legal = match location {
        Location::Header | Location::Query => scalar_or_collection,
        Location::Label => kind.is_scalar() && *kind != ValueKind::Blob,
        Location::PrefixHeaders => is_string_map(kind),
        Location::QueryParams => {
            if !is_string_map(kind) {
                return Err(GenerationError::InvalidQueryParamsTarget {
                    shape: shape.id.to_string(),
                    member: member.name.clone(),
                    kind: kind.to_string(),
                });
            }
            true
        }
        Location::ResponseCode => {
            if *kind != ValueKind::Integer {
                return Err(GenerationError::InvalidResponseCodeTarget {
                    shape: shape.id.to_string(),
                    member: member.name.clone(),
                });
            }
            true
        }
        Location::Payload => matches!(
            kind,
            ValueKind::Blob | ValueKind::String | ValueKind::Enum(_) | ValueKind::Structure(_)
        ),
        Location::Document => true,
    };

    if legal {
        Ok(())
    } else {
        Err(GenerationError::InvalidLocationTarget {
            shape: shape.id.to_string(),
            member: member.name.clone(),
            location,
            kind: kind.to_string(),
        })
    }
}

/// `map<string, string>`, `map<string, list<string>>` or `map<string, set<string>>`.
fn is_string_map(kind: &ValueKind) -> bool {
    match kind {
        ValueKind::Map(value) => match value.as_ref() {
            ValueKind::String => true,
            ValueKind::List(item) | ValueKind::Set(item) => **item == ValueKind::String,
            _ => false,
        },
        _ => false,
    }
}

/// Resolved bindings of every member of one shape.
#[derive(Debug, Clone)]
pub struct ShapeBindings {
    pub shape: Arc<Shape>,
    pub bindings: Vec<MemberBinding>,
    /// Document bindings of the payload structure's members, if the payload
    /// member targets a structure.
    pub payload_members: Vec<MemberBinding>,
}

impl ShapeBindings {
    pub fn at(&self, location: Location) -> impl Iterator<Item = &MemberBinding> {
        self.bindings.iter().filter(move |b| b.location == location)
    }

    pub fn document(&self) -> Vec<&MemberBinding> {
        self.at(Location::Document).collect()
    }

    pub fn payload(&self) -> Option<&MemberBinding> {
        self.at(Location::Payload).next()
    }

    pub fn response_code(&self) -> Option<&MemberBinding> {
        self.at(Location::ResponseCode).next()
    }

    /// True if the body is decoded by the structured-body codec.
    pub fn has_document(&self) -> bool {
        self.at(Location::Document).next().is_some()
            || self
                .payload()
                .is_some_and(|b| matches!(b.kind, ValueKind::Structure(_)))
    }
}

/// Resolve and cross-check all members of a shape.
pub fn resolve_shape(
    shape: &Arc<Shape>,
    defaults: &ProtocolDefaults,
    role: ShapeRole,
) -> Result<ShapeBindings, GenerationError> {
    let shape_name = shape.id.to_string();
    let bindings = shape
        .members
        .iter()
        .map(|member| resolve(shape, member, defaults, role))
        .collect::<Result<Vec<_>, _>>()?;

    let mut headers = HashSet::new();
    let mut queries = HashSet::new();
    let mut query_params = 0;
    let mut response_codes = 0;
    let mut payload: Option<&MemberBinding> = None;

    for binding in &bindings {
        let duplicate = match binding.location {
            Location::Header => !headers.insert(binding.wire_name.to_ascii_lowercase()),
            Location::Query => !queries.insert(binding.wire_name.clone()),
            Location::QueryParams => {
                query_params += 1;
                if query_params > 1 {
                    return Err(GenerationError::MultipleQueryParams { shape: shape_name });
                }
                false
            }
            Location::ResponseCode => {
                response_codes += 1;
                if response_codes > 1 {
                    return Err(GenerationError::MultipleResponseCode { shape: shape_name });
                }
                false
            }
            Location::Payload => {
                if payload.replace(binding).is_some() {
                    return Err(GenerationError::MultiplePayloads { shape: shape_name });
                }
                false
            }
            Location::PrefixHeaders | Location::Label | Location::Document => false,
        };
        if duplicate {
            return Err(GenerationError::DuplicateWireName {
                shape: shape_name,
                location: binding.location,
                name: binding.wire_name.clone(),
            });
        }
    }

    let mut payload_members = Vec::new();
    if let Some(payload) = payload {
        if bindings.iter().any(|b| b.location == Location::Document) {
            return Err(GenerationError::PayloadWithDocument {
                shape: shape_name,
                member: payload.member.clone(),
            });
        }
        if let ValueKind::Structure(nested) = &payload.kind {
            payload_members = nested
                .members
                .iter()
                .map(|member| document_binding(member, defaults))
                .collect();
        }
    }

    Ok(ShapeBindings {
        shape: shape.clone(),
        bindings,
        payload_members,
    })
}

/// Document binding for a member of a nested structure; HTTP traits do not
/// apply below the top level.
pub fn document_binding(member: &Member, defaults: &ProtocolDefaults) -> MemberBinding {
    MemberBinding {
        member: member.name.clone(),
        location: Location::Document,
        wire_name: member
            .traits
            .json_name
            .clone()
            .unwrap_or_else(|| member.name.clone()),
        kind: member.kind.clone(),
        required: member.required,
        timestamp_format: member.kind.involves_timestamp().then(|| {
            member
                .traits
                .timestamp_format
                .unwrap_or_else(|| defaults.timestamp_format(Location::Document))
        }),
    }
}

/// An error variant together with its resolved bindings.
#[derive(Debug, Clone)]
pub struct ResolvedError {
    pub variant: ErrorVariant,
    pub bindings: ShapeBindings,
}

/// An operation whose bindings and URI pattern have been fully resolved.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub schema: OperationSchema,
    pub pattern: UriPattern,
    pub input: ShapeBindings,
    pub output: ShapeBindings,
    pub errors: Vec<ResolvedError>,
    /// Output and error bindings that are accepted but never applied.
    pub unsupported: Vec<UnsupportedBinding>,
}

impl ResolvedOperation {
    /// Resolve every shape of the operation. Fails fast on the first schema
    /// problem; nothing is served from a schema that does not resolve.
    pub fn resolve(schema: OperationSchema) -> Result<Self, GenerationError> {
        let defaults = schema.protocol.defaults();
        let pattern: UriPattern = schema.uri.parse()?;

        let input = resolve_shape(&schema.input, &defaults, ShapeRole::Input)?;
        check_labels(&pattern, &schema.uri, &input)?;

        let output = resolve_shape(&schema.output, &defaults, ShapeRole::Output)?;

        let mut seen = HashSet::new();
        let mut errors = Vec::with_capacity(schema.errors.len());
        for variant in &schema.errors {
            if !seen.insert(variant.shape.id.clone()) {
                return Err(GenerationError::DuplicateErrorVariant {
                    shape: variant.shape.id.to_string(),
                });
            }
            if let Some(status) = variant.http_status.filter(|s| !(100..=599).contains(s)) {
                return Err(GenerationError::InvalidErrorStatus {
                    shape: variant.shape.id.to_string(),
                    status,
                });
            }
            errors.push(ResolvedError {
                variant: variant.clone(),
                bindings: resolve_shape(&variant.shape, &defaults, ShapeRole::Error)?,
            });
        }

        let unsupported: Vec<UnsupportedBinding> = std::iter::once(&output)
            .chain(errors.iter().map(|e| &e.bindings))
            .flat_map(|shape| {
                shape
                    .bindings
                    .iter()
                    .filter(|b| {
                        matches!(
                            b.location,
                            Location::Header | Location::PrefixHeaders | Location::Payload
                        )
                    })
                    .map(move |b| UnsupportedBinding {
                        shape: shape.shape.id.to_string(),
                        member: b.member.clone(),
                        location: b.location,
                    })
            })
            .collect();

        for warning in &unsupported {
            tracing::warn!(operation = %schema.id, "{}", warning);
        }

        Ok(Self {
            schema,
            pattern,
            input,
            output,
            errors,
            unsupported,
        })
    }

    pub fn error(&self, shape: &ShapeId) -> Option<&ResolvedError> {
        self.errors.iter().find(|e| &e.variant.shape.id == shape)
    }

    /// `METHOD /pattern`, for logs and rejections.
    pub fn route(&self) -> String {
        format!("{} {}", self.schema.method, self.schema.uri)
    }
}

fn check_labels(pattern: &UriPattern, uri: &str, input: &ShapeBindings) -> Result<(), GenerationError> {
    for (label, greedy) in pattern.labels() {
        let binding = input
            .at(Location::Label)
            .find(|b| b.wire_name == label)
            .ok_or_else(|| GenerationError::UnboundLabel {
                pattern: uri.to_string(),
                label: label.to_string(),
            })?;
        if greedy && binding.kind != ValueKind::String {
            return Err(GenerationError::InvalidLocationTarget {
                shape: input.shape.id.to_string(),
                member: binding.member.clone(),
                location: Location::Label,
                kind: binding.kind.to_string(),
            });
        }
    }

    for binding in input.at(Location::Label) {
        if !pattern.labels().any(|(label, _)| label == binding.wire_name) {
            return Err(GenerationError::MissingLabel {
                pattern: uri.to_string(),
                member: binding.member.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Protocol;
    use crate::model::FaultKind;
    use axum::http::Method;

    fn shape(name: &str, members: Vec<Member>) -> Arc<Shape> {
        Shape::new(ShapeId::new("example", name), members)
    }

    fn operation(uri: &str, input: Arc<Shape>, output: Arc<Shape>) -> OperationSchema {
        OperationSchema {
            id: ShapeId::new("example", "Op"),
            protocol: Protocol::RestJson1,
            method: Method::POST,
            uri: uri.to_string(),
            input,
            output,
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_timestamp_format_resolution_order() {
        let input = shape(
            "Input",
            vec![
                Member::new("inHeader", ValueKind::Timestamp).header("X-When"),
                Member::new("inQuery", ValueKind::Timestamp).query("when"),
                Member::new("inBody", ValueKind::Timestamp),
                Member::new("overridden", ValueKind::Timestamp)
                    .header("X-Epoch")
                    .timestamp_format(TimestampFormat::EpochSeconds),
                Member::new("notTime", ValueKind::String),
            ],
        );
        let defaults = Protocol::RestJson1.defaults();
        let resolved = resolve_shape(&input, &defaults, ShapeRole::Input).unwrap();
        let format = |name: &str| {
            resolved
                .bindings
                .iter()
                .find(|b| b.member == name)
                .unwrap()
                .timestamp_format
        };

        assert_eq!(format("inHeader"), Some(TimestampFormat::HttpDate));
        assert_eq!(format("inQuery"), Some(TimestampFormat::DateTime));
        assert_eq!(format("inBody"), Some(TimestampFormat::EpochSeconds));
        assert_eq!(format("overridden"), Some(TimestampFormat::EpochSeconds));
        assert_eq!(format("notTime"), None);
    }

    #[test]
    fn test_duplicate_header_names_are_fatal() {
        let input = shape(
            "Input",
            vec![
                Member::new("a", ValueKind::String).header("X-Dup"),
                Member::new("b", ValueKind::String).header("x-dup"),
            ],
        );
        let err = resolve_shape(&input, &Protocol::RestJson1.defaults(), ShapeRole::Input).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::DuplicateWireName { location: Location::Header, .. }
        ));
    }

    #[test]
    fn test_duplicate_query_names_are_fatal() {
        let input = shape(
            "Input",
            vec![
                Member::new("a", ValueKind::String).query("q"),
                Member::new("b", ValueKind::Integer).query("q"),
            ],
        );
        let err = resolve_shape(&input, &Protocol::RestJson1.defaults(), ShapeRole::Input).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::DuplicateWireName { location: Location::Query, .. }
        ));
    }

    #[test]
    fn test_query_params_target_kinds() {
        let defaults = Protocol::RestJson1.defaults();
        for kind in [
            ValueKind::map_of(ValueKind::String),
            ValueKind::map_of(ValueKind::list_of(ValueKind::String)),
            ValueKind::map_of(ValueKind::set_of(ValueKind::String)),
        ] {
            let input = shape("Input", vec![Member::new("params", kind).query_params()]);
            assert!(resolve_shape(&input, &defaults, ShapeRole::Input).is_ok());
        }

        let input = shape(
            "Input",
            vec![Member::new("params", ValueKind::map_of(ValueKind::Integer)).query_params()],
        );
        assert!(matches!(
            resolve_shape(&input, &defaults, ShapeRole::Input),
            Err(GenerationError::InvalidQueryParamsTarget { .. })
        ));

        let input = shape(
            "Input",
            vec![
                Member::new("a", ValueKind::map_of(ValueKind::String)).query_params(),
                Member::new("b", ValueKind::map_of(ValueKind::String)).query_params(),
            ],
        );
        assert!(matches!(
            resolve_shape(&input, &defaults, ShapeRole::Input),
            Err(GenerationError::MultipleQueryParams { .. })
        ));
    }

    #[test]
    fn test_response_code_must_be_integer() {
        let output = shape("Output", vec![Member::new("status", ValueKind::Long).response_code()]);
        assert!(matches!(
            resolve_shape(&output, &Protocol::RestJson1.defaults(), ShapeRole::Output),
            Err(GenerationError::InvalidResponseCodeTarget { .. })
        ));

        // Ignored on inputs: the member is an ordinary document member.
        let input = shape("Input", vec![Member::new("status", ValueKind::Integer).response_code()]);
        let resolved = resolve_shape(&input, &Protocol::RestJson1.defaults(), ShapeRole::Input).unwrap();
        assert_eq!(resolved.bindings[0].location, Location::Document);
    }

    #[test]
    fn test_conflicting_traits() {
        let input = shape(
            "Input",
            vec![Member::new("a", ValueKind::String).header("X-A").query("a")],
        );
        assert!(matches!(
            resolve_shape(&input, &Protocol::RestJson1.defaults(), ShapeRole::Input),
            Err(GenerationError::ConflictingBindings { .. })
        ));
    }

    #[test]
    fn test_labels_must_match_pattern() {
        let input = shape("Input", vec![Member::new("id", ValueKind::String).label()]);
        let output = Shape::empty(ShapeId::new("example", "Output"));

        assert!(ResolvedOperation::resolve(operation("/w/{id}", input.clone(), output.clone())).is_ok());
        assert!(matches!(
            ResolvedOperation::resolve(operation("/w/{other}", input.clone(), output.clone())),
            Err(GenerationError::UnboundLabel { .. })
        ));
        assert!(matches!(
            ResolvedOperation::resolve(operation("/w", input, output.clone())),
            Err(GenerationError::MissingLabel { .. })
        ));

        let numeric = shape("Input", vec![Member::new("rest", ValueKind::Integer).label()]);
        assert!(matches!(
            ResolvedOperation::resolve(operation("/w/{rest+}", numeric, output)),
            Err(GenerationError::InvalidLocationTarget { .. })
        ));
    }

    #[test]
    fn test_output_header_bindings_are_recorded_as_unsupported() {
        let input = Shape::empty(ShapeId::new("example", "Input"));
        let output = shape(
            "Output",
            vec![
                Member::new("etag", ValueKind::String).header("ETag"),
                Member::new("id", ValueKind::String),
            ],
        );
        let error = ErrorVariant::new(
            shape("Oops", vec![Member::new("retryAfter", ValueKind::Integer).header("Retry-After")]),
            FaultKind::Server,
        );
        let mut schema = operation("/w", input, output);
        schema.errors.push(error);

        let resolved = ResolvedOperation::resolve(schema).unwrap();
        assert_eq!(resolved.unsupported.len(), 2);
        assert_eq!(resolved.unsupported[0].member, "etag");
        assert_eq!(resolved.unsupported[0].location, Location::Header);
        assert_eq!(resolved.unsupported[1].member, "retryAfter");
    }

    #[test]
    fn test_payload_excludes_document_members() {
        let input = shape(
            "Input",
            vec![
                Member::new("data", ValueKind::Blob).payload(),
                Member::new("extra", ValueKind::String),
            ],
        );
        assert!(matches!(
            resolve_shape(&input, &Protocol::RestJson1.defaults(), ShapeRole::Input),
            Err(GenerationError::PayloadWithDocument { .. })
        ));
    }

    #[test]
    fn test_error_status_must_be_a_valid_code() {
        let input = Shape::empty(ShapeId::new("example", "Input"));
        let output = Shape::empty(ShapeId::new("example", "Output"));
        let mut schema = operation("/w", input, output);
        schema.errors.push(ErrorVariant::new(shape("Odd", vec![]), FaultKind::Client).with_status(42));
        assert_eq!(
            ResolvedOperation::resolve(schema.clone()).unwrap_err(),
            GenerationError::InvalidErrorStatus {
                shape: "example#Odd".to_string(),
                status: 42,
            }
        );

        schema.errors[0].http_status = Some(429);
        let resolved = ResolvedOperation::resolve(schema).unwrap();
        assert_eq!(resolved.errors[0].variant.status(), 429);
    }
}
