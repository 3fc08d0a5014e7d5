//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check protocol ids against the supported protocols
//! - Detect duplicate and incomplete expected-failure entries
//! - Validate value ranges and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::binding::Protocol;
use crate::config::schema::EngineConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown protocol `{0}` in harness.protocols")]
    UnknownProtocol(String),

    #[error("expected failure {service_id}/{test_id} ({action}) is listed more than once")]
    DuplicateExpectedFailure {
        service_id: String,
        test_id: String,
        action: String,
    },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(protocols) = &config.harness.protocols {
        for id in protocols {
            if id.parse::<Protocol>().is_err() {
                errors.push(ValidationError::UnknownProtocol(id.clone()));
            }
        }
    }

    if config.harness.disabled_tests.iter().any(|id| id.trim().is_empty()) {
        errors.push(ValidationError::EmptyField("harness.disabled_tests entry"));
    }

    let mut seen = HashSet::new();
    for entry in &config.harness.expected_failures {
        if entry.service_id.trim().is_empty() {
            errors.push(ValidationError::EmptyField("expected_failures.service_id"));
        }
        if entry.test_id.trim().is_empty() {
            errors.push(ValidationError::EmptyField("expected_failures.test_id"));
        }
        if !seen.insert(entry) {
            errors.push(ValidationError::DuplicateExpectedFailure {
                service_id: entry.service_id.clone(),
                test_id: entry.test_id.clone(),
                action: entry.action.to_string(),
            });
        }
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
