//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files; every
//! field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::harness::ExpectedFailureEntry;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Conformance harness settings.
    pub harness: HarnessConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which vectors run and which are expected to fail.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Protocol shape ids to run. When set, replaces the per-service
    /// protocol filter.
    pub protocols: Option<Vec<String>>,

    /// Vector ids that are not run at all.
    pub disabled_tests: Vec<String>,

    /// Vectors that must fail; an unexpected pass fails the suite.
    pub expected_failures: Vec<ExpectedFailureEntry>,
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered request body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Logging and metrics.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
