//! Wire-protocol variants and their binding defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::binding::resolver::Location;
use crate::error::GenerationError;

/// Timestamp wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampFormat {
    /// RFC 3339, e.g. `1985-04-12T23:20:50Z`.
    DateTime,
    /// IMF-fixdate, e.g. `Tue, 29 Apr 2014 18:30:38 GMT`.
    HttpDate,
    /// Seconds since the Unix epoch, optionally fractional.
    EpochSeconds,
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFormat::DateTime => write!(f, "date-time"),
            TimestampFormat::HttpDate => write!(f, "http-date"),
            TimestampFormat::EpochSeconds => write!(f, "epoch-seconds"),
        }
    }
}

/// How a protocol encodes structured bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    Json,
    Xml,
    Form,
}

/// Timestamp format defaults of a protocol.
///
/// A location-specific default wins over `global`; an explicit member trait
/// wins over both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDefaults {
    pub header: Option<TimestampFormat>,
    pub query: Option<TimestampFormat>,
    pub label: Option<TimestampFormat>,
    pub document: Option<TimestampFormat>,
    pub global: TimestampFormat,
}

impl ProtocolDefaults {
    pub fn timestamp_format(&self, location: Location) -> TimestampFormat {
        let specific = match location {
            Location::Header | Location::PrefixHeaders => self.header,
            Location::Query | Location::QueryParams => self.query,
            Location::Label => self.label,
            Location::Payload | Location::Document => self.document,
            Location::ResponseCode => None,
        };
        specific.unwrap_or(self.global)
    }
}

/// Supported wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    RestJson1,
    RestXml,
    AwsJson1_0,
    AwsJson1_1,
    AwsQuery,
    Ec2Query,
}

impl Protocol {
    pub const ALL: [Protocol; 6] = [
        Protocol::RestJson1,
        Protocol::RestXml,
        Protocol::AwsJson1_0,
        Protocol::AwsJson1_1,
        Protocol::AwsQuery,
        Protocol::Ec2Query,
    ];

    /// Protocol trait shape id.
    pub fn id(&self) -> &'static str {
        match self {
            Protocol::RestJson1 => "aws.protocols#restJson1",
            Protocol::RestXml => "aws.protocols#restXml",
            Protocol::AwsJson1_0 => "aws.protocols#awsJson1_0",
            Protocol::AwsJson1_1 => "aws.protocols#awsJson1_1",
            Protocol::AwsQuery => "aws.protocols#awsQuery",
            Protocol::Ec2Query => "aws.protocols#ec2Query",
        }
    }

    pub fn body_style(&self) -> BodyStyle {
        match self {
            Protocol::RestJson1 | Protocol::AwsJson1_0 | Protocol::AwsJson1_1 => BodyStyle::Json,
            Protocol::RestXml => BodyStyle::Xml,
            Protocol::AwsQuery | Protocol::Ec2Query => BodyStyle::Form,
        }
    }

    /// Content type expected on requests carrying a document body.
    pub fn content_type(&self) -> &'static str {
        match self {
            Protocol::RestJson1 => "application/json",
            Protocol::RestXml => "application/xml",
            Protocol::AwsJson1_0 => "application/x-amz-json-1.0",
            Protocol::AwsJson1_1 => "application/x-amz-json-1.1",
            Protocol::AwsQuery | Protocol::Ec2Query => "application/x-www-form-urlencoded",
        }
    }

    /// JSON protocols name the error shape in a response header.
    pub fn sends_error_type_header(&self) -> bool {
        self.body_style() == BodyStyle::Json
    }

    pub fn defaults(&self) -> ProtocolDefaults {
        let document = match self.body_style() {
            BodyStyle::Json => TimestampFormat::EpochSeconds,
            BodyStyle::Xml | BodyStyle::Form => TimestampFormat::DateTime,
        };
        ProtocolDefaults {
            header: Some(TimestampFormat::HttpDate),
            query: Some(TimestampFormat::DateTime),
            label: Some(TimestampFormat::DateTime),
            document: None,
            global: document,
        }
    }
}

impl FromStr for Protocol {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| GenerationError::UnknownProtocol(s.to_string()))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
