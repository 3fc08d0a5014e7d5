//! URI pattern tokenizer.
//!
//! `/widgets/{id}/{path+}/raw?type=gadget` becomes
//! `[Literal("widgets"), Label("id"), GreedyLabel("path"), Literal("raw")]`
//! plus the query literal `type=gadget`.

use std::fmt;
use std::str::FromStr;

use crate::error::GenerationError;

/// One `/`-separated component of a URI pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Label(String),
    GreedyLabel(String),
}

/// A literal query component required by the pattern (`?k` or `?k=v`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLiteral {
    pub key: String,
    pub value: Option<String>,
}

/// Parsed URI pattern.
///
/// Invariants: at most one greedy label; only literals follow it; label
/// names are unique and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriPattern {
    raw: String,
    segments: Vec<Segment>,
    query: Vec<QueryLiteral>,
}

impl UriPattern {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn query_literals(&self) -> &[QueryLiteral] {
        &self.query
    }

    /// Label names in pattern order, with a flag marking the greedy one.
    pub fn labels(&self) -> impl Iterator<Item = (&str, bool)> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Label(name) => Some((name.as_str(), false)),
            Segment::GreedyLabel(name) => Some((name.as_str(), true)),
            Segment::Literal(_) => None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for UriPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for UriPattern {
    type Err = GenerationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| GenerationError::MalformedUriPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };

        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| malformed("must start with `/`"))?;

        let mut segments = Vec::new();
        let mut seen_greedy = false;
        if !rest.is_empty() {
            for component in rest.split('/') {
                if component.is_empty() {
                    return Err(malformed("empty path segment"));
                }
                let segment = parse_segment(component).map_err(|reason| malformed(&reason))?;
                match &segment {
                    Segment::GreedyLabel(_) if seen_greedy => {
                        return Err(malformed("more than one greedy label"));
                    }
                    Segment::GreedyLabel(_) => seen_greedy = true,
                    Segment::Label(_) if seen_greedy => {
                        return Err(malformed("label after greedy label"));
                    }
                    Segment::Label(_) | Segment::Literal(_) => {}
                }
                segments.push(segment);
            }
        }

        let mut names: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Label(name) | Segment::GreedyLabel(name) = segment {
                if names.contains(&name.as_str()) {
                    return Err(malformed("duplicate label"));
                }
                names.push(name);
            }
        }

        let mut literals = Vec::new();
        if let Some(query) = query {
            for pair in query.split('&') {
                let (key, value) = match pair.split_once('=') {
                    Some((key, value)) => (key, Some(value.to_string())),
                    None => (pair, None),
                };
                if key.is_empty() {
                    return Err(malformed("empty query literal"));
                }
                if key.contains(['{', '}']) || value.as_deref().is_some_and(|v| v.contains(['{', '}'])) {
                    return Err(malformed("labels are not allowed in the query"));
                }
                literals.push(QueryLiteral {
                    key: key.to_string(),
                    value,
                });
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            query: literals,
        })
    }
}

fn parse_segment(component: &str) -> Result<Segment, String> {
    match component.strip_prefix('{') {
        Some(inner) => {
            let inner = inner
                .strip_suffix('}')
                .ok_or_else(|| format!("unterminated label `{}`", component))?;
            let (name, greedy) = match inner.strip_suffix('+') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(format!("invalid label name `{}`", component));
            }
            Ok(if greedy {
                Segment::GreedyLabel(name.to_string())
            } else {
                Segment::Label(name.to_string())
            })
        }
        None if component.contains(['{', '}']) => {
            Err(format!("label must span the whole segment `{}`", component))
        }
        None => Ok(Segment::Literal(component.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let pattern: UriPattern = "/a/{id}/{proxy+}/literal".parse().unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("a".into()),
                Segment::Label("id".into()),
                Segment::GreedyLabel("proxy".into()),
                Segment::Literal("literal".into()),
            ]
        );
        assert_eq!(
            pattern.labels().collect::<Vec<_>>(),
            vec![("id", false), ("proxy", true)]
        );
    }

    #[test]
    fn test_parse_root_and_query_literals() {
        let pattern: UriPattern = "/?Action=List&flag".parse().unwrap();
        assert!(pattern.segments().is_empty());
        assert_eq!(
            pattern.query_literals(),
            &[
                QueryLiteral { key: "Action".into(), value: Some("List".into()) },
                QueryLiteral { key: "flag".into(), value: None },
            ]
        );
    }

    #[test]
    fn test_reject_malformed_patterns() {
        for raw in [
            "a/b",
            "/a//b",
            "/{a+}/{b+}",
            "/{a+}/{b}",
            "/{a}/{a}",
            "/{}",
            "/x{a}",
            "/{a",
            "/a?{q}",
            "/a?=v",
        ] {
            assert!(
                matches!(raw.parse::<UriPattern>(), Err(GenerationError::MalformedUriPattern { .. })),
                "{} should be rejected",
                raw
            );
        }
    }
}
