//! Path matching and label extraction.
//!
//! # Responsibilities
//! - Match literal segments (exact, case-sensitive)
//! - Extract normal labels (one path component each)
//! - Extract the greedy label (all components up to a literal suffix)
//! - Match required query literals
//!
//! # Design Decisions
//! - Linear scan over path components, no backtracking
//! - Label values are returned raw; the request parser percent-decodes
//!   them, so `%2F` inside a label never splits it
//! - Deterministic: same pattern + path always yields the same result

use crate::uri::pattern::{QueryLiteral, Segment, UriPattern};

/// Matcher for one component position before any greedy label.
#[derive(Debug, Clone)]
enum SegmentMatcher {
    Literal(String),
    Label(String),
}

/// Greedy label plus the literal suffix that must close the path.
#[derive(Debug, Clone)]
struct GreedyMatcher {
    label: String,
    suffix: Vec<String>,
}

/// Compiled matcher for one operation's URI pattern.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    prefix: Vec<SegmentMatcher>,
    greedy: Option<GreedyMatcher>,
    query: Vec<QueryLiteral>,
}

/// Scan state while walking the path components.
enum State {
    Prefix(usize),
    Greedy,
    Done,
}

impl LabelMatcher {
    pub fn new(pattern: &UriPattern) -> Self {
        let mut prefix = Vec::new();
        let mut greedy: Option<GreedyMatcher> = None;

        for segment in pattern.segments() {
            match (segment, greedy.as_mut()) {
                (Segment::Literal(text), Some(g)) => g.suffix.push(text.clone()),
                (Segment::Literal(text), None) => prefix.push(SegmentMatcher::Literal(text.clone())),
                (Segment::Label(name), _) => prefix.push(SegmentMatcher::Label(name.clone())),
                (Segment::GreedyLabel(name), _) => {
                    greedy = Some(GreedyMatcher {
                        label: name.clone(),
                        suffix: Vec::new(),
                    })
                }
            }
        }

        Self {
            prefix,
            greedy,
            query: pattern.query_literals().to_vec(),
        }
    }

    /// Match `path` (without query string) and return the still-encoded
    /// label values in pattern order. `None` when the path does not have the
    /// pattern's shape, including an empty label.
    pub fn match_path(&self, path: &str) -> Option<Vec<(String, String)>> {
        let rest = path.strip_prefix('/')?;
        let components: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };

        let mut labels = Vec::new();
        let mut state = State::Prefix(0);

        loop {
            state = match state {
                State::Prefix(i) if i < self.prefix.len() => {
                    let component = components.get(i)?;
                    match &self.prefix[i] {
                        SegmentMatcher::Literal(text) => {
                            if text.as_str() != *component {
                                return None;
                            }
                        }
                        SegmentMatcher::Label(name) => {
                            if component.is_empty() {
                                return None;
                            }
                            labels.push((name.clone(), component.to_string()));
                        }
                    }
                    State::Prefix(i + 1)
                }
                State::Prefix(_) if self.greedy.is_some() => State::Greedy,
                State::Prefix(_) => {
                    if components.len() != self.prefix.len() {
                        return None;
                    }
                    State::Done
                }
                State::Greedy => {
                    let greedy = self.greedy.as_ref()?;
                    let tail = &components[self.prefix.len()..];
                    if tail.len() <= greedy.suffix.len() {
                        return None;
                    }
                    let (middle, suffix) = tail.split_at(tail.len() - greedy.suffix.len());
                    if !suffix.iter().zip(&greedy.suffix).all(|(a, b)| a == b) {
                        return None;
                    }
                    let raw = middle.join("/");
                    if raw.is_empty() {
                        return None;
                    }
                    labels.push((greedy.label.clone(), raw));
                    State::Done
                }
                State::Done => return Some(labels),
            };
        }
    }

    /// True if every required query literal is present in `pairs`.
    pub fn match_query(&self, pairs: &[(String, String)]) -> bool {
        self.query.iter().all(|literal| {
            pairs.iter().any(|(key, value)| {
                key == &literal.key && literal.value.as_ref().map_or(true, |v| v == value)
            })
        })
    }

    pub fn requires_query(&self) -> bool {
        !self.query.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(pattern: &str) -> LabelMatcher {
        LabelMatcher::new(&pattern.parse().unwrap())
    }

    fn labels(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_literal_and_labels() {
        let m = matcher("/widgets/{id}/parts/{part}");
        assert_eq!(
            m.match_path("/widgets/w1/parts/p%20two").unwrap(),
            labels(&[("id", "w1"), ("part", "p%20two")])
        );
        assert_eq!(m.match_path("/Widgets/w1/parts/p"), None);
        assert_eq!(m.match_path("/widgets/w1/parts"), None);
        assert_eq!(m.match_path("/widgets/w1/parts/p/extra"), None);
        assert_eq!(m.match_path("/widgets//parts/p"), None);
    }

    #[test]
    fn test_greedy_label_with_suffix() {
        let m = matcher("/a/{proxy+}/literal");
        assert_eq!(m.match_path("/a/x/y"), None);
        assert_eq!(m.match_path("/a/x/y/literal").unwrap(), labels(&[("proxy", "x/y")]));
        assert_eq!(m.match_path("/a/literal"), None);
    }

    #[test]
    fn test_greedy_label_without_suffix() {
        let m = matcher("/files/{key+}");
        assert_eq!(
            m.match_path("/files/dir/sub/name.txt").unwrap(),
            labels(&[("key", "dir/sub/name.txt")])
        );
        assert_eq!(m.match_path("/files"), None);
    }

    #[test]
    fn test_labels_are_returned_encoded() {
        let m = matcher("/items/{id}");
        assert_eq!(m.match_path("/items/a%2Fb").unwrap(), labels(&[("id", "a%2Fb")]));
        assert_eq!(m.match_path("/items/bad%zz").unwrap(), labels(&[("id", "bad%zz")]));

        let m = matcher("/files/{key+}");
        assert_eq!(m.match_path("/files/a%2Fb/c").unwrap(), labels(&[("key", "a%2Fb/c")]));
    }

    #[test]
    fn test_root_pattern() {
        let m = matcher("/");
        assert!(m.match_path("/").unwrap().is_empty());
        assert_eq!(m.match_path("/x"), None);
    }

    #[test]
    fn test_query_literals() {
        let m = matcher("/things?type=gadget&verbose");
        assert!(m.requires_query());
        let pairs = labels(&[("verbose", ""), ("type", "gadget"), ("other", "1")]);
        assert!(m.match_query(&pairs));
        assert!(!m.match_query(&labels(&[("type", "widget"), ("verbose", "")])));
        assert!(!m.match_query(&labels(&[("type", "gadget")])));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let m = matcher("/a/{b}/{c+}/z");
        let first = m.match_path("/a/1/2/3/z").unwrap();
        for _ in 0..10 {
            assert_eq!(m.match_path("/a/1/2/3/z").unwrap(), first);
        }
    }
}
