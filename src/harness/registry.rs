//! Registry of vectors known to fail.
//!
//! An entry turns a failure into an expected failure. A listed vector
//! that passes is reported as an unexpected pass so the entry gets
//! removed once the underlying limitation is fixed.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::harness::vector::Action;

/// `(service, vector, action)` triple identifying one known failure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpectedFailureEntry {
    pub service_id: String,
    pub test_id: String,
    pub action: Action,
}

impl ExpectedFailureEntry {
    pub fn new(service_id: impl Into<String>, test_id: impl Into<String>, action: Action) -> Self {
        Self {
            service_id: service_id.into(),
            test_id: test_id.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedFailures {
    entries: BTreeSet<ExpectedFailureEntry>,
}

impl ExpectedFailures {
    /// Ordered lookup on the full triple.
    pub fn contains(&self, service_id: &str, test_id: &str, action: Action) -> bool {
        self.entries
            .contains(&ExpectedFailureEntry::new(service_id, test_id, action))
    }

    pub fn insert(&mut self, entry: ExpectedFailureEntry) -> bool {
        self.entries.insert(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpectedFailureEntry> {
        self.entries.iter()
    }
}

impl FromIterator<ExpectedFailureEntry> for ExpectedFailures {
    fn from_iter<I: IntoIterator<Item = ExpectedFailureEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<ExpectedFailureEntry> for ExpectedFailures {
    fn extend<I: IntoIterator<Item = ExpectedFailureEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_all_three_fields() {
        let failures: ExpectedFailures =
            [ExpectedFailureEntry::new("ns#Svc", "Vector", Action::Response)]
                .into_iter()
                .collect();

        assert!(failures.contains("ns#Svc", "Vector", Action::Response));
        assert!(!failures.contains("ns#Svc", "Vector", Action::Request));
        assert!(!failures.contains("ns#Other", "Vector", Action::Response));
        assert!(!failures.contains("ns#Svc", "Other", Action::Response));
    }

    #[test]
    fn test_lookup_in_large_registry() {
        let failures: ExpectedFailures = (0..2000)
            .flat_map(|i| {
                [
                    ExpectedFailureEntry::new("ns#Svc", format!("Vector{}", i), Action::Request),
                    ExpectedFailureEntry::new("ns#Other", format!("Vector{}", i), Action::Response),
                ]
            })
            .collect();
        assert_eq!(failures.len(), 4000);
        assert!(failures.contains("ns#Svc", "Vector1999", Action::Request));
        assert!(failures.contains("ns#Other", "Vector0", Action::Response));
        assert!(!failures.contains("ns#Svc", "Vector1999", Action::Response));
        assert!(!failures.contains("ns#Svc", "Vector2000", Action::Request));
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut failures = ExpectedFailures::default();
        assert!(failures.insert(ExpectedFailureEntry::new("s", "t", Action::Request)));
        assert!(!failures.insert(ExpectedFailureEntry::new("s", "t", Action::Request)));
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_deserialize_entry() {
        let entry: ExpectedFailureEntry = toml::from_str(
            r#"
service_id = "example.rest#RestJsonBindings"
test_id = "RestJsonOutputHeaders"
action = "response"
"#,
        )
        .unwrap();
        assert_eq!(entry.action, Action::Response);
        assert_eq!(entry.test_id, "RestJsonOutputHeaders");
    }
}
