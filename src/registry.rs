// 📋 Symptom Registry - Ordered, deduplicated symptom labels
// Identity = exact string match after normalization. Append-only.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Symptoms offered on the checklist when no configuration overrides them
pub const DEFAULT_CHECKLIST: [&str; 6] = [
    "Road Accident",
    "Heavy Bleeding",
    "Burn Injury",
    "Chest Pain",
    "Breathing Problem",
    "Unconscious Person",
];

// ============================================================================
// SYMPTOM REGISTRY
// ============================================================================

/// SymptomRegistry - every symptom reported so far in one session
///
/// - Insertion order of the first successful `add` is preserved
/// - Adding a label that is already present is a no-op
/// - There is no removal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SymptomRegistry {
    labels: Vec<String>,
    seen: HashSet<String>,
}

impl SymptomRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the given labels (duplicates dropped)
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        registry.extend(labels);
        registry
    }

    /// Add a label. Returns true if it was not already present.
    pub fn add(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.seen.contains(&label) {
            return false;
        }

        tracing::debug!(symptom = %label, "symptom registered");
        self.seen.insert(label.clone());
        self.labels.push(label);
        true
    }

    /// Add many labels. Returns how many were new.
    pub fn extend<I, S>(&mut self, labels: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for label in labels {
            if self.add(label) {
                added += 1;
            }
        }
        added
    }

    /// Check membership (exact match)
    pub fn contains(&self, label: &str) -> bool {
        self.seen.contains(label)
    }

    /// All labels in insertion order
    pub fn all(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl From<Vec<String>> for SymptomRegistry {
    fn from(labels: Vec<String>) -> Self {
        Self::with_labels(labels)
    }
}

impl From<SymptomRegistry> for Vec<String> {
    fn from(registry: SymptomRegistry) -> Self {
        registry.labels
    }
}

// ============================================================================
// TESTS
// ============================================================================
