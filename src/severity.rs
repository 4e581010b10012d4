// 🚦 Severity Classifier - Symptom label → severity tier
// Exact, case-sensitive set membership. Labels go through the normalizer first.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Top-tier symptoms under the standard vocabulary
pub const SEVERE_SYMPTOMS: [&str; 4] = [
    "Road Accident",
    "Heavy Bleeding",
    "Chest Pain",
    "Breathing Problem",
];

/// Top-tier symptoms under the legacy Critical/High vocabulary
pub const LEGACY_CRITICAL_SYMPTOMS: [&str; 3] = [
    "Road Accident",
    "Heavy Bleeding",
    "Unconscious Person",
];

// ============================================================================
// SEVERITY TIER
// ============================================================================

/// Two-level severity. Ordering: Urgent < Severe, so `max` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityTier {
    /// Needs medical attention soon
    Urgent,

    /// Needs a trauma hospital now
    Severe,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Urgent => "Urgent",
            SeverityTier::Severe => "Severe",
        }
    }

    pub fn is_severe(&self) -> bool {
        *self == SeverityTier::Severe
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VOCABULARY
// ============================================================================

/// Which naming and membership set the classifier uses.
///
/// Standard: Severe / Urgent. Legacy: Critical / High with its own
/// top-tier list. Both map onto the same two-level `SeverityTier`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vocabulary {
    #[default]
    Standard,
    Legacy,
}

impl Vocabulary {
    /// Built-in top-tier membership for this vocabulary
    pub fn default_top_tier(&self) -> &'static [&'static str] {
        match self {
            Vocabulary::Standard => &SEVERE_SYMPTOMS,
            Vocabulary::Legacy => &LEGACY_CRITICAL_SYMPTOMS,
        }
    }

    /// Display name of a tier under this vocabulary
    pub fn tier_name(&self, tier: SeverityTier) -> &'static str {
        match (self, tier) {
            (Vocabulary::Standard, SeverityTier::Severe) => "SEVERE",
            (Vocabulary::Standard, SeverityTier::Urgent) => "URGENT",
            (Vocabulary::Legacy, SeverityTier::Severe) => "CRITICAL",
            (Vocabulary::Legacy, SeverityTier::Urgent) => "HIGH",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vocabulary::Standard => "standard",
            Vocabulary::Legacy => "legacy",
        }
    }
}

impl FromStr for Vocabulary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "severe" => Ok(Vocabulary::Standard),
            "legacy" | "critical" => Ok(Vocabulary::Legacy),
            other => Err(format!("Unknown vocabulary: {}", other)),
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Classify with the standard vocabulary. Total: anything outside
/// `SEVERE_SYMPTOMS` (including "") is Urgent.
pub fn classify(label: &str) -> SeverityTier {
    if SEVERE_SYMPTOMS.contains(&label) {
        SeverityTier::Severe
    } else {
        SeverityTier::Urgent
    }
}

#[derive(Debug, Clone)]
pub struct SeverityClassifier {
    vocabulary: Vocabulary,
    top_tier: HashSet<String>,
}

impl SeverityClassifier {
    /// Classifier with the vocabulary's built-in membership set
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self::with_symptoms(vocabulary, vocabulary.default_top_tier().iter().copied())
    }

    /// Classifier with an explicit top-tier membership set
    pub fn with_symptoms<I, S>(vocabulary: Vocabulary, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SeverityClassifier {
            vocabulary,
            top_tier: symptoms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, label: &str) -> SeverityTier {
        let tier = if self.top_tier.contains(label) {
            SeverityTier::Severe
        } else {
            SeverityTier::Urgent
        };

        tracing::debug!(symptom = %label, tier = %tier, "symptom classified");
        tier
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    /// Display name for a tier under the configured vocabulary
    pub fn tier_name(&self, tier: SeverityTier) -> &'static str {
        self.vocabulary.tier_name(tier)
    }

    /// Top-tier symptoms, sorted for stable display
    pub fn top_tier_symptoms(&self) -> Vec<&str> {
        let mut symptoms: Vec<&str> = self.top_tier.iter().map(String::as_str).collect();
        symptoms.sort_unstable();
        symptoms
    }
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::new(Vocabulary::Standard)
    }
}

// ============================================================================
// TESTS
// ============================================================================
