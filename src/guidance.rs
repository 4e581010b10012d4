// 🩺 Guidance - What to tell the user for a given tier
// Headline + immediate actions + where to go. Panic mode is a fixed script.

use crate::maps::build_maps_link_with_base;
use crate::severity::{SeverityTier, Vocabulary};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guidance {
    pub tier: SeverityTier,

    /// e.g. "SEVERE EMERGENCY", "HIGH PRIORITY"
    pub headline: String,

    /// Ordered instructions
    pub actions: Vec<String>,

    /// Map search link for the nearest suitable hospital
    pub maps_link: String,
}

/// Builds guidance text for one deployment (emergency number, vocabulary, maps)
#[derive(Debug, Clone)]
pub struct GuidanceBuilder {
    vocabulary: Vocabulary,
    emergency_number: String,
    maps_base_url: String,
}

impl GuidanceBuilder {
    pub fn new(
        vocabulary: Vocabulary,
        emergency_number: impl Into<String>,
        maps_base_url: impl Into<String>,
    ) -> Self {
        GuidanceBuilder {
            vocabulary,
            emergency_number: emergency_number.into(),
            maps_base_url: maps_base_url.into(),
        }
    }

    pub fn headline(&self, tier: SeverityTier) -> String {
        match (self.vocabulary, tier) {
            (Vocabulary::Standard, SeverityTier::Severe) => "SEVERE EMERGENCY".to_string(),
            (Vocabulary::Standard, SeverityTier::Urgent) => "URGENT".to_string(),
            (Vocabulary::Legacy, SeverityTier::Severe) => "CRITICAL EMERGENCY".to_string(),
            (Vocabulary::Legacy, SeverityTier::Urgent) => "HIGH PRIORITY".to_string(),
        }
    }

    pub fn build(&self, tier: SeverityTier) -> Guidance {
        let actions = match tier {
            SeverityTier::Severe => vec![
                format!("Call emergency services ({})", self.emergency_number),
                "Apply pressure if bleeding".to_string(),
                "Move to trauma hospital immediately".to_string(),
            ],
            SeverityTier::Urgent => {
                vec!["Seek medical attention as soon as possible.".to_string()]
            }
        };

        Guidance {
            tier,
            headline: self.headline(tier),
            actions,
            maps_link: build_maps_link_with_base(&self.maps_base_url, tier),
        }
    }

    /// Panic mode script, independent of reported symptoms
    pub fn panic_instructions(&self) -> Vec<String> {
        vec![
            format!("CALL AMBULANCE NOW ({})", self.emergency_number),
            "APPLY PRESSURE TO STOP BLEEDING".to_string(),
            "DO NOT DELAY HOSPITAL VISIT".to_string(),
        ]
    }
}

impl Default for GuidanceBuilder {
    fn default() -> Self {
        Self::new(
            Vocabulary::Standard,
            "108",
            crate::maps::DEFAULT_MAPS_BASE_URL,
        )
    }
}
