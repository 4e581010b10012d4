// ⚙️ Configuration - JSON file + environment overrides
// Every field has a default, so an empty `{}` is a valid config.

use crate::guidance::GuidanceBuilder;
use crate::maps::DEFAULT_MAPS_BASE_URL;
use crate::normalizer::normalize_label;
use crate::registry::DEFAULT_CHECKLIST;
use crate::severity::{SeverityClassifier, Vocabulary};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable holding the config file path
pub const CONFIG_PATH_ENV: &str = "GOLDEN_HOUR_CONFIG";

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Speech service URL. None = voice input disabled.
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    /// BCP-47 language tag sent to the service
    pub language: String,

    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        TranscriptionConfig {
            endpoint: None,
            api_key: None,
            language: "en-US".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Sessions with no activity for this long are dropped
    pub session_idle_secs: u64,

    /// Upper bound on live sessions; the least recently active goes first
    pub max_sessions: usize,

    /// Largest accepted voice upload. 10 MiB ≈ 5 min of 16 kHz mono 16-bit WAV.
    pub max_voice_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
            session_idle_secs: 30 * 60,
            max_sessions: 10_000,
            max_voice_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Severe/Urgent or legacy Critical/High
    pub vocabulary: Vocabulary,

    /// Overrides the vocabulary's built-in top-tier list
    pub severe_symptoms: Option<Vec<String>>,

    /// Symptoms offered for selection
    pub checklist: Vec<String>,

    pub emergency_number: String,

    pub maps_base_url: String,

    pub transcription: TranscriptionConfig,

    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            vocabulary: Vocabulary::Standard,
            severe_symptoms: None,
            checklist: DEFAULT_CHECKLIST.iter().map(|s| s.to_string()).collect(),
            emergency_number: "108".to_string(),
            maps_base_url: DEFAULT_MAPS_BASE_URL.to_string(),
            transcription: TranscriptionConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: AppConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// File from `GOLDEN_HOUR_CONFIG` (if set), then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `GOLDEN_HOUR_*` overrides from a key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GOLDEN_HOUR_VOCABULARY") {
            self.vocabulary = value
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid GOLDEN_HOUR_VOCABULARY")?;
        }
        if let Some(value) = lookup("GOLDEN_HOUR_EMERGENCY_NUMBER") {
            self.emergency_number = value;
        }
        if let Some(value) = lookup("GOLDEN_HOUR_SPEECH_ENDPOINT") {
            self.transcription.endpoint = Some(value);
        }
        if let Some(value) = lookup("GOLDEN_HOUR_SPEECH_API_KEY") {
            self.transcription.api_key = Some(value);
        }
        if let Some(value) = lookup("GOLDEN_HOUR_BIND_ADDR") {
            self.server.bind_addr = value;
        }
        Ok(())
    }

    pub fn classifier(&self) -> SeverityClassifier {
        match &self.severe_symptoms {
            Some(symptoms) => SeverityClassifier::with_symptoms(
                self.vocabulary,
                symptoms.iter().filter_map(|s| normalize_label(s)),
            ),
            None => SeverityClassifier::new(self.vocabulary),
        }
    }

    pub fn guidance(&self) -> GuidanceBuilder {
        GuidanceBuilder::new(
            self.vocabulary,
            self.emergency_number.clone(),
            self.maps_base_url.clone(),
        )
    }

    /// Checklist labels, normalized and deduplicated
    pub fn checklist_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for label in self.checklist.iter().filter_map(|s| normalize_label(s)) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

// ============================================================================
// TESTS
// ============================================================================
