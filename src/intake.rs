// 🧾 Intake Aggregator - Checklist + typed text + voice → one report
//
// One IntakeSession per user. It owns the symptom registry and the raw
// inputs that fed it; every handler gets the session by reference.
// The overall tier is the worst tier among reported symptoms.

use crate::guidance::{Guidance, GuidanceBuilder};
use crate::normalizer::{normalize, normalize_label};
use crate::registry::SymptomRegistry;
use crate::severity::{SeverityClassifier, SeverityTier};
use crate::transcription::{AudioClip, Transcriber, TranscriptionError, TranscriptionResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// REPORT
// ============================================================================

/// Snapshot of a non-empty registry.
///
/// Can only be built from a registry with at least one symptom, so
/// `overall_severity` is defined for every Report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    symptoms: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(registry: &SymptomRegistry) -> Option<Self> {
        if registry.is_empty() {
            return None;
        }

        Some(Report {
            symptoms: registry.all().to_vec(),
            generated_at: Utc::now(),
        })
    }

    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }
}

/// Overall tier under the standard vocabulary
pub fn overall_severity(report: &Report) -> SeverityTier {
    overall_severity_with(&SeverityClassifier::default(), report)
}

/// Severe if any symptom is Severe, else Urgent. Stops at the first Severe.
pub fn overall_severity_with(classifier: &SeverityClassifier, report: &Report) -> SeverityTier {
    if report
        .symptoms
        .iter()
        .any(|symptom| classifier.classify(symptom).is_severe())
    {
        SeverityTier::Severe
    } else {
        SeverityTier::Urgent
    }
}

// ============================================================================
// ASSESSMENT (presentation payload)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub symptoms: Vec<String>,

    /// Symptoms that put the report in the top tier
    pub severe_symptoms: Vec<String>,

    pub severity: SeverityTier,

    /// Tier name under the configured vocabulary ("SEVERE", "HIGH", ...)
    pub severity_label: String,

    pub guidance: Guidance,

    /// Present once panic mode has been triggered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panic_instructions: Option<Vec<String>>,

    pub generated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn from_report(
        report: &Report,
        classifier: &SeverityClassifier,
        guidance: &GuidanceBuilder,
        panic: bool,
    ) -> Self {
        let severity = overall_severity_with(classifier, report);
        let severe_symptoms = report
            .symptoms()
            .iter()
            .filter(|s| classifier.classify(s).is_severe())
            .cloned()
            .collect();

        Assessment {
            symptoms: report.symptoms().to_vec(),
            severe_symptoms,
            severity,
            severity_label: classifier.tier_name(severity).to_string(),
            guidance: guidance.build(severity),
            panic_instructions: panic.then(|| guidance.panic_instructions()),
            generated_at: report.generated_at,
        }
    }
}

/// Stateless one-shot: normalize text and assess it.
/// None when the text holds no symptom.
pub fn assess_text(
    text: &str,
    classifier: &SeverityClassifier,
    guidance: &GuidanceBuilder,
) -> Option<Assessment> {
    let registry = SymptomRegistry::with_labels(normalize(text));
    Report::new(&registry).map(|report| Assessment::from_report(&report, classifier, guidance, false))
}

// ============================================================================
// WARNINGS
// ============================================================================

/// Non-fatal, user-facing problems with an input. The registry is never
/// changed when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum IntakeWarning {
    #[error("Could not recognize any speech. Try again or type your symptoms.")]
    NoSpeechDetected,

    #[error("Speech recognition is unavailable right now. Please type your symptoms.")]
    ServiceUnavailable(String),

    #[error("Could not read the recording. Upload a WAV file.")]
    UnreadableAudio(String),

    #[error("Voice input is not available. Please type your symptoms.")]
    VoiceDisabled,

    /// Upload exceeded the byte limit carried here
    #[error("The recording is too long. Keep it under {} MB or type your symptoms.", .0 / (1024 * 1024))]
    RecordingTooLarge(usize),
}

impl From<TranscriptionError> for IntakeWarning {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::NoSpeech => IntakeWarning::NoSpeechDetected,
            TranscriptionError::ServiceUnavailable(detail) => IntakeWarning::ServiceUnavailable(detail),
            TranscriptionError::InvalidAudio(detail) => IntakeWarning::UnreadableAudio(detail),
            TranscriptionError::NotConfigured => IntakeWarning::VoiceDisabled,
        }
    }
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct IntakeSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    registry: SymptomRegistry,
    checklist_selection: Vec<String>,
    typed_text: Option<String>,
    voice_text: Option<String>,
    panic: bool,
    last_activity: DateTime<Utc>,
}

impl IntakeSession {
    pub fn new() -> Self {
        let now = Utc::now();
        let session = IntakeSession {
            id: Uuid::new_v4(),
            created_at: now,
            registry: SymptomRegistry::new(),
            checklist_selection: Vec::new(),
            typed_text: None,
            voice_text: None,
            panic: false,
            last_activity: now,
        };
        tracing::info!(session = %session.id, "intake session started");
        session
    }

    /// Replace the checklist selection and register every selected label.
    /// Deselecting does not remove a symptom already reported.
    pub fn select_checklist<I, S>(&mut self, labels: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.checklist_selection = labels
            .into_iter()
            .filter_map(|label| normalize_label(label.as_ref()))
            .collect();

        let selection = self.checklist_selection.clone();
        self.register(selection)
    }

    /// Register every symptom in typed text. Returns the new ones.
    pub fn add_text(&mut self, text: &str) -> Vec<String> {
        self.typed_text = Some(text.to_string());
        self.register(normalize(text))
    }

    /// Register symptoms from a transcription outcome. A failed
    /// transcription leaves the session untouched.
    pub fn add_transcript(
        &mut self,
        outcome: TranscriptionResult<String>,
    ) -> Result<Vec<String>, IntakeWarning> {
        match outcome {
            Ok(transcript) => {
                let added = self.register(normalize(&transcript));
                self.voice_text = Some(transcript);
                Ok(added)
            }
            Err(err) => {
                tracing::warn!(session = %self.id, error = %err, "voice input not recognized");
                Err(err.into())
            }
        }
    }

    /// Validate, transcribe and register a WAV recording in one step
    pub fn add_voice(
        &mut self,
        transcriber: &dyn Transcriber,
        wav: Vec<u8>,
    ) -> Result<Vec<String>, IntakeWarning> {
        let outcome = AudioClip::from_wav_bytes(wav).and_then(|clip| transcriber.transcribe(&clip));
        self.add_transcript(outcome)
    }

    pub fn trigger_panic(&mut self) {
        tracing::info!(session = %self.id, "panic mode activated");
        self.panic = true;
        self.touch();
    }

    /// Record user activity (every input does this itself)
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// True once nothing has happened for longer than `idle`
    pub fn is_idle(&self, now: DateTime<Utc>, idle: Duration) -> bool {
        now - self.last_activity > idle
    }

    pub fn panic_active(&self) -> bool {
        self.panic
    }

    pub fn registry(&self) -> &SymptomRegistry {
        &self.registry
    }

    pub fn checklist_selection(&self) -> &[String] {
        &self.checklist_selection
    }

    pub fn typed_text(&self) -> Option<&str> {
        self.typed_text.as_deref()
    }

    pub fn voice_text(&self) -> Option<&str> {
        self.voice_text.as_deref()
    }

    /// None until at least one symptom has been reported
    pub fn report(&self) -> Option<Report> {
        Report::new(&self.registry)
    }

    pub fn assess(
        &self,
        classifier: &SeverityClassifier,
        guidance: &GuidanceBuilder,
    ) -> Option<Assessment> {
        self.report()
            .map(|report| Assessment::from_report(&report, classifier, guidance, self.panic))
    }

    fn register(&mut self, labels: Vec<String>) -> Vec<String> {
        self.touch();
        labels
            .into_iter()
            .filter(|label| self.registry.add(label.clone()))
            .collect()
    }
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::{build_maps_link, query_for};
    use crate::severity::SEVERE_SYMPTOMS;
    use proptest::prelude::*;
    use crate::severity::Vocabulary;
    use crate::transcription::{test_wav, FixedTranscriber};

    fn report_of(labels: &[&str]) -> Report {
        Report::new(&SymptomRegistry::with_labels(labels.iter().copied())).unwrap()
    }

    #[test]
    fn test_empty_registry_has_no_report() {
        assert!(Report::new(&SymptomRegistry::new()).is_none());
        assert!(IntakeSession::new().report().is_none());
    }

    #[test]
    fn test_overall_urgent() {
        assert_eq!(overall_severity(&report_of(&["Fever", "Headache"])), SeverityTier::Urgent);
    }

    #[test]
    fn test_overall_severe_is_order_independent() {
        assert_eq!(
            overall_severity(&report_of(&["Fever", "Road Accident"])),
            SeverityTier::Severe
        );
        assert_eq!(
            overall_severity(&report_of(&["Road Accident", "Fever"])),
            SeverityTier::Severe
        );
    }

    #[test]
    fn test_end_to_end_typed_text() {
        let mut session = IntakeSession::new();
        let added = session.add_text("chest pain and dizziness");
        assert_eq!(added, vec!["Chest Pain", "Dizziness"]);

        let report = session.report().unwrap();
        let tier = overall_severity(&report);
        assert_eq!(tier, SeverityTier::Severe);
        assert_eq!(query_for(tier), "trauma hospital near me");
        assert!(build_maps_link(tier).ends_with("trauma+hospital+near+me"));
    }

    #[test]
    fn test_modalities_share_one_registry() {
        let mut session = IntakeSession::new();
        session.select_checklist(["Burn Injury"]);
        session.add_text("fever & burn injury");
        session
            .add_transcript(Ok("fever and breathing problem".to_string()))
            .unwrap();

        assert_eq!(
            session.registry().all(),
            ["Burn Injury", "Fever", "Breathing Problem"]
        );
        assert_eq!(session.typed_text(), Some("fever & burn injury"));
        assert_eq!(session.voice_text(), Some("fever and breathing problem"));
    }

    #[test]
    fn test_checklist_selection_is_replaced_not_removed() {
        let mut session = IntakeSession::new();
        session.select_checklist(["Road Accident", "Burn Injury"]);
        let added = session.select_checklist(["burn injury"]);

        assert!(added.is_empty());
        assert_eq!(session.checklist_selection(), ["Burn Injury"]);
        assert!(session.registry().contains("Road Accident"));
    }

    #[test]
    fn test_failed_transcription_leaves_registry_unchanged() {
        let mut session = IntakeSession::new();
        session.add_text("fever");
        let before = session.registry().clone();

        let warning = session
            .add_transcript(Err(TranscriptionError::NoSpeech))
            .unwrap_err();
        assert_eq!(warning, IntakeWarning::NoSpeechDetected);

        let warning = session
            .add_transcript(Err(TranscriptionError::ServiceUnavailable("timeout".into())))
            .unwrap_err();
        assert_eq!(warning, IntakeWarning::ServiceUnavailable("timeout".into()));

        assert_eq!(session.registry(), &before);
        assert_eq!(session.voice_text(), None);
    }

    #[test]
    fn test_add_voice_with_transcriber() {
        let mut session = IntakeSession::new();
        let transcriber = FixedTranscriber(Ok("heavy bleeding".to_string()));

        let added = session.add_voice(&transcriber, test_wav(1_600)).unwrap();
        assert_eq!(added, vec!["Heavy Bleeding"]);
    }

    #[test]
    fn test_add_voice_rejects_bad_audio_before_transcribing() {
        let mut session = IntakeSession::new();
        let transcriber = FixedTranscriber(Ok("chest pain".to_string()));

        let warning = session.add_voice(&transcriber, vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(warning, IntakeWarning::UnreadableAudio(_)));
        assert!(session.registry().is_empty());
    }

    #[test]
    fn test_assessment_payload() {
        let mut session = IntakeSession::new();
        session.add_text("fever, road accident");
        session.trigger_panic();

        let assessment = session
            .assess(&SeverityClassifier::default(), &GuidanceBuilder::default())
            .unwrap();

        assert_eq!(assessment.severity, SeverityTier::Severe);
        assert_eq!(assessment.severity_label, "SEVERE");
        assert_eq!(assessment.severe_symptoms, vec!["Road Accident"]);
        assert_eq!(assessment.guidance.headline, "SEVERE EMERGENCY");
        assert_eq!(
            assessment.panic_instructions.as_ref().map(|p| p.len()),
            Some(3)
        );
    }

    #[test]
    fn test_assess_text_legacy_vocabulary() {
        let classifier = SeverityClassifier::new(Vocabulary::Legacy);
        let guidance = GuidanceBuilder::new(Vocabulary::Legacy, "108", crate::maps::DEFAULT_MAPS_BASE_URL);

        let assessment = assess_text("chest pain", &classifier, &guidance).unwrap();
        assert_eq!(assessment.severity, SeverityTier::Urgent);
        assert_eq!(assessment.severity_label, "HIGH");
        assert!(assessment.panic_instructions.is_none());

        assert!(assess_text(" , ", &classifier, &guidance).is_none());
    }

    #[test]
    fn test_warning_messages() {
        assert_eq!(
            IntakeWarning::from(TranscriptionError::NotConfigured).to_string(),
            "Voice input is not available. Please type your symptoms."
        );
        assert!(IntakeWarning::NoSpeechDetected
            .to_string()
            .starts_with("Could not recognize"));
        assert_eq!(
            IntakeWarning::RecordingTooLarge(10 * 1024 * 1024).to_string(),
            "The recording is too long. Keep it under 10 MB or type your symptoms."
        );
    }

    #[test]
    fn test_idle_tracking() {
        let mut session = IntakeSession::new();
        let started = session.last_activity();
        let idle = Duration::minutes(30);

        assert!(!session.is_idle(started + Duration::minutes(29), idle));
        assert!(session.is_idle(started + Duration::minutes(31), idle));

        session.add_text("fever");
        assert!(session.last_activity() >= started);
        assert!(!session.is_idle(session.last_activity() + Duration::minutes(1), idle));
    }

    fn symptom_label() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(vec![
                "Road Accident",
                "Chest Pain",
                "Burn Injury",
                "Fever",
                "Cough",
            ])
            .prop_map(String::from),
            "[A-Za-z ]{1,12}",
        ]
    }

    proptest! {
        #[test]
        fn overall_severity_ignores_order(
            labels in prop::collection::vec(symptom_label(), 1..8),
            shift in 0usize..8,
        ) {
            let expected = if labels.iter().any(|l| SEVERE_SYMPTOMS.contains(&l.as_str())) {
                SeverityTier::Severe
            } else {
                SeverityTier::Urgent
            };

            let mut reversed = labels.clone();
            reversed.reverse();
            let mut rotated = labels.clone();
            rotated.rotate_left(shift % labels.len());

            for order in [&labels, &reversed, &rotated] {
                let report = Report::new(&SymptomRegistry::with_labels(order.iter().cloned())).unwrap();
                prop_assert_eq!(overall_severity(&report), expected);
            }
        }
    }
}
