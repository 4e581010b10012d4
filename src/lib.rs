// Golden Hour - Core Library
// Emergency symptom intake: normalize → register → classify → guide.
// Exposes all modules for use in CLI, terminal UI, API server, and tests

pub mod normalizer;
pub mod registry;
pub mod severity;
pub mod intake;
pub mod transcription;
pub mod maps;
pub mod guidance;
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use normalizer::{normalize, normalize_label, title_case, SEPARATORS};
pub use registry::{SymptomRegistry, DEFAULT_CHECKLIST};
pub use severity::{
    classify, SeverityClassifier, SeverityTier, Vocabulary,
    SEVERE_SYMPTOMS, LEGACY_CRITICAL_SYMPTOMS,
};
pub use intake::{
    assess_text, overall_severity, overall_severity_with,
    Assessment, IntakeSession, IntakeWarning, Report,
};
pub use transcription::{
    create_transcriber, AudioClip, DisabledTranscriber, HttpTranscriber,
    Transcriber, TranscriptionError, TranscriptionResult,
};
pub use maps::{build_maps_link, build_maps_link_with_base, query_for};
pub use guidance::{Guidance, GuidanceBuilder};
pub use config::{AppConfig, ServerConfig, TranscriptionConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber used by every binary.
/// `RUST_LOG` wins; otherwise `golden_hour=info`.
pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("golden_hour=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
