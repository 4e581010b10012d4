// 🎙️ Voice Input - WAV clip → transcript via an external speech service
// The recognizer itself is a black box. We validate audio, make one
// synchronous call, and report failures as typed errors.

use crate::config::TranscriptionConfig;
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranscriptionError {
    /// The service answered but heard nothing usable
    #[error("No speech detected")]
    NoSpeech,

    /// Network failure, timeout or non-success status
    #[error("Speech service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Upload was not a readable WAV clip
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// No speech endpoint configured
    #[error("Voice input is not configured")]
    NotConfigured,
}

pub type TranscriptionResult<T> = Result<T, TranscriptionError>;

// ============================================================================
// AUDIO CLIP
// ============================================================================

/// A validated WAV clip ready to send to a speech service
#[derive(Debug, Clone)]
pub struct AudioClip {
    bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Samples per channel
    pub frames: u32,
}

impl AudioClip {
    /// Parse the WAV header and keep the original bytes for upload
    pub fn from_wav_bytes(bytes: Vec<u8>) -> TranscriptionResult<Self> {
        let (spec, frames) = {
            let reader = hound::WavReader::new(Cursor::new(bytes.as_slice()))
                .map_err(|e| TranscriptionError::InvalidAudio(e.to_string()))?;
            (reader.spec(), reader.duration())
        };

        if spec.sample_rate == 0 {
            return Err(TranscriptionError::InvalidAudio(
                "sample rate is zero".to_string(),
            ));
        }

        Ok(AudioClip {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            frames,
            bytes,
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_silent_length(&self) -> bool {
        self.frames == 0
    }
}

// ============================================================================
// TRANSCRIBER
// ============================================================================

/// Speech-to-text collaborator. One blocking call per clip.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, clip: &AudioClip) -> TranscriptionResult<String>;
}

/// Used when no speech endpoint is configured
pub struct DisabledTranscriber;

impl Transcriber for DisabledTranscriber {
    fn transcribe(&self, _clip: &AudioClip) -> TranscriptionResult<String> {
        Err(TranscriptionError::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptReply {
    #[serde(default)]
    transcript: Option<String>,
}

/// Posts the raw WAV body to a speech endpoint and reads
/// `{"transcript": "..."}` back.
pub struct HttpTranscriber {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    language: String,
}

impl HttpTranscriber {
    pub fn new(config: &TranscriptionConfig) -> TranscriptionResult<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or(TranscriptionError::NotConfigured)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TranscriptionError::ServiceUnavailable(e.to_string()))?;

        Ok(HttpTranscriber {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, clip: &AudioClip) -> TranscriptionResult<String> {
        if clip.is_silent_length() {
            return Err(TranscriptionError::NoSpeech);
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .query(&[("language", self.language.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(clip.as_bytes().to_vec());

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| TranscriptionError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Err(TranscriptionError::NoSpeech);
        }
        if !status.is_success() {
            return Err(TranscriptionError::ServiceUnavailable(format!(
                "speech service returned {}",
                status
            )));
        }

        let reply: TranscriptReply = response
            .json()
            .map_err(|e| TranscriptionError::ServiceUnavailable(e.to_string()))?;

        transcript_from_reply(reply)
    }
}

fn transcript_from_reply(reply: TranscriptReply) -> TranscriptionResult<String> {
    match reply.transcript {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(TranscriptionError::NoSpeech),
    }
}

/// Pick the transcriber for a configuration
pub fn create_transcriber(config: &TranscriptionConfig) -> Box<dyn Transcriber> {
    match HttpTranscriber::new(config) {
        Ok(transcriber) => Box::new(transcriber),
        Err(TranscriptionError::NotConfigured) => Box::new(DisabledTranscriber),
        Err(e) => {
            tracing::warn!(error = %e, "speech client unavailable, voice input disabled");
            Box::new(DisabledTranscriber)
        }
    }
}

/// Transcriber with a canned answer
#[cfg(test)]
pub(crate) struct FixedTranscriber(pub TranscriptionResult<String>);

#[cfg(test)]
impl Transcriber for FixedTranscriber {
    fn transcribe(&self, _clip: &AudioClip) -> TranscriptionResult<String> {
        self.0.clone()
    }
}

/// Build a short mono 16 kHz WAV in memory
#[cfg(test)]
pub(crate) fn test_wav(frames: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

// ============================================================================
// TESTS
// ============================================================================
