use async_trait::async_trait;
use tracing::warn;

use crate::services::{AudioUpload, CollaboratorError};

/// Used when neither a transcript nor a transcription is available.
pub const DEFAULT_SAMPLE_TRANSCRIPT: &str = "\
Patient dog, cough for 2 days, eating well, no vomiting. \
Temp 101.5F, heart rate 100, lungs mild wheeze. \
Owner reports reduced activity. Plan: chest X-ray, start doxycycline 5mg/kg BID for 7 days, recheck in 1 week.";

/// Speech-to-text over an uploaded recording.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// `Ok(None)` means the recording produced no usable text.
    async fn transcribe(&self, audio: &AudioUpload) -> Result<Option<String>, CollaboratorError>;

    fn name(&self) -> &'static str;
}

/// No speech model is configured; every recording yields no text.
pub struct NoTranscriber;

#[async_trait]
impl Transcriber for NoTranscriber {
    async fn transcribe(&self, _audio: &AudioUpload) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Reads the sample transcript from `path`, falling back to the built-in one
/// when the path is unset, unreadable or empty.
pub fn load_sample_transcript(path: Option<&str>) -> String {
    let Some(path) = path else {
        return DEFAULT_SAMPLE_TRANSCRIPT.to_string();
    };
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!("Sample transcript at {path} is empty, using built-in sample");
            DEFAULT_SAMPLE_TRANSCRIPT.to_string()
        }
        Err(e) => {
            warn!("Could not read sample transcript at {path}: {e}");
            DEFAULT_SAMPLE_TRANSCRIPT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_no_transcriber_yields_nothing() {
        let audio = AudioUpload {
            filename: "visit.wav".into(),
            content_type: Some("audio/wav".into()),
            bytes: Bytes::from_static(b"RIFF"),
        };
        assert_eq!(NoTranscriber.transcribe(&audio).await.unwrap(), None);
    }

    #[test]
    fn test_sample_transcript_defaults_without_path() {
        assert_eq!(load_sample_transcript(None), DEFAULT_SAMPLE_TRANSCRIPT);
    }

    #[test]
    fn test_sample_transcript_falls_back_on_missing_file() {
        let text = load_sample_transcript(Some("/nonexistent/sample_transcript.txt"));
        assert_eq!(text, DEFAULT_SAMPLE_TRANSCRIPT);
    }

    #[test]
    fn test_sample_transcript_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "  Cat sneezing since Monday.\n").unwrap();
        let text = load_sample_transcript(file.path().to_str());
        assert_eq!(text, "Cat sneezing since Monday.");
    }

    #[test]
    fn test_blank_sample_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();
        assert_eq!(
            load_sample_transcript(file.path().to_str()),
            DEFAULT_SAMPLE_TRANSCRIPT
        );
    }
}
