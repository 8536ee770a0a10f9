use std::sync::Arc;

use sqlx::PgPool;

use crate::services::generation::NoteGenerator;
use crate::services::storage::AudioStore;
use crate::services::transcription::Transcriber;

/// PostgreSQL / S3 / LLM implementation of every collaborator port.
#[derive(Clone)]
pub struct Backend {
    pub(crate) pool: PgPool,
    pub(crate) audio: AudioStore,
    pub(crate) generator: NoteGenerator,
    pub(crate) transcriber: Arc<dyn Transcriber>,
    pub(crate) sample_transcript: String,
}

impl Backend {
    pub fn new(
        pool: PgPool,
        audio: AudioStore,
        generator: NoteGenerator,
        transcriber: Arc<dyn Transcriber>,
        sample_transcript: String,
    ) -> Self {
        Self {
            pool,
            audio,
            generator,
            transcriber,
            sample_transcript,
        }
    }

    pub fn generator(&self) -> &NoteGenerator {
        &self.generator
    }
}
