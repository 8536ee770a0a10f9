//! Collaborator contracts consumed by the review workflow, plus the
//! PostgreSQL / S3 / LLM-backed implementations used by the server.
//!
//! The review core only ever sees the traits below. `Backend` implements all
//! of them; tests swap in in-memory fakes.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::review::document::SoapNote;

pub mod audit;
pub mod backend;
pub mod generation;
pub mod handlers;
pub mod ingest;
pub mod persistence;
pub mod prompts;
pub mod storage;
pub mod transcription;

pub use backend::Backend;

// ────────────────────────────────────────────────────────────────────────────
// Shared data
// ────────────────────────────────────────────────────────────────────────────

/// An uploaded audio recording.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Result of a successful ingest.
///
/// `transcript` is whatever text the ingestion side settled on: the submitted
/// transcript, a transcription of the audio, or the sample fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReceipt {
    pub ingest_id: Uuid,
    pub transcript: Option<String>,
}

/// One entry of the audit trail. Lists are returned newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub at: DateTime<Utc>,
    pub meta: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Generation error: {0}")]
    Generation(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Ports
// ────────────────────────────────────────────────────────────────────────────

/// Accepts raw input for a new review cycle. At least one of `audio` and
/// `transcript` must be present.
#[async_trait]
pub trait IngestionService: Send + Sync {
    async fn ingest(
        &self,
        audio: Option<AudioUpload>,
        transcript: Option<String>,
    ) -> Result<IngestReceipt, CollaboratorError>;
}

/// Produces a structured note for a previous ingest.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, ingest_id: Uuid) -> Result<SoapNote, CollaboratorError>;
}

/// Stores a reviewed note. Either the whole note is written or nothing is.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn save(&self, subject_id: &str, note: &SoapNote) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait AuditService: Send + Sync {
    async fn audit(&self) -> Result<Vec<AuditEvent>, CollaboratorError>;
}
