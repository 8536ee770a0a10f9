use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IngestRow {
    pub id: Uuid,
    /// S3 key of the uploaded recording, if one was sent.
    pub audio_key: Option<String>,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
}
