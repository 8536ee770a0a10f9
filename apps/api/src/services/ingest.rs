use std::future::Future;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::audit::{record_event, AuditAction};
use crate::services::{AudioUpload, Backend, CollaboratorError, IngestReceipt, IngestionService};

#[async_trait]
impl IngestionService for Backend {
    async fn ingest(
        &self,
        audio: Option<AudioUpload>,
        transcript: Option<String>,
    ) -> Result<IngestReceipt, CollaboratorError> {
        let transcript = transcript.filter(|t| !t.trim().is_empty());
        let Some(source) = pick_source(audio.as_ref(), transcript) else {
            return Err(CollaboratorError::InvalidRequest(
                "Provide an audio file or a transcript".into(),
            ));
        };

        let ingest_id = Uuid::new_v4();
        let audio_key = match &audio {
            Some(upload) => Some(self.audio.put_audio(ingest_id, upload).await?),
            None => None,
        };

        let transcript = match source {
            Source::Text(text) => text,
            Source::Audio(upload) => self.transcribe_or_sample(upload).await,
        };

        let has_file = audio.is_some();
        let recorded = self.record_ingest(ingest_id, audio_key.as_deref(), &transcript, has_file).await;
        discard_upload_on_error(recorded, audio_key.clone(), |key| async move {
            self.audio.delete_audio(&key).await
        })
        .await?;

        info!(
            "Ingest {ingest_id} recorded ({} chars, audio: {})",
            transcript.chars().count(),
            audio_key.is_some()
        );
        Ok(IngestReceipt {
            ingest_id,
            transcript: Some(transcript),
        })
    }
}

enum Source<'a> {
    Text(String),
    Audio(&'a AudioUpload),
}

/// A submitted transcript wins over the recording.
fn pick_source(audio: Option<&AudioUpload>, transcript: Option<String>) -> Option<Source<'_>> {
    match (transcript, audio) {
        (Some(text), _) => Some(Source::Text(text)),
        (None, Some(upload)) => Some(Source::Audio(upload)),
        (None, None) => None,
    }
}

/// Removes an uploaded recording when the ingest row could not be written,
/// so no object outlives a failed ingest. Cleanup failures are only logged.
async fn discard_upload_on_error<T, F, Fut>(
    result: Result<T, CollaboratorError>,
    audio_key: Option<String>,
    discard: F,
) -> Result<T, CollaboratorError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<(), CollaboratorError>>,
{
    match (result, audio_key) {
        (Err(e), Some(key)) => {
            warn!("Ingest write failed, removing uploaded audio {key}");
            if let Err(cleanup) = discard(key.clone()).await {
                warn!("Could not remove orphaned audio {key}: {cleanup}");
            }
            Err(e)
        }
        (result, _) => result,
    }
}

impl Backend {
    /// Writes the ingest row and its audit event in one transaction.
    async fn record_ingest(
        &self,
        ingest_id: Uuid,
        audio_key: Option<&str>,
        transcript: &str,
        has_file: bool,
    ) -> Result<(), CollaboratorError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO ingests (id, audio_key, transcript) VALUES ($1, $2, $3)")
            .bind(ingest_id)
            .bind(audio_key)
            .bind(transcript)
            .execute(&mut *tx)
            .await?;
        record_event(
            &mut *tx,
            AuditAction::Ingested,
            json!({
                "ingest_id": ingest_id,
                "has_file": has_file,
                "chars": transcript.chars().count(),
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn transcribe_or_sample(&self, upload: &AudioUpload) -> String {
        match self.transcriber.transcribe(upload).await {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(
                    "Transcriber '{}' produced no text for {}, using sample transcript",
                    self.transcriber.name(),
                    upload.filename
                );
                self.sample_transcript.clone()
            }
            Err(e) => {
                warn!("Transcription of {} failed: {e}, using sample transcript", upload.filename);
                self.sample_transcript.clone()
            }
        }
    }
}
