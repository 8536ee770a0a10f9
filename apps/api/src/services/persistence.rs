use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::review::document::SoapNote;
use crate::services::audit::{record_event, AuditAction};
use crate::services::{Backend, CollaboratorError, PersistenceService};

#[async_trait]
impl PersistenceService for Backend {
    async fn save(&self, subject_id: &str, note: &SoapNote) -> Result<(), CollaboratorError> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(CollaboratorError::InvalidRequest(
                "patient_id must not be empty".into(),
            ));
        }
        let content = serde_json::to_value(note)
            .map_err(|e| CollaboratorError::InvalidRequest(format!("Unserializable note: {e}")))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO notes (patient_id, content) VALUES ($1, $2)")
            .bind(subject_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;
        record_event(&mut *tx, AuditAction::Saved, json!({ "patient_id": subject_id })).await?;
        tx.commit().await?;

        info!("Saved note for patient {subject_id}");
        Ok(())
    }
}
