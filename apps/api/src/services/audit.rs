use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgExecutor;

use crate::models::audit::AuditEventRow;
use crate::services::{AuditEvent, AuditService, Backend, CollaboratorError};

/// Maximum number of events returned by the audit trail.
pub const AUDIT_LIMIT: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Ingested,
    Generated,
    Saved,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Ingested => "INGESTED",
            AuditAction::Generated => "GENERATED",
            AuditAction::Saved => "SAVED",
        }
    }
}

/// Appends one event. Pass a transaction to make it part of a larger write.
pub async fn record_event<'e>(
    executor: impl PgExecutor<'e>,
    action: AuditAction,
    meta: Value,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO audit_events (action, meta) VALUES ($1, $2)")
        .bind(action.as_str())
        .bind(meta)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl AuditService for Backend {
    async fn audit(&self) -> Result<Vec<AuditEvent>, CollaboratorError> {
        let rows = sqlx::query_as::<_, AuditEventRow>(
            "SELECT id, action, meta, at FROM audit_events ORDER BY id DESC LIMIT $1",
        )
        .bind(AUDIT_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AuditEvent::from).collect())
    }
}
