//! Review driver: hosts review sessions in memory and runs their transitions
//! against the collaborator services.
//!
//! Flow for ingest / generate / save:
//!   lock → begin_* → unlock → await collaborator → lock → complete_* → unlock
//!
//! The lock is a `std::sync::Mutex` and is never held across an `.await`.
//! While a collaborator call is pending the session's busy flag is raised, so
//! a second call of the same kind is rejected instead of queued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::review::comparison::Comparison;
use crate::review::errors::ReviewError;
use crate::review::session::{CompareTarget, Completion, IngestRequest, ReviewSession};
use crate::services::{AuditService, GenerationService, IngestionService, PersistenceService};

/// The four collaborators a review session depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub ingestion: Arc<dyn IngestionService>,
    pub generation: Arc<dyn GenerationService>,
    pub persistence: Arc<dyn PersistenceService>,
    pub audit: Arc<dyn AuditService>,
}

pub struct ReviewDriver {
    sessions: Mutex<HashMap<Uuid, ReviewSession>>,
    collaborators: Collaborators,
    /// Subject id used when a save request does not name one.
    default_subject: String,
}

impl ReviewDriver {
    pub fn new(collaborators: Collaborators, default_subject: impl Into<String>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            collaborators,
            default_subject: default_subject.into(),
        }
    }

    pub fn create(&self) -> ReviewSession {
        let session = ReviewSession::new(Uuid::new_v4());
        self.lock().insert(session.id(), session.clone());
        info!("Created review session {}", session.id());
        session
    }

    pub fn get(&self, id: Uuid) -> Result<ReviewSession, AppError> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| session_not_found(id))
    }

    /// Drops a session. An answer still in flight for it is discarded.
    pub fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.lock()
            .remove(&id)
            .ok_or_else(|| session_not_found(id))?;
        info!("Removed review session {id}");
        Ok(())
    }

    pub async fn ingest(
        &self,
        id: Uuid,
        request: IngestRequest,
    ) -> Result<ReviewSession, AppError> {
        let (ticket, request) = self.begin(id, |s| {
            let (next, ticket, request) = s.begin_ingest(request)?;
            Ok((next, (ticket, request)))
        })?;

        let result = self
            .collaborators
            .ingestion
            .ingest(request.audio, request.transcript)
            .await;

        self.complete(id, "ingest", |s| s.complete_ingest(ticket, result))
    }

    pub async fn generate(&self, id: Uuid) -> Result<ReviewSession, AppError> {
        let ticket = self.begin(id, |s| s.begin_generate())?;

        let result = self
            .collaborators
            .generation
            .generate(ticket.ingest_id())
            .await;

        self.complete(id, "generate", |s| s.complete_generate(ticket, result))
    }

    pub fn edit_field(
        &self,
        id: Uuid,
        key: &str,
        text: String,
    ) -> Result<ReviewSession, AppError> {
        let session = self.begin(id, |s| {
            let next = s.edit_field_by_key(key, text)?;
            Ok((next.clone(), next))
        })?;
        debug!("Session {id}: edited field '{key}'");
        Ok(session)
    }

    /// Persists the working note, then refreshes the session's audit log.
    pub async fn save(
        &self,
        id: Uuid,
        subject_id: Option<String>,
    ) -> Result<ReviewSession, AppError> {
        let (ticket, note) = self.begin(id, |s| {
            let (next, ticket, note) = s.begin_save()?;
            Ok((next, (ticket, note)))
        })?;
        let subject_id = subject_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_subject.clone());

        let result = match self.collaborators.persistence.save(&subject_id, &note).await {
            Ok(()) => self.collaborators.audit.audit().await,
            Err(e) => Err(e),
        };

        self.complete(id, "save", |s| s.complete_save(ticket, result))
    }

    pub fn set_compare_target(
        &self,
        id: Uuid,
        target: CompareTarget,
    ) -> Result<ReviewSession, AppError> {
        self.begin(id, |s| {
            let next = s.set_compare_target(target);
            Ok((next.clone(), next))
        })
    }

    pub fn comparison(&self, id: Uuid) -> Result<Comparison, AppError> {
        Ok(self.get(id)?.comparison())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, ReviewSession>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs a synchronous transition and stores the resulting session.
    fn begin<T>(
        &self,
        id: Uuid,
        transition: impl FnOnce(&ReviewSession) -> Result<(ReviewSession, T), ReviewError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.lock();
        let session = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
        let (next, out) = transition(session)?;
        sessions.insert(id, next);
        Ok(out)
    }

    /// Feeds a collaborator answer into the session, whatever its outcome.
    fn complete(
        &self,
        id: Uuid,
        operation: &str,
        completion: impl FnOnce(&ReviewSession) -> Completion,
    ) -> Result<ReviewSession, AppError> {
        let mut sessions = self.lock();
        let session = sessions.get(&id).ok_or_else(|| session_not_found(id))?;

        match completion(session) {
            Completion::Applied(next) => {
                info!("Session {id}: {operation} committed ({:?})", next.phase());
                sessions.insert(id, next.clone());
                Ok(next)
            }
            Completion::Failed(next, e) => {
                warn!("Session {id}: {operation} failed: {e}");
                sessions.insert(id, next);
                Err(ReviewError::Collaborator(e).into())
            }
            Completion::Stale(next) => {
                debug!("Session {id}: discarded stale {operation} response");
                sessions.insert(id, next.clone());
                Ok(next)
            }
        }
    }
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Review session {id} not found"))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use super::*;
    use crate::review::document::{Field, SoapNote};
    use crate::review::session::Phase;
    use crate::services::{AudioUpload, AuditEvent, CollaboratorError, IngestReceipt};

    /// In-memory stand-in for every collaborator.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub note: StdMutex<Option<SoapNote>>,
        pub saved: StdMutex<Vec<(String, SoapNote)>>,
        pub fail_save: StdMutex<bool>,
        /// When set, `generate` waits on this before answering.
        pub generate_gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl IngestionService for FakeBackend {
        async fn ingest(
            &self,
            audio: Option<AudioUpload>,
            transcript: Option<String>,
        ) -> Result<IngestReceipt, CollaboratorError> {
            let transcript =
                transcript.or_else(|| audio.map(|a| format!("transcribed {}", a.filename)));
            Ok(IngestReceipt {
                ingest_id: Uuid::new_v4(),
                transcript,
            })
        }
    }

    #[async_trait]
    impl GenerationService for FakeBackend {
        async fn generate(&self, _ingest_id: Uuid) -> Result<SoapNote, CollaboratorError> {
            if let Some(gate) = &self.generate_gate {
                gate.notified().await;
            }
            self.note
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CollaboratorError::Generation("no note configured".to_string()))
        }
    }

    #[async_trait]
    impl PersistenceService for FakeBackend {
        async fn save(&self, subject_id: &str, note: &SoapNote) -> Result<(), CollaboratorError> {
            if *self.fail_save.lock().unwrap() {
                return Err(CollaboratorError::Storage("disk full".to_string()));
            }
            self.saved
                .lock()
                .unwrap()
                .push((subject_id.to_string(), note.clone()));
            Ok(())
        }
    }

    #[async_trait]
    impl AuditService for FakeBackend {
        async fn audit(&self) -> Result<Vec<AuditEvent>, CollaboratorError> {
            let saved = self.saved.lock().unwrap().len();
            Ok((0..saved)
                .map(|_| AuditEvent {
                    action: "SAVED".to_string(),
                    at: Utc::now(),
                    meta: serde_json::json!({}),
                })
                .collect())
        }
    }

    pub(crate) fn driver_with(backend: Arc<FakeBackend>) -> ReviewDriver {
        ReviewDriver::new(
            Collaborators {
                ingestion: backend.clone(),
                generation: backend.clone(),
                persistence: backend.clone(),
                audit: backend,
            },
            "patient-001",
        )
    }

    pub(crate) fn backend_with_note(note: SoapNote) -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            note: StdMutex::new(Some(note)),
            ..Default::default()
        })
    }

    fn transcript(text: &str) -> IngestRequest {
        IngestRequest {
            audio: None,
            transcript: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_full_review_cycle() {
        let backend = backend_with_note(SoapNote::new("Cat lethargic", "", "", ""));
        let driver = driver_with(backend.clone());
        let id = driver.create().id();

        driver.ingest(id, transcript("cat is lethargic")).await.unwrap();
        let session = driver.generate(id).await.unwrap();
        assert_eq!(session.phase(), Phase::Generated);
        assert_eq!(driver.comparison(id).unwrap(), Comparison::Identical);

        driver
            .edit_field(id, "subjective", "Cat very lethargic".to_string())
            .unwrap();
        let changed = driver.comparison(id).unwrap();
        assert_eq!(changed.changed_fields().len(), 1);
        assert_eq!(changed.changed_fields()[0].field, Field::Subjective);

        let session = driver.save(id, None).await.unwrap();
        assert_eq!(session.phase(), Phase::Saved);
        assert_eq!(session.audit_log().len(), 1);

        let saved = backend.saved.lock().unwrap();
        assert_eq!(saved[0].0, "patient-001");
        assert_eq!(saved[0].1.subjective, "Cat very lethargic");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let driver = driver_with(Arc::new(FakeBackend::default()));
        let err = driver.generate(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_generate_before_ingest_is_conflict() {
        let driver = driver_with(Arc::new(FakeBackend::default()));
        let id = driver.create().id();
        let err = driver.generate(id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_clears_busy_and_allows_retry() {
        let backend = Arc::new(FakeBackend::default());
        let driver = driver_with(backend.clone());
        let id = driver.create().id();
        driver.ingest(id, transcript("x")).await.unwrap();

        let err = driver.generate(id).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        let session = driver.get(id).unwrap();
        assert!(!session.busy().generating);
        assert_eq!(session.phase(), Phase::Ingested);

        *backend.note.lock().unwrap() = Some(SoapNote::new("s", "o", "a", "p"));
        assert!(driver.generate(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_generated_phase() {
        let backend = backend_with_note(SoapNote::new("s", "o", "a", "p"));
        *backend.fail_save.lock().unwrap() = true;
        let driver = driver_with(backend);
        let id = driver.create().id();
        driver.ingest(id, transcript("x")).await.unwrap();
        driver.generate(id).await.unwrap();

        assert!(driver.save(id, Some("patient-042".to_string())).await.is_err());
        let session = driver.get(id).unwrap();
        assert_eq!(session.phase(), Phase::Generated);
        assert!(!session.busy().saving);
    }

    #[tokio::test]
    async fn test_reentrant_generate_rejected_and_stale_result_dropped() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend {
            note: StdMutex::new(Some(SoapNote::new("old", "", "", ""))),
            generate_gate: Some(gate.clone()),
            ..Default::default()
        });
        let driver = Arc::new(driver_with(backend));
        let id = driver.create().id();
        driver.ingest(id, transcript("first")).await.unwrap();

        let pending = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.generate(id).await })
        };
        // Let the spawned generate reach its suspend point
        while !driver.get(id).unwrap().busy().generating {
            tokio::task::yield_now().await;
        }

        let err = driver.generate(id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // A new cycle starts before the first generation answers
        driver.ingest(id, transcript("second")).await.unwrap();
        gate.notify_one();
        let session = pending.await.unwrap().unwrap();

        assert!(session.current().is_none());
        assert!(!session.busy().generating);
        assert_eq!(session.source_text(), Some("second"));
    }

    #[tokio::test]
    async fn test_audio_only_ingest_uses_collaborator_transcript() {
        let driver = driver_with(Arc::new(FakeBackend::default()));
        let id = driver.create().id();
        let request = IngestRequest {
            audio: Some(AudioUpload {
                filename: "visit.m4a".to_string(),
                content_type: None,
                bytes: bytes::Bytes::from_static(b"\x00\x01"),
            }),
            transcript: None,
        };
        let session = driver.ingest(id, request).await.unwrap();
        assert_eq!(session.source_text(), Some("transcribed visit.m4a"));
    }

    #[tokio::test]
    async fn test_removed_session_drops_pending_answer() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend {
            note: StdMutex::new(Some(SoapNote::new("s", "o", "a", "p"))),
            generate_gate: Some(gate.clone()),
            ..Default::default()
        });
        let driver = Arc::new(driver_with(backend));
        let id = driver.create().id();
        driver.ingest(id, transcript("x")).await.unwrap();

        let pending = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.generate(id).await })
        };
        while !driver.get(id).unwrap().busy().generating {
            tokio::task::yield_now().await;
        }

        driver.remove(id).unwrap();
        gate.notify_one();

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(driver.get(id), Err(AppError::NotFound(_))));
        assert!(matches!(driver.remove(id), Err(AppError::NotFound(_))));
    }
}
