//! Review session state machine.
//!
//! Lifecycle: Empty → Ingested → Generated → Saved, with field edits looping
//! on the generated/saved states. Every transition takes `&self` and returns a
//! new session, so a rejected transition leaves the caller's value untouched.
//!
//! Ingest, generate and save wait on a collaborator. They are split into a
//! `begin_*` call, which raises the busy flag and hands out a ticket, and a
//! `complete_*` call, which applies the collaborator's answer. A ticket
//! remembers the cycle/generation counters it was issued under; an answer
//! whose ticket no longer matches is dropped as stale.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::review::comparison::{compare_optional, Comparison};
use crate::review::document::{Field, SoapNote};
use crate::review::errors::ReviewError;
use crate::review::projection::project_source;
use crate::services::{AudioUpload, AuditEvent, CollaboratorError, IngestReceipt};

// ────────────────────────────────────────────────────────────────────────────
// State types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Empty,
    Ingested,
    Generated,
    Saved,
}

/// Which reference the working note is compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareTarget {
    /// The note as first generated.
    #[default]
    Baseline,
    /// The raw transcript, projected into note shape.
    Source,
}

/// Per-operation in-flight flags. A raised flag blocks re-entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Busy {
    pub ingesting: bool,
    pub generating: bool,
    pub saving: bool,
}

impl Busy {
    pub fn any(&self) -> bool {
        self.ingesting || self.generating || self.saving
    }
}

/// The generated note and its working copy. They only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub baseline: SoapNote,
    pub current: SoapNote,
}

/// Input for a new ingest.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub audio: Option<AudioUpload>,
    pub transcript: Option<String>,
}

impl IngestRequest {
    /// Drops a whitespace-only transcript so it counts as absent.
    fn normalized(self) -> Self {
        Self {
            audio: self.audio,
            transcript: self.transcript.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestTicket {
    cycle: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateTicket {
    cycle: u64,
    ingest_id: Uuid,
}

impl GenerateTicket {
    pub fn ingest_id(&self) -> Uuid {
        self.ingest_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    cycle: u64,
    generation: u64,
}

/// Result of feeding a collaborator answer back into a session.
#[derive(Debug)]
pub enum Completion {
    /// The answer was applied.
    Applied(ReviewSession),
    /// The collaborator failed; only the busy flag changed.
    Failed(ReviewSession, CollaboratorError),
    /// The answer belongs to a superseded cycle and was dropped.
    Stale(ReviewSession),
}

impl Completion {
    pub fn session(&self) -> &ReviewSession {
        match self {
            Completion::Applied(s) | Completion::Failed(s, _) | Completion::Stale(s) => s,
        }
    }

    pub fn into_session(self) -> ReviewSession {
        match self {
            Completion::Applied(s) | Completion::Failed(s, _) | Completion::Stale(s) => s,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ReviewSession {
    id: Uuid,
    phase: Phase,
    ingest_id: Option<Uuid>,
    source_text: Option<String>,
    revision: Option<Revision>,
    compare_target: CompareTarget,
    busy: Busy,
    audit_log: Vec<AuditEvent>,
    /// Bumped whenever an ingest commits.
    #[serde(skip)]
    cycle: u64,
    /// Bumped whenever a generation commits.
    #[serde(skip)]
    generation: u64,
    /// Transcript submitted with the in-flight ingest.
    #[serde(skip)]
    pending_transcript: Option<String>,
}

impl ReviewSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            phase: Phase::Empty,
            ingest_id: None,
            source_text: None,
            revision: None,
            compare_target: CompareTarget::default(),
            busy: Busy::default(),
            audit_log: Vec::new(),
            cycle: 0,
            generation: 0,
            pending_transcript: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ingest_id(&self) -> Option<Uuid> {
        self.ingest_id
    }

    pub fn source_text(&self) -> Option<&str> {
        self.source_text.as_deref()
    }

    pub fn baseline(&self) -> Option<&SoapNote> {
        self.revision.as_ref().map(|r| &r.baseline)
    }

    pub fn current(&self) -> Option<&SoapNote> {
        self.revision.as_ref().map(|r| &r.current)
    }

    pub fn compare_target(&self) -> CompareTarget {
        self.compare_target
    }

    pub fn busy(&self) -> Busy {
        self.busy
    }

    pub fn audit_log(&self) -> &[AuditEvent] {
        &self.audit_log
    }

    /// The note that `current` is compared against, per the compare target.
    /// A source projection is rebuilt on every call.
    pub fn reference(&self) -> Option<Cow<'_, SoapNote>> {
        match self.compare_target {
            CompareTarget::Baseline => self.baseline().map(Cow::Borrowed),
            CompareTarget::Source => self
                .source_text
                .as_deref()
                .map(|text| Cow::Owned(project_source(text))),
        }
    }

    pub fn comparison(&self) -> Comparison {
        let reference = self.reference();
        compare_optional(reference.as_deref(), self.current())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────

    /// Validates an ingest request and marks the ingest as in flight.
    ///
    /// Returns the normalized request to hand to the ingestion collaborator.
    pub fn begin_ingest(
        &self,
        request: IngestRequest,
    ) -> Result<(Self, IngestTicket, IngestRequest), ReviewError> {
        let request = request.normalized();
        if request.audio.is_none() && request.transcript.is_none() {
            return Err(ReviewError::InvalidInput(
                "either an audio file or a transcript is required".to_string(),
            ));
        }
        if self.busy.ingesting {
            return Err(ReviewError::Busy("ingest"));
        }

        let mut next = self.clone();
        next.busy.ingesting = true;
        next.pending_transcript = request.transcript.clone();
        let ticket = IngestTicket { cycle: self.cycle };
        Ok((next, ticket, request))
    }

    /// Starts a new review cycle from the ingestion collaborator's answer.
    pub fn complete_ingest(
        &self,
        ticket: IngestTicket,
        result: Result<IngestReceipt, CollaboratorError>,
    ) -> Completion {
        let mut next = self.clone();
        next.busy.ingesting = false;
        let submitted = next.pending_transcript.take();

        if ticket.cycle != self.cycle {
            return Completion::Stale(next);
        }

        match result {
            Ok(receipt) => {
                next.ingest_id = Some(receipt.ingest_id);
                next.source_text = submitted.or(receipt.transcript);
                next.revision = None;
                next.compare_target = CompareTarget::default();
                next.audit_log.clear();
                next.cycle += 1;
                next.phase = Phase::Ingested;
                Completion::Applied(next)
            }
            Err(e) => Completion::Failed(next, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generate
    // ─────────────────────────────────────────────────────────────────────────

    pub fn begin_generate(&self) -> Result<(Self, GenerateTicket), ReviewError> {
        let ingest_id = self.ingest_id.ok_or_else(|| {
            ReviewError::NotReady("ingest input before generating a note".to_string())
        })?;
        if self.busy.generating {
            return Err(ReviewError::Busy("generate"));
        }

        let mut next = self.clone();
        next.busy.generating = true;
        let ticket = GenerateTicket {
            cycle: self.cycle,
            ingest_id,
        };
        Ok((next, ticket))
    }

    /// Installs a freshly generated note as both baseline and working copy.
    pub fn complete_generate(
        &self,
        ticket: GenerateTicket,
        result: Result<SoapNote, CollaboratorError>,
    ) -> Completion {
        let mut next = self.clone();
        next.busy.generating = false;

        if ticket.cycle != self.cycle || Some(ticket.ingest_id) != self.ingest_id {
            return Completion::Stale(next);
        }

        match result {
            Ok(note) => {
                next.revision = Some(Revision {
                    baseline: note.clone(),
                    current: note,
                });
                next.compare_target = CompareTarget::default();
                next.generation += 1;
                next.phase = Phase::Generated;
                Completion::Applied(next)
            }
            Err(e) => Completion::Failed(next, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edit
    // ─────────────────────────────────────────────────────────────────────────

    /// Replaces one section of the working note. The baseline is never touched.
    pub fn edit_field(&self, field: Field, text: impl Into<String>) -> Result<Self, ReviewError> {
        let revision = self
            .revision
            .as_ref()
            .ok_or_else(|| ReviewError::NotReady("generate a note before editing".to_string()))?;

        let mut next = self.clone();
        next.revision = Some(Revision {
            baseline: revision.baseline.clone(),
            current: revision.current.with_field(field, text),
        });
        Ok(next)
    }

    /// Same as [`edit_field`](Self::edit_field) for a field named on the wire.
    pub fn edit_field_by_key(
        &self,
        key: &str,
        text: impl Into<String>,
    ) -> Result<Self, ReviewError> {
        let field: Field = key.parse()?;
        self.edit_field(field, text)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Save
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks a save as in flight and returns the note to persist.
    pub fn begin_save(&self) -> Result<(Self, SaveTicket, SoapNote), ReviewError> {
        let current = self
            .current()
            .cloned()
            .ok_or_else(|| ReviewError::NotReady("generate a note before saving".to_string()))?;
        if self.busy.saving {
            return Err(ReviewError::Busy("save"));
        }

        let mut next = self.clone();
        next.busy.saving = true;
        let ticket = SaveTicket {
            cycle: self.cycle,
            generation: self.generation,
        };
        Ok((next, ticket, current))
    }

    /// Records a finished save along with the audit trail fetched after it.
    pub fn complete_save(
        &self,
        ticket: SaveTicket,
        result: Result<Vec<AuditEvent>, CollaboratorError>,
    ) -> Completion {
        let mut next = self.clone();
        next.busy.saving = false;

        if ticket.cycle != self.cycle || ticket.generation != self.generation {
            return Completion::Stale(next);
        }

        match result {
            Ok(events) => {
                next.audit_log = events;
                next.phase = Phase::Saved;
                Completion::Applied(next)
            }
            Err(e) => Completion::Failed(next, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Compare target
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_compare_target(&self, target: CompareTarget) -> Self {
        let mut next = self.clone();
        next.compare_target = target;
        next
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
