// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every prompt that summarizes source material.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every statement you write must be supported by the transcript. \
    Do NOT infer diagnoses, doses or measurements that were not stated. \
    If the transcript says nothing relevant for a section, write \"Not documented.\"";
