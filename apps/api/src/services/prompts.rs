// SOAP note generation prompt templates.

pub const SOAP_SYSTEM: &str = "\
You are a veterinary scribe. You turn visit transcripts into SOAP notes. \
Keep each section short and clinical. \
You MUST respond with valid JSON only, without markdown fences or explanations.";

pub const SOAP_PROMPT_TEMPLATE: &str = r#"Write a SOAP note for the following visit transcript.

TRANSCRIPT:
{transcript}

{json_only}

{grounding_instruction}

OUTPUT SCHEMA (return exactly this structure, all four keys, string values):
{
  "subjective": "owner-reported history and complaints",
  "objective": "exam findings and vitals",
  "assessment": "clinical assessment",
  "plan": "treatment, medication and follow-up"
}"#;
