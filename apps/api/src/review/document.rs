//! SOAP note document model.
//!
//! A note is a fixed-shape record: exactly four text sections, always in the
//! canonical order Subjective, Objective, Assessment, Plan. Field access goes
//! through [`Field`] so an unknown section name can never reach the record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::review::errors::ReviewError;

/// One of the four SOAP sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

impl Field {
    /// Canonical display order. Diff output always follows this order.
    pub const ALL: [Field; 4] = [
        Field::Subjective,
        Field::Objective,
        Field::Assessment,
        Field::Plan,
    ];

    /// The section that receives the raw transcript in a source projection.
    pub const PRIMARY: Field = Field::Subjective;

    /// Wire key, as used in JSON bodies and URL paths.
    pub fn key(self) -> &'static str {
        match self {
            Field::Subjective => "subjective",
            Field::Objective => "objective",
            Field::Assessment => "assessment",
            Field::Plan => "plan",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Subjective => "Subjective",
            Field::Objective => "Objective",
            Field::Assessment => "Assessment",
            Field::Plan => "Plan",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| ReviewError::InvalidInput(format!("unknown field '{s}'")))
    }
}

/// A structured clinical note.
///
/// Values are never mutated in place once handed out: [`SoapNote::with_field`]
/// returns a new note, so holders of an earlier value keep seeing it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

impl SoapNote {
    pub fn new(
        subjective: impl Into<String>,
        objective: impl Into<String>,
        assessment: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            subjective: subjective.into(),
            objective: objective.into(),
            assessment: assessment.into(),
            plan: plan.into(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Subjective => &self.subjective,
            Field::Objective => &self.objective,
            Field::Assessment => &self.assessment,
            Field::Plan => &self.plan,
        }
    }

    /// Returns a copy of this note with one section replaced.
    pub fn with_field(&self, field: Field, text: impl Into<String>) -> Self {
        let mut next = self.clone();
        let slot = match field {
            Field::Subjective => &mut next.subjective,
            Field::Objective => &mut next.objective,
            Field::Assessment => &mut next.assessment,
            Field::Plan => &mut next.plan,
        };
        *slot = text.into();
        next
    }

    /// True when every section carries non-whitespace text.
    pub fn is_complete(&self) -> bool {
        Field::ALL
            .iter()
            .all(|field| !self.get(*field).trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_is_soap() {
        let keys: Vec<_> = Field::ALL.iter().map(|f| f.key()).collect();
        assert_eq!(keys, ["subjective", "objective", "assessment", "plan"]);
    }

    #[test]
    fn test_field_from_str_accepts_known_keys() {
        assert_eq!("plan".parse::<Field>().unwrap(), Field::Plan);
        assert_eq!("subjective".parse::<Field>().unwrap(), Field::Subjective);
    }

    #[test]
    fn test_field_from_str_rejects_unknown_key() {
        let err = "history".parse::<Field>().unwrap_err();
        assert!(matches!(err, ReviewError::InvalidInput(_)));
        // Keys are case-sensitive on the wire
        assert!("Plan".parse::<Field>().is_err());
    }

    #[test]
    fn test_with_field_leaves_original_untouched() {
        let original = SoapNote::new("Cat lethargic", "", "", "");
        let edited = original.with_field(Field::Subjective, "Cat very lethargic");

        assert_eq!(original.subjective, "Cat lethargic");
        assert_eq!(edited.subjective, "Cat very lethargic");
        assert_eq!(edited.objective, original.objective);
    }

    #[test]
    fn test_is_complete_requires_every_section() {
        assert!(SoapNote::new("a", "b", "c", "d").is_complete());
        assert!(!SoapNote::new("a", "b", "  ", "d").is_complete());
        assert!(!SoapNote::default().is_complete());
    }

    #[test]
    fn test_note_json_uses_section_keys() {
        let note = SoapNote::new("s", "o", "a", "p");
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["subjective"], "s");
        assert_eq!(value["plan"], "p");

        let bad = serde_json::json!({ "subjective": "s", "objective": "o", "assessment": "a" });
        assert!(serde_json::from_value::<SoapNote>(bad).is_err());
    }
}
