//! Diff aggregation across the fixed SOAP field set.

use serde::Serialize;

use crate::review::diff::highlight_change;
use crate::review::document::{Field, SoapNote};

/// Render-ready diff of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: Field,
    pub label: &'static str,
    pub before_markup: String,
    pub after_markup: String,
    pub changed: bool,
}

/// Outcome of comparing a reference note with the working note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "fields", rename_all = "snake_case")]
pub enum Comparison {
    /// One of the two notes does not exist yet.
    Unavailable,
    /// Both notes exist and every section matches.
    Identical,
    /// Changed sections only, in canonical order.
    Changed(Vec<FieldDiff>),
}

impl Comparison {
    pub fn changed_fields(&self) -> &[FieldDiff] {
        match self {
            Comparison::Changed(fields) => fields,
            _ => &[],
        }
    }
}

/// Diffs every section of `before` against `after`, keeping changed ones.
pub fn compare(before: &SoapNote, after: &SoapNote) -> Comparison {
    let changed: Vec<FieldDiff> = Field::ALL
        .into_iter()
        .map(|field| diff_field(field, before.get(field), after.get(field)))
        .filter(|diff| diff.changed)
        .collect();

    if changed.is_empty() {
        Comparison::Identical
    } else {
        Comparison::Changed(changed)
    }
}

/// Like [`compare`], but reports `Unavailable` when either side is missing.
pub fn compare_optional(before: Option<&SoapNote>, after: Option<&SoapNote>) -> Comparison {
    match (before, after) {
        (Some(before), Some(after)) => compare(before, after),
        _ => Comparison::Unavailable,
    }
}

fn diff_field(field: Field, before: &str, after: &str) -> FieldDiff {
    let highlight = highlight_change(before, after);
    FieldDiff {
        field,
        label: field.label(),
        before_markup: highlight.before_markup,
        after_markup: highlight.after_markup,
        changed: highlight.changed,
    }
}
