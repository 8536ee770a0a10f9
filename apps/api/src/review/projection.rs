use crate::review::document::{Field, SoapNote};

/// Shapes a raw transcript like a note so it can be diffed against one.
///
/// The whole transcript goes into the primary section; every other section is
/// empty. Nothing is cached, callers recompute this whenever they compare.
pub fn project_source(source_text: &str) -> SoapNote {
    SoapNote::default().with_field(Field::PRIMARY, source_text)
}
