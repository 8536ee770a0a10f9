//! Field differ: single-span change highlighting for one text field.
//!
//! The two strings are split into a common prefix, a changed middle and a
//! common suffix. Only the middle is marked. Lengths are counted in `char`s
//! so every split point lands on a UTF-8 boundary.

use serde::Serialize;

/// Opening tag wrapped around text that only exists on the before side.
pub const REMOVED_OPEN: &str = r#"<span class="diff-del">"#;
/// Opening tag wrapped around text that only exists on the after side.
pub const ADDED_OPEN: &str = r#"<span class="diff-add">"#;
pub const MARK_CLOSE: &str = "</span>";

/// Lengths, in chars, of the shared prefix and suffix of two strings.
///
/// Invariant: `prefix + suffix <= min(chars(before), chars(after))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affixes {
    pub prefix: usize,
    pub suffix: usize,
}

/// One side of a decomposition, as raw (unescaped) text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    pub prefix: &'a str,
    pub middle: &'a str,
    pub suffix: &'a str,
}

#[cfg(test)]
impl Split<'_> {
    /// Rebuilds the original text.
    pub fn joined(&self) -> String {
        [self.prefix, self.middle, self.suffix].concat()
    }
}

/// Rendered comparison of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub before_markup: String,
    pub after_markup: String,
    pub changed: bool,
}

/// Measures the common prefix, then the common suffix of what remains.
///
/// The suffix scan only walks the text after the prefix on both sides, so the
/// two regions can never overlap, even for inputs such as `"aa"` / `"aaa"`.
pub fn common_affixes(before: &str, after: &str) -> Affixes {
    let prefix_bytes = common_prefix_bytes(before, after);
    let (rest_before, rest_after) = (&before[prefix_bytes..], &after[prefix_bytes..]);

    Affixes {
        prefix: before[..prefix_bytes].chars().count(),
        suffix: rest_before
            .chars()
            .rev()
            .zip(rest_after.chars().rev())
            .take_while(|(a, b)| a == b)
            .count(),
    }
}

/// Splits both strings into prefix / middle / suffix.
pub fn split<'a>(before: &'a str, after: &'a str) -> (Split<'a>, Split<'a>) {
    let affixes = common_affixes(before, after);
    (split_side(before, affixes), split_side(after, affixes))
}

/// Compares two field values and renders escaped markup for both sides.
pub fn highlight_change(before: &str, after: &str) -> Highlight {
    if before == after {
        let safe = escape_html(before);
        return Highlight {
            before_markup: safe.clone(),
            after_markup: safe,
            changed: false,
        };
    }

    let (old, new) = split(before, after);
    Highlight {
        before_markup: render_side(&old, REMOVED_OPEN),
        after_markup: render_side(&new, ADDED_OPEN),
        changed: true,
    }
}

/// Escapes characters that carry meaning in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn common_prefix_bytes(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

fn split_side(text: &str, affixes: Affixes) -> Split<'_> {
    let start = byte_offset(text, affixes.prefix);
    let total = text.chars().count();
    let end = byte_offset(text, total - affixes.suffix);
    Split {
        prefix: &text[..start],
        middle: &text[start..end],
        suffix: &text[end..],
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

fn render_side(side: &Split<'_>, open: &str) -> String {
    format!(
        "{}{}{}{}{}",
        escape_html(side.prefix),
        open,
        escape_html(side.middle),
        MARK_CLOSE,
        escape_html(side.suffix)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_are_unchanged_and_unmarked() {
        let result = highlight_change("Vitals stable", "Vitals stable");
        assert!(!result.changed);
        assert_eq!(result.before_markup, "Vitals stable");
        assert_eq!(result.after_markup, "Vitals stable");
    }

    #[test]
    fn test_both_empty_is_unchanged() {
        let result = highlight_change("", "");
        assert!(!result.changed);
        assert_eq!(result.before_markup, "");
        assert_eq!(result.after_markup, "");
    }

    #[test]
    fn test_pure_insertion_from_empty() {
        let (old, new) = split("", "x");
        assert_eq!(old, Split { prefix: "", middle: "", suffix: "" });
        assert_eq!(new, Split { prefix: "", middle: "x", suffix: "" });

        let result = highlight_change("", "x");
        assert!(result.changed);
        assert_eq!(result.before_markup, r#"<span class="diff-del"></span>"#);
        assert_eq!(result.after_markup, r#"<span class="diff-add">x</span>"#);
    }

    #[test]
    fn test_pure_deletion_to_empty() {
        let (old, new) = split("gone", "");
        assert_eq!(old.middle, "gone");
        assert_eq!(new.middle, "");
        assert_eq!(common_affixes("gone", ""), Affixes { prefix: 0, suffix: 0 });
    }

    #[test]
    fn test_inserted_word_lands_in_after_middle() {
        let (old, new) = split("Cat lethargic", "Cat very lethargic");
        assert_eq!(old.prefix, "Cat ");
        assert_eq!(old.middle, "");
        assert_eq!(old.suffix, "lethargic");
        assert_eq!(new.prefix, "Cat ");
        assert_eq!(new.middle, "very ");
        assert_eq!(new.suffix, "lethargic");
    }

    #[test]
    fn test_suffix_is_bounded_by_prefix() {
        // Unbounded scans would count the shared 'a's twice
        let affixes = common_affixes("aa", "aaa");
        assert_eq!(affixes, Affixes { prefix: 2, suffix: 0 });

        let (old, new) = split("aa", "aaa");
        assert_eq!(old.middle, "");
        assert_eq!(new.middle, "a");

        let affixes = common_affixes("abab", "ab");
        assert!(affixes.prefix + affixes.suffix <= 2);
    }

    #[test]
    fn test_replacement_in_the_middle() {
        let (old, new) = split("T 102.5F, mild wheeze", "T 103.1F, mild wheeze");
        assert_eq!(old.prefix, "T 10");
        assert_eq!(old.middle, "2.5");
        assert_eq!(new.middle, "3.1");
        assert_eq!(old.suffix, "F, mild wheeze");
    }

    #[test]
    fn test_multibyte_characters_split_on_char_boundaries() {
        let (old, new) = split("temp 38°C ok", "temp 39°C ok");
        assert_eq!(old.middle, "8");
        assert_eq!(new.middle, "9");
        assert_eq!(old.suffix, "°C ok");

        let (old, new) = split("é", "è");
        assert_eq!(old.middle, "é");
        assert_eq!(new.middle, "è");
    }

    #[test]
    fn test_markup_is_escaped_in_every_segment() {
        let result = highlight_change("<a>", "<b>");
        assert!(result.changed);
        assert_eq!(
            result.before_markup,
            r#"&lt;<span class="diff-del">a</span>&gt;"#
        );
        assert_eq!(
            result.after_markup,
            r#"&lt;<span class="diff-add">b</span>&gt;"#
        );

        for markup in [&result.before_markup, &result.after_markup] {
            let stripped = markup
                .replace(REMOVED_OPEN, "")
                .replace(ADDED_OPEN, "")
                .replace(MARK_CLOSE, "");
            assert!(!stripped.contains('<') && !stripped.contains('>'));
        }
    }

    #[test]
    fn test_fast_path_output_is_escaped() {
        let result = highlight_change("<script>x & y</script>", "<script>x & y</script>");
        assert!(!result.changed);
        assert_eq!(
            result.before_markup,
            "&lt;script&gt;x &amp; y&lt;/script&gt;"
        );
    }

    #[test]
    fn test_escape_html_handles_quotes() {
        assert_eq!(escape_html(r#"say "hi""#), "say &quot;hi&quot;");
    }

    mod proptest_diff {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn identical_inputs_are_never_changed(a in "\\PC{0,64}") {
                let result = highlight_change(&a, &a);
                prop_assert!(!result.changed);
                prop_assert_eq!(&result.before_markup, &escape_html(&a));
                prop_assert_eq!(&result.after_markup, &escape_html(&a));
            }

            #[test]
            fn sides_reconstruct_their_inputs(a in "\\PC{0,64}", b in "\\PC{0,64}") {
                let (old, new) = split(&a, &b);
                prop_assert_eq!(&old.joined(), &a);
                prop_assert_eq!(&new.joined(), &b);
            }

            #[test]
            fn affixes_never_overlap(a in "[ab ]{0,24}", b in "[ab ]{0,24}") {
                let affixes = common_affixes(&a, &b);
                let shortest = a.chars().count().min(b.chars().count());
                prop_assert!(affixes.prefix + affixes.suffix <= shortest);
            }

            #[test]
            fn changed_matches_raw_inequality(a in "[xy<&]{0,12}", b in "[xy<&]{0,12}") {
                prop_assert_eq!(highlight_change(&a, &b).changed, a != b);
            }
        }
    }
}
