//! Slovnyk Format -- turns raw server definitions into display text.
//!
//! Pure string functions, no I/O. [`format_definition`] runs the ordered
//! stage list in [`stages::PIPELINE`]; [`render_interactive`] is the lighter
//! single-pass styler for previews; [`extract_clean_translation`] prepares
//! formatted text for plain export.

pub mod abbreviations;
pub mod classify;
pub mod export;
pub mod render;
pub mod stages;

pub use classify::{abbreviation_badges, classify_line, classify_lines, LineKind};
pub use export::extract_clean_translation;
pub use render::{render_interactive, spans, Span, SpanStyle, TextSink};
pub use stages::{format_definition, Stage, PIPELINE};

use regex::Regex;
use std::sync::OnceLock;

/// Indent applied to every non-header line.
pub const BODY_INDENT: &str = "   ";

/// Default colour for tags and headers.
pub const DEFAULT_TAG_COLOR: &str = "#10B981";

static HEADER_LINE: OnceLock<Regex> = OnceLock::new();

fn header_line_regex() -> &'static Regex {
    HEADER_LINE.get_or_init(|| {
        Regex::new(r"^\[\s*([A-Z](?:[A-Z ]*[A-Z])?)\s*\]$").expect("Invalid header line pattern")
    })
}

/// Header name if `line` is a bare `[ NAME ]` header (all caps).
pub fn header_name(line: &str) -> Option<&str> {
    header_line_regex()
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_header_line(line: &str) -> bool {
    header_name(line).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lines() {
        assert_eq!(header_name("[ NOUN ]"), Some("NOUN"));
        assert_eq!(header_name("  [PHRASAL VERB]  "), Some("PHRASAL VERB"));
        assert_eq!(header_name("[V]"), Some("V"));
        assert!(!is_header_line("[розм.]"));
        assert!(!is_header_line("[ noun ]"));
        assert!(!is_header_line("[ NOUN ] cat"));
        assert!(!is_header_line("[]"));
    }
}
