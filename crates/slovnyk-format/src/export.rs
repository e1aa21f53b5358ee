//! Plain-text export of a formatted definition.

use std::sync::OnceLock;

use regex::Regex;

fn pos_header_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(
            r"\[\s*(?:NOUN|VERB|ADJECTIVE|ADVERB|PREPOSITION|CONJUNCTION|PRONOUN|INTERJECTION|NUMERAL|PHRASAL VERB)\s*\]",
        )
        .expect("Invalid header pattern")
    })
}

fn blank_run_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"\n{3,}").expect("Invalid blank run pattern"))
}

fn leading_space_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"(?m)^\s+").expect("Invalid indent pattern"))
}

/// Strip header markers, a leading line echoing the headword, and layout
/// whitespace. Meant for the clipboard.
pub fn extract_clean_translation(formatted: &str, headword: Option<&str>) -> String {
    let mut text = pos_header_regex().replace_all(formatted, "").into_owned();

    if let Some(hw) = headword.map(str::trim).filter(|hw| !hw.is_empty()) {
        let pattern = format!(r"(?i)\A\s*{}[ \t]*(?:\n|\z)", regex::escape(hw));
        match Regex::new(&pattern) {
            Ok(echo) => text = echo.replacen(&text, 1, "").into_owned(),
            Err(e) => tracing::debug!(headword = hw, error = %e, "headword pattern rejected"),
        }
    }

    let text = blank_run_regex().replace_all(&text, "\n\n");
    let text = leading_space_regex().replace_all(&text, "");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_headers_and_indent() {
        let formatted = "[ NOUN ]\n   a domestic bird\n\n[ VERB ]\n   to chicken out";
        assert_eq!(
            extract_clean_translation(formatted, Some("chicken")),
            "a domestic bird\nto chicken out"
        );
    }

    #[test]
    fn test_removes_headword_echo_line() {
        let formatted = "cat\n[ NOUN ]\n   кіт";
        assert_eq!(extract_clean_translation(formatted, Some("Cat")), "кіт");
    }

    #[test]
    fn test_keeps_words_that_only_start_with_headword() {
        let formatted = "   catalogue of cats";
        assert_eq!(
            extract_clean_translation(formatted, Some("cat")),
            "catalogue of cats"
        );
    }

    #[test]
    fn test_no_headword() {
        assert_eq!(extract_clean_translation("  [ ADVERB ]  швидко  ", None), "швидко");
    }
}
