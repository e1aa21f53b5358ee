//! Line classification for structured result display.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::abbreviations::badge_label;
use crate::header_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineKind {
    Blank,
    PosHeader {
        name: String,
    },
    /// `1. text` or `1) text`.
    Definition {
        number: String,
        text: String,
    },
    /// Usage example, optionally with a translation after a dash separator.
    Example {
        source: String,
        translation: Option<String>,
    },
    Regular {
        text: String,
    },
}

const EXAMPLE_DASH: &str = " — ";

fn numbered_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"^(\d+[.)])\s+(.*)$").expect("Invalid numbered line pattern"))
}

fn bracket_tag_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("Invalid tag pattern"))
}

fn strip_example_marker(s: &str) -> String {
    s.trim()
        .trim_start_matches(|c| matches!(c, '~' | '-' | ' '))
        .trim()
        .to_string()
}

pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if let Some(name) = header_name(line) {
        return LineKind::PosHeader {
            name: name.to_string(),
        };
    }
    if let Some(caps) = numbered_regex().captures(line) {
        return LineKind::Definition {
            number: caps[1].to_string(),
            text: caps[2].trim().to_string(),
        };
    }
    if line.starts_with('~') || line.starts_with('-') || line.contains(EXAMPLE_DASH) {
        return match line.split_once(EXAMPLE_DASH) {
            Some((source, translation)) => LineKind::Example {
                source: strip_example_marker(source),
                translation: Some(translation.trim().to_string()),
            },
            None => LineKind::Example {
                source: strip_example_marker(line),
                translation: None,
            },
        };
    }
    LineKind::Regular {
        text: line.to_string(),
    }
}

pub fn classify_lines(text: &str) -> Vec<LineKind> {
    text.lines().map(classify_line).collect()
}

/// English labels for the known `[tags]` in `text`, first appearance first.
pub fn abbreviation_badges(text: &str) -> Vec<&'static str> {
    let mut badges = Vec::new();
    for caps in bracket_tag_regex().captures_iter(text) {
        if let Some(label) = badge_label(&caps[1]) {
            if !badges.contains(&label) {
                badges.push(label);
            }
        }
    }
    badges
}
