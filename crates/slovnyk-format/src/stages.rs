//! The definition pipeline as an ordered list of named stages.
//!
//! Order matters: noise stripping keeps `[ HEADER ]` markers so header
//! extraction can skip them later, and abbreviation tagging runs before
//! header extraction so a tag never ends up split from its sense.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use slovnyk_protocol::NOT_FOUND;

use crate::abbreviations::{
    bounded_matches, canonical_pos, is_ukrainian_letter, is_word_letter, replace_bounded,
    Boundary, ABBREVIATIONS, POS_HEADER_NAMES,
};
use crate::{is_header_line, BODY_INDENT};

/// One named text transformation. `headword` is only read by stages that
/// need it.
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str, Option<&str>) -> String,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

pub const PIPELINE: [Stage; 13] = [
    Stage {
        name: "decode_entities",
        apply: |t, _| decode_entities(t),
    },
    Stage {
        name: "resolve_cross_refs",
        apply: |t, _| resolve_cross_refs(t),
    },
    Stage {
        name: "strip_quote_markers",
        apply: |t, _| strip_quote_markers(t),
    },
    Stage {
        name: "collapse_alternatives",
        apply: |t, _| collapse_alternatives(t),
    },
    Stage {
        name: "substitute_placeholder",
        apply: substitute_placeholder,
    },
    Stage {
        name: "strip_tags",
        apply: |t, _| strip_tags(t),
    },
    Stage {
        name: "strip_dsl_noise",
        apply: |t, _| strip_dsl_noise(t),
    },
    Stage {
        name: "normalize_line_breaks",
        apply: |t, _| normalize_line_breaks(t),
    },
    Stage {
        name: "expand_shorthand",
        apply: |t, _| expand_shorthand(t),
    },
    Stage {
        name: "tag_abbreviations",
        apply: |t, _| tag_abbreviations(t),
    },
    Stage {
        name: "extract_headers",
        apply: |t, _| extract_headers(t),
    },
    Stage {
        name: "strip_ordinals",
        apply: |t, _| strip_ordinals(t),
    },
    Stage {
        name: "reindent",
        apply: |t, _| reindent(t),
    },
];

/// Format a raw definition for display.
///
/// Never fails. Empty input and the not-found sentinel come back unchanged.
pub fn format_definition(raw: &str, headword: Option<&str>) -> String {
    if raw.is_empty() || raw == NOT_FOUND {
        return raw.to_string();
    }
    PIPELINE.iter().fold(raw.to_string(), |text, stage| {
        let next = (stage.apply)(&text, headword);
        tracing::trace!(stage = stage.name, before = text.len(), after = next.len(), "stage applied");
        next
    })
}

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            CELL.get_or_init(|| Regex::new($pattern).expect("Invalid formatter pattern"))
        }
    };
}

cached_regex!(cross_ref_regex, r"<<\s*([^<>]+?)\s*>>");
cached_regex!(quote_marker_regex, r"(?m)^[ \t]*>+[ \t]*");
cached_regex!(alternatives_regex, r"\(([^()]*\|[^()]*)\)");
cached_regex!(alphabetic_token_regex, r"^[A-Za-z\- ]+$");
cached_regex!(tag_regex, r"<[^>]+>");
cached_regex!(bracket_regex, r"\[([^\]]*)\]");
cached_regex!(etc_regex, r"(?i)і т\.п\.");
cached_regex!(and_so_on_regex, r"(?i)і т\.д\.");
cached_regex!(latin_etc_regex, r"(?i)\betc\.");
cached_regex!(phrasal_regex, r"(?i)(?:\d+\.\s*)?\b(?:phrasal\s+v|ph\.?\s*v)\b\s*");
cached_regex!(
    pos_regex,
    r"(?i)(?:\d+\.\s*)?\b(noun|verb|adj(?:ective)?|adv(?:erb)?|prep(?:osition)?|conj(?:unction)?|pron(?:oun)?|int(?:erjection)?|num(?:eral)?|n|v)\b\s+"
);
cached_regex!(ordinal_regex, r"(?m)^[ \t]*\d+\.[ \t]*");

/// Apply `f` to every line that is not a `[ HEADER ]` line.
fn map_body_lines(text: &str, f: impl Fn(&str) -> String) -> String {
    text.split('\n')
        .map(|line| {
            if is_header_line(line) {
                line.to_string()
            } else {
                f(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn header_block(name: &str) -> String {
    format!("\n\n[ {name} ]\n{BODY_INDENT}")
}

// ============================================================================
// Stages
// ============================================================================

/// `&amp;` → `&`, `&#x27;` → `'`, ...
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// `<<word>>` → `word`.
pub fn resolve_cross_refs(text: &str) -> String {
    cross_ref_regex().replace_all(text, "${1}").into_owned()
}

/// Drop `>` quote markers at line starts.
pub fn strip_quote_markers(text: &str) -> String {
    quote_marker_regex().replace_all(text, "").into_owned()
}

/// `(a|b|c)` → ` (a / b / c)`. When any token is purely alphabetic, only
/// those are kept.
pub fn collapse_alternatives(text: &str) -> String {
    alternatives_regex()
        .replace_all(text, |caps: &Captures| {
            let parts: Vec<&str> = caps[1]
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            let alpha: Vec<&str> = parts
                .iter()
                .copied()
                .filter(|p| alphabetic_token_regex().is_match(p))
                .collect();
            let kept = if alpha.is_empty() { parts } else { alpha };
            format!(" ({})", kept.join(" / "))
        })
        .into_owned()
}

/// `~` → lowercase headword.
pub fn substitute_placeholder(text: &str, headword: Option<&str>) -> String {
    match headword.map(str::trim).filter(|hw| !hw.is_empty()) {
        Some(hw) => text.replace('~', &hw.to_lowercase()),
        None => text.to_string(),
    }
}

/// Remove any remaining `<...>` markup.
pub fn strip_tags(text: &str) -> String {
    tag_regex().replace_all(text, "").into_owned()
}

/// Remove `[...]` segments, except part-of-speech headers.
pub fn strip_dsl_noise(text: &str) -> String {
    bracket_regex()
        .replace_all(text, |caps: &Captures| {
            let inner = caps[1].trim_matches(' ');
            if POS_HEADER_NAMES.contains(&inner) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Literal `\n` escapes, CRLF and CR all become LF.
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Spell out common shorthand.
pub fn expand_shorthand(text: &str) -> String {
    let text = replace_bounded(text, "тж", "також", is_ukrainian_letter);
    let text = replace_bounded(&text, "напр.", "наприклад", is_ukrainian_letter);
    let text = etc_regex().replace_all(&text, "і тому подібне");
    let text = and_so_on_regex().replace_all(&text, "і так далі");
    latin_etc_regex().replace_all(&text, "тощо").into_owned()
}

/// Wrap known abbreviations as `[abbr]`. Header lines are left alone and a
/// token that is already bracketed is not wrapped twice.
pub fn tag_abbreviations(text: &str) -> String {
    map_body_lines(text, |line| {
        ABBREVIATIONS.iter().fold(line.to_string(), |line, abbr| {
            let found: Vec<_> = match abbr.boundary {
                Boundary::Letters => bounded_matches(&line, abbr.source, is_word_letter),
                Boundary::Word => latin_word_matches(&line, abbr.source),
            };
            wrap_unbracketed(&line, found, abbr.tag)
        })
    })
}

fn latin_word_matches(line: &str, word: &str) -> Vec<std::ops::Range<usize>> {
    static CELL: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    let patterns = CELL.get_or_init(|| {
        ABBREVIATIONS
            .iter()
            .filter(|a| a.boundary == Boundary::Word)
            .map(|a| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(a.source));
                (a.source, Regex::new(&pattern).expect("Invalid abbreviation pattern"))
            })
            .collect()
    });
    patterns
        .iter()
        .find(|(source, _)| *source == word)
        .map(|(_, re)| re.find_iter(line).map(|m| m.range()).collect())
        .unwrap_or_default()
}

fn wrap_unbracketed(line: &str, found: Vec<std::ops::Range<usize>>, tag: &str) -> String {
    if found.is_empty() {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + found.len() * 4);
    let mut last = 0;
    for range in found {
        let bracketed = line[..range.start].ends_with('[') && line[range.end..].starts_with(']');
        out.push_str(&line[last..range.start]);
        if bracketed {
            out.push_str(&line[range.clone()]);
        } else {
            out.push('[');
            out.push_str(tag);
            out.push(']');
        }
        last = range.end;
    }
    out.push_str(&line[last..]);
    out
}

/// Turn phrasal-verb and part-of-speech labels into `[ NAME ]` header lines.
pub fn extract_headers(text: &str) -> String {
    map_body_lines(text, |line| {
        let line = phrasal_regex().replace_all(line, header_block("PHRASAL VERB").as_str());
        // The phrasal pass may have produced header lines of its own.
        map_body_lines(&line, |part| {
            pos_regex()
                .replace_all(part, |caps: &Captures| {
                    let label = &caps[1];
                    let name: Cow<'_, str> = match canonical_pos(label) {
                        Some(name) => Cow::Borrowed(name),
                        None => Cow::Owned(label.to_uppercase()),
                    };
                    header_block(&name)
                })
                .into_owned()
        })
    })
}

/// Drop leading `1. ` style markers.
pub fn strip_ordinals(text: &str) -> String {
    ordinal_regex().replace_all(text, "").into_owned()
}

/// Headers bare, body indented, at most one blank line in a row, no blank
/// lines at either end.
pub fn reindent(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let stripped = line.trim();
        if stripped.is_empty() {
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        if is_header_line(stripped) {
            lines.push(stripped.to_string());
        } else {
            lines.push(format!("{BODY_INDENT}{stripped}"));
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_lines(text: &str) -> Vec<String> {
        text.lines()
            .filter(|l| is_header_line(l))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_pipeline_order() {
        let names: Vec<_> = PIPELINE.iter().map(|s| s.name).collect();
        assert_eq!(names.first(), Some(&"decode_entities"));
        assert_eq!(names.last(), Some(&"reindent"));
        let dsl = names.iter().position(|n| *n == "strip_dsl_noise").unwrap();
        let headers = names.iter().position(|n| *n == "extract_headers").unwrap();
        assert!(dsl < headers);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("it&#x27;s &quot;ok&quot; &amp; fine"), "it's \"ok\" & fine");
    }

    #[test]
    fn test_resolve_cross_refs() {
        assert_eq!(resolve_cross_refs("see <<  kitten >> too"), "see kitten too");
    }

    #[test]
    fn test_strip_quote_markers() {
        assert_eq!(strip_quote_markers(">> quoted\n  > also\nplain"), "quoted\nalso\nplain");
    }

    #[test]
    fn test_collapse_alternatives() {
        assert_eq!(collapse_alternatives("colour(colour|color)"), "colour (colour / color)");
        assert_eq!(collapse_alternatives("x(1|foo|2)"), "x (foo)");
        assert_eq!(collapse_alternatives("x(1|2)"), "x (1 / 2)");
        assert_eq!(collapse_alternatives("(кіт | кішка)"), " (кіт / кішка)");
        assert_eq!(collapse_alternatives("(no pipes)"), "(no pipes)");
    }

    #[test]
    fn test_substitute_placeholder() {
        assert_eq!(substitute_placeholder("~ out", Some(" Chicken ")), "chicken out");
        assert_eq!(substitute_placeholder("~ out", None), "~ out");
        assert_eq!(substitute_placeholder("~ out", Some("  ")), "~ out");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>bold</b> <i>it</i>"), "bold it");
    }

    #[test]
    fn test_strip_dsl_noise_keeps_headers() {
        assert_eq!(strip_dsl_noise("[m1]cat [c]кіт[/c]"), "cat кіт");
        assert_eq!(strip_dsl_noise("[ NOUN ] x [VERB]"), "[ NOUN ] x [VERB]");
        assert_eq!(strip_dsl_noise("[ PHRASAL VERB ]"), "[ PHRASAL VERB ]");
        assert_eq!(strip_dsl_noise("[noun]"), "");
    }

    #[test]
    fn test_normalize_line_breaks() {
        assert_eq!(normalize_line_breaks("a\\nb\r\nc\rd"), "a\nb\nc\nd");
    }

    #[test]
    fn test_expand_shorthand() {
        assert_eq!(expand_shorthand("тж кіт"), "також кіт");
        assert_eq!(expand_shorthand("Напр. кіт"), "наприклад кіт");
        assert_eq!(expand_shorthand("коти і т.п."), "коти і тому подібне");
        assert_eq!(expand_shorthand("коти і т.д."), "коти і так далі");
        assert_eq!(expand_shorthand("cats etc. dogs"), "cats тощо dogs");
        // Not a standalone word.
        assert_eq!(expand_shorthand("тжк"), "тжк");
    }

    #[test]
    fn test_tag_abbreviations() {
        assert_eq!(tag_abbreviations("розм. кицька"), "[розм.] кицька");
        assert_eq!(tag_abbreviations("(мед.) ліки"), "([мед.]) ліки");
        assert_eq!(tag_abbreviations("pl кішки"), "[мн.] кішки");
        assert_eq!(tag_abbreviations("attr котячий"), "[означ.] котячий");
        // Inside words nothing happens.
        assert_eq!(tag_abbreviations("мореплавство, apple"), "мореплавство, apple");
    }

    #[test]
    fn test_tag_abbreviations_no_double_wrap() {
        assert_eq!(tag_abbreviations("[розм.] кицька"), "[розм.] кицька");
        assert_eq!(tag_abbreviations("[ NOUN ]\nрозм. кіт"), "[ NOUN ]\n[розм.] кіт");
    }

    #[test]
    fn test_extract_headers() {
        assert_eq!(
            extract_headers("1. noun кіт 2. verb гнати"),
            "\n\n[ NOUN ]\n   кіт \n\n[ VERB ]\n   гнати"
        );
        assert_eq!(
            extract_headers("ph v chicken out"),
            "\n\n[ PHRASAL VERB ]\n   chicken out"
        );
        // Existing headers stay as they are.
        assert_eq!(extract_headers("[ NOUN ]"), "[ NOUN ]");
    }

    #[test]
    fn test_strip_ordinals() {
        assert_eq!(strip_ordinals("1. кіт\n  2.кішка\n3 коти"), "кіт\nкішка\n3 коти");
    }

    #[test]
    fn test_reindent() {
        assert_eq!(
            reindent("\n\n[ NOUN ]\n кіт\n\n\n\nкішка\n\n"),
            "[ NOUN ]\n   кіт\n\n   кішка"
        );
    }

    #[test]
    fn test_format_definition_chicken() {
        let out = format_definition(
            "1. noun a domestic bird~ 2. verb to chicken out",
            Some("chicken"),
        );
        assert_eq!(
            out,
            "[ NOUN ]\n   a domestic birdchicken\n\n[ VERB ]\n   to chicken out"
        );
    }

    #[test]
    fn test_format_definition_sentinels() {
        assert_eq!(format_definition("", Some("cat")), "");
        assert_eq!(format_definition("NOT_FOUND", Some("cat")), "NOT_FOUND");
    }

    #[test]
    fn test_format_definition_tags_once_next_to_headers() {
        let out = format_definition("[ NOUN ]\nрозм. кицька", None);
        assert_eq!(out.matches("[розм.]").count(), 1);
        assert!(!out.contains("[[розм.]]"));
        assert_eq!(header_lines(&out), vec!["[ NOUN ]"]);
    }

    #[test]
    fn test_format_definition_is_stable_on_headers() {
        let once = format_definition("1. noun a bird 2. verb to flee ph v chicken out", Some("chicken"));
        let twice = format_definition(&once, Some("chicken"));
        assert_eq!(header_lines(&once), vec!["[ NOUN ]", "[ VERB ]", "[ PHRASAL VERB ]"]);
        assert_eq!(header_lines(&twice), header_lines(&once));
        assert!(!twice.contains("[ ["));
    }

    #[test]
    fn test_format_definition_full_markup() {
        let raw = "<b>colour</b>(colour|color) n &quot;колір&quot; [m1]розм. <<hue>>";
        let out = format_definition(raw, Some("colour"));
        assert_eq!(out, "   colour (colour / color)\n\n[ NOUN ]\n   \"колір\" [розм.] hue");
    }

    proptest::proptest! {
        #[test]
        fn prop_format_never_panics(raw in "\\PC{0,200}", hw in proptest::option::of("\\PC{0,12}")) {
            let _ = format_definition(&raw, hw.as_deref());
        }

        #[test]
        fn prop_headers_survive_reformatting(
            words in proptest::collection::vec(
                proptest::sample::select(vec![
                    "1.", "2.", "noun", "verb", "adj", "n", "cat", "кіт", "~", "розм.", "ph v", "the", "pl",
                ]),
                0..24,
            )
        ) {
            let raw = words.join(" ");
            let once = format_definition(&raw, Some("cat"));
            let twice = format_definition(&once, Some("cat"));
            proptest::prop_assert_eq!(header_lines(&once), header_lines(&twice));
        }

        #[test]
        fn prop_collapse_alternatives(
            tokens in proptest::collection::vec(
                proptest::prop_oneof!["[a-z]{1,6}", "[0-9]{1,3}"],
                2..6,
            )
        ) {
            let out = collapse_alternatives(&format!("x({})", tokens.join("|")));
            let alpha: Vec<&str> = tokens
                .iter()
                .map(String::as_str)
                .filter(|t| t.chars().all(|c| c.is_ascii_alphabetic()))
                .collect();
            let kept = if alpha.is_empty() {
                tokens.iter().map(String::as_str).collect()
            } else {
                alpha
            };
            proptest::prop_assert_eq!(out, format!("x ({})", kept.join(" / ")));
        }
    }
}
