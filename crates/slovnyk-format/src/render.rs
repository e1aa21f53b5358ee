//! Single-pass styling for compact previews.
//!
//! Works on raw or formatted text alike: only header lines and `[...]` tags
//! are recognised, everything else is plain.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::header_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStyle {
    Plain,
    /// Coloured abbreviation tag.
    Tag,
    /// Bold coloured header or all-caps tag.
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// Something styled text can be written into.
pub trait TextSink {
    fn clear(&mut self);

    /// Colour used for `Tag` and `Header` spans from now on.
    fn set_tag_color(&mut self, _color: &str) {}

    fn insert(&mut self, text: &str, style: SpanStyle);
}

fn inline_tag_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"\[[^\]]+\]").expect("Invalid inline tag pattern"))
}

fn caps_only_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"^[A-Z\s]+$").expect("Invalid caps pattern"))
}

fn push(spans: &mut Vec<Span>, text: &str, style: SpanStyle) {
    if text.is_empty() {
        return;
    }
    if style == SpanStyle::Plain {
        if let Some(last) = spans.last_mut().filter(|s| s.style == SpanStyle::Plain) {
            last.text.push_str(text);
            return;
        }
    }
    spans.push(Span {
        text: text.to_string(),
        style,
    });
}

/// Split `text` into styled runs. Every source line ends with `\n`.
pub fn spans(text: &str) -> Vec<Span> {
    let mut out = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            push(&mut out, "\n", SpanStyle::Plain);
            continue;
        }

        if let Some(name) = header_name(line) {
            let indent = &line[..line.len() - line.trim_start().len()];
            let trailing = &line[line.trim_end().len()..];
            push(&mut out, indent, SpanStyle::Plain);
            push(&mut out, &format!("[ {name} ]"), SpanStyle::Header);
            push(&mut out, trailing, SpanStyle::Plain);
            push(&mut out, "\n", SpanStyle::Plain);
            continue;
        }

        let mut last = 0;
        for m in inline_tag_regex().find_iter(line) {
            push(&mut out, &line[last..m.start()], SpanStyle::Plain);
            let content = m.as_str().trim_matches(|c| c == '[' || c == ']').trim();
            let style = if caps_only_regex().is_match(content) {
                SpanStyle::Header
            } else {
                SpanStyle::Tag
            };
            push(&mut out, m.as_str(), style);
            last = m.end();
        }
        push(&mut out, &line[last..], SpanStyle::Plain);
        push(&mut out, "\n", SpanStyle::Plain);
    }
    out
}

/// Replace the sink's contents with the styled form of `text`. Empty text
/// leaves the sink untouched.
pub fn render_interactive(sink: &mut dyn TextSink, text: &str, tag_color: &str) {
    if text.is_empty() {
        return;
    }
    sink.clear();
    sink.set_tag_color(tag_color);
    for span in spans(text) {
        sink.insert(&span.text, span.style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        color: String,
        cleared: usize,
        runs: Vec<(String, SpanStyle)>,
    }

    impl TextSink for Recorder {
        fn clear(&mut self) {
            self.cleared += 1;
            self.runs.clear();
        }

        fn set_tag_color(&mut self, color: &str) {
            self.color = color.to_string();
        }

        fn insert(&mut self, text: &str, style: SpanStyle) {
            self.runs.push((text.to_string(), style));
        }
    }

    #[test]
    fn test_spans_header_and_tags() {
        let out = spans("[NOUN]\n   [розм.] кицька [VERB]\n\nend");
        let styled: Vec<_> = out.iter().map(|s| (s.text.as_str(), s.style)).collect();
        assert_eq!(
            styled,
            vec![
                ("[ NOUN ]", SpanStyle::Header),
                ("\n   ", SpanStyle::Plain),
                ("[розм.]", SpanStyle::Tag),
                (" кицька ", SpanStyle::Plain),
                ("[VERB]", SpanStyle::Header),
                ("\n\nend\n", SpanStyle::Plain),
            ]
        );
    }

    #[test]
    fn test_render_interactive_uses_sink() {
        let mut sink = Recorder::default();
        render_interactive(&mut sink, "[ NOUN ]\n   кіт", "#FF0000");
        assert_eq!(sink.cleared, 1);
        assert_eq!(sink.color, "#FF0000");
        assert_eq!(sink.runs[0], ("[ NOUN ]".to_string(), SpanStyle::Header));
        assert_eq!(sink.runs[1], ("\n   кіт\n".to_string(), SpanStyle::Plain));
    }

    #[test]
    fn test_render_interactive_ignores_empty_text() {
        let mut sink = Recorder::default();
        render_interactive(&mut sink, "", "#FF0000");
        assert_eq!(sink.cleared, 0);
        assert!(sink.runs.is_empty());
    }
}
