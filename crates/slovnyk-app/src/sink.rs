//! Terminal sink for styled definition text.

use std::io;

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use slovnyk_format::{SpanStyle, TextSink};

/// `#RRGGBB` to a truecolor value. Anything else yields `None`.
pub fn parse_hex_color(color: &str) -> Option<Color> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

/// Collects styled output as terminal commands in memory.
#[derive(Debug, Default)]
pub struct AnsiSink {
    buf: Vec<u8>,
    color: Option<Color>,
    plain: bool,
}

impl AnsiSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that drops all styling, for pipes and `NO_COLOR`.
    pub fn plain() -> Self {
        Self {
            plain: true,
            ..Self::default()
        }
    }

    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    fn write(&mut self, text: &str, style: SpanStyle) -> io::Result<()> {
        if self.plain || style == SpanStyle::Plain {
            return queue!(self.buf, Print(text));
        }
        if style == SpanStyle::Header {
            queue!(self.buf, SetAttribute(Attribute::Bold))?;
        }
        if let Some(color) = self.color {
            queue!(self.buf, SetForegroundColor(color))?;
        }
        queue!(self.buf, Print(text), ResetColor)?;
        if style == SpanStyle::Header {
            queue!(self.buf, SetAttribute(Attribute::Reset))?;
        }
        Ok(())
    }
}

impl TextSink for AnsiSink {
    fn clear(&mut self) {
        self.buf.clear();
    }

    fn set_tag_color(&mut self, color: &str) {
        self.color = parse_hex_color(color);
        if self.color.is_none() {
            tracing::debug!(color, "ignoring unparseable tag colour");
        }
    }

    fn insert(&mut self, text: &str, style: SpanStyle) {
        if let Err(e) = self.write(text, style) {
            tracing::warn!(error = %e, "failed to buffer styled text");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slovnyk_format::render_interactive;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(
            parse_hex_color("#10B981"),
            Some(Color::Rgb {
                r: 16,
                g: 185,
                b: 129
            })
        );
        assert_eq!(parse_hex_color("10B981"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
    }

    #[test]
    fn test_styled_output() {
        let mut sink = AnsiSink::new();
        render_interactive(&mut sink, "[ NOUN ]\n   [розм.] кіт", "#FF0000");
        let out = sink.into_string();
        assert!(out.contains("\x1b[1m"));
        assert!(out.contains("\x1b[38;2;255;0;0m[ NOUN ]"));
        assert!(out.contains("\x1b[38;2;255;0;0m[розм.]"));
        assert!(out.contains(" кіт"));
    }

    #[test]
    fn test_unparseable_colour_keeps_text() {
        let mut sink = AnsiSink::new();
        render_interactive(&mut sink, "   [розм.] кіт", "green");
        let out = sink.into_string();
        assert!(!out.contains("38;2"));
        assert!(out.contains("[розм.]"));
        assert!(out.contains(" кіт"));
    }

    #[test]
    fn test_plain_sink_drops_escapes() {
        let mut sink = AnsiSink::plain();
        render_interactive(&mut sink, "[ NOUN ]\n   [розм.] кіт", "#FF0000");
        let out = sink.into_string();
        assert!(!out.contains('\x1b'));
        assert!(out.contains("[ NOUN ]"));
        assert!(out.contains("[розм.] кіт"));
    }
}
