//! # Text Measurement
//!
//! Line breaking for the autosizer. The engine only ever needs one thing
//! from a text backend: given a string, a font and a width, which lines does
//! it wrap into. That contract is the [`TextMeasure`] trait; a browser host
//! implements it with canvas `measureText`, the built-in implementation on
//! [`FontContext`] uses the standard font tables.

use std::fmt;

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::font::FontContext;
use crate::model::BoxStyle;

/// CSS pixels per millimetre (96 dpi).
pub const PX_PER_MM: f64 = 96.0 / 25.4;
/// Millimetres per typographic point.
pub const MM_PER_PT: f64 = 25.4 / 72.0;
/// CSS pixels per point.
pub const PX_PER_PT: f64 = 96.0 / 72.0;

/// Font selection for a measurement call.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    pub family: String,
    pub size_px: f64,
    pub weight: u32,
    pub italic: bool,
}

impl FontDescriptor {
    pub fn from_style(style: &BoxStyle) -> Self {
        FontDescriptor {
            family: style.font_family.clone(),
            size_px: style.font_size * PX_PER_PT,
            weight: style.font_weight,
            italic: style.italic,
        }
    }
}

impl fmt::Display for FontDescriptor {
    /// CSS `font` shorthand, e.g. `italic 700 16px Helvetica`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.italic {
            write!(f, "italic ")?;
        }
        write!(f, "{} {}px {}", self.weight, self.size_px, self.family)
    }
}

/// A text shaping backend.
pub trait TextMeasure: Send + Sync {
    /// Wrap `text` into lines no wider than `max_width_px`.
    ///
    /// Rows separated by `\n` always start a new line, and an empty row
    /// still produces one (empty) line. A word wider than the limit sits on
    /// a line of its own.
    fn measure_wrapped_lines(
        &self,
        text: &str,
        font: &FontDescriptor,
        max_width_px: f64,
    ) -> Vec<String>;
}

/// A word (or unbreakable run) with its trailing whitespace kept separate so
/// that spaces at the end of a line never count against the width.
struct Segment<'a> {
    word: &'a str,
    trailing: &'a str,
}

/// Split one row into segments at UAX#14 break opportunities.
fn segments(row: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (offset, opp) in linebreaks(row) {
        // Mandatory breaks only occur at the very end of a row here since
        // rows are already split on newlines.
        if opp == BreakOpportunity::Mandatory && offset < row.len() {
            continue;
        }
        let piece = &row[start..offset];
        let word = piece.trim_end();
        out.push(Segment {
            word,
            trailing: &piece[word.len()..],
        });
        start = offset;
    }
    out
}

/// Greedy line filling over any width function.
pub fn wrap_greedy(text: &str, max_width: f64, width_of: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    for row in text.split('\n') {
        let row = row.strip_suffix('\r').unwrap_or(row);
        if row.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut line = String::new();
        let mut pending_space = "";
        for seg in segments(row) {
            if seg.word.is_empty() {
                pending_space = seg.trailing;
                continue;
            }
            if line.is_empty() {
                line.push_str(seg.word);
            } else {
                let candidate = format!("{}{}{}", line, pending_space, seg.word);
                if width_of(&candidate) <= max_width {
                    line = candidate;
                } else {
                    lines.push(std::mem::take(&mut line));
                    line.push_str(seg.word);
                }
            }
            pending_space = seg.trailing;
        }
        lines.push(line);
    }
    lines
}

impl TextMeasure for FontContext {
    fn measure_wrapped_lines(
        &self,
        text: &str,
        font: &FontDescriptor,
        max_width_px: f64,
    ) -> Vec<String> {
        wrap_greedy(text, max_width_px, |s| {
            self.measure_string(s, &font.family, font.weight, font.italic, font.size_px)
        })
    }
}

/// Fixed-advance measurement: every character is `advance_em × size` wide.
///
/// Handy for hosts without font data and for exact line counts in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonoMeasure {
    pub advance_em: f64,
}

impl Default for MonoMeasure {
    fn default() -> Self {
        MonoMeasure { advance_em: 0.5 }
    }
}

impl TextMeasure for MonoMeasure {
    fn measure_wrapped_lines(
        &self,
        text: &str,
        font: &FontDescriptor,
        max_width_px: f64,
    ) -> Vec<String> {
        let advance = self.advance_em * font.size_px;
        wrap_greedy(text, max_width_px, |s| s.chars().count() as f64 * advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_font() -> FontDescriptor {
        FontDescriptor {
            family: "Courier".into(),
            size_px: 10.0,
            weight: 400,
            italic: false,
        }
    }

    fn mono() -> MonoMeasure {
        // 5px per char at 10px.
        MonoMeasure::default()
    }

    #[test]
    fn short_text_single_line() {
        let lines = mono().measure_wrapped_lines("hallo", &mono_font(), 100.0);
        assert_eq!(lines, vec!["hallo"]);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        // 9 chars fit in 45px.
        let lines = mono().measure_wrapped_lines("ich gehe nach hause", &mono_font(), 45.0);
        assert_eq!(lines, vec!["ich gehe", "nach", "hause"]);
    }

    #[test]
    fn overlong_word_sits_alone() {
        let lines = mono().measure_wrapped_lines("a Donaudampfschiff b", &mono_font(), 30.0);
        assert_eq!(lines, vec!["a", "Donaudampfschiff", "b"]);
    }

    #[test]
    fn blank_rows_are_kept() {
        let lines = mono().measure_wrapped_lines("eins\n\nzwei", &mono_font(), 100.0);
        assert_eq!(lines, vec!["eins", "", "zwei"]);
        let empty = mono().measure_wrapped_lines("", &mono_font(), 100.0);
        assert_eq!(empty, vec![""]);
    }

    #[test]
    fn font_context_wraps_with_real_widths() {
        let ctx = FontContext::new();
        let font = FontDescriptor {
            family: "Helvetica".into(),
            size_px: 16.0,
            weight: 400,
            italic: false,
        };
        let narrow = ctx.measure_wrapped_lines("Ich gehe heute nach Hause", &font, 80.0);
        let wide = ctx.measure_wrapped_lines("Ich gehe heute nach Hause", &font, 1000.0);
        assert!(narrow.len() > 1);
        assert_eq!(wide.len(), 1);
    }

    #[test]
    fn descriptor_display_is_css_shorthand() {
        let font = FontDescriptor {
            family: "Helvetica".into(),
            size_px: 16.0,
            weight: 700,
            italic: true,
        };
        assert_eq!(font.to_string(), "italic 700 16px Helvetica");
    }
}
