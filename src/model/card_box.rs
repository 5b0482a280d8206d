//! Boxes: positioned, styled rectangles bound to one card field.

use serde::{Deserialize, Serialize};

use super::field::FieldId;
use super::Card;

/// Whether a box shows literal text or live field content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Visual style of a box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxStyle {
    #[serde(default = "default_family")]
    pub font_family: String,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Font weight (100-900).
    #[serde(default = "default_weight")]
    pub font_weight: u32,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub align: TextAlign,
    /// Line height as a multiplier of font size. Always > 0.
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Inner padding in millimetres. Always >= 0.
    #[serde(default = "default_padding")]
    pub padding_mm: f64,
    #[serde(default)]
    pub border: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

pub const DEFAULT_FONT_SIZE: f64 = 10.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;
pub const DEFAULT_PADDING_MM: f64 = 0.8;

fn default_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_weight() -> u32 {
    400
}

fn default_line_height() -> f64 {
    DEFAULT_LINE_HEIGHT
}

fn default_padding() -> f64 {
    DEFAULT_PADDING_MM
}

fn default_true() -> bool {
    true
}

impl Default for BoxStyle {
    fn default() -> Self {
        BoxStyle {
            font_family: default_family(),
            font_size: DEFAULT_FONT_SIZE,
            font_weight: 400,
            italic: false,
            align: TextAlign::Left,
            line_height: DEFAULT_LINE_HEIGHT,
            padding_mm: DEFAULT_PADDING_MM,
            border: false,
            visible: true,
        }
    }
}

impl BoxStyle {
    pub fn bold(font_size: f64) -> Self {
        BoxStyle {
            font_size,
            font_weight: 700,
            ..Default::default()
        }
    }

    pub fn sized(font_size: f64) -> Self {
        BoxStyle {
            font_size,
            ..Default::default()
        }
    }

    /// Clamp values a renderer cannot use back into range.
    pub fn sanitized(mut self) -> Self {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            self.font_size = DEFAULT_FONT_SIZE;
        }
        if !(self.line_height.is_finite() && self.line_height > 0.0) {
            self.line_height = DEFAULT_LINE_HEIGHT;
        }
        if !(self.padding_mm.is_finite() && self.padding_mm >= 0.0) {
            self.padding_mm = 0.0;
        }
        self.font_weight = self.font_weight.clamp(100, 900);
        self
    }
}

/// A positioned text box on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBox {
    pub id: String,
    pub field_id: FieldId,
    pub x_mm: f64,
    pub y_mm: f64,
    pub w_mm: f64,
    pub h_mm: f64,
    #[serde(default)]
    pub z: i32,
    #[serde(default)]
    pub rotate_deg: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub style: BoxStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_mode: Option<TextMode>,
    /// Literal text for static boxes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Explicit role tag, e.g. `section-title`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Explicit autosize flag. `None` infers from the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_h: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<f64>,
    /// Space kept free at the right edge, e.g. for the frequency dots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_right_mm: Option<f64>,
}

impl CardBox {
    pub fn new(id: impl Into<String>, field_id: FieldId, x: f64, y: f64, w: f64, h: f64) -> Self {
        CardBox {
            id: id.into(),
            field_id,
            x_mm: x,
            y_mm: y,
            w_mm: w,
            h_mm: h,
            z: 0,
            rotate_deg: 0.0,
            locked: false,
            style: BoxStyle::default(),
            text_mode: None,
            text: None,
            label: None,
            kind: None,
            auto_h: None,
            min_h: None,
            max_h: None,
            reserve_right_mm: None,
        }
    }

    /// The mode actually in effect: explicit mode, else dynamic for real card
    /// fields and static for synthetic ones.
    pub fn effective_mode(&self) -> TextMode {
        self.text_mode.unwrap_or(if self.field_id.is_card_field() {
            TextMode::Dynamic
        } else {
            TextMode::Static
        })
    }

    /// The text this box displays for `card`.
    pub fn resolve_text(&self, card: &Card) -> String {
        match self.effective_mode() {
            TextMode::Static => self.text.clone().unwrap_or_default(),
            TextMode::Dynamic => card.field_text(&self.field_id),
        }
    }

    /// Role token used to tell apart boxes bound to the same field.
    pub fn role(&self) -> &str {
        self.kind
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_mode_follows_field() {
        let dynamic = CardBox::new("a", FieldId::Inf, 0.0, 0.0, 10.0, 5.0);
        assert_eq!(dynamic.effective_mode(), TextMode::Dynamic);
        let synthetic = CardBox::new("b", FieldId::Translations, 0.0, 0.0, 10.0, 5.0);
        assert_eq!(synthetic.effective_mode(), TextMode::Static);
    }

    #[test]
    fn static_box_uses_literal_text() {
        let mut card = Card::empty("c");
        card.inf = "machen".into();
        let mut b = CardBox::new("a", FieldId::Inf, 0.0, 0.0, 10.0, 5.0);
        assert_eq!(b.resolve_text(&card), "machen");
        b.text_mode = Some(TextMode::Static);
        b.text = Some("literal".into());
        assert_eq!(b.resolve_text(&card), "literal");
    }

    #[test]
    fn role_prefers_type_then_label() {
        let mut b = CardBox::new("a", FieldId::Inf, 0.0, 0.0, 10.0, 5.0);
        assert_eq!(b.role(), "");
        b.label = Some("caption".into());
        assert_eq!(b.role(), "caption");
        b.kind = Some("hero".into());
        assert_eq!(b.role(), "hero");
    }

    #[test]
    fn sanitized_style_is_usable() {
        let style = BoxStyle {
            line_height: 0.0,
            padding_mm: -1.0,
            font_size: f64::NAN,
            font_weight: 1200,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(style.line_height, DEFAULT_LINE_HEIGHT);
        assert_eq!(style.padding_mm, 0.0);
        assert_eq!(style.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(style.font_weight, 900);
    }
}
