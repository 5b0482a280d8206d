//! # Card Model
//!
//! The canonical representation the whole engine works on. A card is a flat
//! record of vocabulary fields plus an ordered list of [`CardBox`]es that
//! place those fields on a page-like canvas.
//!
//! All geometry is in millimetres. Font sizes are in points, as a user would
//! type them into a style panel.

pub mod card_box;
pub mod field;

pub use card_box::{BoxStyle, CardBox, TextAlign, TextMode};
pub use field::{ExPart, FieldId, FormKind, PairPart, TrPart};

use field::{EXAMPLE_SLOTS, RECOMMENDATION_SLOTS, SYNONYM_SLOTS, TRANSLATION_SLOTS};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FREQ: u8 = 3;

/// A flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub inf: String,
    #[serde(default)]
    pub title: String,
    /// Frequency rating, always within `1..=5`.
    #[serde(default = "default_freq")]
    pub freq: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub translations: [Translation; TRANSLATION_SLOTS],
    #[serde(default)]
    pub forms: VerbForms,
    #[serde(default)]
    pub synonyms: [WordPair; SYNONYM_SLOTS],
    #[serde(default)]
    pub examples: [Example; EXAMPLE_SLOTS],
    #[serde(default)]
    pub recommendations: [WordPair; RECOMMENDATION_SLOTS],
    #[serde(default)]
    pub boxes: Vec<CardBox>,
    /// Where the card came from, if it was imported.
    #[serde(rename = "_import", default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

fn default_freq() -> u8 {
    DEFAULT_FREQ
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub ru: String,
    #[serde(default)]
    pub ctx: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbForms {
    #[serde(default)]
    pub p3: String,
    #[serde(default)]
    pub prat: String,
    #[serde(default)]
    pub p2: String,
    #[serde(default)]
    pub aux: String,
}

impl VerbForms {
    pub fn get(&self, kind: FormKind) -> &str {
        match kind {
            FormKind::P3 => &self.p3,
            FormKind::Prat => &self.prat,
            FormKind::P2 => &self.p2,
            FormKind::Aux => &self.aux,
        }
    }

    fn get_mut(&mut self, kind: FormKind) -> &mut String {
        match kind {
            FormKind::P3 => &mut self.p3,
            FormKind::Prat => &mut self.prat,
            FormKind::P2 => &mut self.p2,
            FormKind::Aux => &mut self.aux,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    #[serde(default)]
    pub de: String,
    #[serde(default)]
    pub ru: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub de: String,
    #[serde(default)]
    pub ru: String,
    #[serde(default)]
    pub tag: String,
}

/// Which import shape a card was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSchema {
    Cards,
    Array,
    Verbs,
    Unknown,
}

impl ImportSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSchema::Cards => "cards",
            ImportSchema::Array => "array",
            ImportSchema::Verbs => "verbs",
            ImportSchema::Unknown => "unknown",
        }
    }
}

/// Import metadata kept beside the canonical fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// The entry exactly as it appeared in the import payload.
    pub raw: serde_json::Value,
    pub schema: ImportSchema,
    pub index: usize,
}

/// Page (card) dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A6_LANDSCAPE
    }
}

impl PageSize {
    pub const A6_LANDSCAPE: PageSize = PageSize::new(148.0, 105.0);
    pub const A6_PORTRAIT: PageSize = PageSize::new(105.0, 148.0);
    pub const A5_LANDSCAPE: PageSize = PageSize::new(210.0, 148.0);
    /// 5 × 3 inch index card.
    pub const INDEX_CARD: PageSize = PageSize::new(127.0, 76.2);

    pub const fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }

    /// Parse `WxH` (millimetres) or one of the preset names.
    pub fn parse(s: &str) -> Option<PageSize> {
        match s.trim().to_lowercase().as_str() {
            "a6" | "a6-landscape" => return Some(Self::A6_LANDSCAPE),
            "a6-portrait" => return Some(Self::A6_PORTRAIT),
            "a5" | "a5-landscape" => return Some(Self::A5_LANDSCAPE),
            "index" | "index-card" => return Some(Self::INDEX_CARD),
            _ => {}
        }
        let (w, h) = s.split_once(['x', 'X'])?;
        let w: f64 = w.trim().parse().ok()?;
        let h: f64 = h.trim().parse().ok()?;
        (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then_some(Self::new(w, h))
    }
}

impl Card {
    /// An empty card with the given id and every field defaulted.
    pub fn empty(id: impl Into<String>) -> Self {
        Card {
            id: id.into(),
            inf: String::new(),
            title: String::new(),
            freq: DEFAULT_FREQ,
            tags: Vec::new(),
            translations: Default::default(),
            forms: VerbForms::default(),
            synonyms: Default::default(),
            examples: Default::default(),
            recommendations: Default::default(),
            boxes: Vec::new(),
            provenance: None,
        }
    }

    /// Resolve the live text of a field. Synthetic fields resolve to "".
    pub fn field_text(&self, field: &FieldId) -> String {
        match field {
            FieldId::Inf => self.inf.clone(),
            FieldId::Title => self.title.clone(),
            FieldId::Freq => self.freq.to_string(),
            FieldId::Tags => self.tags.join(", "),
            FieldId::Tr(i, part) => self
                .translation(*i)
                .map(|t| match part {
                    TrPart::Ru => t.ru.clone(),
                    TrPart::Ctx => t.ctx.clone(),
                })
                .unwrap_or_default(),
            FieldId::Translation(i) => self
                .translation(*i)
                .map(translation_line)
                .unwrap_or_default(),
            FieldId::Form(kind) => self.forms.get(*kind).to_string(),
            FieldId::Forms => forms_line(&self.forms),
            FieldId::Syn(i, part) => slot(&self.synonyms, *i)
                .map(|p| pair_part(p, *part).to_string())
                .unwrap_or_default(),
            FieldId::Synonym(i) => slot(&self.synonyms, *i).map(pair_line).unwrap_or_default(),
            FieldId::Ex(i, part) => slot(&self.examples, *i)
                .map(|e| match part {
                    ExPart::De => e.de.clone(),
                    ExPart::Ru => e.ru.clone(),
                    ExPart::Tag => e.tag.clone(),
                })
                .unwrap_or_default(),
            FieldId::Example(i) => slot(&self.examples, *i).map(example_line).unwrap_or_default(),
            FieldId::Rek(i, part) => slot(&self.recommendations, *i)
                .map(|p| pair_part(p, *part).to_string())
                .unwrap_or_default(),
            FieldId::Recommendation(i) => slot(&self.recommendations, *i)
                .map(pair_line)
                .unwrap_or_default(),
            FieldId::Meta
            | FieldId::Translations
            | FieldId::Synonyms
            | FieldId::Examples
            | FieldId::Recommendations
            | FieldId::Custom(_) => String::new(),
        }
    }

    /// Write a single text field. Returns `false` for aggregates and synthetic
    /// fields, which have no single backing value.
    pub fn set_field_text(&mut self, field: &FieldId, value: String) -> bool {
        let target: &mut String = match field {
            FieldId::Inf => &mut self.inf,
            FieldId::Title => &mut self.title,
            FieldId::Tr(i, part) => match slot_mut(&mut self.translations, *i) {
                Some(t) => match part {
                    TrPart::Ru => &mut t.ru,
                    TrPart::Ctx => &mut t.ctx,
                },
                None => return false,
            },
            FieldId::Form(kind) => self.forms.get_mut(*kind),
            FieldId::Syn(i, part) => match slot_mut(&mut self.synonyms, *i) {
                Some(p) => pair_part_mut(p, *part),
                None => return false,
            },
            FieldId::Ex(i, part) => match slot_mut(&mut self.examples, *i) {
                Some(e) => match part {
                    ExPart::De => &mut e.de,
                    ExPart::Ru => &mut e.ru,
                    ExPart::Tag => &mut e.tag,
                },
                None => return false,
            },
            FieldId::Rek(i, part) => match slot_mut(&mut self.recommendations, *i) {
                Some(p) => pair_part_mut(p, *part),
                None => return false,
            },
            _ => return false,
        };
        *target = value;
        true
    }

    pub fn translation(&self, slot_no: u8) -> Option<&Translation> {
        slot(&self.translations, slot_no)
    }

    /// The frequency strip plus tags, as shown on the meta line.
    pub fn meta_line(&self) -> String {
        let dots: String = (1..=5u8)
            .map(|i| if i <= self.freq { '●' } else { '○' })
            .collect();
        if self.tags.is_empty() {
            dots
        } else {
            format!("{} · {}", dots, self.tags.join(", "))
        }
    }

    pub fn find_box(&self, id: &str) -> Option<&CardBox> {
        self.boxes.iter().find(|b| b.id == id)
    }
}

fn slot<T>(items: &[T], slot_no: u8) -> Option<&T> {
    (slot_no as usize).checked_sub(1).and_then(|i| items.get(i))
}

fn slot_mut<T>(items: &mut [T], slot_no: u8) -> Option<&mut T> {
    (slot_no as usize).checked_sub(1).and_then(move |i| items.get_mut(i))
}

fn pair_part(p: &WordPair, part: PairPart) -> &str {
    match part {
        PairPart::De => &p.de,
        PairPart::Ru => &p.ru,
    }
}

fn pair_part_mut(p: &mut WordPair, part: PairPart) -> &mut String {
    match part {
        PairPart::De => &mut p.de,
        PairPart::Ru => &mut p.ru,
    }
}

fn translation_line(t: &Translation) -> String {
    match (t.ru.trim().is_empty(), t.ctx.trim().is_empty()) {
        (false, false) => format!("{} ({})", t.ru, t.ctx),
        (false, true) => t.ru.clone(),
        (true, false) => format!("({})", t.ctx),
        (true, true) => String::new(),
    }
}

fn pair_line(p: &WordPair) -> String {
    join_nonempty(&[&p.de, &p.ru], " — ")
}

fn example_line(e: &Example) -> String {
    let line = join_nonempty(&[&e.de, &e.ru], " — ");
    if e.tag.trim().is_empty() || line.is_empty() {
        line
    } else {
        format!("[{}] {}", e.tag, line)
    }
}

fn forms_line(f: &VerbForms) -> String {
    let line = join_nonempty(&[&f.p3, &f.prat, &f.p2], " · ");
    if f.aux.trim().is_empty() {
        line
    } else {
        format!("{} ({})", line, f.aux)
    }
}

fn join_nonempty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|p| !p.trim().is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Card {
        let mut card = Card::empty("c1");
        card.inf = "gehen".into();
        card.translations[0] = Translation {
            ru: "идти".into(),
            ctx: "пешком".into(),
        };
        card.forms.p3 = "geht".into();
        card.forms.prat = "ging".into();
        card.forms.p2 = "gegangen".into();
        card.forms.aux = "sein".into();
        card.examples[1] = Example {
            de: "Ich gehe.".into(),
            ru: "Я иду.".into(),
            tag: "A1".into(),
        };
        card
    }

    #[test]
    fn resolves_slot_fields() {
        let card = sample();
        assert_eq!(card.field_text(&FieldId::Tr(1, TrPart::Ru)), "идти");
        assert_eq!(card.field_text(&FieldId::Translation(1)), "идти (пешком)");
        assert_eq!(card.field_text(&FieldId::Translation(2)), "");
        assert_eq!(card.field_text(&FieldId::Form(FormKind::P3)), "geht");
        assert_eq!(card.field_text(&FieldId::Forms), "geht · ging · gegangen (sein)");
        assert_eq!(card.field_text(&FieldId::Example(2)), "[A1] Ich gehe. — Я иду.");
        assert_eq!(card.field_text(&FieldId::Translations), "");
    }

    #[test]
    fn set_field_text_writes_slots() {
        let mut card = sample();
        assert!(card.set_field_text(&FieldId::Syn(3, PairPart::Ru), "уходить".into()));
        assert_eq!(card.synonyms[2].ru, "уходить");
        assert!(!card.set_field_text(&FieldId::Synonyms, "x".into()));
        assert!(!card.set_field_text(&FieldId::Custom("x".into()), "x".into()));
    }

    #[test]
    fn meta_line_shows_dots_and_tags() {
        let mut card = sample();
        card.freq = 2;
        assert_eq!(card.meta_line(), "●●○○○");
        card.tags = vec!["verb".into(), "A1".into()];
        assert_eq!(card.meta_line(), "●●○○○ · verb, A1");
    }

    #[test]
    fn page_size_parse() {
        assert_eq!(PageSize::parse("100x70"), Some(PageSize::new(100.0, 70.0)));
        assert_eq!(PageSize::parse("a6-portrait"), Some(PageSize::A6_PORTRAIT));
        assert_eq!(PageSize::parse("0x70"), None);
        assert_eq!(PageSize::parse("wide"), None);
    }
}
