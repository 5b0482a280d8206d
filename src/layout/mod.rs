//! # Semantic Layout Generator
//!
//! Builds a complete box set for a card that has none, from the card's
//! content alone.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ hero: infinitive                         │
//! │ meta line: ●●●○○ · tags                  │
//! ├─────────────────────────┬────────────────┤
//! │ Translations            │ Forms          │
//! │ Examples                │ Synonyms       │
//! │                         │ Recommendations│
//! └─────────────────────────┴────────────────┘
//! ```
//!
//! Line heights come from a closed-form character-count estimate rather
//! than real text measurement. The generated geometry is only a seed: the
//! autosizer refines heights with the metrics provider afterwards, and users
//! usually move things around anyway.
//!
//! Columns do not paginate. When a section runs into the bottom margin the
//! remaining lines are dropped.

mod column;

use column::{fit_count, ColumnCursor};

use crate::model::{Card, CardBox, FieldId, FormKind, PageSize, BoxStyle, TextMode};
use crate::model::field::{EXAMPLE_SLOTS, RECOMMENDATION_SLOTS, SYNONYM_SLOTS, TRANSLATION_SLOTS};

pub const MARGIN_MM: f64 = 4.0;
pub const GUTTER_MM: f64 = 2.0;
/// Share of the inner width taken by the left column.
pub const LEFT_COLUMN_SHARE: f64 = 0.58;
/// Narrowest column on pages too small for margins and gutter.
pub const MIN_COLUMN_MM: f64 = 1.0;

const HERO_FONT_PT: f64 = 20.0;
const HERO_HEIGHT_MM: f64 = 10.0;
const META_FONT_PT: f64 = 8.0;
const META_HEIGHT_MM: f64 = 4.4;
const HEADER_GAP_MM: f64 = 1.5;

const SECTION_TITLE_FONT_PT: f64 = 9.0;
const SECTION_TITLE_HEIGHT_MM: f64 = 4.4;
const LINE_FONT_PT: f64 = 9.0;
const BOX_GAP_MM: f64 = 0.8;
const SECTION_GAP_MM: f64 = 1.6;

pub const SECTION_TITLE_ROLE: &str = "section-title";
pub const HERO_ROLE: &str = "hero";
pub const META_ROLE: &str = "meta";

/// Estimate a line box's height from its text length alone.
///
/// `charsPerLine = max(10, floor(w × 2.35 / max(7, fontPt)))`,
/// `lines = ceil(len / charsPerLine)`, clamped to `[4.4, 12]` mm at 3.8 mm
/// per line.
pub fn estimate_line_height(text: &str, width_mm: f64, font_pt: f64) -> f64 {
    let chars_per_line = ((width_mm * 2.35 / font_pt.max(7.0)).floor()).max(10.0);
    let len = text.chars().count() as f64;
    let lines = (len / chars_per_line).ceil();
    (lines * 3.8).clamp(4.4, 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Left,
    Right,
}

/// A titled group of line boxes placed together in one column.
struct Section {
    field: FieldId,
    column: Column,
    lines: Vec<FieldId>,
}

/// Sections in emission order, each keeping only lines with content.
fn sections(card: &Card) -> Vec<Section> {
    let keep = |ids: Vec<FieldId>| -> Vec<FieldId> {
        ids.into_iter()
            .filter(|f| !card.field_text(f).trim().is_empty())
            .collect()
    };
    let slots = |n: usize, make: fn(u8) -> FieldId| (1..=n as u8).map(make).collect::<Vec<_>>();

    vec![
        Section {
            field: FieldId::Translations,
            column: Column::Left,
            lines: keep(slots(TRANSLATION_SLOTS, FieldId::Translation)),
        },
        Section {
            field: FieldId::Forms,
            column: Column::Right,
            lines: keep(FormKind::ALL.iter().map(|k| FieldId::Form(*k)).collect()),
        },
        Section {
            field: FieldId::Synonyms,
            column: Column::Right,
            lines: keep(slots(SYNONYM_SLOTS, FieldId::Synonym)),
        },
        Section {
            field: FieldId::Examples,
            column: Column::Left,
            lines: keep(slots(EXAMPLE_SLOTS, FieldId::Example)),
        },
        Section {
            field: FieldId::Recommendations,
            column: Column::Right,
            lines: keep(slots(RECOMMENDATION_SLOTS, FieldId::Recommendation)),
        },
    ]
}

/// Collects emitted boxes with deterministic ids.
struct Emitter {
    boxes: Vec<CardBox>,
}

impl Emitter {
    fn emit(&mut self, field: FieldId, x: f64, y: f64, w: f64, h: f64) -> &mut CardBox {
        let id = format!("gen_{}_{}", self.boxes.len() + 1, field.key());
        let mut b = CardBox::new(id, field, x, y, w, h);
        b.z = self.boxes.len() as i32;
        self.boxes.push(b);
        let last = self.boxes.len() - 1;
        &mut self.boxes[last]
    }
}

/// Generate a full box layout for `card` on a page of `page` size.
pub fn generate_layout(card: &Card, page: &PageSize) -> Vec<CardBox> {
    let inner_w = (page.width_mm - 2.0 * MARGIN_MM).max(1.0);
    let bottom = page.height_mm - MARGIN_MM;
    let mut out = Emitter { boxes: Vec::new() };
    let mut y = MARGIN_MM;

    // Hero title across the full inner width.
    let hero_field = if card.inf.trim().is_empty() && !card.title.trim().is_empty() {
        FieldId::Title
    } else {
        FieldId::Inf
    };
    let hero = out.emit(hero_field, MARGIN_MM, y, inner_w, HERO_HEIGHT_MM);
    hero.style = BoxStyle::bold(HERO_FONT_PT);
    hero.kind = Some(HERO_ROLE.to_string());
    hero.text_mode = Some(TextMode::Dynamic);
    y += HERO_HEIGHT_MM + HEADER_GAP_MM;

    // Frequency is always set, so every card has a meta line.
    let meta = out.emit(FieldId::Meta, MARGIN_MM, y, inner_w, META_HEIGHT_MM);
    meta.style = BoxStyle::sized(META_FONT_PT);
    meta.kind = Some(META_ROLE.to_string());
    meta.text_mode = Some(TextMode::Static);
    meta.text = Some(card.meta_line());
    y += META_HEIGHT_MM + HEADER_GAP_MM;

    let left_share = inner_w * LEFT_COLUMN_SHARE;
    let mut left = ColumnCursor::new(
        MARGIN_MM,
        (left_share - GUTTER_MM / 2.0).max(MIN_COLUMN_MM),
        y,
        bottom,
    );
    let mut right = ColumnCursor::new(
        MARGIN_MM + left_share + GUTTER_MM / 2.0,
        (inner_w - left_share - GUTTER_MM / 2.0).max(MIN_COLUMN_MM),
        y,
        bottom,
    );

    for section in sections(card) {
        if section.lines.is_empty() {
            continue;
        }
        let cursor = match section.column {
            Column::Left => &mut left,
            Column::Right => &mut right,
        };
        place_section(card, &section, cursor, &mut out);
    }

    tracing::debug!("Generated {} boxes for card '{}'", out.boxes.len(), card.id);
    out.boxes
}

fn place_section(card: &Card, section: &Section, cursor: &mut ColumnCursor, out: &mut Emitter) {
    if !cursor.fits(SECTION_TITLE_HEIGHT_MM) {
        tracing::debug!(
            "Card '{}': no room for section '{}', dropped {} lines",
            card.id,
            section.field,
            section.lines.len()
        );
        return;
    }

    let title = out.emit(
        section.field.clone(),
        cursor.x,
        cursor.y,
        cursor.width,
        SECTION_TITLE_HEIGHT_MM,
    );
    title.style = BoxStyle::bold(SECTION_TITLE_FONT_PT);
    title.kind = Some(SECTION_TITLE_ROLE.to_string());
    title.text_mode = Some(TextMode::Static);
    title.text = Some(section.field.default_caption().to_string());
    cursor.advance(SECTION_TITLE_HEIGHT_MM + BOX_GAP_MM);

    let heights: Vec<f64> = section
        .lines
        .iter()
        .map(|f| estimate_line_height(&card.field_text(f), cursor.width, LINE_FONT_PT))
        .collect();
    let placed = fit_count(cursor.remaining_height(), &heights, BOX_GAP_MM);
    if placed < section.lines.len() {
        tracing::debug!(
            "Card '{}': section '{}' truncated, {} of {} lines placed",
            card.id,
            section.field,
            placed,
            section.lines.len()
        );
    }

    for (field, h) in section.lines.iter().zip(&heights).take(placed) {
        let line = out.emit(field.clone(), cursor.x, cursor.y, cursor.width, *h);
        line.style = BoxStyle::sized(LINE_FONT_PT);
        line.text_mode = Some(TextMode::Dynamic);
        cursor.advance(h + BOX_GAP_MM);
    }
    cursor.advance(SECTION_GAP_MM);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Example, Translation, WordPair};

    fn rich_card() -> Card {
        let mut card = Card::empty("c1");
        card.inf = "gehen".into();
        card.translations[0] = Translation {
            ru: "идти".into(),
            ctx: String::new(),
        };
        card.translations[2] = Translation {
            ru: "ходить".into(),
            ctx: "регулярно".into(),
        };
        card.forms.p3 = "geht".into();
        card.forms.aux = "sein".into();
        card.synonyms[0] = WordPair {
            de: "laufen".into(),
            ru: "бежать".into(),
        };
        card.examples[0] = Example {
            de: "Ich gehe nach Hause.".into(),
            ru: "Я иду домой.".into(),
            tag: String::new(),
        };
        card
    }

    fn fields(boxes: &[CardBox]) -> Vec<FieldId> {
        boxes.iter().map(|b| b.field_id.clone()).collect()
    }

    #[test]
    fn estimate_formula() {
        // 50mm at 9pt: floor(50 * 2.35 / 9) = 13 chars per line.
        assert_eq!(estimate_line_height("", 50.0, 9.0), 4.4);
        assert_eq!(estimate_line_height(&"a".repeat(13), 50.0, 9.0), 4.4);
        assert!((estimate_line_height(&"a".repeat(14), 50.0, 9.0) - 7.6).abs() < 1e-9);
        assert_eq!(estimate_line_height(&"a".repeat(200), 50.0, 9.0), 12.0);
        // Narrow boxes still assume at least 10 chars per line.
        assert_eq!(estimate_line_height(&"a".repeat(10), 5.0, 9.0), 4.4);
    }

    #[test]
    fn emits_sections_in_order() {
        let boxes = generate_layout(&rich_card(), &PageSize::A6_LANDSCAPE);
        assert_eq!(
            fields(&boxes),
            vec![
                FieldId::Inf,
                FieldId::Meta,
                FieldId::Translations,
                FieldId::Translation(1),
                FieldId::Translation(3),
                FieldId::Forms,
                FieldId::Form(FormKind::P3),
                FieldId::Form(FormKind::Aux),
                FieldId::Synonyms,
                FieldId::Synonym(1),
                FieldId::Examples,
                FieldId::Example(1),
            ]
        );
    }

    #[test]
    fn z_is_dense_and_ids_unique() {
        let boxes = generate_layout(&rich_card(), &PageSize::A6_LANDSCAPE);
        for (i, b) in boxes.iter().enumerate() {
            assert_eq!(b.z, i as i32);
        }
        let mut ids: Vec<_> = boxes.iter().map(|b| b.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), boxes.len());
    }

    #[test]
    fn columns_split_inner_width() {
        let page = PageSize::A6_LANDSCAPE;
        let boxes = generate_layout(&rich_card(), &page);
        let inner = page.width_mm - 2.0 * MARGIN_MM;
        let tr = boxes.iter().find(|b| b.field_id == FieldId::Translations).unwrap();
        let forms = boxes.iter().find(|b| b.field_id == FieldId::Forms).unwrap();
        assert_eq!(tr.x_mm, MARGIN_MM);
        assert!((tr.w_mm - (inner * 0.58 - 1.0)).abs() < 1e-9);
        assert!((forms.x_mm - (MARGIN_MM + inner * 0.58 + 1.0)).abs() < 1e-9);
        assert!((forms.x_mm + forms.w_mm - (page.width_mm - MARGIN_MM)).abs() < 1e-9);
        // Both columns start at the same height.
        assert_eq!(tr.y_mm, forms.y_mm);
    }

    #[test]
    fn meta_line_with_and_without_tags() {
        let mut card = rich_card();
        card.freq = 4;
        let boxes = generate_layout(&card, &PageSize::A6_LANDSCAPE);
        let meta = boxes.iter().find(|b| b.field_id == FieldId::Meta).unwrap();
        assert_eq!(meta.text.as_deref(), Some("●●●●○"));
        assert_eq!(meta.kind.as_deref(), Some(META_ROLE));
        assert_eq!(boxes[0].reserve_right_mm, None);

        card.tags = vec!["A1".into()];
        let boxes = generate_layout(&card, &PageSize::A6_LANDSCAPE);
        let meta = boxes.iter().find(|b| b.field_id == FieldId::Meta).unwrap();
        assert_eq!(meta.text.as_deref(), Some(card.meta_line().as_str()));
    }

    #[test]
    fn narrow_page_keeps_positive_sizes() {
        let page = PageSize::parse("9x105").unwrap();
        let boxes = generate_layout(&rich_card(), &page);
        assert!(boxes.iter().any(|b| b.field_id == FieldId::Translations));
        for b in &boxes {
            assert!(b.w_mm > 0.0 && b.h_mm > 0.0, "{} is {}x{}", b.id, b.w_mm, b.h_mm);
        }
    }

    #[test]
    fn empty_sections_are_skipped() {
        let mut card = Card::empty("bare");
        card.inf = "sein".into();
        let boxes = generate_layout(&card, &PageSize::A6_LANDSCAPE);
        assert_eq!(fields(&boxes), vec![FieldId::Inf, FieldId::Meta]);
    }

    #[test]
    fn overflow_is_truncated_inside_margins() {
        let mut card = rich_card();
        for (i, ex) in card.examples.iter_mut().enumerate() {
            ex.de = format!("Beispielsatz {} ", i).repeat(12);
        }
        let page = PageSize::new(148.0, 50.0);
        let boxes = generate_layout(&card, &page);
        let examples = boxes
            .iter()
            .filter(|b| matches!(b.field_id, FieldId::Example(_)))
            .count();
        assert!(examples < 5);
        for b in &boxes {
            assert!(b.y_mm + b.h_mm <= page.height_mm - MARGIN_MM + 1e-9, "{} overflows", b.id);
        }
    }

    #[test]
    fn deterministic_output() {
        let a = generate_layout(&rich_card(), &PageSize::A6_LANDSCAPE);
        let b = generate_layout(&rich_card(), &PageSize::A6_LANDSCAPE);
        assert_eq!(a, b);
    }
}
