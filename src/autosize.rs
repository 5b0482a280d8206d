//! # Text Autosizer
//!
//! Recomputes the height of auto-height boxes from the text they currently
//! show. Widths never change; only `hMm` follows the content.
//!
//! Updates below [`HEIGHT_EPSILON_MM`] are ignored so that repeated passes
//! settle immediately and float noise does not produce a fresh card (and a
//! fresh persistence write) on every edit.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::model::{Card, CardBox};
use crate::text::{FontDescriptor, TextMeasure, MM_PER_PT, PX_PER_MM};

/// Height changes at or below this are treated as no change.
pub const HEIGHT_EPSILON_MM: f64 = 0.15;
/// Floor for any autosized box.
const MIN_BOX_HEIGHT_MM: f64 = 1.0;

/// Whether a box follows its content height.
pub fn is_auto_height(b: &CardBox) -> bool {
    b.auto_h.unwrap_or_else(|| b.field_id.is_multiline())
}

/// The height `b` needs to show its text on `card`.
pub fn required_height(card: &Card, b: &CardBox, measure: &dyn TextMeasure) -> f64 {
    let style = &b.style;
    let text = b.resolve_text(card);
    let padding = style.padding_mm.max(0.0);
    let reserve = b.reserve_right_mm.unwrap_or(0.0).max(0.0);
    let content_w_mm = (b.w_mm - 2.0 * padding - reserve).max(1.0);

    let font = FontDescriptor::from_style(style);
    let lines = measure.measure_wrapped_lines(&text, &font, content_w_mm * PX_PER_MM);
    let line_count = lines.len().max(1) as f64;

    let line_height = if style.line_height > 0.0 {
        style.line_height
    } else {
        1.0
    };
    let mut height = 2.0 * padding + line_count * style.font_size * MM_PER_PT * line_height;
    if let Some(min_h) = b.min_h {
        height = height.max(min_h);
    }
    if let Some(max_h) = b.max_h {
        height = height.min(max_h);
    }
    height.max(MIN_BOX_HEIGHT_MM)
}

/// Autosize one box. Returns `None` when the box is not auto-height or its
/// height is already within tolerance.
pub fn autosize_box(card: &Card, b: &CardBox, measure: &dyn TextMeasure) -> Option<CardBox> {
    if !is_auto_height(b) {
        return None;
    }
    let target = required_height(card, b, measure);
    if (target - b.h_mm).abs() <= HEIGHT_EPSILON_MM {
        return None;
    }
    Some(CardBox {
        h_mm: target,
        ..b.clone()
    })
}

/// Autosize every auto-height box on a card.
///
/// Borrows the input back when nothing moved, so callers can skip
/// downstream work with a cheap `Cow::Borrowed` check.
pub fn autosize_card<'a>(card: &'a Card, measure: &dyn TextMeasure) -> Cow<'a, Card> {
    let mut updated: Option<Card> = None;
    for (i, b) in card.boxes.iter().enumerate() {
        if let Some(resized) = autosize_box(card, b, measure) {
            let target = updated.get_or_insert_with(|| card.clone());
            target.boxes[i] = resized;
        }
    }
    match updated {
        Some(card) => {
            tracing::debug!("Autosized card '{}'", card.id);
            Cow::Owned(card)
        }
        None => Cow::Borrowed(card),
    }
}

/// Autosize a whole list. Cards are independent, so they run in parallel;
/// boxes within one card stay sequential.
pub fn autosize_cards(cards: &[Card], measure: &dyn TextMeasure) -> Vec<Card> {
    cards
        .par_iter()
        .map(|card| autosize_card(card, measure).into_owned())
        .collect()
}
