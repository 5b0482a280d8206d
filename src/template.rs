//! # Layout Templates
//!
//! A template is the geometry and style of one card's boxes, stripped of
//! content, so it can be replayed onto other cards.
//!
//! Matching is deliberately simple. Target boxes are grouped by
//! `(fieldId, role)` and each template box takes the first box of its group
//! that has not been consumed yet. There is no best-fit search: two boxes
//! bound to the same field and role are matched in document order.
//!
//! ```text
//! template:  [inf/hero] [tr_1/] [tr_1/] [examples/section-title]
//! target:    [tr_1/a]  [inf/hero]  [tr_1/b]  [note/]
//!                 │         │          │        │
//! result:    [inf/hero ← 2nd] [tr_1 ← a] [tr_1 ← b] [examples ← new box] [note ← appended]
//! ```

use std::collections::{HashMap, VecDeque};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::autosize::autosize_card;
use crate::model::{BoxStyle, Card, CardBox, FieldId, PageSize, TextMode};
use crate::text::TextMeasure;
use crate::CardError;

pub const TEMPLATE_VERSION: u64 = 1;

/// Box layout captured from a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTemplate {
    pub version: u64,
    pub card_size: PageSize,
    pub boxes: Vec<TemplateBox>,
}

/// One box of a template. Carries no text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateBox {
    pub field_id: FieldId,
    #[serde(default)]
    pub role: String,
    pub x_mm: f64,
    pub y_mm: f64,
    pub w_mm: f64,
    pub h_mm: f64,
    #[serde(default)]
    pub z: i32,
    #[serde(default)]
    pub style: BoxStyle,
    #[serde(default)]
    pub rotate_deg: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_mode: Option<TextMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl TemplateBox {
    fn from_box(b: &CardBox) -> Self {
        TemplateBox {
            field_id: b.field_id.clone(),
            role: b.role().to_string(),
            x_mm: b.x_mm,
            y_mm: b.y_mm,
            w_mm: b.w_mm,
            h_mm: b.h_mm,
            z: b.z,
            style: b.style.clone(),
            rotate_deg: b.rotate_deg,
            locked: b.locked,
            text_mode: b.text_mode,
            label: b.label.clone(),
            kind: b.kind.clone(),
        }
    }

    fn match_key(&self) -> (String, &str) {
        (self.field_id.key(), self.role.as_str())
    }

    /// Copy geometry and presentation onto an existing box.
    fn restyle(&self, target: &mut CardBox) {
        target.x_mm = self.x_mm;
        target.y_mm = self.y_mm;
        target.w_mm = self.w_mm;
        target.h_mm = self.h_mm;
        target.style = self.style.clone();
        target.rotate_deg = self.rotate_deg;
        target.label = self.label.clone();
        target.kind = self.kind.clone();
    }

    /// A fresh box for a template entry nothing on the card matched.
    fn synthesize(&self, card: &Card) -> CardBox {
        let mut b = CardBox::new(
            format!("box_{}", Uuid::new_v4().simple()),
            self.field_id.clone(),
            self.x_mm,
            self.y_mm,
            self.w_mm,
            self.h_mm,
        );
        self.restyle(&mut b);
        b.locked = self.locked;
        if self.field_id.is_card_field() {
            b.text_mode = Some(TextMode::Dynamic);
        } else {
            let mode = self.text_mode.unwrap_or(TextMode::Static);
            b.text_mode = Some(mode);
            if mode == TextMode::Static {
                b.text = Some(match self.field_id {
                    FieldId::Meta => card.meta_line(),
                    _ => self.field_id.default_caption().to_string(),
                });
            }
        }
        b
    }
}

impl LayoutTemplate {
    /// Parse template JSON, rejecting versions this build cannot read.
    pub fn from_json(text: &str) -> Result<Self, CardError> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        if version != TEMPLATE_VERSION {
            return Err(CardError::TemplateVersion(version));
        }
        Ok(serde_json::from_value(raw)?)
    }

    /// Rescale geometry proportionally to another card size.
    pub fn scaled_to(&self, page: &PageSize) -> LayoutTemplate {
        if self.card_size == *page {
            return self.clone();
        }
        let sx = page.width_mm / self.card_size.width_mm;
        let sy = page.height_mm / self.card_size.height_mm;
        if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
            return self.clone();
        }
        LayoutTemplate {
            version: self.version,
            card_size: *page,
            boxes: self
                .boxes
                .iter()
                .map(|b| TemplateBox {
                    x_mm: b.x_mm * sx,
                    y_mm: b.y_mm * sy,
                    w_mm: b.w_mm * sx,
                    h_mm: b.h_mm * sy,
                    ..b.clone()
                })
                .collect(),
        }
    }
}

/// Capture the layout of `card`.
pub fn extract_template(card: &Card, page: &PageSize) -> LayoutTemplate {
    LayoutTemplate {
        version: TEMPLATE_VERSION,
        card_size: *page,
        boxes: card.boxes.iter().map(TemplateBox::from_box).collect(),
    }
}

/// Replay `template` onto `card`.
pub fn apply_template(card: &Card, template: &LayoutTemplate) -> Card {
    let mut pools: HashMap<(String, &str), VecDeque<usize>> = HashMap::new();
    for (i, b) in card.boxes.iter().enumerate() {
        pools
            .entry((b.field_id.key(), b.role()))
            .or_default()
            .push_back(i);
    }

    let mut consumed = vec![false; card.boxes.len()];
    let mut boxes = Vec::with_capacity(template.boxes.len() + card.boxes.len());
    let mut synthesized = 0usize;
    for tb in &template.boxes {
        let (key, role) = tb.match_key();
        let hit = pools.get_mut(&(key, role)).and_then(VecDeque::pop_front);
        match hit {
            Some(i) => {
                consumed[i] = true;
                let mut b = card.boxes[i].clone();
                tb.restyle(&mut b);
                boxes.push(b);
            }
            None => {
                synthesized += 1;
                boxes.push(tb.synthesize(card));
            }
        }
    }

    let leftovers = card
        .boxes
        .iter()
        .zip(&consumed)
        .filter(|(_, used)| !**used)
        .map(|(b, _)| b.clone());
    boxes.extend(leftovers);
    for (z, b) in boxes.iter_mut().enumerate() {
        b.z = z as i32;
    }

    tracing::debug!(
        "Applied template to '{}': {} boxes, {} synthesized",
        card.id,
        boxes.len(),
        synthesized
    );
    Card {
        boxes,
        ..card.clone()
    }
}

/// Apply a template to every card except `exclude`, autosizing each result.
pub fn apply_template_to_cards(
    cards: &[Card],
    template: &LayoutTemplate,
    exclude: Option<&str>,
    measure: &dyn TextMeasure,
) -> Vec<Card> {
    let result: Vec<Card> = cards
        .par_iter()
        .map(|card| {
            if exclude == Some(card.id.as_str()) {
                return card.clone();
            }
            let applied = apply_template(card, template);
            autosize_card(&applied, measure).into_owned()
        })
        .collect();
    tracing::info!(
        "Applied template ({} boxes) across {} cards",
        template.boxes.len(),
        cards.len()
    );
    result
}
