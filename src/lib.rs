//! # cardlayout
//!
//! A layout engine for language-learning flashcards.
//!
//! Vocabulary data arrives in whatever JSON shape a word list happens to be
//! exported in. The engine turns it into canonical cards, places every
//! field on a fixed-size card as a positioned box, keeps box heights in step
//! with their text, and lets one card's hand-tuned layout be replayed onto
//! the rest of the deck.
//!
//! ## Architecture
//!
//! ```text
//! Import JSON
//!       ↓
//!   [import]    — Detect the payload shape, coerce fields, derive ids
//!       ↓
//!   [layout]    — Two-column semantic layout for cards without boxes
//!       ↓
//!   [autosize]  — Fit box heights to wrapped text, via [text] + [font]
//!       ↓
//!   [template]  — Capture one card's layout, replay it onto others
//!       ↓
//!   [store]     — Reducer, undo/redo, bookmarks, chunked persistence
//! ```

pub mod autosize;
pub mod config;
pub mod error;
pub mod font;
pub mod import;
pub mod layout;
pub mod model;
pub mod store;
pub mod template;
pub mod text;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::CardError;

use autosize::autosize_cards;
use font::FontContext;
use model::{Card, PageSize};
use template::{apply_template_to_cards, extract_template, LayoutTemplate};

/// Import JSON text and autosize the resulting cards.
///
/// This is the primary entry point. Accepts every supported import shape,
/// including the `{cards: [...]}` envelope produced by [`export_json`].
pub fn normalize_json(json: &str, page: &PageSize) -> Result<Vec<Card>, CardError> {
    let cards = import::import_json(json, page)?;
    Ok(autosize_cards(&cards, &FontContext::new()))
}

/// Serialize cards in the `{cards: [...]}` export envelope.
pub fn export_json(cards: &[Card]) -> Result<String, CardError> {
    let value = import::export_cards(cards)?;
    serde_json::to_string_pretty(&value).map_err(CardError::Serialize)
}

/// Re-run the autosizer over a card payload.
pub fn autosize_json(json: &str) -> Result<String, CardError> {
    let cards = normalize_json(json, &PageSize::default())?;
    export_json(&cards)
}

/// Capture the layout of the card `card_id` as template JSON.
pub fn extract_template_json(json: &str, card_id: &str, page: &PageSize) -> Result<String, CardError> {
    let cards = import::import_json(json, page)?;
    let card = cards
        .iter()
        .find(|c| c.id == card_id)
        .ok_or_else(|| CardError::CardNotFound(card_id.to_string()))?;
    let template = extract_template(card, page);
    serde_json::to_string_pretty(&template).map_err(CardError::Serialize)
}

/// Apply template JSON to every card of a payload except `exclude`.
pub fn apply_template_json(
    json: &str,
    template_json: &str,
    exclude: Option<&str>,
) -> Result<String, CardError> {
    let template = LayoutTemplate::from_json(template_json)?;
    let cards = import::import_json(json, &template.card_size)?;
    let applied = apply_template_to_cards(&cards, &template, exclude, &FontContext::new());
    export_json(&applied)
}
