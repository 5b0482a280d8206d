//! # Editor Store
//!
//! All editor state lives in one [`AppState`] value. Actions go through the
//! pure [`reduce`] function, which returns the next state and never touches
//! the previous one. The [`Store`] handle wraps the reducer with history:
//!
//! ```text
//!   dispatch(action)
//!        │
//!        ├─ reduce(&state, action) ──► next state
//!        ├─ undoable? push snapshot(prev) on `past`, clear `future`,
//!        │            append a bookmark
//!        └─ always:   append to the change log, bump `revision`
//! ```
//!
//! Selection, box selection and the layout editing flag are ephemeral: they
//! are change-logged but never land on the undo stack. Persistence is not
//! wired in here; a [`persist::Persister`] watches [`Store::revision`].

pub mod history;
pub mod persist;

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::autosize::{autosize_card, autosize_cards};
use crate::config::Settings;
use crate::import::normalize_import;
use crate::layout::generate_layout;
use crate::model::{BoxStyle, Card, CardBox, FieldId, PageSize, TextMode};
use crate::template::{apply_template_to_cards, extract_template, LayoutTemplate};
use crate::text::TextMeasure;
use crate::CardError;

use history::BoundedStack;
use persist::PersistedState;

/// The two card lists of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListId {
    Main,
    Buffer,
}

impl ListId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListId::Main => "main",
            ListId::Buffer => "buffer",
        }
    }
}

/// Selected card ids per list, in selection order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub main: Vec<String>,
    pub buffer: Vec<String>,
}

impl Selection {
    pub fn get(&self, list: ListId) -> &[String] {
        match list {
            ListId::Main => &self.main,
            ListId::Buffer => &self.buffer,
        }
    }

    fn get_mut(&mut self, list: ListId) -> &mut Vec<String> {
        match list {
            ListId::Main => &mut self.main,
            ListId::Buffer => &mut self.buffer,
        }
    }

    pub fn set(&mut self, list: ListId, ids: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        *self.get_mut(list) = unique;
    }
}

/// The box currently focused in the layout editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedBox {
    pub list: ListId,
    pub card_id: String,
    pub box_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub main: Vec<Card>,
    pub buffer: Vec<Card>,
    pub selection: Selection,
    pub page_size: PageSize,
    pub selected_box: Option<SelectedBox>,
    pub settings: Settings,
    pub active_template: Option<LayoutTemplate>,
    pub layout_editing: bool,
}

/// The undoable part of [`AppState`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppStateSnapshot {
    pub main: Vec<Card>,
    pub buffer: Vec<Card>,
    pub selection: Selection,
    pub page_size: PageSize,
    pub selected_box: Option<SelectedBox>,
}

impl AppState {
    pub fn with_settings(settings: Settings) -> Self {
        AppState {
            page_size: settings.default_page_size,
            settings,
            ..Default::default()
        }
    }

    pub fn list(&self, list: ListId) -> &[Card] {
        match list {
            ListId::Main => &self.main,
            ListId::Buffer => &self.buffer,
        }
    }

    fn list_mut(&mut self, list: ListId) -> &mut Vec<Card> {
        match list {
            ListId::Main => &mut self.main,
            ListId::Buffer => &mut self.buffer,
        }
    }

    pub fn card(&self, list: ListId, id: &str) -> Option<&Card> {
        self.list(list).iter().find(|c| c.id == id)
    }

    fn card_mut(&mut self, list: ListId, id: &str) -> Result<&mut Card, CardError> {
        self.list_mut(list)
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CardError::CardNotFound(id.to_string()))
    }

    pub fn snapshot(&self) -> AppStateSnapshot {
        AppStateSnapshot {
            main: self.main.clone(),
            buffer: self.buffer.clone(),
            selection: self.selection.clone(),
            page_size: self.page_size,
            selected_box: self.selected_box.clone(),
        }
    }

    /// Replace the undoable state. Leaves layout editing mode.
    pub fn restore(&mut self, snapshot: AppStateSnapshot) {
        self.main = snapshot.main;
        self.buffer = snapshot.buffer;
        self.selection = snapshot.selection;
        self.page_size = snapshot.page_size;
        self.selected_box = snapshot.selected_box;
        self.layout_editing = false;
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            settings: self.settings.clone(),
            page_size: self.page_size,
            selection: self.selection.clone(),
            active_template: self.active_template.clone(),
        }
    }

    /// Drop selected ids and the selected box when their cards are gone.
    pub fn prune_selection(&mut self) {
        for list in [ListId::Main, ListId::Buffer] {
            let live: Vec<String> = self
                .selection
                .get(list)
                .iter()
                .filter(|id| self.card(list, id).is_some())
                .cloned()
                .collect();
            *self.selection.get_mut(list) = live;
        }
        let box_gone = self.selected_box.as_ref().is_some_and(|sel| {
            self.card(sel.list, &sel.card_id)
                .and_then(|c| c.find_box(&sel.box_id))
                .is_none()
        });
        if box_gone {
            self.selected_box = None;
        }
    }

    /// Ids not yet used by any card in either list.
    fn fresh_card_id(&self, wanted: &str) -> String {
        let taken = |id: &str| self.main.iter().chain(&self.buffer).any(|c| c.id == id);
        if !wanted.is_empty() && !taken(wanted) {
            return wanted.to_string();
        }
        let base = if wanted.is_empty() { "card" } else { wanted };
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Partial update for a box. `None` leaves the property alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxPatch {
    pub field_id: Option<FieldId>,
    pub x_mm: Option<f64>,
    pub y_mm: Option<f64>,
    pub w_mm: Option<f64>,
    pub h_mm: Option<f64>,
    pub z: Option<i32>,
    pub rotate_deg: Option<f64>,
    pub locked: Option<bool>,
    pub style: Option<BoxStyle>,
    pub text_mode: Option<TextMode>,
    pub text: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub auto_h: Option<bool>,
}

impl BoxPatch {
    fn apply(self, b: &mut CardBox) {
        if let Some(v) = self.field_id {
            b.field_id = v;
        }
        if let Some(v) = self.x_mm {
            b.x_mm = v;
        }
        if let Some(v) = self.y_mm {
            b.y_mm = v;
        }
        if let Some(v) = self.w_mm.filter(|w| *w > 0.0) {
            b.w_mm = v;
        }
        if let Some(v) = self.h_mm.filter(|h| *h > 0.0) {
            b.h_mm = v;
        }
        if let Some(v) = self.z {
            b.z = v;
        }
        if let Some(v) = self.rotate_deg {
            b.rotate_deg = v;
        }
        if let Some(v) = self.locked {
            b.locked = v;
        }
        if let Some(v) = self.style {
            b.style = v.sanitized();
        }
        if let Some(v) = self.text_mode {
            b.text_mode = Some(v);
        }
        if let Some(v) = self.text {
            b.text = Some(v);
        }
        if let Some(v) = self.label {
            b.label = Some(v);
        }
        if let Some(v) = self.kind {
            b.kind = Some(v);
        }
        if let Some(v) = self.auto_h {
            b.auto_h = Some(v);
        }
    }
}

/// Everything the editor can do to its state.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Normalize an import payload and add (or, with `replace`, swap in)
    /// the resulting cards.
    Import {
        list: ListId,
        payload: serde_json::Value,
        replace: bool,
    },
    AddCard { list: ListId, card: Card },
    RemoveCards { list: ListId, ids: Vec<String> },
    /// Move cards between the main list and the buffer.
    MoveCards { from: ListId, to: ListId, ids: Vec<String> },
    UpdateField {
        list: ListId,
        card_id: String,
        field: FieldId,
        value: String,
    },
    SetFreq { list: ListId, card_id: String, freq: u8 },
    SetTags { list: ListId, card_id: String, tags: Vec<String> },
    UpdateBox {
        list: ListId,
        card_id: String,
        box_id: String,
        patch: BoxPatch,
    },
    AddBox { list: ListId, card_id: String, card_box: CardBox },
    RemoveBox { list: ListId, card_id: String, box_id: String },
    RegenerateLayout { list: ListId, card_id: String },
    AutosizeAll { list: ListId },
    /// Make the layout of a card the active template.
    CaptureTemplate { list: ListId, card_id: String },
    /// Apply the active template to every card of `list` except `exclude`.
    ApplyTemplate { list: ListId, exclude: Option<String> },
    SetPageSize(PageSize),
    Select { list: ListId, ids: Vec<String> },
    SelectBox(Option<SelectedBox>),
    SetLayoutEditing(bool),
    UpdateSettings(Settings),
    Clear { list: ListId },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Import { .. } => "import",
            Action::AddCard { .. } => "add-card",
            Action::RemoveCards { .. } => "remove-cards",
            Action::MoveCards { .. } => "move-cards",
            Action::UpdateField { .. } => "update-field",
            Action::SetFreq { .. } => "set-freq",
            Action::SetTags { .. } => "set-tags",
            Action::UpdateBox { .. } => "update-box",
            Action::AddBox { .. } => "add-box",
            Action::RemoveBox { .. } => "remove-box",
            Action::RegenerateLayout { .. } => "regenerate-layout",
            Action::AutosizeAll { .. } => "autosize-all",
            Action::CaptureTemplate { .. } => "capture-template",
            Action::ApplyTemplate { .. } => "apply-template",
            Action::SetPageSize(_) => "set-page-size",
            Action::Select { .. } => "select",
            Action::SelectBox(_) => "select-box",
            Action::SetLayoutEditing(_) => "set-layout-editing",
            Action::UpdateSettings(_) => "update-settings",
            Action::Clear { .. } => "clear",
        }
    }

    /// Selection and mode changes. Logged, never undoable.
    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self,
            Action::Select { .. } | Action::SelectBox(_) | Action::SetLayoutEditing(_)
        )
    }

    pub fn is_undoable(&self) -> bool {
        !self.is_ephemeral()
            && !matches!(self, Action::CaptureTemplate { .. } | Action::UpdateSettings(_))
    }
}

/// Compute the state after `action`. `state` is never modified.
pub fn reduce(
    state: &AppState,
    action: Action,
    measure: &dyn TextMeasure,
) -> Result<AppState, CardError> {
    let mut next = state.clone();
    let autosize = state.settings.autosize_on_edit;

    match action {
        Action::Import {
            list,
            payload,
            replace,
        } => {
            let imported = normalize_import(&payload, &state.page_size)?;
            let imported = autosize_cards(&imported, measure);
            if replace {
                next.list_mut(list).clear();
            }
            for mut card in imported {
                card.id = next.fresh_card_id(&card.id);
                next.list_mut(list).push(card);
            }
        }
        Action::AddCard { list, mut card } => {
            card.id = next.fresh_card_id(&card.id);
            if card.boxes.is_empty() {
                card.boxes = generate_layout(&card, &state.page_size);
            }
            let card = autosize_card(&card, measure).into_owned();
            next.list_mut(list).push(card);
        }
        Action::RemoveCards { list, ids } => {
            next.list_mut(list).retain(|c| !ids.contains(&c.id));
        }
        Action::MoveCards { from, to, ids } => {
            if from != to {
                let (moving, staying): (Vec<Card>, Vec<Card>) = next
                    .list_mut(from)
                    .drain(..)
                    .partition(|c| ids.contains(&c.id));
                *next.list_mut(from) = staying;
                for mut card in moving {
                    if next.card(to, &card.id).is_some() {
                        card.id = next.fresh_card_id(&card.id);
                    }
                    next.list_mut(to).push(card);
                }
            }
        }
        Action::UpdateField {
            list,
            card_id,
            field,
            value,
        } => {
            let card = next.card_mut(list, &card_id)?;
            if card.set_field_text(&field, value) {
                if field == FieldId::Inf && card.title.is_empty() {
                    card.title = card.inf.clone();
                }
                resize_if(card, autosize, measure);
            }
        }
        Action::SetFreq {
            list,
            card_id,
            freq,
        } => {
            let card = next.card_mut(list, &card_id)?;
            card.freq = freq.clamp(1, 5);
            refresh_meta_box(card);
            resize_if(card, autosize, measure);
        }
        Action::SetTags {
            list,
            card_id,
            tags,
        } => {
            let card = next.card_mut(list, &card_id)?;
            let mut clean: Vec<String> = Vec::new();
            for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                if !clean.iter().any(|t| t == tag) {
                    clean.push(tag.to_string());
                }
            }
            card.tags = clean;
            refresh_meta_box(card);
            resize_if(card, autosize, measure);
        }
        Action::UpdateBox {
            list,
            card_id,
            box_id,
            patch,
        } => {
            let card = next.card_mut(list, &card_id)?;
            let target = card
                .boxes
                .iter_mut()
                .find(|b| b.id == box_id)
                .ok_or_else(|| CardError::BoxNotFound {
                    card: card_id.clone(),
                    id: box_id.clone(),
                })?;
            patch.apply(target);
            resize_if(card, autosize, measure);
        }
        Action::AddBox {
            list,
            card_id,
            mut card_box,
        } => {
            let card = next.card_mut(list, &card_id)?;
            if card_box.id.is_empty() || card.find_box(&card_box.id).is_some() {
                card_box.id = format!("box_{}", Uuid::new_v4().simple());
            }
            card_box.z = card.boxes.iter().map(|b| b.z + 1).max().unwrap_or(0);
            card.boxes.push(card_box);
            resize_if(card, autosize, measure);
        }
        Action::RemoveBox {
            list,
            card_id,
            box_id,
        } => {
            let card = next.card_mut(list, &card_id)?;
            let before = card.boxes.len();
            card.boxes.retain(|b| b.id != box_id);
            if card.boxes.len() == before {
                return Err(CardError::BoxNotFound {
                    card: card_id,
                    id: box_id,
                });
            }
        }
        Action::RegenerateLayout { list, card_id } => {
            let page = state.page_size;
            let card = next.card_mut(list, &card_id)?;
            card.boxes = generate_layout(card, &page);
            resize_if(card, true, measure);
        }
        Action::AutosizeAll { list } => {
            let resized = autosize_cards(next.list(list), measure);
            *next.list_mut(list) = resized;
        }
        Action::CaptureTemplate { list, card_id } => {
            let card = state
                .card(list, &card_id)
                .ok_or_else(|| CardError::CardNotFound(card_id.clone()))?;
            let template = extract_template(card, &state.page_size);
            tracing::info!(
                "Captured template from '{}' ({} boxes)",
                card_id,
                template.boxes.len()
            );
            next.active_template = Some(template);
        }
        Action::ApplyTemplate { list, exclude } => {
            if let Some(template) = &state.active_template {
                let template = template.scaled_to(&state.page_size);
                let applied =
                    apply_template_to_cards(next.list(list), &template, exclude.as_deref(), measure);
                *next.list_mut(list) = applied;
            } else {
                tracing::debug!("No active template to apply");
            }
        }
        Action::SetPageSize(page) => {
            next.page_size = page;
        }
        Action::Select { list, ids } => {
            let ids = ids
                .into_iter()
                .filter(|id| state.card(list, id).is_some())
                .collect();
            next.selection.set(list, ids);
        }
        Action::SelectBox(selected) => {
            next.selected_box = selected;
        }
        Action::SetLayoutEditing(on) => {
            next.layout_editing = on;
        }
        Action::UpdateSettings(settings) => {
            next.settings = settings;
        }
        Action::Clear { list } => {
            next.list_mut(list).clear();
        }
    }

    next.prune_selection();
    Ok(next)
}

fn resize_if(card: &mut Card, enabled: bool, measure: &dyn TextMeasure) {
    if !enabled {
        return;
    }
    let resized = match autosize_card(card, measure) {
        Cow::Owned(resized) => Some(resized),
        Cow::Borrowed(_) => None,
    };
    if let Some(resized) = resized {
        *card = resized;
    }
}

/// Static meta boxes carry a copy of the meta line; keep it current.
fn refresh_meta_box(card: &mut Card) {
    let line = card.meta_line();
    for b in card.boxes.iter_mut() {
        if b.field_id == FieldId::Meta && b.effective_mode() == TextMode::Static {
            b.text = Some(line.clone());
        }
    }
}

/// A named snapshot.
#[derive(Debug, Clone)]
pub struct Bookmark {
    pub id: u64,
    pub name: String,
    pub at: DateTime<Utc>,
    /// Set for bookmarks appended by mutations rather than saved by hand.
    pub automatic: bool,
    pub snapshot: AppStateSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub at: DateTime<Utc>,
    pub action: &'static str,
    pub undoable: bool,
}

/// The editor state plus its history.
pub struct Store {
    state: AppState,
    past: BoundedStack<AppStateSnapshot>,
    future: BoundedStack<AppStateSnapshot>,
    bookmarks: BoundedStack<Bookmark>,
    changes: BoundedStack<ChangeEntry>,
    next_bookmark_id: u64,
    revision: u64,
    measure: Box<dyn TextMeasure>,
}

impl Store {
    pub fn new(state: AppState, measure: Box<dyn TextMeasure>) -> Self {
        let limit = state.settings.history_limit;
        Store {
            state,
            past: BoundedStack::new(limit),
            future: BoundedStack::new(limit),
            bookmarks: BoundedStack::new(limit),
            changes: BoundedStack::new(limit),
            next_bookmark_id: 1,
            revision: 0,
            measure,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Increments on every state change, including undo and redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), CardError> {
        let name = action.name();
        let undoable = action.is_undoable();
        let next = reduce(&self.state, action, self.measure.as_ref())?;
        // A rejected edit leaves nothing to undo.
        let undoable = undoable && next.snapshot() != self.state.snapshot();

        if undoable {
            self.past.push(self.state.snapshot());
            self.future.clear();
        }
        let previous = std::mem::replace(&mut self.state, next);
        if self.state.settings.history_limit != previous.settings.history_limit {
            self.apply_history_limit();
        }
        if undoable {
            self.append_bookmark(name, true);
        }
        self.changes.push(ChangeEntry {
            at: Utc::now(),
            action: name,
            undoable,
        });
        self.revision += 1;
        Ok(())
    }

    fn apply_history_limit(&mut self) {
        let limit = self.state.settings.history_limit;
        self.past.set_limit(limit);
        self.future.set_limit(limit);
        self.bookmarks.set_limit(limit);
        self.changes.set_limit(limit);
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Step back one mutation. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.past.pop() else {
            return false;
        };
        self.future.push(self.state.snapshot());
        self.state.restore(snapshot);
        self.revision += 1;
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.future.pop() else {
            return false;
        };
        self.past.push(self.state.snapshot());
        self.state.restore(snapshot);
        self.revision += 1;
        true
    }

    /// Save the current state under `name`. Returns the bookmark id.
    pub fn save_bookmark(&mut self, name: &str) -> u64 {
        self.append_bookmark(name, false)
    }

    fn append_bookmark(&mut self, name: &str, automatic: bool) -> u64 {
        let id = self.next_bookmark_id;
        self.next_bookmark_id += 1;
        self.bookmarks.push(Bookmark {
            id,
            name: name.to_string(),
            at: Utc::now(),
            automatic,
            snapshot: self.state.snapshot(),
        });
        id
    }

    /// Jump to a bookmark. Undoable like any other mutation.
    pub fn restore_bookmark(&mut self, id: u64) -> Result<(), CardError> {
        let snapshot = self
            .bookmarks
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.snapshot.clone())
            .ok_or(CardError::BookmarkNotFound(id))?;
        self.past.push(self.state.snapshot());
        self.future.clear();
        self.state.restore(snapshot);
        self.changes.push(ChangeEntry {
            at: Utc::now(),
            action: "restore-bookmark",
            undoable: true,
        });
        self.revision += 1;
        Ok(())
    }

    /// Oldest first.
    pub fn bookmarks(&self) -> impl DoubleEndedIterator<Item = &Bookmark> {
        self.bookmarks.iter()
    }

    pub fn changes(&self) -> impl DoubleEndedIterator<Item = &ChangeEntry> {
        self.changes.iter()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }
}
