//! # Persistence
//!
//! Writes the editor state to a string key-value store (browser
//! `localStorage` or anything shaped like it). Card lists can be large, so
//! each list is split into chunks under numbered keys with a small meta
//! record naming the generation and chunk count of the current payload:
//!
//! ```text
//! cardlayout.state              {version: 1, state: {settings, pageSize, ...}}
//! cardlayout.cards.main.meta    {version: 1, chunks: 3, generation: 7}
//! cardlayout.cards.main.g7.0    [{"id":"a1", ...
//! cardlayout.cards.main.g7.1    ... ...
//! cardlayout.cards.main.g7.2    ...}]
//! ```
//!
//! A save writes generation 8 beside generation 7, switches the meta record
//! and only then deletes generation 7.
//!
//! Loading is all or nothing per payload. A wrong version, a missing chunk or
//! JSON that does not parse discards that payload and the caller starts from
//! defaults instead of half a list.
//!
//! Writes are debounced. The host reports changes with [`Persister::observe`]
//! and drives time with [`Persister::tick`]; nothing runs in the background.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{AppState, ListId, Selection, Store};
use crate::config::Settings;
use crate::model::{Card, PageSize};
use crate::template::LayoutTemplate;
use crate::CardError;

pub const STATE_KEY: &str = "cardlayout.state";
pub const PERSIST_VERSION: u64 = 1;
pub const RAM_ONLY_WARNING: &str = "Storage is full or unavailable; changes are RAM-only";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded writing '{key}' ({needed} bytes needed, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Failed to encode persisted state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string key-value store.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str);
}

/// In-memory storage with an optional byte quota over keys and values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        MemoryStorage {
            entries: BTreeMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let replaced = self.entries.get(key).map_or(0, |old| key.len() + old.len());
            let available = quota.saturating_sub(self.used_bytes() - replaced);
            let needed = key.len() + value.len();
            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// The non-card part of the editor state that survives a reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub settings: Settings,
    pub page_size: PageSize,
    pub selection: Selection,
    pub active_template: Option<LayoutTemplate>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u64,
    state: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkMeta {
    version: u64,
    chunks: usize,
    /// Each save writes its chunks under a fresh generation, so the chunks
    /// the current meta points at are never overwritten in place.
    #[serde(default)]
    generation: u64,
}

fn meta_key(list: ListId) -> String {
    format!("cardlayout.cards.{}.meta", list.as_str())
}

fn chunk_key(list: ListId, generation: u64, k: usize) -> String {
    format!("cardlayout.cards.{}.g{}.{}", list.as_str(), generation, k)
}

/// Remove every chunk stored under `generation`.
fn remove_generation(storage: &mut dyn KeyValueStorage, list: ListId, generation: u64) {
    let mut k = 0;
    while storage.get(&chunk_key(list, generation, k)).is_some() {
        storage.remove(&chunk_key(list, generation, k));
        k += 1;
    }
}

/// Split `text` into pieces of at most `max_chars` characters, on char
/// boundaries. Always returns at least one piece.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (i, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Write one card list as chunks. Returns the number of chunks written.
///
/// The previous save stays loadable until the new meta record is in place.
/// If any write fails, the partial new generation is removed again and the
/// previous save is left as it was.
pub fn save_cards(
    storage: &mut dyn KeyValueStorage,
    list: ListId,
    cards: &[Card],
    chunk_chars: usize,
) -> Result<usize, StorageError> {
    let json = serde_json::to_string(cards)?;
    let chunks = split_chunks(&json, chunk_chars);
    let previous = read_meta(storage, list);
    let generation = previous.as_ref().map_or(0, |m| m.generation + 1);

    // Leftovers of an interrupted save under the same generation.
    remove_generation(storage, list, generation);

    let meta = ChunkMeta {
        version: PERSIST_VERSION,
        chunks: chunks.len(),
        generation,
    };
    let written = chunks
        .iter()
        .enumerate()
        .try_for_each(|(k, chunk)| storage.set(&chunk_key(list, generation, k), chunk))
        .and_then(|()| storage.set(&meta_key(list), &serde_json::to_string(&meta)?));
    if let Err(e) = written {
        remove_generation(storage, list, generation);
        return Err(e);
    }

    if let Some(old) = previous {
        remove_generation(storage, list, old.generation);
    }
    Ok(chunks.len())
}

fn read_meta(storage: &dyn KeyValueStorage, list: ListId) -> Option<ChunkMeta> {
    let text = storage.get(&meta_key(list))?;
    serde_json::from_str(&text).ok()
}

/// Read one card list. `None` means nothing usable is persisted.
pub fn load_cards(storage: &dyn KeyValueStorage, list: ListId) -> Option<Vec<Card>> {
    let raw_meta = storage.get(&meta_key(list))?;
    let Ok(meta) = serde_json::from_str::<ChunkMeta>(&raw_meta) else {
        tracing::warn!("Discarding {} cards: malformed chunk meta", list.as_str());
        return None;
    };
    if meta.version != PERSIST_VERSION {
        tracing::warn!(
            "Discarding {} cards: version {} (expected {})",
            list.as_str(),
            meta.version,
            PERSIST_VERSION
        );
        return None;
    }

    let mut json = String::new();
    for k in 0..meta.chunks {
        match storage.get(&chunk_key(list, meta.generation, k)) {
            Some(chunk) => json.push_str(&chunk),
            None => {
                tracing::warn!("Discarding {} cards: chunk {} is missing", list.as_str(), k);
                return None;
            }
        }
    }
    match serde_json::from_str(&json) {
        Ok(cards) => Some(cards),
        Err(e) => {
            tracing::warn!("Discarding {} cards: {}", list.as_str(), e);
            None
        }
    }
}

pub fn save_state(storage: &mut dyn KeyValueStorage, state: &PersistedState) -> Result<(), StorageError> {
    let envelope = Envelope {
        version: PERSIST_VERSION,
        state,
    };
    storage.set(STATE_KEY, &serde_json::to_string(&envelope)?)
}

pub fn load_state(storage: &dyn KeyValueStorage) -> Option<PersistedState> {
    let text = storage.get(STATE_KEY)?;
    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Discarding persisted state: {}", e);
            return None;
        }
    };
    let version = value.get("version").and_then(Value::as_u64);
    if version != Some(PERSIST_VERSION) {
        tracing::warn!("Discarding persisted state: unsupported version {:?}", version);
        return None;
    }
    match serde_json::from_value::<Envelope<PersistedState>>(value) {
        Ok(envelope) => Some(envelope.state),
        Err(e) => {
            tracing::warn!("Discarding persisted state: {}", e);
            None
        }
    }
}

/// Rebuild an [`AppState`] from storage. Each payload that cannot be read
/// falls back to its default on its own.
pub fn load_app_state(storage: &dyn KeyValueStorage) -> AppState {
    let persisted = load_state(storage).unwrap_or_default();
    let main = load_cards(storage, ListId::Main).unwrap_or_default();
    let buffer = load_cards(storage, ListId::Buffer).unwrap_or_default();
    let mut state = AppState {
        main,
        buffer,
        selection: persisted.selection,
        page_size: persisted.page_size,
        settings: persisted.settings,
        active_template: persisted.active_template,
        ..AppState::default()
    };
    state.prune_selection();
    state
}

/// A trailing-edge timer: every `schedule` pushes the deadline out again.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the deadline has passed. Clears it if so.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Subscribes to a [`Store`] and writes its state out after a quiet period.
#[derive(Debug)]
pub struct Persister {
    debouncer: Debouncer,
    chunk_chars: usize,
    seen_revision: u64,
    warning: Option<String>,
}

impl Persister {
    pub fn new(settings: &Settings) -> Self {
        Persister {
            debouncer: Debouncer::new(Duration::from_millis(settings.debounce_ms)),
            chunk_chars: settings.chunk_chars,
            seen_revision: 0,
            warning: None,
        }
    }

    /// Schedule a write if the store changed since the last call.
    pub fn observe(&mut self, store: &Store, now: Instant) {
        if store.revision() != self.seen_revision {
            self.seen_revision = store.revision();
            self.debouncer.schedule(now);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Flush if the debounce window has elapsed. Returns whether a write
    /// was attempted.
    pub fn tick(&mut self, now: Instant, state: &AppState, storage: &mut dyn KeyValueStorage) -> bool {
        if !self.debouncer.fire(now) {
            return false;
        }
        // Failures are already recorded in the sticky warning.
        let _ = self.flush_now(state, storage);
        true
    }

    /// Write everything immediately.
    pub fn flush_now(
        &mut self,
        state: &AppState,
        storage: &mut dyn KeyValueStorage,
    ) -> Result<(), CardError> {
        self.debouncer.cancel();
        self.chunk_chars = state.settings.chunk_chars;
        match self.write(state, storage) {
            Ok(()) => {
                tracing::info!(
                    "Persisted {} main and {} buffer cards",
                    state.main.len(),
                    state.buffer.len()
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Persisting failed: {}", e);
                self.warning = Some(RAM_ONLY_WARNING.to_string());
                Err(CardError::Storage(e))
            }
        }
    }

    fn write(&self, state: &AppState, storage: &mut dyn KeyValueStorage) -> Result<(), StorageError> {
        save_state(storage, &state.persisted())?;
        save_cards(storage, ListId::Main, &state.main, self.chunk_chars)?;
        save_cards(storage, ListId::Buffer, &state.buffer, self.chunk_chars)?;
        Ok(())
    }

    /// Set after the first failed write and never cleared.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| {
                let mut card = Card::empty(format!("c{}", i));
                card.inf = format!("Verb Nummer {} mit Ümlauten äöü", i);
                card
            })
            .collect()
    }

    #[test]
    fn split_respects_char_boundaries() {
        let chunks = split_chunks("aäbößc", 2);
        assert_eq!(chunks, vec!["aä", "bö", "ßc"]);
        assert_eq!(split_chunks("", 5), vec![""]);
        assert_eq!(split_chunks("abc", 5), vec!["abc"]);
    }

    #[test]
    fn chunked_round_trip() {
        let mut storage = MemoryStorage::new();
        let original = cards(10);
        let n = save_cards(&mut storage, ListId::Main, &original, 64).unwrap();
        assert!(n > 1);
        assert_eq!(load_cards(&storage, ListId::Main), Some(original));
    }

    #[test]
    fn stale_chunks_are_removed() {
        let mut storage = MemoryStorage::new();
        let many = save_cards(&mut storage, ListId::Main, &cards(10), 64).unwrap();
        let few = save_cards(&mut storage, ListId::Main, &cards(1), 64).unwrap();
        assert!(few < many);
        let prefix = |g: u64| format!("cardlayout.cards.main.g{}.", g);
        assert_eq!(storage.keys().filter(|k| k.starts_with(&prefix(0))).count(), 0);
        assert_eq!(storage.keys().filter(|k| k.starts_with(&prefix(1))).count(), few);
        assert_eq!(load_cards(&storage, ListId::Main).unwrap().len(), 1);
    }

    #[test]
    fn missing_chunk_discards_list() {
        let mut storage = MemoryStorage::new();
        save_cards(&mut storage, ListId::Buffer, &cards(10), 64).unwrap();
        storage.remove(&chunk_key(ListId::Buffer, 0, 1));
        assert_eq!(load_cards(&storage, ListId::Buffer), None);
    }

    #[test]
    fn failed_save_keeps_previous_list() {
        let original = cards(6);
        let mut scratch = MemoryStorage::new();
        save_cards(&mut scratch, ListId::Main, &original, 64).unwrap();
        let used = scratch.used_bytes();

        // Room for one full save plus half of another.
        let mut storage = MemoryStorage::with_quota(used + used / 2);
        save_cards(&mut storage, ListId::Main, &original, 64).unwrap();

        let mut edited = original.clone();
        edited[0].inf = "B00".into();
        edited[5].recommendations[0].ru = "länger ".repeat(40);
        let err = save_cards(&mut storage, ListId::Main, &edited, 64).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));

        assert_eq!(load_cards(&storage, ListId::Main), Some(original));
        assert_eq!(storage.used_bytes(), used);
    }

    #[test]
    fn wrong_version_discards_list() {
        let mut storage = MemoryStorage::new();
        save_cards(&mut storage, ListId::Main, &cards(2), 1000).unwrap();
        storage
            .set(&meta_key(ListId::Main), r#"{"version": 2, "chunks": 1}"#)
            .unwrap();
        assert_eq!(load_cards(&storage, ListId::Main), None);
    }

    #[test]
    fn quota_is_enforced() {
        let mut storage = MemoryStorage::with_quota(10);
        assert!(storage.set("k", "12345").is_ok());
        assert!(storage.set("k", "123456789").is_ok());
        let err = storage.set("other", "123456").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    }

    #[test]
    fn debouncer_reschedules() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(400));
        d.schedule(start);
        d.schedule(start + Duration::from_millis(300));
        assert!(!d.fire(start + Duration::from_millis(500)));
        assert!(d.fire(start + Duration::from_millis(700)));
        assert!(!d.is_pending());
    }

    #[test]
    fn corrupt_state_falls_back() {
        let mut storage = MemoryStorage::new();
        storage.set(STATE_KEY, "{not json").unwrap();
        assert_eq!(load_state(&storage), None);
        storage.set(STATE_KEY, r#"{"version": 7, "state": {}}"#).unwrap();
        assert_eq!(load_state(&storage), None);
    }
}
