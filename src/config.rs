//! Editor settings. Every field has a default so partial or older settings
//! files still load.

use serde::{Deserialize, Serialize};

use crate::model::PageSize;
use crate::store::history::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
/// Largest chunk written under one storage key, in characters.
pub const DEFAULT_CHUNK_CHARS: usize = 180_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_page_size: PageSize,
    /// Re-run the autosizer after field and box edits.
    pub autosize_on_edit: bool,
    pub debounce_ms: u64,
    pub chunk_chars: usize,
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_page_size: PageSize::default(),
            autosize_on_edit: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Settings {
    /// Parse a settings file. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, crate::CardError> {
        let settings: Settings = serde_json::from_str(text)?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.chunk_chars = self.chunk_chars.max(1);
        self.history_limit = self.history_limit.max(1);
        self
    }
}
