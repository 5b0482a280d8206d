//! Structured error types for the card layout engine.
//!
//! Only a few things can actually fail: parsing JSON text, recognising an
//! import payload, reading a template, finding the card or box an action
//! targets, and writing to storage. Field coercion never fails.

use thiserror::Error;

use crate::store::persist::StorageError;

/// The unified error type returned by the public API.
#[derive(Debug, Error)]
pub enum CardError {
    /// Input text was not valid JSON (or did not match the expected shape).
    #[error("Failed to parse input: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// The import payload is neither an array nor an object with a
    /// `cards`, `verbs` or `data` array.
    #[error("Unrecognized import format: root is {root_type} with keys [{}]", .keys.join(", "))]
    UnrecognizedImport { root_type: String, keys: Vec<String> },

    /// A layout template declared a version this build cannot read.
    #[error("Unsupported template version {0} (expected 1)")]
    TemplateVersion(u64),

    #[error("No card with id '{0}'")]
    CardNotFound(String),

    #[error("No box '{id}' on card '{card}'")]
    BoxNotFound { card: String, id: String },

    #[error("No bookmark with id {0}")]
    BookmarkNotFound(u64),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serializing state for output failed.
    #[error("Serialization failed: {0}")]
    Serialize(serde_json::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for CardError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        CardError::Parse { source: e, hint }
    }
}
