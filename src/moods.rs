use crate::models::{validate_date_key, MoodEntry, MoodLog, ValidationError};
use crate::storage::{Document, DocumentStore, StoreError, USERS};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

const MOODS_FIELD: &str = "moods";

#[derive(Debug, Error)]
pub enum MoodWriteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reads and merge-writes the per-user mood log stored under
/// `users/{uid}.moods`.
#[derive(Clone)]
pub struct MoodStore {
    store: Arc<dyn DocumentStore>,
}

impl MoodStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// A user without a document, or without a `moods` field, has an empty log.
    ///
    /// Entries are decoded one at a time: a malformed entry is skipped and
    /// the rest of the log is still returned.
    pub async fn read(&self, user_id: &str) -> Result<MoodLog, StoreError> {
        let Some(document) = self.store.get(USERS, user_id).await? else {
            return Ok(MoodLog::new());
        };
        let Some(moods) = document.get(MOODS_FIELD) else {
            return Ok(MoodLog::new());
        };
        let Value::Object(entries) = moods else {
            warn!(user_id, "ignoring moods field that is not a map");
            return Ok(MoodLog::new());
        };

        let mut log = MoodLog::new();
        for (date, value) in entries {
            match serde_json::from_value::<MoodEntry>(value.clone()) {
                Ok(entry) => {
                    log.insert(date.clone(), entry);
                }
                Err(err) => warn!(user_id, date = %date, "skipping malformed mood entry: {err}"),
            }
        }
        Ok(log)
    }

    /// Adds `entry` under `date` to the caller's cached log and sends the
    /// whole map as the `moods` field.
    ///
    /// The document-level merge keeps other fields intact, but the `moods`
    /// map itself is replaced: a writer holding a stale cache overwrites
    /// dates written by others since its last read. Returns the merged log,
    /// which the caller should keep as its new cache.
    pub async fn write(
        &self,
        user_id: &str,
        cached: &MoodLog,
        date: &str,
        entry: MoodEntry,
    ) -> Result<MoodLog, MoodWriteError> {
        let date = validate_date_key(date)?;
        if entry.note.trim().is_empty() {
            return Err(ValidationError::MissingNote.into());
        }
        if entry.emoji.trim().is_empty() {
            return Err(ValidationError::MissingEmoji.into());
        }

        let mut updated = cached.clone();
        updated.insert(date, entry);

        let moods = serde_json::to_value(&updated).map_err(StoreError::from)?;
        let mut partial = Document::new();
        partial.insert(MOODS_FIELD.to_string(), moods);
        self.store.set(USERS, user_id, partial, true).await?;

        Ok(updated)
    }
}

/// Reads a string field from a document, ignoring non-string values.
pub fn string_field(document: &Document, field: &str) -> Option<String> {
    match document.get(field) {
        Some(Value::String(value)) => Some(value.clone()),
        _ => None,
    }
}
