//! Notes board
//!
//! A list of notes persisted under one key. Notes are only ever appended or
//! removed, always through functional updates so concurrent clicks cannot
//! lose each other's changes.

use crate::error::DemoError;
use crate::toast::{Notifier, Toast};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spark_host::Host;
use spark_kv::KvHandle;
use std::sync::Arc;
use ulid::Ulid;

/// Key the board persists under
pub const NOTES_KEY: &str = "spark-demo-notes";

/// A saved note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique, time-sortable id
    pub id: String,
    /// Trimmed, non-empty text
    pub text: String,
    /// Creation time, epoch milliseconds
    pub created_at: i64,
}

impl Note {
    /// Create note stamped now
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            text: text.into(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Creation time as a timestamp
    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Add/delete controller over the persisted note list
pub struct NotesBoard {
    notes: KvHandle<Vec<Note>>,
    notifier: Arc<dyn Notifier>,
}

impl NotesBoard {
    /// Bind to [`NOTES_KEY`]
    ///
    /// # Errors
    /// `DemoError::Kv` if the key is already bound to another type.
    pub fn new(host: &Host, notifier: Arc<dyn Notifier>) -> Result<Self, DemoError> {
        Self::with_key(host, NOTES_KEY, notifier)
    }

    /// Bind to a custom key
    ///
    /// # Errors
    /// See [`NotesBoard::new`].
    pub fn with_key(
        host: &Host,
        key: &str,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, DemoError> {
        let notes = host.use_kv(key, Vec::new())?;
        Ok(Self { notes, notifier })
    }

    /// Wait for the stored notes to load
    pub async fn ready(&self) -> Arc<Vec<Note>> {
        self.notes.hydrated().await
    }

    /// Notes, oldest first
    #[inline]
    #[must_use]
    pub fn notes(&self) -> Arc<Vec<Note>> {
        self.notes.get()
    }

    /// Number of notes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.get().len()
    }

    /// Check if there are no notes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.get().is_empty()
    }

    /// Underlying accessor
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &KvHandle<Vec<Note>> {
        &self.notes
    }

    /// Append a note
    ///
    /// # Errors
    /// - `DemoError::EmptyInput` for empty or whitespace-only text; nothing
    ///   is changed
    /// - `DemoError::Kv` if the list cannot be encoded
    pub fn add_note(&self, text: &str) -> Result<Note, DemoError> {
        let text = text.trim();
        if text.is_empty() {
            self.notifier.notify(Toast::error("Please enter some text"));
            return Err(DemoError::EmptyInput { field: "note text" });
        }

        let note = Note::new(text);
        let appended = note.clone();
        let added = self.notes.update(move |current| {
            let mut next = current.clone();
            next.push(appended.clone());
            next
        });
        if let Err(e) = added {
            tracing::error!(error = %e, "failed to add note");
            self.notifier.notify(Toast::error("Failed to save note"));
            return Err(e.into());
        }

        tracing::debug!(id = %note.id, "note added");
        self.notifier.notify(Toast::success("Note saved!"));
        Ok(note)
    }

    /// Remove the note with `id`
    ///
    /// Returns whether a note was removed. An unknown id changes nothing
    /// and writes nothing.
    ///
    /// # Errors
    /// `DemoError::Kv` if the list cannot be encoded.
    pub fn delete_note(&self, id: &str) -> Result<bool, DemoError> {
        if !self.notes.get().iter().any(|note| note.id == id) {
            tracing::debug!(id, "delete of unknown note ignored");
            return Ok(false);
        }

        let id_owned = id.to_string();
        self.notes.update(move |current| {
            current
                .iter()
                .filter(|note| note.id != id_owned)
                .cloned()
                .collect()
        })?;

        self.notifier.notify(Toast::success("Note deleted"));
        Ok(true)
    }
}

impl std::fmt::Debug for NotesBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotesBoard")
            .field("notes", &self.notes)
            .finish_non_exhaustive()
    }
}
