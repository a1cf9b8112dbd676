use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ItemId;

/// Upper bound on a single note body, in characters.
pub const MAX_NOTE_CHARS: usize = 20_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NoteError {
    #[error("note is too long ({len} > {max} characters)")]
    TooLong { len: usize, max: usize },
}

/// Free-form markdown note attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    item_id: ItemId,
    body: String,
    updated_at: DateTime<Utc>,
}

impl Note {
    /// Builds a note. Returns `Ok(None)` when the body is blank, meaning "no note".
    ///
    /// # Errors
    ///
    /// Returns `NoteError::TooLong` if the body exceeds `MAX_NOTE_CHARS`.
    pub fn new(
        item_id: ItemId,
        body: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Self>, NoteError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Ok(None);
        }
        let len = body.chars().count();
        if len > MAX_NOTE_CHARS {
            return Err(NoteError::TooLong {
                len,
                max: MAX_NOTE_CHARS,
            });
        }
        Ok(Some(Self {
            item_id,
            body,
            updated_at,
        }))
    }

    #[must_use]
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn blank_body_means_no_note() {
        let note = Note::new(ItemId::new("a").unwrap(), " \n", fixed_now()).unwrap();
        assert!(note.is_none());
    }

    #[test]
    fn oversized_body_is_rejected() {
        let body = "x".repeat(MAX_NOTE_CHARS + 1);
        let err = Note::new(ItemId::new("a").unwrap(), body, fixed_now()).unwrap_err();
        assert!(matches!(err, NoteError::TooLong { .. }));
    }
}
