use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{Fingerprint, ItemId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RatingError {
    #[error("rating must be between 1 and 5, got {0}")]
    OutOfRange(u8),
}

/// Star rating, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `RatingError::OutOfRange` outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// A like row; unique per (item, fingerprint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub item_id: ItemId,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
}

/// A feedback row with rating and optional comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub item_id: ItemId,
    pub fingerprint: Fingerprint,
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    /// Builds a feedback row, dropping blank comments.
    #[must_use]
    pub fn new(
        item_id: ItemId,
        fingerprint: Fingerprint,
        rating: Rating,
        comment: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let comment = comment
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Self {
            item_id,
            fingerprint,
            rating,
            comment,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(5).unwrap().value(), 5);
        assert_eq!(Rating::new(6), Err(RatingError::OutOfRange(6)));
    }

    #[test]
    fn feedback_drops_blank_comment() {
        let feedback = Feedback::new(
            ItemId::new("a").unwrap(),
            Fingerprint::new("anon_1").unwrap(),
            Rating::new(4).unwrap(),
            Some("   ".into()),
            fixed_now(),
        );
        assert!(feedback.comment.is_none());
    }

    #[test]
    fn feedback_rejects_bad_rating_in_json() {
        let json = r#"{"item_id":"a","fingerprint":"f","rating":9,"created_at":"2023-11-14T22:13:20Z"}"#;
        assert!(serde_json::from_str::<Feedback>(json).is_err());
    }
}
