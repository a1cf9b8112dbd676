use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemIdError {
    #[error("item id cannot be empty")]
    Empty,
}

/// Opaque identifier of a content item (trimmed, non-empty).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Creates a validated `ItemId`.
    ///
    /// # Errors
    ///
    /// Returns `ItemIdError::Empty` if the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, ItemIdError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ItemIdError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemId {
    type Error = ItemIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(value: ItemId) -> Self {
        value.0
    }
}

impl FromStr for ItemId {
    type Err = ItemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Locally generated pseudo-identifier used to attribute anonymous engagement.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub const PREFIX: &'static str = "anon_";

    /// Wraps a stored fingerprint; returns `None` for blank values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Builds an `anon_<hex>` fingerprint from random bytes.
    #[must_use]
    pub fn from_random_bytes(bytes: &[u8]) -> Self {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self(format!("{}{hex}", Self::PREFIX))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_trims_whitespace() {
        let id = ItemId::new("  intro-01 ").unwrap();
        assert_eq!(id.as_str(), "intro-01");
        assert_eq!(id.to_string(), "intro-01");
    }

    #[test]
    fn item_id_rejects_blank() {
        assert_eq!(ItemId::new("   "), Err(ItemIdError::Empty));
        assert!("".parse::<ItemId>().is_err());
    }

    #[test]
    fn item_id_deserializes_through_validation() {
        let id: ItemId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id, ItemId::new("abc").unwrap());
        assert!(serde_json::from_str::<ItemId>("\" \"").is_err());
    }

    #[test]
    fn fingerprint_from_bytes_is_hex() {
        let fp = Fingerprint::from_random_bytes(&[0x00, 0xab, 0x10]);
        assert_eq!(fp.as_str(), "anon_00ab10");
    }

    #[test]
    fn fingerprint_rejects_blank() {
        assert!(Fingerprint::new("").is_none());
        assert_eq!(Fingerprint::new(" anon_1 ").unwrap().as_str(), "anon_1");
    }
}
