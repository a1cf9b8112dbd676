use std::collections::{BTreeSet, HashSet};

use thiserror::Error;

use crate::model::ids::ItemId;
use crate::model::item::{ContentItem, ContentItemDraft, ContentItemError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("content list is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Item(#[from] ContentItemError),

    #[error("duplicate item id: {0}")]
    DuplicateId(String),
}

/// Ordered list of content items loaded from the static content JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<ContentItem>,
}

impl Catalog {
    /// Parse the JSON array of content items.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on malformed JSON, invalid items or duplicate ids.
    pub fn from_json(input: &str) -> Result<Self, CatalogError> {
        let drafts: Vec<ContentItemDraft> = serde_json::from_str(input)?;
        Self::from_drafts(drafts)
    }

    /// Validate drafts into a catalog, preserving order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on invalid items or duplicate ids.
    pub fn from_drafts(drafts: Vec<ContentItemDraft>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let item = draft.validate()?;
            if !seen.insert(item.item_id().clone()) {
                return Err(CatalogError::DuplicateId(item.item_id().to_string()));
            }
            items.push(item);
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, item_id: &ItemId) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.item_id() == item_id)
    }

    /// The item that follows `item_id` in catalog order, used for auto-advance.
    #[must_use]
    pub fn next_after(&self, item_id: &ItemId) -> Option<&ContentItem> {
        let pos = self
            .items
            .iter()
            .position(|item| item.item_id() == item_id)?;
        self.items.get(pos + 1)
    }

    /// Sorted, distinct topic tags across all items.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.items
            .iter()
            .flat_map(|item| item.topic_tags().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn with_topic(&self, topic: &str) -> Vec<&ContentItem> {
        self.items
            .iter()
            .filter(|item| item.has_topic(topic))
            .collect()
    }

    /// Case-insensitive match over name, description and tags.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&ContentItem> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| {
                item.name().to_lowercase().contains(&needle)
                    || item.description().to_lowercase().contains(&needle)
                    || item
                        .topic_tags()
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&needle))
            })
            .collect()
    }
}
