use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::model::ids::{ItemId, ItemIdError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentItemError {
    #[error(transparent)]
    InvalidId(#[from] ItemIdError),

    #[error("item {item_id} has an empty name")]
    EmptyName { item_id: String },

    #[error("item {item_id} has an invalid source URL: {raw}")]
    InvalidSourceUrl { item_id: String, raw: String },
}

/// How a source can be played back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    /// A media file a native player can control and observe.
    Direct,
    /// A third-party viewer page that only works inside an embedded frame.
    Embedded,
}

const DIRECT_EXTENSIONS: &[&str] = &["mp4", "webm", "m4v", "mov", "ogg", "ogv"];

impl MediaSource {
    #[must_use]
    pub fn classify(url: &Url) -> Self {
        let extension = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .and_then(|last| last.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if DIRECT_EXTENSIONS.contains(&ext.as_str()) => Self::Direct,
            _ => Self::Embedded,
        }
    }
}

/// Unvalidated item as it appears in the static content JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItemDraft {
    pub item_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    pub source_url: String,
    /// Seconds; may be fractional.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl ContentItemDraft {
    /// Validate the draft into a `ContentItem`.
    ///
    /// # Errors
    ///
    /// Returns `ContentItemError` if the id or name is blank or the source URL
    /// does not parse.
    pub fn validate(self) -> Result<ContentItem, ContentItemError> {
        let item_id = ItemId::new(self.item_id)?;
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ContentItemError::EmptyName {
                item_id: item_id.to_string(),
            });
        }
        let source_url =
            Url::parse(self.source_url.trim()).map_err(|_| ContentItemError::InvalidSourceUrl {
                item_id: item_id.to_string(),
                raw: self.source_url.clone(),
            })?;

        let mut topic_tags: Vec<String> = self
            .topic_tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        topic_tags.dedup();

        Ok(ContentItem {
            item_id,
            name,
            description: self.description.trim().to_string(),
            topic_tags,
            source_url,
            duration: self.duration.map(whole_seconds),
        })
    }
}

/// Round an authored duration up to whole seconds. Values that are not a
/// usable length become 0, which the estimator treats as unknown.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(secs: f64) -> u32 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    secs.ceil().min(f64::from(u32::MAX)) as u32
}

/// A single short video clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    item_id: ItemId,
    name: String,
    description: String,
    topic_tags: Vec<String>,
    source_url: Url,
    duration: Option<u32>,
}

impl ContentItem {
    #[must_use]
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn topic_tags(&self) -> &[String] {
        &self.topic_tags
    }

    #[must_use]
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Authored duration in seconds. `Some(0)` means the list carried a
    /// duration that is not usable yet.
    #[must_use]
    pub fn duration(&self) -> Option<u32> {
        self.duration
    }

    #[must_use]
    pub fn media_source(&self) -> MediaSource {
        MediaSource::classify(&self.source_url)
    }

    #[must_use]
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topic_tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(topic.trim()))
    }
}
