//! Per-item markdown notes, persisted as one JSON document.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bite_core::Clock;
use bite_core::model::{ItemId, Note};
use storage::repository::{KeyValueStore, keys};
use tracing::warn;

use crate::error::NoteServiceError;

pub struct NoteService {
    clock: Clock,
    kv: Arc<dyn KeyValueStore>,
    notes: Mutex<BTreeMap<ItemId, Note>>,
    persist_gate: tokio::sync::Mutex<()>,
}

impl NoteService {
    #[must_use]
    pub fn new(clock: Clock, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock,
            kv,
            notes: Mutex::new(BTreeMap::new()),
            persist_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Load persisted notes. A missing or unreadable document starts empty.
    pub async fn init(&self) -> usize {
        let loaded = match self.kv.load(keys::NOTES).await {
            Ok(Some(raw)) => match serde_json::from_str::<BTreeMap<ItemId, Note>>(&raw) {
                Ok(notes) => notes,
                Err(err) => {
                    warn!("persisted notes are corrupt, starting empty: {err}");
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!("failed to read notes: {err}");
                BTreeMap::new()
            }
        };
        let count = loaded.len();
        *self.lock() = loaded;
        count
    }

    #[must_use]
    pub fn get(&self, item_id: &ItemId) -> Option<Note> {
        self.lock().get(item_id).cloned()
    }

    #[must_use]
    pub fn list(&self) -> Vec<Note> {
        self.lock().values().cloned().collect()
    }

    /// Save `body` as the note for `item_id`. A blank body deletes the note.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Note` when the body fails validation.
    pub async fn save(
        &self,
        item_id: &ItemId,
        body: &str,
    ) -> Result<Option<Note>, NoteServiceError> {
        let note = Note::new(item_id.clone(), body, self.clock.now())?;
        {
            let mut notes = self.lock();
            match &note {
                Some(note) => {
                    notes.insert(item_id.clone(), note.clone());
                }
                None => {
                    notes.remove(item_id);
                }
            }
        }
        self.persist().await;
        Ok(note)
    }

    /// Returns whether a note existed.
    pub async fn delete(&self, item_id: &ItemId) -> bool {
        let removed = self.lock().remove(item_id).is_some();
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Sanitized HTML for the note on `item_id`, if any.
    #[must_use]
    pub fn render_html(&self, item_id: &ItemId) -> Option<String> {
        self.get(item_id).map(|note| markdown_to_html(note.body()))
    }

    async fn persist(&self) {
        let _gate = self.persist_gate.lock().await;
        let json = match serde_json::to_string(&*self.lock()) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize notes: {err}");
                return;
            }
        };
        if let Err(err) = self.kv.save(keys::NOTES, &json).await {
            warn!("failed to persist notes: {err}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ItemId, Note>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[must_use]
pub fn markdown_to_html(input: &str) -> String {
    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);
    options.insert(pulldown_cmark::Options::ENABLE_TASKLISTS);

    let parser = pulldown_cmark::Parser::new_ext(input, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    sanitize_html(&html)
}

#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = [
        "p", "br", "em", "strong", "del", "code", "pre", "blockquote", "ul", "ol", "li", "a",
        "h1", "h2", "h3", "h4", "table", "thead", "tbody", "tr", "th", "td", "input",
    ]
    .into_iter()
    .collect();

    let mut attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    attributes.insert("a", ["href"].into_iter().collect());
    attributes.insert("input", ["type", "checked", "disabled"].into_iter().collect());

    ammonia::Builder::new()
        .tags(tags)
        .tag_attributes(attributes)
        .clean(html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bite_core::model::{MAX_NOTE_CHARS, NoteError};
    use bite_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn save_reload_and_blank_deletes() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let notes = NoteService::new(fixed_clock(), Arc::clone(&kv));
        notes.save(&id("a"), "remember **this**").await.unwrap();

        let reloaded = NoteService::new(fixed_clock(), Arc::clone(&kv));
        assert_eq!(reloaded.init().await, 1);
        assert_eq!(reloaded.get(&id("a")).unwrap().body(), "remember **this**");

        assert!(reloaded.save(&id("a"), "   ").await.unwrap().is_none());
        assert!(reloaded.get(&id("a")).is_none());
        assert!(!reloaded.delete(&id("a")).await);
    }

    #[tokio::test]
    async fn too_long_is_rejected() {
        let notes = NoteService::new(fixed_clock(), Arc::new(InMemoryStore::new()));
        let body = "x".repeat(MAX_NOTE_CHARS + 1);
        let err = notes.save(&id("a"), &body).await.unwrap_err();
        assert!(matches!(
            err,
            NoteServiceError::Note(NoteError::TooLong { .. })
        ));
        assert!(notes.list().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_starts_empty() {
        let kv = Arc::new(InMemoryStore::new());
        kv.save(keys::NOTES, "{not json").await.unwrap();
        let notes = NoteService::new(fixed_clock(), kv);
        assert_eq!(notes.init().await, 0);
    }

    #[test]
    fn rendering_strips_scripts() {
        let html = markdown_to_html("**bold** <script>alert(1)</script>");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<script>"));
    }
}
