use std::sync::Arc;

use bite_core::model::PanelLayout;
use storage::repository::{KeyValueStore, keys};
use tracing::warn;

/// Persists the player screen's panel arrangement.
#[derive(Clone)]
pub struct LayoutService {
    kv: Arc<dyn KeyValueStore>,
}

impl LayoutService {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored layout, or the default when nothing usable is stored.
    pub async fn load(&self) -> PanelLayout {
        match self.kv.load(keys::LAYOUT).await {
            Ok(Some(raw)) => serde_json::from_str::<PanelLayout>(&raw)
                .map(PanelLayout::clamped)
                .unwrap_or_else(|err| {
                    warn!("stored layout is unreadable, using defaults: {err}");
                    PanelLayout::default()
                }),
            Ok(None) => PanelLayout::default(),
            Err(err) => {
                warn!("failed to read layout: {err}");
                PanelLayout::default()
            }
        }
    }

    /// Clamp and persist `layout`, returning what was stored.
    pub async fn save(&self, layout: PanelLayout) -> PanelLayout {
        let layout = layout.clamped();
        match serde_json::to_string(&layout) {
            Ok(json) => {
                if let Err(err) = self.kv.save(keys::LAYOUT, &json).await {
                    warn!("failed to persist layout: {err}");
                }
            }
            Err(err) => warn!("failed to serialize layout: {err}"),
        }
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bite_core::model::{MAX_PANEL_WIDTH, MIN_PANEL_WIDTH};
    use storage::repository::InMemoryStore;

    #[tokio::test]
    async fn defaults_then_clamped_round_trip() {
        let kv = Arc::new(InMemoryStore::new());
        let layouts = LayoutService::new(kv.clone());
        assert_eq!(layouts.load().await, PanelLayout::default());

        let saved = layouts
            .save(PanelLayout {
                sidebar_width: 10,
                notes_width: 5_000,
                sidebar_collapsed: true,
                notes_open: true,
            })
            .await;
        assert_eq!(saved.sidebar_width, MIN_PANEL_WIDTH);
        assert_eq!(saved.notes_width, MAX_PANEL_WIDTH);
        assert_eq!(layouts.load().await, saved);
    }

    #[tokio::test]
    async fn corrupt_layout_falls_back_to_default() {
        let kv = Arc::new(InMemoryStore::new());
        kv.save(keys::LAYOUT, "[]").await.unwrap();
        assert_eq!(LayoutService::new(kv).load().await, PanelLayout::default());
    }
}
