use std::sync::Arc;

use storage::repository::{EngagementRepository, Storage};
use tracing::info;

use crate::Clock;
use crate::analytics::AnalyticsService;
use crate::catalog_service::CatalogService;
use crate::engagement::EngagementService;
use crate::error::AppServicesError;
use crate::fingerprint::FingerprintService;
use crate::layout::LayoutService;
use crate::notes::NoteService;
use crate::progress::ProgressStore;
use crate::remote::{RemoteStoreConfig, RemoteTableClient};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    progress: Arc<ProgressStore>,
    notes: Arc<NoteService>,
    layout: Arc<LayoutService>,
    engagement: Arc<EngagementService>,
    analytics: Option<Arc<AnalyticsService>>,
    catalog: Arc<CatalogService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Likes and feedback go to the remote table service when `remote` is
    /// set and to the local database otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        remote: Option<RemoteStoreConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let engagement: Arc<dyn EngagementRepository> = match remote {
            Some(config) => {
                info!(url = %config.base_url, "using remote engagement store");
                Arc::new(RemoteTableClient::new(config))
            }
            None => Arc::clone(&storage.engagement),
        };
        Ok(Self::assemble(clock, &storage, Some(engagement)).await)
    }

    /// Build services over memory-only storage.
    pub async fn in_memory(clock: Clock) -> Self {
        let storage = Storage::in_memory();
        let engagement = Arc::clone(&storage.engagement);
        Self::assemble(clock, &storage, Some(engagement)).await
    }

    /// Wire services over `storage`. `engagement` of `None` disables likes,
    /// feedback and analytics.
    pub async fn assemble(
        clock: Clock,
        storage: &Storage,
        engagement: Option<Arc<dyn EngagementRepository>>,
    ) -> Self {
        let progress = Arc::new(ProgressStore::new(clock, Arc::clone(&storage.kv)));
        progress.init().await;
        let notes = Arc::new(NoteService::new(clock, Arc::clone(&storage.kv)));
        notes.init().await;
        let layout = Arc::new(LayoutService::new(Arc::clone(&storage.kv)));
        let fingerprint = Arc::new(FingerprintService::new(Arc::clone(&storage.kv)));

        let analytics = engagement
            .as_ref()
            .map(|repo| Arc::new(AnalyticsService::new(Arc::clone(repo))));
        let engagement = Arc::new(EngagementService::new(clock, engagement, fingerprint));

        Self {
            clock,
            progress,
            notes,
            layout,
            engagement,
            analytics,
            catalog: Arc::new(CatalogService::new()),
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn notes(&self) -> Arc<NoteService> {
        Arc::clone(&self.notes)
    }

    #[must_use]
    pub fn layout(&self) -> Arc<LayoutService> {
        Arc::clone(&self.layout)
    }

    #[must_use]
    pub fn engagement(&self) -> Arc<EngagementService> {
        Arc::clone(&self.engagement)
    }

    #[must_use]
    pub fn analytics(&self) -> Option<Arc<AnalyticsService>> {
        self.analytics.clone()
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }
}
