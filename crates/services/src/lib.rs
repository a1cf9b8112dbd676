#![forbid(unsafe_code)]

pub mod analytics;
pub mod app_services;
pub mod catalog_service;
pub mod engagement;
pub mod error;
pub mod fingerprint;
pub mod layout;
pub mod notes;
pub mod progress;
pub mod remote;
pub mod surface;
pub mod watch;

pub use bite_core::Clock;

pub use analytics::{AnalyticsReport, AnalyticsService, ItemSummary};
pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use engagement::EngagementService;
pub use error::{AppServicesError, CatalogServiceError, NoteServiceError, RemoteConfigError};
pub use fingerprint::FingerprintService;
pub use layout::LayoutService;
pub use notes::NoteService;
pub use progress::ProgressStore;
pub use remote::{RemoteStoreConfig, RemoteTableClient};
pub use surface::{SurfaceConfig, SurfaceController};
pub use watch::{WatchConfig, WatchEvent, WatchTracker};
