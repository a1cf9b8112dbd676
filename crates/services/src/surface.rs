//! Load-timeout handling around the playback surface state machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bite_core::surface::{SurfaceAction, SurfaceEvent, SurfaceSelector, SurfaceState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceConfig {
    /// How long the embedded viewer gets to signal that it loaded.
    pub load_timeout: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(10),
        }
    }
}

struct Inner {
    selector: Mutex<SurfaceSelector>,
    timer: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<SurfaceState>,
    config: SurfaceConfig,
}

/// Owns the surface selector for the active item and its load timer.
///
/// Every armed timer is aborted when it is superseded, when the fallback
/// signals load, or when the controller is dropped.
pub struct SurfaceController {
    inner: Arc<Inner>,
}

impl SurfaceController {
    #[must_use]
    pub fn new(source_url: Url, config: SurfaceConfig) -> Self {
        let selector = SurfaceSelector::new(source_url);
        let (state, _) = watch::channel(selector.state());
        Self {
            inner: Arc::new(Inner {
                selector: Mutex::new(selector),
                timer: Mutex::new(None),
                state,
                config,
            }),
        }
    }

    /// Must be called from within a Tokio runtime, as are the other
    /// transitions that can arm a load timer.
    pub fn start(&self) -> SurfaceState {
        dispatch(&self.inner, SurfaceEvent::Start)
    }

    /// The direct media element reported a playback error.
    pub fn media_error(&self) -> SurfaceState {
        dispatch(&self.inner, SurfaceEvent::MediaError)
    }

    /// The embedded viewer signalled that it finished loading.
    pub fn fallback_loaded(&self) -> SurfaceState {
        let attempt = match self.state() {
            SurfaceState::FallbackLoading { attempt } => attempt,
            state => return state,
        };
        dispatch(&self.inner, SurfaceEvent::FallbackLoaded { attempt })
    }

    /// User-initiated retry after a load failure.
    pub fn retry(&self) -> SurfaceState {
        dispatch(&self.inner, SurfaceEvent::Retry)
    }

    #[must_use]
    pub fn state(&self) -> SurfaceState {
        *self.inner.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SurfaceState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn uses_estimator(&self) -> bool {
        lock(&self.inner.selector).uses_estimator()
    }

    /// Source URL to open outside the app, offered once the fallback failed.
    #[must_use]
    pub fn external_url(&self) -> Option<Url> {
        lock(&self.inner.selector).external_url().cloned()
    }
}

impl Drop for SurfaceController {
    fn drop(&mut self) {
        cancel_timer(&self.inner);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn dispatch(inner: &Arc<Inner>, event: SurfaceEvent) -> SurfaceState {
    let (action, state) = {
        let mut selector = lock(&inner.selector);
        let action = selector.handle(event);
        (action, selector.state())
    };
    inner.state.send_if_modified(|current| {
        let changed = *current != state;
        *current = state;
        changed
    });

    match action {
        SurfaceAction::BeginFallbackLoad { attempt } => {
            info!(attempt, "loading fallback surface");
            arm_timer(inner, attempt);
        }
        SurfaceAction::CancelTimeout { attempt } => {
            info!(attempt, "fallback surface loaded");
            cancel_timer(inner);
        }
        SurfaceAction::None => {}
    }
    state
}

fn arm_timer(inner: &Arc<Inner>, attempt: u32) {
    let weak = Arc::downgrade(inner);
    let timeout = inner.config.load_timeout;
    let handle = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(inner) = weak.upgrade() {
            warn!(attempt, "fallback surface did not load in {timeout:?}");
            dispatch(&inner, SurfaceEvent::LoadTimedOut { attempt });
        }
    });
    if let Some(previous) = lock(&inner.timer).replace(handle) {
        previous.abort();
    }
}

fn cancel_timer(inner: &Inner) {
    if let Some(handle) = lock(&inner.timer).take() {
        handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded() -> SurfaceController {
        SurfaceController::new(
            Url::parse("https://drive.example.com/file/d/x/preview").unwrap(),
            SurfaceConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_reaches_error_and_retry_reloads() {
        let surface = embedded();
        assert_eq!(surface.start(), SurfaceState::FallbackLoading { attempt: 1 });

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(surface.state(), SurfaceState::FallbackLoading { attempt: 1 });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(surface.state(), SurfaceState::FallbackError { attempt: 1 });
        assert!(surface.external_url().is_some());

        assert_eq!(surface.retry(), SurfaceState::FallbackLoading { attempt: 2 });
        assert!(surface.external_url().is_none());

        assert_eq!(surface.fallback_loaded(), SurfaceState::FallbackReady { attempt: 2 });
        assert!(surface.uses_estimator());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(surface.state(), SurfaceState::FallbackReady { attempt: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_before_timeout_stays_ready() {
        let surface = embedded();
        surface.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        surface.fallback_loaded();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(surface.state(), SurfaceState::FallbackReady { attempt: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn direct_error_falls_back() {
        let surface = SurfaceController::new(
            Url::parse("https://cdn.example.com/clip.mp4").unwrap(),
            SurfaceConfig::default(),
        );
        let mut states = surface.subscribe();
        assert_eq!(surface.start(), SurfaceState::Direct);
        assert!(states.has_changed().unwrap());
        let _ = states.borrow_and_update();

        assert_eq!(surface.media_error(), SurfaceState::FallbackLoading { attempt: 1 });
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(*states.borrow(), SurfaceState::FallbackError { attempt: 1 });
    }

    #[tokio::test]
    async fn retry_is_ignored_unless_failed() {
        let surface = embedded();
        surface.start();
        assert_eq!(surface.retry(), SurfaceState::FallbackLoading { attempt: 1 });
    }
}
