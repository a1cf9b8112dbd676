//! Drives a `PlaybackSession` with a one-second wall-clock tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bite_core::estimator::PlaybackSession;
use bite_core::model::{ContentItem, ItemId, ProgressUpdate};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::progress::ProgressStore;

/// Tuning for the simulated watch tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub tick: Duration,
    /// Consecutive loops before auto-advancing to the next item.
    pub loop_limit: u32,
    pub auto_advance_delay: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            loop_limit: 3,
            auto_advance_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Progress { item_id: ItemId, percentage: f64 },
    Completed { item_id: ItemId },
    Looped { item_id: ItemId, count: u32 },
    AutoAdvance { from: ItemId, next: ItemId },
}

/// One active watch session.
///
/// The tick timer only exists while the session is watching (engaged and
/// visible). Hidden time is never counted and never caught up. Dropping the
/// tracker cancels its task.
pub struct WatchTracker {
    session: Arc<Mutex<PlaybackSession>>,
    watching: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchTracker {
    /// Start tracking `item`. `next` is the item to auto-advance to after the
    /// loop limit; without one the session just keeps looping.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(
        store: Arc<ProgressStore>,
        item: &ContentItem,
        next: Option<ItemId>,
        config: WatchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let floor = store
            .get_progress(item.item_id())
            .map_or(0.0, |record| record.percentage());
        let session = PlaybackSession::new(item.item_id().clone(), item.duration())
            .with_reported_floor(floor);
        let session = Arc::new(Mutex::new(session));

        let (watching_tx, watching_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_ticker(
            Arc::clone(&session),
            store,
            next,
            config,
            watching_rx,
            events_tx,
        ));

        (
            Self {
                session,
                watching: watching_tx,
                task,
            },
            events_rx,
        )
    }

    /// Host tab visibility changed.
    pub fn set_visible(&self, visible: bool) {
        self.update(|session| session.set_visible(visible));
    }

    /// The playback surface started or stopped being engaged.
    pub fn set_engaged(&self, engaged: bool) {
        self.update(|session| session.set_engaged(engaged));
    }

    /// Authored duration became known after the session started.
    pub fn set_assumed_duration(&self, duration_secs: u32) {
        self.update(|session| session.set_assumed_duration(duration_secs));
    }

    /// Snapshot of the current session state.
    #[must_use]
    pub fn session(&self) -> PlaybackSession {
        lock(&self.session).clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the tick task. Also happens on drop.
    pub fn stop(&self) {
        self.task.abort();
    }

    fn update(&self, change: impl FnOnce(&mut PlaybackSession)) {
        let watching = {
            let mut session = lock(&self.session);
            change(&mut session);
            session.is_watching()
        };
        self.watching.send_replace(watching);
    }
}

impl Drop for WatchTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock(session: &Mutex<PlaybackSession>) -> MutexGuard<'_, PlaybackSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_ticker(
    session: Arc<Mutex<PlaybackSession>>,
    store: Arc<ProgressStore>,
    next: Option<ItemId>,
    config: WatchConfig,
    mut watching: watch::Receiver<bool>,
    events: mpsc::UnboundedSender<WatchEvent>,
) {
    let item_id = lock(&session).item_id().clone();
    let tick_secs = config.tick.as_secs_f64();

    loop {
        // Suspended: no timer exists until watching resumes.
        loop {
            let active = *watching.borrow_and_update();
            if active {
                break;
            }
            if watching.changed().await.is_err() {
                return;
            }
        }

        let mut interval = tokio::time::interval_at(Instant::now() + config.tick, config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = watching.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let active = *watching.borrow_and_update();
                    if active {
                        continue;
                    }
                    debug!(item = %item_id, "watch ticking paused");
                    break;
                }
            }

            let outcome = lock(&session).tick(tick_secs);
            let Some(outcome) = outcome else {
                continue;
            };

            if let Some(percentage) = outcome.report {
                let update = store
                    .update_progress_with_seconds(&item_id, percentage, outcome.watched_seconds)
                    .await;
                let _ = events.send(WatchEvent::Progress {
                    item_id: item_id.clone(),
                    percentage,
                });
                if update == ProgressUpdate::Completed {
                    let _ = events.send(WatchEvent::Completed {
                        item_id: item_id.clone(),
                    });
                }
            }

            if let Some(count) = outcome.looped {
                let _ = events.send(WatchEvent::Looped {
                    item_id: item_id.clone(),
                    count,
                });
                if let Some(next) = next.as_ref().filter(|_| count >= config.loop_limit) {
                    info!(from = %item_id, next = %next, "loop limit reached, advancing");
                    tokio::time::sleep(config.auto_advance_delay).await;
                    let _ = events.send(WatchEvent::AutoAdvance {
                        from: item_id.clone(),
                        next: next.clone(),
                    });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bite_core::model::ContentItemDraft;
    use bite_core::time::fixed_clock;
    use storage::repository::InMemoryStore;

    fn item(id: &str, duration: Option<f64>) -> ContentItem {
        ContentItemDraft {
            item_id: id.into(),
            name: format!("Clip {id}"),
            description: String::new(),
            topic_tags: Vec::new(),
            source_url: format!("https://drive.example.com/file/d/{id}/preview"),
            duration,
        }
        .validate()
        .unwrap()
    }

    fn store() -> Arc<ProgressStore> {
        Arc::new(ProgressStore::new(
            fixed_clock(),
            Arc::new(InMemoryStore::new()),
        ))
    }

    fn id(raw: &str) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_57_ticks_and_stays_complete() {
        let store = store();
        let (tracker, mut events) =
            WatchTracker::start(Arc::clone(&store), &item("a", Some(60.0)), None, WatchConfig::default());
        tracker.set_engaged(true);

        tokio::time::sleep(Duration::from_millis(56_500)).await;
        assert!(!store.is_completed(&id("a")));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(store.is_completed(&id("a")));
        let mut saw_completed = false;
        while let Ok(event) = events.try_recv() {
            if event == (WatchEvent::Completed { item_id: id("a") }) {
                saw_completed = true;
            }
        }
        assert!(saw_completed);

        tokio::time::sleep(Duration::from_secs(20)).await;
        let record = store.get_progress(&id("a")).unwrap();
        assert!((record.percentage() - 100.0).abs() < f64::EPSILON);
        assert_eq!(tracker.session().loop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_interval_is_not_counted() {
        let (tracker, _events) =
            WatchTracker::start(store(), &item("a", Some(60.0)), None, WatchConfig::default());
        tracker.set_engaged(true);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert!((tracker.session().accumulated_secs() - 10.0).abs() < f64::EPSILON);

        tracker.set_visible(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!((tracker.session().accumulated_secs() - 10.0).abs() < f64::EPSILON);

        tracker.set_visible(true);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!((tracker.session().accumulated_secs() - 11.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_counts_until_engaged() {
        let store = store();
        let (tracker, _events) =
            WatchTracker::start(Arc::clone(&store), &item("a", Some(60.0)), None, WatchConfig::default());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(tracker.session().accumulated_secs().abs() < f64::EPSILON);
        assert!(store.get_progress(&id("a")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advances_after_loop_limit() {
        let (tracker, mut events) = WatchTracker::start(
            store(),
            &item("a", Some(2.0)),
            Some(id("b")),
            WatchConfig::default(),
        );
        tracker.set_engaged(true);

        let mut loops = Vec::new();
        let advance = loop {
            match events.recv().await.unwrap() {
                WatchEvent::Looped { count, .. } => loops.push(count),
                WatchEvent::AutoAdvance { from, next } => break (from, next),
                _ => {}
            }
        };
        assert_eq!(loops, vec![1, 2, 3]);
        assert_eq!(advance, (id("a"), id("b")));
        tokio::task::yield_now().await;
        assert!(tracker.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_looping_without_next_item() {
        let (tracker, _events) =
            WatchTracker::start(store(), &item("a", Some(2.0)), None, WatchConfig::default());
        tracker.set_engaged(true);
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(tracker.session().loop_count(), 5);
        assert!(!tracker.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_from_stored_progress() {
        let store = store();
        store.update_progress(&id("a"), 50.0).await;
        let (tracker, mut events) =
            WatchTracker::start(Arc::clone(&store), &item("a", Some(10.0)), None, WatchConfig::default());
        tracker.set_engaged(true);

        tokio::time::sleep(Duration::from_millis(6_500)).await;
        let mut reported = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let WatchEvent::Progress { percentage, .. } = event {
                reported.push(percentage);
            }
        }
        assert_eq!(reported.len(), 1);
        assert!((reported[0] - 60.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_ticking() {
        let (tracker, _events) =
            WatchTracker::start(store(), &item("a", Some(60.0)), None, WatchConfig::default());
        tracker.set_engaged(true);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        tracker.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!((tracker.session().accumulated_secs() - 3.0).abs() < f64::EPSILON);
        assert!(tracker.is_finished());
    }
}
