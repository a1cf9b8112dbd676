//! Durable, monotonic per-item progress.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bite_core::Clock;
use bite_core::model::{ItemId, ProgressRecord, ProgressUpdate};
use serde_json::Value;
use storage::repository::{KeyValueStore, keys};
use tracing::{debug, info, warn};

/// Progress records for every item, cached in memory and written through to
/// a `KeyValueStore` on each mutation.
///
/// Storage failures never reach the caller: they are logged and the in-memory
/// state stays authoritative for the rest of the session.
pub struct ProgressStore {
    clock: Clock,
    kv: Arc<dyn KeyValueStore>,
    records: Mutex<BTreeMap<ItemId, ProgressRecord>>,
    persist_gate: tokio::sync::Mutex<()>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(clock: Clock, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            clock,
            kv,
            records: Mutex::new(BTreeMap::new()),
            persist_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Load persisted records, repair legacy shapes and write back any repairs.
    ///
    /// Returns the number of records loaded.
    pub async fn init(&self) -> usize {
        let raw = match self.kv.load(keys::PROGRESS).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to read progress, starting empty: {err}");
                None
            }
        };

        let (loaded, dirty) = raw.as_deref().map_or_else(
            || (BTreeMap::new(), false),
            parse_records,
        );
        let count = loaded.len();
        *self.lock() = loaded;

        if dirty {
            info!("repaired persisted progress records");
            self.persist().await;
        }
        count
    }

    /// Record a percentage for `item_id`.
    pub async fn update_progress(&self, item_id: &ItemId, percentage: f64) -> ProgressUpdate {
        self.apply(item_id, percentage, None).await
    }

    /// Record a percentage along with the seconds observed so far.
    pub async fn update_progress_with_seconds(
        &self,
        item_id: &ItemId,
        percentage: f64,
        watched_seconds: f64,
    ) -> ProgressUpdate {
        self.apply(item_id, percentage, Some(watched_seconds)).await
    }

    async fn apply(
        &self,
        item_id: &ItemId,
        percentage: f64,
        watched_seconds: Option<f64>,
    ) -> ProgressUpdate {
        let now = self.clock.now();
        let update = {
            let mut records = self.lock();
            let record = records
                .entry(item_id.clone())
                .or_insert_with(|| ProgressRecord::new(item_id.clone(), now));
            record.apply(percentage, watched_seconds, now)
        };

        match update {
            ProgressUpdate::Completed => info!(item = %item_id, "item completed"),
            ProgressUpdate::Repaired => warn!(item = %item_id, "repaired completed record"),
            ProgressUpdate::Rejected => {
                debug!(item = %item_id, percentage, "progress update ignored");
            }
            ProgressUpdate::Accepted => {}
        }

        if update.is_change() {
            self.persist().await;
        }
        update
    }

    /// Force completion regardless of prior state. Idempotent.
    pub async fn mark_completed(&self, item_id: &ItemId) {
        let now = self.clock.now();
        let changed = {
            let mut records = self.lock();
            match records.get_mut(item_id) {
                Some(record) => record.mark_completed(now),
                None => {
                    records.insert(
                        item_id.clone(),
                        ProgressRecord::completed(item_id.clone(), now),
                    );
                    true
                }
            }
        };
        if changed {
            info!(item = %item_id, "item marked completed");
            self.persist().await;
        }
    }

    #[must_use]
    pub fn get_progress(&self, item_id: &ItemId) -> Option<ProgressRecord> {
        self.lock().get(item_id).cloned()
    }

    /// Absent records count as not completed.
    #[must_use]
    pub fn is_completed(&self, item_id: &ItemId) -> bool {
        self.lock()
            .get(item_id)
            .is_some_and(ProgressRecord::is_completed)
    }

    #[must_use]
    pub fn list_completed(&self) -> BTreeSet<ItemId> {
        self.lock()
            .values()
            .filter(|record| record.is_completed())
            .map(|record| record.item_id().clone())
            .collect()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lock().values().filter(|r| r.is_completed()).count()
    }

    #[must_use]
    pub fn records(&self) -> Vec<ProgressRecord> {
        self.lock().values().cloned().collect()
    }

    pub async fn reset_all(&self) {
        self.lock().clear();
        let _gate = self.persist_gate.lock().await;
        if let Err(err) = self.kv.remove(keys::PROGRESS).await {
            warn!("failed to clear persisted progress: {err}");
        }
    }

    /// Clear a single record. Returns whether one existed.
    pub async fn reset_one(&self, item_id: &ItemId) -> bool {
        let removed = self.lock().remove(item_id).is_some();
        if removed {
            self.persist().await;
        }
        removed
    }

    async fn persist(&self) {
        let _gate = self.persist_gate.lock().await;
        let snapshot = serde_json::to_string(&*self.lock());
        let json = match snapshot {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize progress: {err}");
                return;
            }
        };
        if let Err(err) = self.kv.save(keys::PROGRESS, &json).await {
            warn!("failed to persist progress, keeping in-memory state: {err}");
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ItemId, ProgressRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parse the persisted document, skipping entries that cannot be read.
///
/// Returns the records and whether anything was repaired or dropped.
fn parse_records(raw: &str) -> (BTreeMap<ItemId, ProgressRecord>, bool) {
    let entries: serde_json::Map<String, Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("persisted progress is corrupt, starting empty: {err}");
            return (BTreeMap::new(), false);
        }
    };

    let mut dirty = false;
    let mut records = BTreeMap::new();
    for (key, mut value) in entries {
        let Ok(item_id) = ItemId::new(key.clone()) else {
            warn!(key = %key, "dropping progress entry with empty id");
            dirty = true;
            continue;
        };
        if let Value::Object(fields) = &mut value {
            // Older documents keyed records by id without repeating it inside.
            if !fields.contains_key("itemId") {
                fields.insert("itemId".into(), Value::String(key.clone()));
            }
        }
        let mut record: ProgressRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(err) => {
                warn!(key = %key, "dropping malformed progress entry: {err}");
                dirty = true;
                continue;
            }
        };
        if record.item_id() != &item_id {
            dirty = true;
            continue;
        }
        dirty |= record.normalize();
        records.insert(item_id, record);
    }
    (records, dirty)
}
