use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ItemId;

/// Percentage at which an item counts as watched.
pub const COMPLETION_THRESHOLD: f64 = 95.0;
pub const FULL_PERCENTAGE: f64 = 100.0;

/// Outcome of applying a progress value to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Stored percentage moved forward (or stayed equal).
    Accepted,
    /// The value crossed the completion threshold; percentage is pinned to 100.
    Completed,
    /// Lower than the stored value, or the record is already complete.
    Rejected,
    /// A completed record had a percentage other than 100 and was fixed.
    Repaired,
}

impl ProgressUpdate {
    /// True when the record changed and must be persisted.
    #[must_use]
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Per-item watch progress.
///
/// `is_completed == true` always implies `percentage == 100`, and the
/// percentage never decreases except through an explicit reset (which
/// removes the record entirely).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    item_id: ItemId,
    #[serde(default)]
    watched_seconds: f64,
    #[serde(default)]
    percentage: f64,
    #[serde(default)]
    last_observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_completed: bool,
}

impl ProgressRecord {
    /// A fresh record at 0%.
    #[must_use]
    pub fn new(item_id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            item_id,
            watched_seconds: 0.0,
            percentage: 0.0,
            last_observed_at: Some(now),
            is_completed: false,
        }
    }

    /// A record already marked complete.
    #[must_use]
    pub fn completed(item_id: ItemId, now: DateTime<Utc>) -> Self {
        let mut record = Self::new(item_id, now);
        record.mark_completed(now);
        record
    }

    #[must_use]
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub fn watched_seconds(&self) -> f64 {
        self.watched_seconds
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[must_use]
    pub fn last_observed_at(&self) -> Option<DateTime<Utc>> {
        self.last_observed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Apply a new percentage observation.
    ///
    /// Input is clamped to `[0, 100]`. Completed records only accept repairs
    /// back to 100. Values below the stored percentage are rejected.
    pub fn apply(
        &mut self,
        percentage: f64,
        watched_seconds: Option<f64>,
        now: DateTime<Utc>,
    ) -> ProgressUpdate {
        if self.is_completed {
            if !is_full(self.percentage) {
                self.percentage = FULL_PERCENTAGE;
                self.last_observed_at = Some(now);
                return ProgressUpdate::Repaired;
            }
            return ProgressUpdate::Rejected;
        }

        let percentage = clamp_percentage(percentage);
        if percentage < self.percentage {
            return ProgressUpdate::Rejected;
        }

        self.percentage = percentage;
        if let Some(seconds) = watched_seconds.filter(|s| s.is_finite()) {
            self.watched_seconds = self.watched_seconds.max(seconds.max(0.0));
        }
        self.last_observed_at = Some(now);

        if percentage >= COMPLETION_THRESHOLD {
            self.is_completed = true;
            self.percentage = FULL_PERCENTAGE;
            return ProgressUpdate::Completed;
        }
        ProgressUpdate::Accepted
    }

    /// Force completion. Returns `false` if the record was already complete at 100.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) -> bool {
        let unchanged = self.is_completed && is_full(self.percentage);
        self.is_completed = true;
        self.percentage = FULL_PERCENTAGE;
        if !unchanged {
            self.last_observed_at = Some(now);
        }
        !unchanged
    }

    /// Repair legacy or inconsistent persisted shapes.
    ///
    /// Returns `true` if anything was changed.
    pub fn normalize(&mut self) -> bool {
        let before = self.clone();

        self.percentage = clamp_percentage(self.percentage);
        if !self.watched_seconds.is_finite() || self.watched_seconds < 0.0 {
            self.watched_seconds = 0.0;
        }
        if self.percentage >= COMPLETION_THRESHOLD {
            self.is_completed = true;
        }
        if self.is_completed {
            self.percentage = FULL_PERCENTAGE;
        }

        *self != before
    }
}

fn is_full(value: f64) -> bool {
    (value - FULL_PERCENTAGE).abs() < f64::EPSILON
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, FULL_PERCENTAGE)
}
