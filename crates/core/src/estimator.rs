//! Synthetic watch-progress estimation for surfaces that report no playback events.
//!
//! `PlaybackSession` is a pure state machine: the caller decides when a tick
//! happens (see the watch tracker in the services crate), the session decides
//! what that tick means. Anything that can report real playback positions
//! implements [`ProgressSignal`] instead and bypasses the estimator entirely.

use crate::model::{FULL_PERCENTAGE, ItemId};

/// Assumed clip length when an item carries no authored duration.
pub const DEFAULT_ASSUMED_DURATION_SECS: u32 = 60;

/// A source of "how far has the viewer got" for one item.
pub trait ProgressSignal {
    /// Percentage watched, in `[0, 100]`.
    fn percentage(&self) -> f64;

    /// Seconds of content observed so far.
    fn watched_seconds(&self) -> f64;
}

/// Authoritative position reported by a controllable media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaPosition {
    pub position_secs: f64,
    pub duration_secs: f64,
}

impl ProgressSignal for MediaPosition {
    fn percentage(&self) -> f64 {
        percentage_of(self.position_secs, self.duration_secs)
    }

    fn watched_seconds(&self) -> f64 {
        self.position_secs.max(0.0)
    }
}

/// What a single counted tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub percentage: f64,
    pub watched_seconds: f64,
    /// Set when `percentage` exceeds every value reported before in this session.
    pub report: Option<f64>,
    /// Set to the new loop count when the assumed duration was exhausted on this tick.
    pub looped: Option<u32>,
}

/// Transient per-item watch state. Not persisted.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    item_id: ItemId,
    assumed_duration_secs: u32,
    visible: bool,
    engaged: bool,
    accumulated_secs: f64,
    total_secs: f64,
    loop_count: u32,
    last_reported: f64,
}

impl PlaybackSession {
    /// Start a session. `duration_secs` of `None` uses the fallback estimate;
    /// `Some(0)` means "unknown" and keeps the percentage at 0.
    #[must_use]
    pub fn new(item_id: ItemId, duration_secs: Option<u32>) -> Self {
        Self {
            item_id,
            assumed_duration_secs: duration_secs.unwrap_or(DEFAULT_ASSUMED_DURATION_SECS),
            visible: true,
            engaged: false,
            accumulated_secs: 0.0,
            total_secs: 0.0,
            loop_count: 0,
            last_reported: 0.0,
        }
    }

    /// Seed the "already reported" mark, typically from the stored record, so
    /// the session never forwards values the store would reject anyway.
    #[must_use]
    pub fn with_reported_floor(mut self, percentage: f64) -> Self {
        if percentage.is_finite() {
            self.last_reported = percentage.clamp(0.0, FULL_PERCENTAGE);
        }
        self
    }

    #[must_use]
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    #[must_use]
    pub fn assumed_duration_secs(&self) -> u32 {
        self.assumed_duration_secs
    }

    pub fn set_assumed_duration(&mut self, duration_secs: u32) {
        self.assumed_duration_secs = duration_secs;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn set_engaged(&mut self, engaged: bool) {
        self.engaged = engaged;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Ticks count only while the surface is engaged and the host is visible.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.visible && self.engaged
    }

    #[must_use]
    pub fn accumulated_secs(&self) -> f64 {
        self.accumulated_secs
    }

    #[must_use]
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    #[must_use]
    pub fn last_reported(&self) -> f64 {
        self.last_reported
    }

    /// True once the session has looped `limit` times.
    #[must_use]
    pub fn loops_exhausted(&self, limit: u32) -> bool {
        limit > 0 && self.loop_count >= limit
    }

    /// Count `elapsed_secs` of watching. Returns `None` when not watching.
    pub fn tick(&mut self, elapsed_secs: f64) -> Option<TickOutcome> {
        if !self.is_watching() || !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return None;
        }

        self.accumulated_secs += elapsed_secs;
        self.total_secs += elapsed_secs;

        let percentage = self.percentage();
        let report = if percentage > self.last_reported {
            self.last_reported = percentage;
            Some(percentage)
        } else {
            None
        };

        let duration = f64::from(self.assumed_duration_secs);
        let looped = if self.assumed_duration_secs > 0 && self.accumulated_secs >= duration {
            self.loop_count = self.loop_count.saturating_add(1);
            self.accumulated_secs = 0.0;
            Some(self.loop_count)
        } else {
            None
        };

        Some(TickOutcome {
            percentage,
            watched_seconds: self.total_secs,
            report,
            looped,
        })
    }
}

impl ProgressSignal for PlaybackSession {
    fn percentage(&self) -> f64 {
        percentage_of(self.accumulated_secs, f64::from(self.assumed_duration_secs))
    }

    fn watched_seconds(&self) -> f64 {
        self.total_secs
    }
}

fn percentage_of(elapsed: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !elapsed.is_finite() {
        return 0.0;
    }
    (elapsed.max(0.0) * FULL_PERCENTAGE / duration).min(FULL_PERCENTAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::COMPLETION_THRESHOLD;

    fn watching(duration: Option<u32>) -> PlaybackSession {
        let mut session = PlaybackSession::new(ItemId::new("a").unwrap(), duration);
        session.set_engaged(true);
        session
    }

    #[test]
    fn ticks_are_ignored_unless_watching() {
        let mut session = PlaybackSession::new(ItemId::new("a").unwrap(), Some(60));
        assert!(session.tick(1.0).is_none());
        session.set_engaged(true);
        session.set_visible(false);
        assert!(session.tick(1.0).is_none());
        assert!(session.accumulated_secs().abs() < f64::EPSILON);
    }

    #[test]
    fn completion_detected_at_57_of_60_seconds() {
        let mut session = watching(Some(60));
        let mut last = None;
        for _ in 0..57 {
            last = session.tick(1.0);
        }
        let outcome = last.unwrap();
        assert!((outcome.percentage - 95.0).abs() < 1e-9);
        assert!(outcome.percentage >= COMPLETION_THRESHOLD);
        assert_eq!(outcome.report, Some(outcome.percentage));
    }

    #[test]
    fn loops_reset_accumulated_and_stop_reporting_lower_values() {
        let mut session = watching(Some(3));
        session.tick(1.0);
        session.tick(1.0);
        let third = session.tick(1.0).unwrap();
        assert_eq!(third.looped, Some(1));
        assert!((third.percentage - 100.0).abs() < f64::EPSILON);
        assert!(session.accumulated_secs().abs() < f64::EPSILON);

        let after_loop = session.tick(1.0).unwrap();
        assert!(after_loop.report.is_none());
        assert!((after_loop.watched_seconds - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_duration_keeps_percentage_at_zero_until_known() {
        let mut session = watching(Some(0));
        for _ in 0..10 {
            let outcome = session.tick(1.0).unwrap();
            assert!(outcome.percentage.abs() < f64::EPSILON);
            assert!(outcome.looped.is_none());
        }
        session.set_assumed_duration(20);
        let outcome = session.tick(1.0).unwrap();
        assert!((outcome.percentage - 55.0).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_uses_fallback() {
        let session = PlaybackSession::new(ItemId::new("a").unwrap(), None);
        assert_eq!(session.assumed_duration_secs(), DEFAULT_ASSUMED_DURATION_SECS);
    }

    #[test]
    fn reported_floor_suppresses_old_values() {
        let mut session = watching(Some(10)).with_reported_floor(50.0);
        for _ in 0..5 {
            assert!(session.tick(1.0).unwrap().report.is_none());
        }
        let reported = session.tick(1.0).unwrap().report.unwrap();
        assert!((reported - 60.0).abs() < 1e-9);
    }

    #[test]
    fn loops_exhausted_after_limit() {
        let mut session = watching(Some(1));
        for _ in 0..3 {
            session.tick(1.0);
        }
        assert!(session.loops_exhausted(3));
        assert!(!session.loops_exhausted(0));
    }

    #[test]
    fn media_position_signal() {
        let pos = MediaPosition {
            position_secs: 30.0,
            duration_secs: 120.0,
        };
        assert!((pos.percentage() - 25.0).abs() < f64::EPSILON);
        assert!((pos.watched_seconds() - 30.0).abs() < f64::EPSILON);
    }
}
