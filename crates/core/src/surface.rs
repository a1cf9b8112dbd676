//! Playback surface selection: native media element first, embedded viewer as fallback.

use url::Url;

use crate::model::MediaSource;

/// Number of a fallback load attempt; each retry gets a new one.
pub type Attempt = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Initializing,
    /// Playing through a controllable media element.
    Direct,
    /// Waiting for the embedded viewer to signal that it loaded.
    FallbackLoading { attempt: Attempt },
    /// Embedded viewer is up; progress comes from the estimator.
    FallbackReady { attempt: Attempt },
    /// Embedded viewer never signalled load within the timeout.
    FallbackError { attempt: Attempt },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Start,
    MediaError,
    FallbackLoaded { attempt: Attempt },
    LoadTimedOut { attempt: Attempt },
    /// User-initiated only.
    Retry,
}

/// What the driver has to do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
    None,
    /// Begin loading the embedded viewer and arm the load timeout for `attempt`.
    BeginFallbackLoad { attempt: Attempt },
    /// Cancel the load timeout for `attempt`.
    CancelTimeout { attempt: Attempt },
}

#[derive(Debug, Clone)]
pub struct SurfaceSelector {
    source_url: Url,
    source: MediaSource,
    state: SurfaceState,
    next_attempt: Attempt,
}

impl SurfaceSelector {
    #[must_use]
    pub fn new(source_url: Url) -> Self {
        let source = MediaSource::classify(&source_url);
        Self {
            source_url,
            source,
            state: SurfaceState::Initializing,
            next_attempt: 1,
        }
    }

    #[must_use]
    pub fn state(&self) -> SurfaceState {
        self.state
    }

    #[must_use]
    pub fn source(&self) -> MediaSource {
        self.source
    }

    /// Progress must be estimated when the embedded viewer is in use.
    #[must_use]
    pub fn uses_estimator(&self) -> bool {
        matches!(self.state, SurfaceState::FallbackReady { .. })
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.state, SurfaceState::FallbackError { .. })
    }

    /// "Open externally" escape hatch; available only after the fallback failed.
    #[must_use]
    pub fn external_url(&self) -> Option<&Url> {
        self.is_error().then_some(&self.source_url)
    }

    /// Apply an event. Events that do not fit the current state (including
    /// stale load/timeout signals from an abandoned attempt) are ignored.
    pub fn handle(&mut self, event: SurfaceEvent) -> SurfaceAction {
        use SurfaceState as S;

        match (self.state, event) {
            (S::Initializing, SurfaceEvent::Start) => match self.source {
                MediaSource::Direct => {
                    self.state = S::Direct;
                    SurfaceAction::None
                }
                MediaSource::Embedded => self.begin_fallback(),
            },
            (S::Direct, SurfaceEvent::MediaError) => self.begin_fallback(),
            (S::FallbackLoading { attempt }, SurfaceEvent::FallbackLoaded { attempt: got })
                if attempt == got =>
            {
                self.state = S::FallbackReady { attempt };
                SurfaceAction::CancelTimeout { attempt }
            }
            (S::FallbackLoading { attempt }, SurfaceEvent::LoadTimedOut { attempt: got })
                if attempt == got =>
            {
                self.state = S::FallbackError { attempt };
                SurfaceAction::None
            }
            (S::FallbackError { .. }, SurfaceEvent::Retry) => self.begin_fallback(),
            _ => SurfaceAction::None,
        }
    }

    fn begin_fallback(&mut self) -> SurfaceAction {
        let attempt = self.next_attempt;
        self.next_attempt = self.next_attempt.saturating_add(1);
        self.state = SurfaceState::FallbackLoading { attempt };
        SurfaceAction::BeginFallbackLoad { attempt }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(url: &str) -> SurfaceSelector {
        SurfaceSelector::new(Url::parse(url).unwrap())
    }

    #[test]
    fn direct_source_starts_direct_and_falls_back_on_error() {
        let mut s = selector("https://cdn.example.com/a.mp4");
        assert_eq!(s.handle(SurfaceEvent::Start), SurfaceAction::None);
        assert_eq!(s.state(), SurfaceState::Direct);
        assert_eq!(
            s.handle(SurfaceEvent::MediaError),
            SurfaceAction::BeginFallbackLoad { attempt: 1 }
        );
        assert_eq!(s.state(), SurfaceState::FallbackLoading { attempt: 1 });
    }

    #[test]
    fn embedded_source_skips_direct() {
        let mut s = selector("https://drive.example.com/file/d/x/preview");
        assert_eq!(
            s.handle(SurfaceEvent::Start),
            SurfaceAction::BeginFallbackLoad { attempt: 1 }
        );
    }

    #[test]
    fn timeout_then_retry_clears_error() {
        let mut s = selector("https://drive.example.com/file/d/x/preview");
        s.handle(SurfaceEvent::Start);
        s.handle(SurfaceEvent::LoadTimedOut { attempt: 1 });
        assert_eq!(s.state(), SurfaceState::FallbackError { attempt: 1 });
        assert!(s.external_url().is_some());

        assert_eq!(
            s.handle(SurfaceEvent::Retry),
            SurfaceAction::BeginFallbackLoad { attempt: 2 }
        );
        assert_eq!(s.state(), SurfaceState::FallbackLoading { attempt: 2 });
        assert!(!s.is_error());
        assert!(s.external_url().is_none());
    }

    #[test]
    fn stale_signals_are_ignored() {
        let mut s = selector("https://drive.example.com/file/d/x/preview");
        s.handle(SurfaceEvent::Start);
        s.handle(SurfaceEvent::LoadTimedOut { attempt: 1 });
        s.handle(SurfaceEvent::Retry);

        s.handle(SurfaceEvent::FallbackLoaded { attempt: 1 });
        assert_eq!(s.state(), SurfaceState::FallbackLoading { attempt: 2 });

        assert_eq!(
            s.handle(SurfaceEvent::FallbackLoaded { attempt: 2 }),
            SurfaceAction::CancelTimeout { attempt: 2 }
        );
        assert!(s.uses_estimator());
        s.handle(SurfaceEvent::LoadTimedOut { attempt: 2 });
        assert_eq!(s.state(), SurfaceState::FallbackReady { attempt: 2 });
    }

    #[test]
    fn retry_only_from_error() {
        let mut s = selector("https://cdn.example.com/a.mp4");
        s.handle(SurfaceEvent::Start);
        assert_eq!(s.handle(SurfaceEvent::Retry), SurfaceAction::None);
        assert_eq!(s.state(), SurfaceState::Direct);
    }
}
