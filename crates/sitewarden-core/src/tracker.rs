//! Tracker state machine types

use chrono::{DateTime, Local};
use sitewarden_api::Domain;
use sitewarden_util::{MonotonicInstant, SessionId, TabId};
use std::time::Duration;

/// The one session currently being tracked.
///
/// Elapsed time is measured on the monotonic clock from the last flush
/// mark, so wall-clock jumps never inflate usage.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session_id: SessionId,
    pub tab_id: TabId,
    pub domain: Domain,
    /// Full URL the session started on, kept for the interstitial redirect
    pub url: String,
    pub started_at: DateTime<Local>,
    flush_mark: MonotonicInstant,
}

impl ActiveSession {
    pub fn new(
        tab_id: TabId,
        domain: Domain,
        url: String,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            tab_id,
            domain,
            url,
            started_at: now,
            flush_mark: now_mono,
        }
    }

    /// Whole seconds since the last flush (floor; the sub-second
    /// remainder stays pending)
    pub fn elapsed_whole_secs(&self, now_mono: MonotonicInstant) -> u64 {
        now_mono.saturating_duration_since(self.flush_mark).as_secs()
    }

    /// Consume `secs` whole seconds of the elapsed interval.
    ///
    /// The mark advances by exactly the flushed amount, never to "now",
    /// so the sub-second remainder carries over into the next
    /// measurement and jittered flushes cannot bleed time away.
    pub fn mark_flushed(&mut self, secs: u64) {
        self.flush_mark = self.flush_mark + Duration::from_secs(secs);
    }
}

/// Tracker state: at most one session at a time
#[derive(Debug, Default)]
pub enum TrackerState {
    #[default]
    Idle,
    Tracking(ActiveSession),
}

impl TrackerState {
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackerState::Tracking(_))
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        match self {
            TrackerState::Tracking(session) => Some(session),
            TrackerState::Idle => None,
        }
    }

    /// Transition to `Idle`, handing back the session if there was one
    pub fn take_session(&mut self) -> Option<ActiveSession> {
        match std::mem::take(self) {
            TrackerState::Tracking(session) => Some(session),
            TrackerState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(now_mono: MonotonicInstant) -> ActiveSession {
        ActiveSession::new(
            TabId::new(1),
            Domain::new("example.com"),
            "https://example.com/".into(),
            Local::now(),
            now_mono,
        )
    }

    #[test]
    fn elapsed_floors_to_whole_seconds() {
        let t0 = MonotonicInstant::now();
        let s = session(t0);

        assert_eq!(s.elapsed_whole_secs(t0), 0);
        assert_eq!(s.elapsed_whole_secs(t0 + Duration::from_millis(2500)), 2);
        assert_eq!(s.elapsed_whole_secs(t0 + Duration::from_secs(3)), 3);
    }

    #[test]
    fn mark_flushed_restarts_measurement() {
        let t0 = MonotonicInstant::now();
        let mut s = session(t0);

        let t3 = t0 + Duration::from_secs(3);
        assert_eq!(s.elapsed_whole_secs(t3), 3);

        s.mark_flushed(3);
        assert_eq!(s.elapsed_whole_secs(t3), 0);
        assert_eq!(s.elapsed_whole_secs(t3 + Duration::from_secs(2)), 2);
    }

    #[test]
    fn mark_flushed_keeps_subsecond_remainder() {
        let t0 = MonotonicInstant::now();
        let mut s = session(t0);

        // 2.5s elapsed, 2 flushed: the remaining 500ms stays pending
        s.mark_flushed(s.elapsed_whole_secs(t0 + Duration::from_millis(2500)));
        assert_eq!(s.elapsed_whole_secs(t0 + Duration::from_millis(2500)), 0);
        assert_eq!(s.elapsed_whole_secs(t0 + Duration::from_millis(3000)), 1);
    }

    #[test]
    fn take_session_transitions_to_idle() {
        let t0 = MonotonicInstant::now();
        let mut state = TrackerState::Tracking(session(t0));

        assert!(state.is_tracking());
        assert!(state.take_session().is_some());
        assert!(!state.is_tracking());
        assert!(state.take_session().is_none());
    }
}
