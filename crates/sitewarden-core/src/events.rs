//! Core events emitted by the engine

use sitewarden_api::{BlockReason, Domain};
use sitewarden_util::{SessionId, TabId};

/// Events emitted by the tracker engine.
///
/// The daemon reacts to these: it schedules the flush tick on
/// `TrackingStarted`, cancels it on `TrackingStopped`, and performs the
/// browser redirect on `RedirectRequested`.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A session started tracking a domain
    TrackingStarted {
        session_id: SessionId,
        tab_id: TabId,
        domain: Domain,
    },

    /// The session ended; `flushed_secs` is the final flushed interval
    TrackingStopped {
        session_id: SessionId,
        domain: Domain,
        flushed_secs: u64,
    },

    /// A visit was denied; the daemon should redirect the tab
    RedirectRequested {
        tab_id: TabId,
        original_url: String,
        reason: BlockReason,
        /// Domain for the interstitial's `domain` parameter
        domain: Domain,
    },

    /// Usage counters were cleared for a new day
    DailyReset { date: String },
}
