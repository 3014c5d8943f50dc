//! Tracker engine: ties the gate, the state machine, and the store together

use chrono::{DateTime, Local};
use sitewarden_api::{
    BlockReason, Domain, LimitView, SessionInfo, StatsEntry, TabInfo, TrackerSnapshot, API_VERSION,
};
use sitewarden_policy::{normalize_site, validate_limit_minutes, InputError};
use sitewarden_store::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};
use sitewarden_util::{date_stamp, MonotonicInstant, TabId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{evaluate, maybe_reset, ActiveSession, CoreEvent, Decision, TrackerState};

/// Errors from management commands
#[derive(Debug, Error)]
pub enum ManagementError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The tracker engine.
///
/// Owns the tracker state machine; all transitions go through its handler
/// methods. Rule state is re-read from the store on every decision, so
/// management edits take effect on the very next event. No handler is
/// fatal: store and browser trouble degrades to `Idle` and is retried on
/// the next event.
pub struct TrackerEngine {
    store: Arc<dyn Store>,
    state: TrackerState,
}

impl TrackerEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        info!("Tracker engine initialized");

        Self {
            store,
            state: TrackerState::Idle,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking()
    }

    pub fn current_session(&self) -> Option<&ActiveSession> {
        self.state.session()
    }

    /// Startup housekeeping: catch up on a missed daily reset
    pub fn startup(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.run_daily_reset(&date_stamp(&now), &mut events);
        events
    }

    /// Periodic daily-reset check (the daemon calls this hourly; tab
    /// focus changes also run it, so this is a backstop for idle periods)
    pub fn check_daily_reset(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.run_daily_reset(&date_stamp(&now), &mut events);
        events
    }

    fn run_daily_reset(&self, today: &str, events: &mut Vec<CoreEvent>) {
        match maybe_reset(self.store.as_ref(), today) {
            Ok(true) => events.push(CoreEvent::DailyReset {
                date: today.to_string(),
            }),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Daily reset check failed"),
        }
    }

    /// A tab gained focus (activated, finished loading while active, or
    /// its window took focus).
    ///
    /// Any previous session is stopped first, before the new tab is even
    /// inspected; re-entrant focus events can therefore never double-track.
    pub fn handle_tab_focused(
        &mut self,
        tab: &TabInfo,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.stop_tracking(now_mono, &mut events);
        self.run_daily_reset(&date_stamp(&now), &mut events);

        let Some(url) = tab.url.as_deref() else {
            return events;
        };
        let Some(domain) = Domain::from_url(url) else {
            debug!(tab_id = %tab.id, "Ignoring untrackable URL");
            return events;
        };

        let decision = match self.evaluate_domain(&domain) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, domain = %domain, "Gate evaluation failed, staying idle");
                return events;
            }
        };

        match decision {
            Decision::Allow => {
                let session =
                    ActiveSession::new(tab.id, domain.clone(), url.to_string(), now, now_mono);

                info!(
                    session_id = %session.session_id,
                    domain = %domain,
                    tab_id = %tab.id,
                    "Tracking started"
                );
                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::TrackingStarted {
                        session_id: session.session_id.clone(),
                        domain: domain.clone(),
                    },
                ));

                events.push(CoreEvent::TrackingStarted {
                    session_id: session.session_id.clone(),
                    tab_id: tab.id,
                    domain,
                });
                self.state = TrackerState::Tracking(session);
            }
            Decision::BlockPermanent { .. } => {
                // The interstitial names the site the user tried to visit
                events.push(self.deny(tab.id, url, BlockReason::Blocked, domain));
            }
            Decision::BlockTimeLimit { rule } => {
                events.push(self.deny(tab.id, url, BlockReason::TimeLimit, rule));
            }
        }

        events
    }

    /// The browser lost focus, or no tab is active anymore
    pub fn handle_focus_lost(&mut self, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.stop_tracking(now_mono, &mut events);
        events
    }

    /// A tab was closed. Only ends tracking if it was the tracked tab.
    pub fn handle_tab_closed(&mut self, tab_id: TabId, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        if self.state.session().map(|s| s.tab_id) == Some(tab_id) {
            self.stop_tracking(now_mono, &mut events);
        }
        events
    }

    /// Pre-emptive check before a navigation commits (main frame only).
    /// Does not touch tracking state; the focus/update events that follow
    /// an allowed navigation handle that.
    pub fn handle_before_navigate(&self, tab_id: TabId, frame_id: i64, url: &str) -> Vec<CoreEvent> {
        if frame_id != 0 {
            return Vec::new();
        }
        let Some(domain) = Domain::from_url(url) else {
            return Vec::new();
        };

        match self.evaluate_domain(&domain) {
            Ok(Decision::Allow) => Vec::new(),
            Ok(Decision::BlockPermanent { .. }) => {
                vec![self.deny(tab_id, url, BlockReason::Blocked, domain)]
            }
            Ok(Decision::BlockTimeLimit { rule }) => {
                vec![self.deny(tab_id, url, BlockReason::TimeLimit, rule)]
            }
            Err(e) => {
                warn!(error = %e, domain = %domain, "Gate evaluation failed, allowing navigation");
                Vec::new()
            }
        }
    }

    /// Periodic flush while tracking.
    ///
    /// Flushes the elapsed whole seconds into the usage map, then enforces
    /// the time limit against cumulative usage. When the limit is reached
    /// the session ends and a redirect is requested for its tab.
    pub fn tick(&mut self, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        let Some(mut session) = self.state.take_session() else {
            return events;
        };

        let flushed = self.flush(&mut session, now_mono);
        if flushed == 0 {
            self.state = TrackerState::Tracking(session);
            return events;
        }

        match self.limit_exceeded(&session.domain) {
            Ok(Some(rule)) => {
                info!(
                    session_id = %session.session_id,
                    domain = %session.domain,
                    rule = %rule,
                    "Time limit reached"
                );
                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::TrackingStopped {
                        session_id: session.session_id.clone(),
                        domain: session.domain.clone(),
                        seconds: flushed,
                    },
                ));

                events.push(CoreEvent::TrackingStopped {
                    session_id: session.session_id.clone(),
                    domain: session.domain.clone(),
                    flushed_secs: flushed,
                });
                events.push(self.deny(
                    session.tab_id,
                    &session.url,
                    BlockReason::TimeLimit,
                    rule,
                ));
                // Stay idle; the tab is being redirected
            }
            Ok(None) => {
                self.state = TrackerState::Tracking(session);
            }
            Err(e) => {
                warn!(error = %e, "Limit check failed, tracking continues");
                self.state = TrackerState::Tracking(session);
            }
        }

        events
    }

    // Management commands

    /// Add a permanent block rule.
    ///
    /// If the blocked domain is being tracked right now, the session ends
    /// immediately and the tab is sent to the interstitial; a block rule
    /// never coexists with an active session on its domain.
    pub fn add_blocked_site(
        &mut self,
        input: &str,
        now_mono: MonotonicInstant,
    ) -> Result<Vec<CoreEvent>, ManagementError> {
        let domain = normalize_site(input)?;

        let mut list = self.store.block_list()?;
        if list.insert(domain.clone()) {
            self.store.set_block_list(&list)?;
            let _ = self.store.append_audit(AuditEvent::new(
                AuditEventType::BlockRuleAdded {
                    domain: domain.clone(),
                },
            ));
            info!(domain = %domain, "Block rule added");
        }

        let mut events = Vec::new();
        let tracked = self.state.session().and_then(|s| {
            s.domain
                .matches(&domain)
                .then(|| (s.tab_id, s.url.clone(), s.domain.clone()))
        });
        if let Some((tab_id, url, visited)) = tracked {
            self.stop_tracking(now_mono, &mut events);
            events.push(self.deny(tab_id, &url, BlockReason::Blocked, visited));
        }

        Ok(events)
    }

    /// Remove a block rule. Returns whether it existed.
    pub fn remove_blocked_site(&mut self, input: &str) -> Result<bool, ManagementError> {
        let domain = normalize_site(input)?;

        let mut list = self.store.block_list()?;
        if !list.remove(&domain) {
            return Ok(false);
        }
        self.store.set_block_list(&list)?;

        let _ = self.store.append_audit(AuditEvent::new(
            AuditEventType::BlockRuleRemoved {
                domain: domain.clone(),
            },
        ));
        info!(domain = %domain, "Block rule removed");
        Ok(true)
    }

    /// Set a daily time limit (minutes), replacing any existing one
    pub fn set_time_limit(&mut self, input: &str, minutes: u32) -> Result<(), ManagementError> {
        let domain = normalize_site(input)?;
        let limit_secs = validate_limit_minutes(minutes)?;

        let mut limits = self.store.time_limits()?;
        limits.set(domain.clone(), limit_secs);
        self.store.set_time_limits(&limits)?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::TimeLimitSet {
            domain: domain.clone(),
            limit_secs,
        }));
        info!(domain = %domain, limit_secs, "Time limit set");
        Ok(())
    }

    /// Remove a time limit. Returns whether it existed.
    pub fn remove_time_limit(&mut self, input: &str) -> Result<bool, ManagementError> {
        let domain = normalize_site(input)?;

        let mut limits = self.store.time_limits()?;
        if !limits.remove(&domain) {
            return Ok(false);
        }
        self.store.set_time_limits(&limits)?;

        let _ = self.store.append_audit(AuditEvent::new(
            AuditEventType::TimeLimitRemoved {
                domain: domain.clone(),
            },
        ));
        info!(domain = %domain, "Time limit removed");
        Ok(true)
    }

    /// Current rules, with today's usage joined onto the limits
    pub fn rules(&self) -> StoreResult<(Vec<Domain>, Vec<LimitView>)> {
        let blocked: Vec<Domain> = self.store.block_list()?.iter().cloned().collect();
        let limits = self.store.time_limits()?;
        let usage = self.store.usage()?;

        let limit_views = limits
            .iter()
            .map(|rule| LimitView {
                domain: rule.domain.clone(),
                limit_secs: rule.limit_secs,
                used_secs: usage.get(&rule.domain),
            })
            .collect();

        Ok((blocked, limit_views))
    }

    /// Today's usage report, heaviest first
    pub fn stats(&self) -> StoreResult<Vec<StatsEntry>> {
        let limits = self.store.time_limits()?;
        let usage = self.store.usage()?;

        let mut entries: Vec<StatsEntry> = usage
            .iter()
            .map(|(domain, used_secs)| StatsEntry {
                domain: domain.clone(),
                used_secs,
                limit_secs: limits.get(domain),
            })
            .collect();
        entries.sort_by(|a, b| b.used_secs.cmp(&a.used_secs));

        Ok(entries)
    }

    /// Clear today's counters and restamp (management action, not the
    /// daily reset)
    pub fn reset_usage(&mut self, now: DateTime<Local>) -> StoreResult<()> {
        self.store.set_usage(&Default::default())?;
        self.store.set_last_reset(&date_stamp(&now))?;

        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::UsageReset));
        info!("Usage counters cleared");
        Ok(())
    }

    pub fn snapshot(&self) -> StoreResult<TrackerSnapshot> {
        let tracking = self.state.session().map(|s| SessionInfo {
            session_id: s.session_id.clone(),
            tab_id: s.tab_id,
            domain: s.domain.clone(),
            started_at: s.started_at,
        });

        Ok(TrackerSnapshot {
            api_version: API_VERSION,
            tracking,
            blocked_count: self.store.block_list()?.len(),
            limit_count: self.store.time_limits()?.len(),
        })
    }

    // Internals

    fn evaluate_domain(&self, domain: &Domain) -> StoreResult<Decision> {
        let blocked = self.store.block_list()?;
        let limits = self.store.time_limits()?;
        let usage = self.store.usage()?;
        Ok(evaluate(domain, &blocked, &limits, &usage))
    }

    fn deny(
        &self,
        tab_id: TabId,
        original_url: &str,
        reason: BlockReason,
        domain: Domain,
    ) -> CoreEvent {
        info!(domain = %domain, reason = %reason, tab_id = %tab_id, "Visit denied");
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::SiteBlocked {
            domain: domain.clone(),
            reason,
        }));

        CoreEvent::RedirectRequested {
            tab_id,
            original_url: original_url.to_string(),
            reason,
            domain,
        }
    }

    fn stop_tracking(&mut self, now_mono: MonotonicInstant, events: &mut Vec<CoreEvent>) {
        let Some(mut session) = self.state.take_session() else {
            return;
        };

        let flushed = self.flush(&mut session, now_mono);
        info!(
            session_id = %session.session_id,
            domain = %session.domain,
            flushed_secs = flushed,
            "Tracking stopped"
        );
        let _ = self.store.append_audit(AuditEvent::new(
            AuditEventType::TrackingStopped {
                session_id: session.session_id.clone(),
                domain: session.domain.clone(),
                seconds: flushed,
            },
        ));

        events.push(CoreEvent::TrackingStopped {
            session_id: session.session_id,
            domain: session.domain,
            flushed_secs: flushed,
        });
    }

    /// Flush whole elapsed seconds into the tracked bucket.
    ///
    /// A flush that floors to 0 seconds is a pure no-op: the mark stays
    /// put, so the sub-second remainder keeps accumulating for the next
    /// flush. Once an interval is consumed the mark advances even when
    /// the write fails: the interval is dropped rather than retried, so
    /// a flaky store can only lose time, never inflate it. Returns the
    /// seconds actually written.
    fn flush(&self, session: &mut ActiveSession, now_mono: MonotonicInstant) -> u64 {
        let elapsed = session.elapsed_whole_secs(now_mono);
        if elapsed == 0 {
            return 0;
        }
        session.mark_flushed(elapsed);

        let bucket = match self.tracked_bucket(&session.domain) {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!(error = %e, "Flush skipped, interval dropped");
                return 0;
            }
        };

        let written = self.store.usage().and_then(|mut usage| {
            usage.add(bucket.clone(), elapsed);
            self.store.set_usage(&usage)
        });
        if let Err(e) = written {
            warn!(error = %e, domain = %bucket, "Usage flush failed, interval dropped");
            return 0;
        }

        debug!(domain = %bucket, secs = elapsed, "Usage flushed");
        elapsed
    }

    /// Usage bucket for a visited domain: the matching time-limit rule's
    /// domain when one exists, else the domain itself
    fn tracked_bucket(&self, domain: &Domain) -> StoreResult<Domain> {
        let limits = self.store.time_limits()?;
        Ok(limits
            .first_match(domain)
            .map(|(rule, _)| rule.clone())
            .unwrap_or_else(|| domain.clone()))
    }

    fn limit_exceeded(&self, domain: &Domain) -> StoreResult<Option<Domain>> {
        let limits = self.store.time_limits()?;
        let Some((rule, limit_secs)) = limits.first_match(domain) else {
            return Ok(None);
        };

        let usage = self.store.usage()?;
        if usage.get(rule) >= limit_secs {
            Ok(Some(rule.clone()))
        } else {
            Ok(None)
        }
    }
}
