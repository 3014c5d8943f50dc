//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sitewarden_api::{BlockReason, Domain};
use sitewarden_util::SessionId;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Daily usage reset performed
    DailyReset { date: String },

    /// Tracking started for a domain
    TrackingStarted {
        session_id: SessionId,
        domain: Domain,
    },

    /// Tracking stopped; `seconds` is the final flushed interval
    TrackingStopped {
        session_id: SessionId,
        domain: Domain,
        seconds: u64,
    },

    /// A visit was denied and the tab redirected
    SiteBlocked {
        domain: Domain,
        reason: BlockReason,
    },

    /// A block rule was added
    BlockRuleAdded { domain: Domain },

    /// A block rule was removed
    BlockRuleRemoved { domain: Domain },

    /// A time limit was set or replaced
    TimeLimitSet { domain: Domain, limit_secs: u64 },

    /// A time limit was removed
    TimeLimitRemoved { domain: Domain },

    /// Usage counters cleared by a management command
    UsageReset,
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: Local::now(),
            event,
        }
    }
}
