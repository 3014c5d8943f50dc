//! Store trait definitions

use sitewarden_policy::{BlockList, TimeLimits, UsageMap};

use crate::{AuditEvent, StoreResult};

/// Main store trait.
///
/// Rule state lives under four top-level keys, each read and written as a
/// whole. Callers that need to modify one perform read-modify-write; there
/// is deliberately no atomic increment. Handlers only interleave at await
/// points, so the window for a lost update is a single flush interval.
pub trait Store: Send + Sync {
    // Rule state

    /// The permanent block list
    fn block_list(&self) -> StoreResult<BlockList>;

    /// Replace the permanent block list
    fn set_block_list(&self, list: &BlockList) -> StoreResult<()>;

    /// The daily time limits
    fn time_limits(&self) -> StoreResult<TimeLimits>;

    /// Replace the daily time limits
    fn set_time_limits(&self, limits: &TimeLimits) -> StoreResult<()>;

    /// Today's usage counters
    fn usage(&self) -> StoreResult<UsageMap>;

    /// Replace today's usage counters
    fn set_usage(&self, usage: &UsageMap) -> StoreResult<()>;

    /// Date stamp of the last daily reset, if one was ever recorded.
    /// Compared for equality only.
    fn last_reset(&self) -> StoreResult<Option<String>>;

    /// Record the daily reset date stamp
    fn set_last_reset(&self, stamp: &str) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
