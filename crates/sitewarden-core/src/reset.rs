//! Daily usage reset

use sitewarden_policy::UsageMap;
use sitewarden_store::{AuditEvent, AuditEventType, Store, StoreResult};
use tracing::info;

/// Reset usage if the stored date stamp is not `today`.
///
/// Idempotent: once the stamp matches today's date every further call is
/// a no-op. An absent stamp (fresh store) counts as a different day, so
/// the first run stamps it. Returns whether a reset was performed.
pub fn maybe_reset(store: &dyn Store, today: &str) -> StoreResult<bool> {
    match store.last_reset()? {
        Some(stamp) if stamp == today => Ok(false),
        previous => {
            store.set_usage(&UsageMap::new())?;
            store.set_last_reset(today)?;

            let _ = store.append_audit(AuditEvent::new(AuditEventType::DailyReset {
                date: today.to_string(),
            }));
            info!(today, previous = ?previous, "Daily usage reset");

            Ok(true)
        }
    }
}
