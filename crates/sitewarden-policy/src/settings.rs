//! Validated service settings

use crate::schema::RawSettings;
use sitewarden_util::data_dir_without_env;
use std::path::PathBuf;
use std::time::Duration;

/// Default interstitial page, resolved by the extension against its origin
pub const DEFAULT_INTERSTITIAL_URL: &str = "blocked.html";

const DEFAULT_TICK_SECONDS: u64 = 1;
const DEFAULT_RESET_CHECK_SECONDS: u64 = 3600;

/// Validated settings the daemon runs with
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub interstitial_url: String,
    pub tick_interval: Duration,
    pub reset_check_interval: Duration,
}

impl Settings {
    /// Convert validated raw settings, applying defaults
    pub fn from_raw(raw: RawSettings) -> Self {
        Self {
            data_dir: raw.service.data_dir.unwrap_or_else(data_dir_without_env),
            interstitial_url: raw
                .service
                .interstitial_url
                .unwrap_or_else(|| DEFAULT_INTERSTITIAL_URL.to_string()),
            tick_interval: Duration::from_secs(
                raw.service.tick_seconds.unwrap_or(DEFAULT_TICK_SECONDS),
            ),
            reset_check_interval: Duration::from_secs(
                raw.service
                    .reset_check_seconds
                    .unwrap_or(DEFAULT_RESET_CHECK_SECONDS),
            ),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_raw(RawSettings {
            config_version: crate::CURRENT_CONFIG_VERSION,
            service: Default::default(),
        })
    }
}
