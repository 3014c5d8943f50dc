//! Raw settings schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw settings as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSettings {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceSettings {
    /// Data directory for the store (default: XDG data dir)
    pub data_dir: Option<PathBuf>,

    /// Base URL of the interstitial page the extension serves.
    /// A relative value is resolved by the extension against its own origin.
    pub interstitial_url: Option<String>,

    /// Tracking flush period in seconds (default: 1)
    pub tick_seconds: Option<u64>,

    /// Period of the belt-and-braces daily reset check in seconds
    /// (default: 3600)
    pub reset_check_seconds: Option<u64>,
}
