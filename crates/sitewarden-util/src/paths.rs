//! Default paths for sitewardend components
//!
//! Provides centralized path defaults that all crates can use.
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/sitewarden/config.toml` or `~/.config/sitewarden/config.toml`
//! - Data: `$XDG_DATA_HOME/sitewarden` or `~/.local/share/sitewarden`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const SITEWARDEN_CONFIG_ENV: &str = "SITEWARDEN_CONFIG";

/// Environment variable for overriding the data directory
pub const SITEWARDEN_DATA_DIR_ENV: &str = "SITEWARDEN_DATA_DIR";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "sitewarden";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$SITEWARDEN_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/sitewarden/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/sitewarden/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    // Check environment override first
    if let Ok(path) = std::env::var(SITEWARDEN_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking SITEWARDEN_CONFIG env var.
/// Used for default values where the env var is checked separately.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory, without checking the
/// SITEWARDEN_DATA_DIR env var. The daemon's argument parser handles
/// that override itself (along with `--data-dir`), so checking it here
/// too would shadow the command line.
///
/// Order of precedence:
/// 1. `$XDG_DATA_HOME/sitewarden` (if XDG_DATA_HOME is set)
/// 2. `~/.local/share/sitewarden` (fallback)
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_sitewarden() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("sitewarden"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn data_dir_contains_sitewarden() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("sitewarden"));
    }
}
