//! Rule model and service settings for sitewardend
//!
//! This crate holds everything policy-shaped:
//! - The block list and time-limit rules, with first-match lookup
//! - Today's usage counters
//! - Normalization of user-entered site strings
//! - TOML service settings with a versioned schema and validation

mod normalize;
mod rules;
mod schema;
mod settings;
mod validation;

pub use normalize::*;
pub use rules::*;
pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate settings from a TOML file
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Load settings, falling back to defaults when the file does not exist.
///
/// Parse and validation errors in an existing file are still fatal; a
/// missing file is the normal first-run state.
pub fn load_settings_or_default(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        return Ok(Settings::default());
    }
    load_settings(path)
}

/// Parse and validate settings from a TOML string
pub fn parse_settings(content: &str) -> ConfigResult<Settings> {
    let raw: RawSettings = toml::from_str(content)?;

    // Check version
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    // Validate
    let errors = validate_settings(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Settings::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1
        "#;

        let settings = parse_settings(config).unwrap();
        assert_eq!(settings.tick_interval.as_secs(), 1);
        assert_eq!(settings.reset_check_interval.as_secs(), 3600);
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            data_dir = "/tmp/sitewarden-test"
            interstitial_url = "blocked.html"
            tick_seconds = 2
            reset_check_seconds = 600
        "#;

        let settings = parse_settings(config).unwrap();
        assert_eq!(settings.tick_interval.as_secs(), 2);
        assert_eq!(settings.reset_check_interval.as_secs(), 600);
        assert_eq!(settings.interstitial_url, "blocked.html");
    }

    #[test]
    fn reject_wrong_version() {
        let config = "config_version = 99";
        let result = parse_settings(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings_or_default("/nonexistent/sitewarden/config.toml").unwrap();
        assert_eq!(settings.tick_interval.as_secs(), 1);
    }
}
