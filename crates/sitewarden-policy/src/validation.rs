//! Settings validation

use crate::schema::RawSettings;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Service setting '{setting}': {message}")]
    ServiceError { setting: String, message: String },
}

/// Validate raw settings
pub fn validate_settings(settings: &RawSettings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(tick) = settings.service.tick_seconds {
        if tick == 0 {
            errors.push(ValidationError::ServiceError {
                setting: "tick_seconds".into(),
                message: "must be at least 1".into(),
            });
        }
    }

    if let Some(reset) = settings.service.reset_check_seconds {
        if reset == 0 {
            errors.push(ValidationError::ServiceError {
                setting: "reset_check_seconds".into(),
                message: "must be at least 1".into(),
            });
        }
    }

    if let Some(url) = &settings.service.interstitial_url {
        if url.trim().is_empty() {
            errors.push(ValidationError::ServiceError {
                setting: "interstitial_url".into(),
                message: "cannot be empty".into(),
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawServiceSettings;

    #[test]
    fn zero_tick_rejected() {
        let raw = RawSettings {
            config_version: 1,
            service: RawServiceSettings {
                tick_seconds: Some(0),
                ..Default::default()
            },
        };

        let errors = validate_settings(&raw);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn empty_interstitial_rejected() {
        let raw = RawSettings {
            config_version: 1,
            service: RawServiceSettings {
                interstitial_url: Some("  ".into()),
                ..Default::default()
            },
        };

        let errors = validate_settings(&raw);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn defaults_validate_clean() {
        let raw = RawSettings {
            config_version: 1,
            service: Default::default(),
        };

        assert!(validate_settings(&raw).is_empty());
    }
}
