//! Normalization and validation of user-entered rule input

use sitewarden_api::Domain;
use thiserror::Error;

/// Largest accepted time limit: one full day, in minutes
pub const MAX_LIMIT_MINUTES: u32 = 1440;

/// Errors for user-entered sites and limits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Site cannot be empty")]
    EmptySite,

    #[error("Not a usable site: '{0}'")]
    InvalidSite(String),

    #[error("Time limit must be 1-{MAX_LIMIT_MINUTES} minutes, got {0}")]
    InvalidLimit(u32),
}

/// Normalize a user-entered site string into a rule domain.
///
/// Cleanup steps, in order: trim and lowercase, strip an `http://` or
/// `https://` scheme, strip a leading `www.`, cut at the first `/`.
/// Whatever remains is taken as the domain; an empty or whitespace-bearing
/// remainder is rejected.
pub fn normalize_site(input: &str) -> Result<Domain, InputError> {
    let cleaned = input.trim().to_lowercase();
    if cleaned.is_empty() {
        return Err(InputError::EmptySite);
    }

    let cleaned = cleaned
        .strip_prefix("https://")
        .or_else(|| cleaned.strip_prefix("http://"))
        .unwrap_or(&cleaned);
    let cleaned = cleaned.strip_prefix("www.").unwrap_or(cleaned);
    let cleaned = cleaned.split('/').next().unwrap_or("");

    if cleaned.is_empty() || cleaned.chars().any(char::is_whitespace) {
        return Err(InputError::InvalidSite(input.trim().to_string()));
    }

    Ok(Domain::new(cleaned))
}

/// Validate a limit in minutes and convert it to stored seconds
pub fn validate_limit_minutes(minutes: u32) -> Result<u64, InputError> {
    if minutes < 1 || minutes > MAX_LIMIT_MINUTES {
        return Err(InputError::InvalidLimit(minutes));
    }
    Ok(u64::from(minutes) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_www_and_path() {
        let d = normalize_site("https://www.YouTube.com/watch?v=abc").unwrap();
        assert_eq!(d.as_str(), "youtube.com");

        let d = normalize_site("http://example.com/some/path").unwrap();
        assert_eq!(d.as_str(), "example.com");
    }

    #[test]
    fn keeps_non_www_subdomains() {
        let d = normalize_site("mail.example.com").unwrap();
        assert_eq!(d.as_str(), "mail.example.com");
    }

    #[test]
    fn trims_and_lowercases() {
        let d = normalize_site("  Reddit.COM  ").unwrap();
        assert_eq!(d.as_str(), "reddit.com");
    }

    #[test]
    fn bare_domain_passes_through() {
        let d = normalize_site("news.ycombinator.com").unwrap();
        assert_eq!(d.as_str(), "news.ycombinator.com");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(normalize_site(""), Err(InputError::EmptySite));
        assert_eq!(normalize_site("   "), Err(InputError::EmptySite));
    }

    #[test]
    fn rejects_scheme_only() {
        assert!(matches!(
            normalize_site("https://"),
            Err(InputError::InvalidSite(_))
        ));
    }

    #[test]
    fn limit_bounds() {
        assert_eq!(validate_limit_minutes(1), Ok(60));
        assert_eq!(validate_limit_minutes(30), Ok(1800));
        assert_eq!(validate_limit_minutes(1440), Ok(86400));

        assert_eq!(validate_limit_minutes(0), Err(InputError::InvalidLimit(0)));
        assert_eq!(
            validate_limit_minutes(1441),
            Err(InputError::InvalidLimit(1441))
        );
    }
}
