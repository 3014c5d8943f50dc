//! Interstitial redirect URL construction

use sitewarden_api::{BlockReason, Domain};

/// Build the interstitial page URL for a denied visit.
///
/// Query parameters, in order: `url` (the visit that was denied),
/// `reason` (`blocked` or `time-limit`), `domain`. For permanent blocks
/// the domain parameter carries the visited domain; for time limits it
/// carries the matched rule's domain, so the page can say which limit ran
/// out.
pub fn interstitial_url(
    base: &str,
    original_url: &str,
    reason: BlockReason,
    domain: &Domain,
) -> String {
    format!(
        "{}?url={}&reason={}&domain={}",
        base,
        urlencoding::encode(original_url),
        reason.as_str(),
        urlencoding::encode(domain.as_str())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_original_url() {
        let url = interstitial_url(
            "blocked.html",
            "https://example.com/page?a=1&b=2",
            BlockReason::Blocked,
            &Domain::new("example.com"),
        );

        assert_eq!(
            url,
            "blocked.html?url=https%3A%2F%2Fexample.com%2Fpage%3Fa%3D1%26b%3D2&reason=blocked&domain=example.com"
        );
    }

    #[test]
    fn time_limit_reason() {
        let url = interstitial_url(
            "blocked.html",
            "https://youtube.com/",
            BlockReason::TimeLimit,
            &Domain::new("youtube.com"),
        );

        assert!(url.contains("&reason=time-limit&"));
        assert!(url.ends_with("&domain=youtube.com"));
    }
}
