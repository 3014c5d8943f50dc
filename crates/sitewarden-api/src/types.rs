//! Core vocabulary types for the sitewardend protocol

use serde::{Deserialize, Serialize};
use sitewarden_util::{SessionId, TabId, WindowId};
use std::fmt;

/// URL schemes that never map to a trackable site.
///
/// Navigation inside the browser's own pages (settings, extension pages,
/// devtools) must not be tracked or blocked.
const INTERNAL_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "about",
    "edge",
    "moz-extension",
    "devtools",
    "view-source",
    "file",
];

/// A normalized web domain: lowercase, no scheme, no leading `www.`, no path.
///
/// Both rules and visited sites are represented as `Domain`s, so rule
/// matching is a comparison between two already-normalized values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    /// Wrap an already-normalized domain string.
    ///
    /// Lowercases defensively but performs no other cleanup; user input
    /// goes through the policy normalizer instead.
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into().to_lowercase())
    }

    /// Extract the domain from a full URL.
    ///
    /// Returns `None` for URLs with internal browser schemes, no host,
    /// or that fail to parse at all. A leading `www.` is stripped so that
    /// `www.example.com` and `example.com` compare equal.
    pub fn from_url(raw: &str) -> Option<Self> {
        let parsed = url::Url::parse(raw).ok()?;

        if INTERNAL_SCHEMES.contains(&parsed.scheme()) {
            return None;
        }

        let host = parsed.host_str()?;
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

        if host.is_empty() {
            return None;
        }

        Some(Self(host))
    }

    /// Whether this (visited) domain is governed by `rule`.
    ///
    /// True for an exact match or a strict subdomain of the rule:
    /// `mail.example.com` matches the rule `example.com`, but
    /// `notexample.com` does not.
    pub fn matches(&self, rule: &Domain) -> bool {
        if self.0 == rule.0 {
            return true;
        }

        self.0.len() > rule.0.len()
            && self.0.ends_with(&rule.0)
            && self.0.as_bytes()[self.0.len() - rule.0.len() - 1] == b'.'
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Snapshot of a browser tab as reported over the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: Option<WindowId>,
    /// Absent while the tab is still loading or for special tabs
    pub url: Option<String>,
    pub active: bool,
}

/// Why a navigation was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    /// The domain is on the permanent block list
    Blocked,
    /// The domain's daily time limit is exhausted
    TimeLimit,
}

impl BlockReason {
    /// Value used in the interstitial page's `reason` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Blocked => "blocked",
            BlockReason::TimeLimit => "time-limit",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-limit rule together with today's usage, for management UIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitView {
    pub domain: Domain,
    pub limit_secs: u64,
    pub used_secs: u64,
}

/// One row of the usage report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsEntry {
    pub domain: Domain,
    pub used_secs: u64,
    /// Present when a time-limit rule governs this domain
    pub limit_secs: Option<u64>,
}

/// Description of the currently tracked session, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub tab_id: TabId,
    pub domain: Domain,
    pub started_at: chrono::DateTime<chrono::Local>,
}

/// Snapshot of the tracker for `GetState`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub api_version: u32,
    /// `None` while idle
    pub tracking: Option<SessionInfo>,
    pub blocked_count: usize,
    pub limit_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let visited = Domain::new("example.com");
        let rule = Domain::new("example.com");
        assert!(visited.matches(&rule));
    }

    #[test]
    fn subdomain_match() {
        let visited = Domain::new("mail.example.com");
        let rule = Domain::new("example.com");
        assert!(visited.matches(&rule));

        let deep = Domain::new("a.b.example.com");
        assert!(deep.matches(&rule));
    }

    #[test]
    fn suffix_without_dot_is_not_a_match() {
        let visited = Domain::new("notexample.com");
        let rule = Domain::new("example.com");
        assert!(!visited.matches(&rule));
    }

    #[test]
    fn parent_does_not_match_child_rule() {
        let visited = Domain::new("example.com");
        let rule = Domain::new("mail.example.com");
        assert!(!visited.matches(&rule));
    }

    #[test]
    fn from_url_strips_www_and_lowercases() {
        let d = Domain::from_url("https://WWW.Example.COM/path?q=1").unwrap();
        assert_eq!(d.as_str(), "example.com");
    }

    #[test]
    fn from_url_keeps_other_subdomains() {
        let d = Domain::from_url("https://mail.example.com/inbox").unwrap();
        assert_eq!(d.as_str(), "mail.example.com");
    }

    #[test]
    fn from_url_rejects_internal_schemes() {
        assert!(Domain::from_url("chrome://settings").is_none());
        assert!(Domain::from_url("about:blank").is_none());
        assert!(Domain::from_url("chrome-extension://abcdef/popup.html").is_none());
        assert!(Domain::from_url("file:///home/user/doc.html").is_none());
    }

    #[test]
    fn from_url_rejects_garbage() {
        assert!(Domain::from_url("").is_none());
        assert!(Domain::from_url("not a url").is_none());
    }

    #[test]
    fn block_reason_strings() {
        assert_eq!(BlockReason::Blocked.as_str(), "blocked");
        assert_eq!(BlockReason::TimeLimit.as_str(), "time-limit");
    }

    #[test]
    fn domain_serializes_as_plain_string() {
        let d = Domain::new("example.com");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "\"example.com\"");
    }
}
