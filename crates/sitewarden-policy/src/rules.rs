//! Block and time-limit rules, plus today's usage counters

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sitewarden_api::Domain;
use std::collections::BTreeMap;
use std::fmt;

/// The permanent block list.
///
/// Set semantics over normalized domains: no duplicates, order preserved
/// for display. Membership is exact; enforcement goes through
/// [`BlockList::first_match`], which also catches subdomains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockList(Vec<Domain>);

impl BlockList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Exact membership check (used when editing rules)
    pub fn contains(&self, domain: &Domain) -> bool {
        self.0.iter().any(|d| d == domain)
    }

    /// Add a rule. Returns false if it was already present.
    pub fn insert(&mut self, domain: Domain) -> bool {
        if self.contains(&domain) {
            return false;
        }
        self.0.push(domain);
        true
    }

    /// Remove a rule. Returns false if it was not present.
    pub fn remove(&mut self, domain: &Domain) -> bool {
        let before = self.0.len();
        self.0.retain(|d| d != domain);
        self.0.len() != before
    }

    /// First rule the visited domain matches (exact or subdomain).
    /// Any match means the visit is blocked.
    pub fn first_match(&self, visited: &Domain) -> Option<&Domain> {
        self.0.iter().find(|rule| visited.matches(rule))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One time-limit rule: domain plus daily allowance in whole seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimitRule {
    pub domain: Domain,
    pub limit_secs: u64,
}

/// Daily time limits, one per domain, in insertion order.
///
/// Lookup is first-match-wins in insertion order, which decides which rule
/// governs a visit when both a parent domain and one of its subdomains carry
/// limits. Persisted as a JSON object so the stored shape stays a plain
/// domain-to-seconds map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeLimits(Vec<TimeLimitRule>);

impl TimeLimits {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a limit. Replaces the value in place if the domain already has
    /// one (keeping its position), otherwise appends.
    pub fn set(&mut self, domain: Domain, limit_secs: u64) {
        if let Some(rule) = self.0.iter_mut().find(|r| r.domain == domain) {
            rule.limit_secs = limit_secs;
        } else {
            self.0.push(TimeLimitRule { domain, limit_secs });
        }
    }

    /// Remove a rule. Returns false if it was not present.
    pub fn remove(&mut self, domain: &Domain) -> bool {
        let before = self.0.len();
        self.0.retain(|r| &r.domain != domain);
        self.0.len() != before
    }

    /// Exact lookup (used when editing rules)
    pub fn get(&self, domain: &Domain) -> Option<u64> {
        self.0
            .iter()
            .find(|r| &r.domain == domain)
            .map(|r| r.limit_secs)
    }

    /// First rule the visited domain matches, in insertion order.
    /// The returned domain is the usage bucket the visit accrues to.
    pub fn first_match(&self, visited: &Domain) -> Option<(&Domain, u64)> {
        self.0
            .iter()
            .find(|rule| visited.matches(&rule.domain))
            .map(|rule| (&rule.domain, rule.limit_secs))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeLimitRule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TimeLimits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for rule in &self.0 {
            map.serialize_entry(&rule.domain, &rule.limit_secs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TimeLimits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimeLimitsVisitor;

        impl<'de> Visitor<'de> for TimeLimitsVisitor {
            type Value = TimeLimits;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of domain to limit seconds")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut limits = TimeLimits::new();
                while let Some((domain, secs)) = access.next_entry::<Domain, u64>()? {
                    limits.set(domain, secs);
                }
                Ok(limits)
            }
        }

        deserializer.deserialize_map(TimeLimitsVisitor)
    }
}

/// Seconds accumulated today, keyed by tracked domain.
///
/// When a time-limit rule matched the visit, the bucket is the rule's
/// domain (so subdomain usage rolls up); otherwise it is the visited
/// domain itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageMap(BTreeMap<Domain, u64>);

impl UsageMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Seconds accrued for a bucket; zero when absent
    pub fn get(&self, domain: &Domain) -> u64 {
        self.0.get(domain).copied().unwrap_or(0)
    }

    /// Accrue seconds to a bucket
    pub fn add(&mut self, domain: Domain, secs: u64) {
        *self.0.entry(domain).or_insert(0) += secs;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Domain, u64)> {
        self.0.iter().map(|(d, s)| (d, *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
