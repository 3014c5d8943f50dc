//! Enforcement gate: may this domain be visited right now?

use sitewarden_api::Domain;
use sitewarden_policy::{BlockList, TimeLimits, UsageMap};

/// Gate decision for a visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Visit may proceed (and be tracked)
    Allow,

    /// The domain matches a permanent block rule
    BlockPermanent { rule: Domain },

    /// The domain matches a time-limit rule whose allowance is used up
    BlockTimeLimit { rule: Domain },
}

/// Evaluate a visit against the current rules.
///
/// The block list is checked first: a permanent block always wins over a
/// time limit on the same domain. Time-limit usage is read from the
/// matched rule's bucket, so subdomain visits count against their parent
/// rule.
pub fn evaluate(
    visited: &Domain,
    blocked: &BlockList,
    limits: &TimeLimits,
    usage: &UsageMap,
) -> Decision {
    if let Some(rule) = blocked.first_match(visited) {
        return Decision::BlockPermanent { rule: rule.clone() };
    }

    if let Some((rule, limit_secs)) = limits.first_match(visited) {
        if usage.get(rule) >= limit_secs {
            return Decision::BlockTimeLimit { rule: rule.clone() };
        }
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BlockList, TimeLimits, UsageMap) {
        (BlockList::new(), TimeLimits::new(), UsageMap::new())
    }

    #[test]
    fn no_rules_allows() {
        let (blocked, limits, usage) = setup();
        let decision = evaluate(&Domain::new("example.com"), &blocked, &limits, &usage);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn blocked_domain_denied() {
        let (mut blocked, limits, usage) = setup();
        blocked.insert(Domain::new("reddit.com"));

        let decision = evaluate(&Domain::new("reddit.com"), &blocked, &limits, &usage);
        assert_eq!(
            decision,
            Decision::BlockPermanent {
                rule: Domain::new("reddit.com")
            }
        );
    }

    #[test]
    fn subdomain_of_blocked_denied() {
        let (mut blocked, limits, usage) = setup();
        blocked.insert(Domain::new("reddit.com"));

        let decision = evaluate(&Domain::new("old.reddit.com"), &blocked, &limits, &usage);
        assert!(matches!(decision, Decision::BlockPermanent { .. }));
    }

    #[test]
    fn block_wins_over_limit() {
        let (mut blocked, mut limits, usage) = setup();
        blocked.insert(Domain::new("youtube.com"));
        limits.set(Domain::new("youtube.com"), 600);

        let decision = evaluate(&Domain::new("youtube.com"), &blocked, &limits, &usage);
        assert!(matches!(decision, Decision::BlockPermanent { .. }));
    }

    #[test]
    fn limit_not_exhausted_allows() {
        let (blocked, mut limits, mut usage) = setup();
        limits.set(Domain::new("youtube.com"), 600);
        usage.add(Domain::new("youtube.com"), 599);

        let decision = evaluate(&Domain::new("youtube.com"), &blocked, &limits, &usage);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn limit_exactly_reached_denies() {
        let (blocked, mut limits, mut usage) = setup();
        limits.set(Domain::new("youtube.com"), 600);
        usage.add(Domain::new("youtube.com"), 600);

        let decision = evaluate(&Domain::new("youtube.com"), &blocked, &limits, &usage);
        assert_eq!(
            decision,
            Decision::BlockTimeLimit {
                rule: Domain::new("youtube.com")
            }
        );
    }

    #[test]
    fn subdomain_usage_counts_against_rule_bucket() {
        let (blocked, mut limits, mut usage) = setup();
        limits.set(Domain::new("example.com"), 100);
        // Usage accrued under the rule's bucket, not the subdomain
        usage.add(Domain::new("example.com"), 100);

        let decision = evaluate(&Domain::new("mail.example.com"), &blocked, &limits, &usage);
        assert_eq!(
            decision,
            Decision::BlockTimeLimit {
                rule: Domain::new("example.com")
            }
        );
    }
}
