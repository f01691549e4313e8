// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Block/allow policy over classified flows.

use classify::{AppLabel, domain_matches};
use flow::state::{ClassifyState, FlowState, Verdict};
use std::net::Ipv4Addr;

/// A single policy rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Block flows classified as the given application.
    BlockApp(AppLabel),
    /// Block flows whose server name or `Host` matches the suffix
    /// (case-insensitive, label-anchored).
    BlockDomainSuffix(String),
    /// Block flows with the given address on either end.
    BlockIp(Ipv4Addr),
    /// Allow flows classified as the given application, overriding later
    /// block rules.
    AllowApp(AppLabel),
}

impl core::fmt::Display for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Rule::BlockApp(app) => write!(f, "block app {app}"),
            Rule::BlockDomainSuffix(suffix) => write!(f, "block domain *.{suffix}"),
            Rule::BlockIp(ip) => write!(f, "block ip {ip}"),
            Rule::AllowApp(app) => write!(f, "allow app {app}"),
        }
    }
}

/// An ordered, immutable rule list. First matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set. Domain suffixes are lowercased so matching
    /// against already-lowercased flow names is byte equality.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> RuleSet {
        let rules = rules
            .into_iter()
            .map(|rule| match rule {
                Rule::BlockDomainSuffix(suffix) => {
                    Rule::BlockDomainSuffix(suffix.to_ascii_lowercase())
                }
                other => other,
            })
            .collect();
        RuleSet { rules }
    }

    /// Whether the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate the policy against a flow.
    ///
    /// Returns the verdict of the first matching rule, or `None` when no
    /// rule matches. Before a flow is classified only address rules are
    /// considered, since application and name rules would be judging
    /// fields that are not final yet.
    #[must_use]
    pub fn decide(&self, flow: &FlowState) -> Option<Verdict> {
        let classified = flow.classify_state() == ClassifyState::Classified;
        for rule in &self.rules {
            let matched = match rule {
                Rule::BlockIp(ip) => flow.key().a().ip == *ip || flow.key().b().ip == *ip,
                Rule::BlockApp(app) => classified && flow.app() == *app,
                Rule::AllowApp(app) => classified && flow.app() == *app,
                Rule::BlockDomainSuffix(suffix) => {
                    classified
                        && (flow.sni().is_some_and(|name| domain_matches(name, suffix))
                            || flow
                                .http_host()
                                .is_some_and(|name| domain_matches(name, suffix)))
                }
            };
            if matched {
                return Some(match rule {
                    Rule::AllowApp(_) => Verdict::Forward,
                    _ => Verdict::Block,
                });
            }
        }
        None
    }
}

#[allow(clippy::unwrap_used)] // valid in test code
#[cfg(test)]
mod test {
    use super::*;
    use flow::key::{Endpoint, FlowKey};
    use flow::time::CaptureTime;
    use net::packet::IpProto;

    fn flow(sni: Option<&str>, app: AppLabel, classified: bool) -> FlowState {
        let (key, _) = FlowKey::canonicalize(
            IpProto::Tcp,
            Endpoint {
                ip: Ipv4Addr::new(192, 168, 0, 7),
                port: 49152,
            },
            Endpoint {
                ip: Ipv4Addr::new(142, 250, 80, 46),
                port: 443,
            },
        );
        let mut state = FlowState::new(key, CaptureTime::from_parts(0, 0));
        if let Some(name) = sni {
            state.set_sni(name.to_string());
        }
        state.set_app(app);
        if classified {
            state.mark_classified();
        }
        state
    }

    #[test]
    fn no_rules_means_no_decision() {
        let rules = RuleSet::default();
        assert_eq!(rules.decide(&flow(None, AppLabel::Https, true)), None);
    }

    #[test]
    fn block_app_matches_classified_flow() {
        let rules = RuleSet::new(vec![Rule::BlockApp(AppLabel::YouTube)]);
        let youtube = flow(Some("www.youtube.com"), AppLabel::YouTube, true);
        assert_eq!(rules.decide(&youtube), Some(Verdict::Block));
        let other = flow(None, AppLabel::Https, true);
        assert_eq!(rules.decide(&other), None);
    }

    #[test]
    fn app_rules_wait_for_classification() {
        let rules = RuleSet::new(vec![Rule::BlockApp(AppLabel::Unknown)]);
        let unclassified = flow(None, AppLabel::Unknown, false);
        assert_eq!(rules.decide(&unclassified), None);
    }

    #[test]
    fn block_ip_matches_either_endpoint_before_classification() {
        let rules = RuleSet::new(vec![Rule::BlockIp(Ipv4Addr::new(142, 250, 80, 46))]);
        let unclassified = flow(None, AppLabel::Unknown, false);
        assert_eq!(rules.decide(&unclassified), Some(Verdict::Block));

        let rules = RuleSet::new(vec![Rule::BlockIp(Ipv4Addr::new(192, 168, 0, 7))]);
        assert_eq!(rules.decide(&unclassified), Some(Verdict::Block));

        let rules = RuleSet::new(vec![Rule::BlockIp(Ipv4Addr::new(203, 0, 113, 9))]);
        assert_eq!(rules.decide(&unclassified), None);
    }

    #[test]
    fn domain_suffix_matches_sni_case_insensitively() {
        let rules = RuleSet::new(vec![Rule::BlockDomainSuffix("Facebook.COM".to_string())]);
        let facebook = flow(Some("cdn.facebook.com"), AppLabel::Facebook, true);
        assert_eq!(rules.decide(&facebook), Some(Verdict::Block));
        let lookalike = flow(Some("notfacebook.com"), AppLabel::Unknown, true);
        assert_eq!(rules.decide(&lookalike), None);
    }

    #[test]
    fn domain_suffix_matches_http_host() {
        let rules = RuleSet::new(vec![Rule::BlockDomainSuffix("example.com".to_string())]);
        let mut state = flow(None, AppLabel::Http, true);
        state.set_http_host("www.example.com".to_string());
        assert_eq!(rules.decide(&state), Some(Verdict::Block));
    }

    #[test]
    fn first_match_wins() {
        let rules = RuleSet::new(vec![
            Rule::AllowApp(AppLabel::YouTube),
            Rule::BlockApp(AppLabel::YouTube),
        ]);
        let youtube = flow(Some("www.youtube.com"), AppLabel::YouTube, true);
        assert_eq!(rules.decide(&youtube), Some(Verdict::Forward));

        let reversed = RuleSet::new(vec![
            Rule::BlockApp(AppLabel::YouTube),
            Rule::AllowApp(AppLabel::YouTube),
        ]);
        assert_eq!(reversed.decide(&youtube), Some(Verdict::Block));
    }
}
