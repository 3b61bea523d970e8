use std::collections::BTreeSet;

use crate::matching::predicate::{eq_ci, split_list, PredicateEvaluator, RegexLimits};
use crate::types::{MatchOperator, MatchType, RoutingContext, RoutingRule};

/// Decides whether one rule matches a routing context
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator {
    predicate: PredicateEvaluator,
}

impl RuleEvaluator {
    pub fn new(limits: RegexLimits) -> Self {
        Self {
            predicate: PredicateEvaluator::new(limits),
        }
    }

    pub fn predicate(&self) -> &PredicateEvaluator {
        &self.predicate
    }

    pub fn matches(&self, rule: &RoutingRule, context: &RoutingContext) -> bool {
        let value = rule.match_value.as_str();
        let op = rule.match_operator;

        match rule.match_type {
            MatchType::SenderDomain => self.field(context.sender_domain.as_deref(), value, op),
            MatchType::SubjectKeyword => self.predicate.apply(&context.subject, value, op),
            MatchType::BodyKeyword => self.predicate.apply(&context.body, value, op),
            MatchType::IssueType => self.field(context.issue_type.as_deref(), value, op),
            MatchType::System => self.field(context.system.as_deref(), value, op),
            MatchType::RequesterEmail => self.field(context.requester_email.as_deref(), value, op),
            MatchType::CompanyCode => false,
            MatchType::Tag => self.evaluate_tag_rule(&context.tags, value, op),
        }
    }

    /// Tag rules match when any tag satisfies the operator. `In`, `Contains`
    /// and `Equals` compare against the tag set directly; the remaining
    /// operators run the field predicate per tag.
    pub fn evaluate_tag_rule(&self, tags: &BTreeSet<String>, match_value: &str, op: MatchOperator) -> bool {
        if tags.is_empty() {
            return false;
        }

        match op {
            MatchOperator::In => {
                let alternatives = split_list(match_value);
                tags.iter()
                    .any(|tag| alternatives.iter().any(|alt| eq_ci(tag, alt)))
            }
            MatchOperator::Contains => {
                let needle = match_value.to_lowercase();
                tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            }
            MatchOperator::Equals => tags.iter().any(|tag| eq_ci(tag, match_value)),
            MatchOperator::StartsWith | MatchOperator::EndsWith | MatchOperator::Regex => {
                tags.iter().any(|tag| self.predicate.apply(tag, match_value, op))
            }
        }
    }

    fn field(&self, field: Option<&str>, value: &str, op: MatchOperator) -> bool {
        self.predicate.apply(field.unwrap_or_default(), value, op)
    }
}

/// Evaluate `rule` against `context` with default regex limits
pub fn matches(rule: &RoutingRule, context: &RoutingContext) -> bool {
    RuleEvaluator::default().matches(rule, context)
}
