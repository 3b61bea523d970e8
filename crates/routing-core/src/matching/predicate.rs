//! Field-level comparison for a single match operator.

use regex::RegexBuilder;
use tracing::debug;

use crate::types::MatchOperator;

/// Result of evaluating one predicate.
///
/// A pattern that cannot be compiled, or that exceeds the configured
/// [`RegexLimits`], is reported as `PatternRejected` and counts as no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOutcome {
    Matched,
    NotMatched,
    PatternRejected,
}

impl PredicateOutcome {
    pub fn is_match(self) -> bool {
        matches!(self, PredicateOutcome::Matched)
    }

    fn from_bool(matched: bool) -> Self {
        if matched {
            PredicateOutcome::Matched
        } else {
            PredicateOutcome::NotMatched
        }
    }
}

/// Resource bounds for `Regex` predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexLimits {
    /// Maximum compiled program size in bytes
    pub size_limit: usize,
    /// Maximum lazy DFA cache size in bytes
    pub dfa_size_limit: usize,
    /// Fields longer than this are not searched
    pub max_input_len: usize,
}

impl Default for RegexLimits {
    fn default() -> Self {
        Self {
            size_limit: 1 << 20,
            dfa_size_limit: 2 << 20,
            max_input_len: 1 << 20,
        }
    }
}

/// Applies a [`MatchOperator`] to a field value. Comparisons are
/// case-insensitive for every operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateEvaluator {
    limits: RegexLimits,
}

impl PredicateEvaluator {
    pub fn new(limits: RegexLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RegexLimits {
        &self.limits
    }

    /// `true` when `field` satisfies `operator` against `match_value`
    pub fn apply(&self, field: &str, match_value: &str, operator: MatchOperator) -> bool {
        self.evaluate(field, match_value, operator).is_match()
    }

    pub fn evaluate(&self, field: &str, match_value: &str, operator: MatchOperator) -> PredicateOutcome {
        match operator {
            MatchOperator::Equals => PredicateOutcome::from_bool(eq_ci(field, match_value)),
            MatchOperator::Contains => {
                PredicateOutcome::from_bool(field.to_lowercase().contains(&match_value.to_lowercase()))
            }
            MatchOperator::StartsWith => {
                PredicateOutcome::from_bool(field.to_lowercase().starts_with(&match_value.to_lowercase()))
            }
            MatchOperator::EndsWith => {
                PredicateOutcome::from_bool(field.to_lowercase().ends_with(&match_value.to_lowercase()))
            }
            MatchOperator::Regex => self.search(field, match_value),
            MatchOperator::In => PredicateOutcome::from_bool(
                split_list(match_value).iter().any(|alt| eq_ci(field, alt)),
            ),
        }
    }

    fn search(&self, field: &str, pattern: &str) -> PredicateOutcome {
        if field.len() > self.limits.max_input_len {
            debug!(
                field_len = field.len(),
                max_input_len = self.limits.max_input_len,
                "Regex input exceeds limit, treating as no match"
            );
            return PredicateOutcome::PatternRejected;
        }

        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(self.limits.size_limit)
            .dfa_size_limit(self.limits.dfa_size_limit)
            .build();

        match compiled {
            Ok(re) => PredicateOutcome::from_bool(re.is_match(field)),
            Err(e) => {
                debug!(pattern = %pattern, error = %e, "Rejected regex pattern, treating as no match");
                PredicateOutcome::PatternRejected
            }
        }
    }
}

/// Apply `operator` with default regex limits
pub fn apply(field: &str, match_value: &str, operator: MatchOperator) -> bool {
    PredicateEvaluator::default().apply(field, match_value, operator)
}

/// Split a comma separated list, trimming entries and dropping empty ones
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn eq_ci(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}
