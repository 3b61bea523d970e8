//! # Rule Matching
//!
//! The rule-matching DSL: a [`MatchType`](crate::MatchType) picks which
//! context field a rule inspects and a [`MatchOperator`](crate::MatchOperator)
//! decides how the stored value is compared against it.
//!
//! - [`predicate`]: single field comparison, including bounded regex search
//! - [`rule`]: match-type dispatch and the multi-valued tag semantics
//!
//! Evaluation never fails. A pattern that does not compile, or that exceeds
//! the configured [`RegexLimits`], simply does not match.

pub mod predicate;
pub mod rule;

pub use predicate::{apply, split_list, PredicateEvaluator, PredicateOutcome, RegexLimits};
pub use rule::{matches, RuleEvaluator};
