use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::MatchingConfig;
use crate::error::{Result, RoutingError};
use crate::matching::{split_list, RuleEvaluator};
use crate::routing::RoutingLookup;
use crate::types::{Queue, RoutingContext, RoutingResult, RoutingRule};

/// Decides queue, agent, priority and tags for a ticket.
///
/// Every call re-reads the company's rules through the [`RoutingLookup`];
/// nothing is cached between calls and the engine never writes. Rules are
/// evaluated in ascending `sort_order` and the first match wins. When nothing
/// matches, the company's default queue is used if one exists.
#[derive(Clone)]
pub struct RoutingEngine {
    lookup: Arc<dyn RoutingLookup>,
    evaluator: RuleEvaluator,
}

impl RoutingEngine {
    pub fn new(lookup: Arc<dyn RoutingLookup>) -> Self {
        Self {
            lookup,
            evaluator: RuleEvaluator::default(),
        }
    }

    /// Create an engine whose regex bounds come from configuration
    pub fn with_config(lookup: Arc<dyn RoutingLookup>, config: &MatchingConfig) -> Self {
        Self {
            lookup,
            evaluator: RuleEvaluator::new(config.regex_limits()),
        }
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    /// Route a ticket.
    ///
    /// Only a lookup failure is an error; "no rule matched" and "no default
    /// queue" are both ordinary results.
    pub async fn evaluate(&self, context: &RoutingContext) -> Result<RoutingResult> {
        let company_id = &context.company_id;

        let mut rules = self
            .lookup
            .list_rules(company_id)
            .await
            .map_err(|e| unavailable("list_rules", e))?;

        // Tenant and state filtering is enforced here as well, whatever the lookup returns
        rules.retain(|rule| rule.is_eligible_for(company_id));
        // Stable: equal sort_order keeps the lookup order
        rules.sort_by_key(|rule| rule.sort_order);

        debug!(company_id = %company_id, rule_count = rules.len(), "Evaluating routing rules");

        if let Some(rule) = rules.iter().find(|rule| self.evaluator.matches(rule, context)) {
            info!(
                company_id = %company_id,
                rule_id = %rule.id,
                rule_name = %rule.name,
                queue_id = %rule.queue.id,
                "Routing rule matched"
            );
            return Ok(Self::rule_result(rule));
        }

        let default_queue = self
            .lookup
            .find_default_queue(company_id)
            .await
            .map_err(|e| unavailable("find_default_queue", e))?
            .filter(|queue| &queue.company_id == company_id && queue.is_usable_default());

        match default_queue {
            Some(queue) => {
                info!(company_id = %company_id, queue_id = %queue.id, "No rule matched, using default queue");
                Ok(Self::fallback_result(&queue))
            }
            None => {
                warn!(company_id = %company_id, "No rule matched and no default queue configured");
                Ok(RoutingResult::default())
            }
        }
    }

    fn rule_result(rule: &RoutingRule) -> RoutingResult {
        RoutingResult {
            queue: Some(rule.queue.clone()),
            auto_assign_agent_id: rule.auto_assign_agent_id.clone(),
            priority_override: rule.priority_override,
            tags_to_add: rule.tags_to_add.as_deref().map(split_list).unwrap_or_default(),
            matched_rule: Some(rule.to_ref()),
            is_default_fallback: false,
        }
    }

    fn fallback_result(queue: &Queue) -> RoutingResult {
        RoutingResult {
            queue: Some(queue.to_ref()),
            is_default_fallback: true,
            ..Default::default()
        }
    }
}

fn unavailable(operation: &str, err: RoutingError) -> RoutingError {
    match err {
        RoutingError::LookupUnavailable(_) => err,
        other => RoutingError::lookup_unavailable(format!("{} failed: {}", operation, other)),
    }
}
