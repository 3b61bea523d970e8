//! In-process [`RoutingLookup`] backed by plain vectors.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Result, RoutingError};
use crate::routing::RoutingLookup;
use crate::types::{CompanyId, Queue, QueueId, RoutingRule, RuleId};

/// Rule and queue lookup held in memory. Useful for tests and for embedding
/// the engine where rules are loaded from configuration.
///
/// ```rust
/// use std::sync::Arc;
/// use helpdesk_routing_core::prelude::*;
///
/// # tokio_test::block_on(async {
/// let lookup = Arc::new(InMemoryRoutingLookup::new());
/// let engine = RoutingEngine::new(lookup.clone());
///
/// let result = engine
///     .evaluate(&RoutingContext::new(CompanyId::from("acme")))
///     .await
///     .unwrap();
/// assert!(result.is_unrouted());
///
/// lookup.set_unavailable(true);
/// let err = engine
///     .evaluate(&RoutingContext::new(CompanyId::from("acme")))
///     .await
///     .unwrap_err();
/// assert!(err.is_unavailable());
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRoutingLookup {
    rules: RwLock<Vec<RoutingRule>>,
    queues: RwLock<Vec<Queue>>,
    unavailable: AtomicBool,
}

impl InMemoryRoutingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a rule by id
    pub fn upsert_rule(&self, rule: RoutingRule) {
        let mut rules = self.rules.write();
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }

    pub fn remove_rule(&self, rule_id: &RuleId) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| &r.id != rule_id);
        rules.len() != before
    }

    /// Insert or replace a queue by id
    pub fn upsert_queue(&self, queue: Queue) {
        let mut queues = self.queues.write();
        match queues.iter_mut().find(|q| q.id == queue.id) {
            Some(existing) => *existing = queue,
            None => queues.push(queue),
        }
    }

    pub fn remove_queue(&self, queue_id: &QueueId) -> bool {
        let mut queues = self.queues.write();
        let before = queues.len();
        queues.retain(|q| &q.id != queue_id);
        queues.len() != before
    }

    /// Simulate the backing store going away. Every lookup fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RoutingError::lookup_unavailable("in-memory lookup marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RoutingLookup for InMemoryRoutingLookup {
    async fn list_rules(&self, company_id: &CompanyId) -> Result<Vec<RoutingRule>> {
        self.check_available()?;

        let mut rules: Vec<RoutingRule> = self
            .rules
            .read()
            .iter()
            .filter(|r| r.is_eligible_for(company_id))
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.sort_order);
        Ok(rules)
    }

    async fn find_default_queue(&self, company_id: &CompanyId) -> Result<Option<Queue>> {
        self.check_available()?;

        // Oldest default wins if more than one is flagged
        Ok(self
            .queues
            .read()
            .iter()
            .filter(|q| &q.company_id == company_id && q.is_usable_default())
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }
}
