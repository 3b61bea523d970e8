use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CompanyId, Queue, RoutingRule};

/// Read-only view of rules and queues consumed by the routing engine.
///
/// Implementations are queried on every evaluation; after a rule or queue
/// mutation the next call must observe it. Failure to reach the backing store
/// must be reported as an error, never as an empty rule set.
#[async_trait]
pub trait RoutingLookup: Send + Sync {
    /// Active, non-deleted rules of `company_id`, ordered by ascending `sort_order`
    async fn list_rules(&self, company_id: &CompanyId) -> Result<Vec<RoutingRule>>;

    /// The company's active, non-deleted default queue, if any
    async fn find_default_queue(&self, company_id: &CompanyId) -> Result<Option<Queue>>;
}
