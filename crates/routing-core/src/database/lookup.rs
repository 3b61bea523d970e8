//! SQLite-backed [`RoutingLookup`](crate::routing::RoutingLookup).

use async_trait::async_trait;

use crate::database::{QueueStore, RuleStore};
use crate::error::{Result, RoutingError};
use crate::routing::RoutingLookup;
use crate::types::{CompanyId, Queue, RoutingRule};

/// [`RoutingLookup`] reading straight from SQLite on every call
#[derive(Clone, Debug)]
pub struct SqliteRoutingLookup {
    rules: RuleStore,
    queues: QueueStore,
}

impl SqliteRoutingLookup {
    pub fn new(rules: RuleStore, queues: QueueStore) -> Self {
        Self { rules, queues }
    }
}

#[async_trait]
impl RoutingLookup for SqliteRoutingLookup {
    async fn list_rules(&self, company_id: &CompanyId) -> Result<Vec<RoutingRule>> {
        self.rules.list_rules(company_id).await.map_err(store_unavailable)
    }

    async fn find_default_queue(&self, company_id: &CompanyId) -> Result<Option<Queue>> {
        self.queues
            .find_default_queue(company_id)
            .await
            .map_err(store_unavailable)
    }
}

fn store_unavailable(err: RoutingError) -> RoutingError {
    match err {
        RoutingError::Database(e) => RoutingError::lookup_unavailable(e.to_string()),
        other => other,
    }
}
