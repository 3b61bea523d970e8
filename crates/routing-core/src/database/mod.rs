//! # Routing Persistence
//!
//! SQLite storage for queues, routing rules and mailbox configurations,
//! built on sqlx. This is the management side of the system: the routing
//! engine itself only reads through [`SqliteRoutingLookup`].
//!
//! ```rust,no_run
//! use helpdesk_routing_core::database::{CreateQueueRequest, RoutingDatabase};
//! use helpdesk_routing_core::CompanyId;
//!
//! # async fn example() -> helpdesk_routing_core::Result<()> {
//! let db = RoutingDatabase::new("sqlite://routing.db?mode=rwc").await?;
//!
//! let queue = db.queues().create_queue(CreateQueueRequest {
//!     company_id: CompanyId::from("acme"),
//!     name: "General".to_string(),
//!     description: None,
//!     is_default: true,
//! }).await?;
//! println!("default queue {}", queue.id);
//! # Ok(())
//! # }
//! ```

pub mod lookup;
pub mod mailbox_store;
pub mod queue_store;
pub mod rule_store;
pub mod schema;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, error, info};

use crate::config::{DatabaseConfig, PollingConfig};
use crate::error::Result;

pub use lookup::SqliteRoutingLookup;
pub use mailbox_store::{CreateMailboxRequest, MailboxStore};
pub use queue_store::{CreateQueueRequest, QueueStore};
pub use rule_store::{CreateRuleRequest, RuleStore, UpdateRuleRequest};

/// Routing database handle. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct RoutingDatabase {
    pool: SqlitePool,
}

impl RoutingDatabase {
    /// Open (creating if needed) the database at `database_url` and apply the schema
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, 5).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::connect(&config.database_url, config.max_connections).await
    }

    /// Private in-memory database for tests. Uses a single long-lived
    /// connection because every SQLite memory connection is its own database.
    pub async fn new_in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Opening routing database at {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        schema::create_schema(&pool).await?;

        debug!("Routing database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn queues(&self) -> QueueStore {
        QueueStore::new(self.pool.clone())
    }

    pub fn rules(&self) -> RuleStore {
        RuleStore::new(self.pool.clone())
    }

    pub fn mailboxes(&self) -> MailboxStore {
        MailboxStore::new(self.pool.clone())
    }

    /// Mailbox store applying the configured default poll interval
    pub fn mailboxes_with_config(&self, config: &PollingConfig) -> MailboxStore {
        self.mailboxes().with_default_interval(config.default_interval_minutes)
    }

    /// Read-only lookup for the routing engine
    pub fn lookup(&self) -> SqliteRoutingLookup {
        SqliteRoutingLookup::new(self.rules(), self.queues())
    }

    /// Execute a health check query
    pub async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                error!("Routing database health check failed: {}", e);
                false
            }
        }
    }

    /// Close the pool. Subsequent queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
