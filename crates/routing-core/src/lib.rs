//! # Helpdesk Routing Core
//!
//! Ticket routing for the helpdesk stack. Given a snapshot of an incoming or
//! updated ticket, the routing engine picks a queue, an optional auto-assigned
//! agent, an optional priority override and tags to add, based on a
//! company-scoped, ordered list of match rules.
//!
//! ## Features
//!
//! - **Rule Matching**: match types × match operators, including bounded regex
//!   and multi-valued tag semantics
//! - **Routing Engine**: first-match-wins evaluation with default-queue fallback
//! - **Persistence**: SQLite stores for rules, queues and mailbox configurations
//! - **Poll Scheduling**: due-for-poll decisions with per-mailbox failure isolation
//!
//! ## Architecture
//!
//! - [`matching`]: predicate and rule evaluation
//! - [`routing`]: the engine and its read-only lookup trait
//! - [`database`]: sqlx-backed management stores and lookup
//! - [`polling`]: mailbox poll scheduling
//! - [`config`], [`logging`], [`error`]: ambient plumbing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helpdesk_routing_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RoutingConfig::default();
//!     setup_logging(LoggingConfig::from_settings(&config.logging)?)?;
//!
//!     let database = RoutingDatabase::from_config(&config.database).await?;
//!     let engine = RoutingEngine::with_config(Arc::new(database.lookup()), &config.matching);
//!
//!     let context = RoutingContext::new(CompanyId::from("acme"))
//!         .with_subject("URGENT: system down")
//!         .with_sender_domain("customer.example");
//!
//!     let result = engine.evaluate(&context).await?;
//!     println!("routed to {:?}", result.queue);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Routing functionality
pub mod matching;
pub mod routing;

// Persistence and scheduling
pub mod database;
pub mod polling;

pub use config::RoutingConfig;
pub use error::{Result, RoutingError};
pub use routing::{RoutingEngine, RoutingLookup};
pub use types::{
    AgentId, CompanyId, MailboxId, MatchOperator, MatchType, Queue, QueueId, QueueRef, RoutingContext,
    RoutingResult, RoutingRule, RuleId, RuleRef, TicketPriority,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DatabaseConfig, MatchingConfig, PollingConfig, RoutingConfig};
    pub use crate::database::{
        CreateMailboxRequest, CreateQueueRequest, CreateRuleRequest, RoutingDatabase, UpdateRuleRequest,
    };
    pub use crate::error::{Result, RoutingError};
    pub use crate::logging::{setup_logging, LoggingConfig};
    pub use crate::matching::{PredicateEvaluator, RegexLimits, RuleEvaluator};
    pub use crate::polling::{MailboxConfig, MailboxPoller, MailboxSource, PollScheduler, PollSummary};
    pub use crate::routing::{InMemoryRoutingLookup, RoutingEngine, RoutingLookup};
    pub use crate::types::*;
}
