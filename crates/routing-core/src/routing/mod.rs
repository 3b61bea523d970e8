//! # Ticket Routing Engine
//!
//! Decides, for an incoming or updated ticket, which queue it belongs to,
//! which agent is auto-assigned, what priority override applies and which
//! tags are added.
//!
//! ```text
//! RoutingContext ──► RoutingEngine::evaluate
//!                       │
//!                       ├─ RoutingLookup::list_rules(company)   (fresh read)
//!                       ├─ first rule (ascending sort_order) that matches
//!                       │     └─► RoutingResult { queue, agent, priority, tags, matched_rule }
//!                       └─ no match
//!                             ├─ RoutingLookup::find_default_queue(company)
//!                             ├─ found     ─► RoutingResult { queue, is_default_fallback: true }
//!                             └─ not found ─► RoutingResult::default()
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use helpdesk_routing_core::routing::{InMemoryRoutingLookup, RoutingEngine};
//! use helpdesk_routing_core::{CompanyId, RoutingContext};
//!
//! # async fn example() -> helpdesk_routing_core::Result<()> {
//! let lookup = Arc::new(InMemoryRoutingLookup::new());
//! let engine = RoutingEngine::new(lookup);
//!
//! let context = RoutingContext::new(CompanyId::from("acme"))
//!     .with_subject("URGENT: system down")
//!     .with_tags(["vip"]);
//!
//! let result = engine.evaluate(&context).await?;
//! if result.is_unrouted() {
//!     println!("No rule matched and no default queue exists");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: evaluation order and result construction
//! - [`lookup`]: the read-only collaborator trait
//! - [`memory`]: an in-memory lookup implementation

pub mod engine;
pub mod lookup;
pub mod memory;

pub use engine::RoutingEngine;
pub use lookup::RoutingLookup;
pub use memory::InMemoryRoutingLookup;
