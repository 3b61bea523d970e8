//! # Mailbox Poll Scheduling
//!
//! Decides which mailbox configurations are due for a poll and runs the
//! polls, keeping one mailbox's failure from affecting the others.
//!
//! A configuration is due when it has never been polled, or when at least
//! `polling_interval_minutes` have elapsed since `last_polled_at`. Inactive
//! and soft-deleted configurations are never polled.
//!
//! - [`scheduler`]: the per-tick decision and the background loop

pub mod scheduler;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CompanyId, MailboxId};

pub use scheduler::{MailboxPollResult, PollScheduler, PollStatus, PollSummary};

/// Inbound mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    pub id: MailboxId,
    pub company_id: CompanyId,
    pub name: String,
    pub address: String,
    pub polling_interval_minutes: u32,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MailboxConfig {
    /// Active and not soft-deleted
    pub fn is_pollable(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    /// Whether enough time has passed since the last poll
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_polled_at {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.polling_interval(),
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.polling_interval_minutes))
    }
}

/// Where the scheduler reads mailbox configurations from
#[async_trait]
pub trait MailboxSource: Send + Sync {
    async fn list_mailboxes(&self) -> Result<Vec<MailboxConfig>>;

    /// Record a successful poll
    async fn record_poll(&self, mailbox_id: &MailboxId, polled_at: DateTime<Utc>) -> Result<()>;
}

/// Polls one mailbox and ingests what it finds
#[async_trait]
pub trait MailboxPoller: Send + Sync {
    /// Returns the number of items processed
    async fn poll(&self, mailbox: &MailboxConfig) -> anyhow::Result<usize>;
}
