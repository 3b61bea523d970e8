use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::PollingConfig;
use crate::error::Result;
use crate::polling::{MailboxConfig, MailboxPoller, MailboxSource};
use crate::types::MailboxId;

/// Outcome of polling one mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Succeeded { processed: usize },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxPollResult {
    pub mailbox_id: MailboxId,
    pub mailbox_name: String,
    pub status: PollStatus,
}

/// Aggregate of one scheduler pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// One entry per mailbox that was due, in listing order
    pub results: Vec<MailboxPollResult>,
    /// Pollable mailboxes whose interval had not yet elapsed
    pub skipped: usize,
}

impl PollSummary {
    /// Items processed across every successful poll
    pub fn processed_total(&self) -> usize {
        self.results
            .iter()
            .map(|r| match r.status {
                PollStatus::Succeeded { processed } => processed,
                PollStatus::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn polled(&self) -> usize {
        self.results.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Failed mailboxes with their error messages
    pub fn failures(&self) -> impl Iterator<Item = (&MailboxId, &str)> {
        self.results.iter().filter_map(|r| match &r.status {
            PollStatus::Failed { message } => Some((&r.mailbox_id, message.as_str())),
            PollStatus::Succeeded { .. } => None,
        })
    }
}

/// Runs due mailbox polls on a fixed tick
#[derive(Clone)]
pub struct PollScheduler {
    source: Arc<dyn MailboxSource>,
    poller: Arc<dyn MailboxPoller>,
    tick: Duration,
}

impl PollScheduler {
    pub fn new(source: Arc<dyn MailboxSource>, poller: Arc<dyn MailboxPoller>) -> Self {
        Self {
            source,
            poller,
            tick: Duration::from_secs(60),
        }
    }

    /// Create a scheduler ticking at the configured interval
    pub fn with_config(
        source: Arc<dyn MailboxSource>,
        poller: Arc<dyn MailboxPoller>,
        config: &PollingConfig,
    ) -> Self {
        Self::new(source, poller).with_tick(config.tick_interval())
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Poll every mailbox that is due at `now`.
    ///
    /// Fails only if the configurations cannot be listed. A failing poll is
    /// recorded in the summary and the pass moves on to the next mailbox.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<PollSummary> {
        let mailboxes = self.source.list_mailboxes().await?;
        let mut summary = PollSummary::default();

        for mailbox in mailboxes.iter().filter(|m| m.is_pollable()) {
            if !mailbox.is_due(now) {
                debug!(mailbox_id = %mailbox.id, "Mailbox not due for polling");
                summary.skipped += 1;
                continue;
            }

            let status = self.poll_one(mailbox, now).await;
            summary.results.push(MailboxPollResult {
                mailbox_id: mailbox.id.clone(),
                mailbox_name: mailbox.name.clone(),
                status,
            });
        }

        Ok(summary)
    }

    /// Poll one mailbox. Errors and panics in the poller are both reported
    /// as `Failed` so the rest of the pass continues.
    async fn poll_one(&self, mailbox: &MailboxConfig, now: DateTime<Utc>) -> PollStatus {
        let outcome = AssertUnwindSafe(self.poller.poll(mailbox)).catch_unwind().await;

        match outcome {
            Ok(Ok(processed)) => {
                info!(mailbox_id = %mailbox.id, mailbox = %mailbox.name, processed, "Polled mailbox");
                if let Err(e) = self.source.record_poll(&mailbox.id, now).await {
                    warn!(mailbox_id = %mailbox.id, error = %e, "Failed to record poll time");
                }
                PollStatus::Succeeded { processed }
            }
            Ok(Err(e)) => {
                warn!(mailbox_id = %mailbox.id, mailbox = %mailbox.name, error = %e, "Mailbox poll failed");
                PollStatus::Failed {
                    message: format!("{:#}", e),
                }
            }
            Err(payload) => {
                let message = format!("poller panicked: {}", panic_message(&*payload));
                error!(mailbox_id = %mailbox.id, mailbox = %mailbox.name, "{}", message);
                PollStatus::Failed { message }
            }
        }
    }

    /// Tick until `shutdown` turns `true` or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if *shutdown.borrow() {
            info!("Mailbox poll scheduler not started, shutdown already requested");
            return;
        }

        info!(tick_secs = self.tick.as_secs(), "Mailbox poll scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(summary) => info!(
                            polled = summary.polled(),
                            skipped = summary.skipped,
                            failed = summary.failure_count(),
                            processed = summary.processed_total(),
                            "Mailbox poll pass complete"
                        ),
                        Err(e) => error!("Failed to list mailboxes: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Mailbox poll scheduler stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
