//! Mailbox poll scheduling tests

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use helpdesk_routing_core::polling::PollStatus;
use helpdesk_routing_core::prelude::*;
use parking_lot::Mutex;
use tokio::sync::watch;

fn mailbox(id: &str, interval: u32, last_polled_at: Option<DateTime<Utc>>) -> MailboxConfig {
    let now = Utc::now();
    MailboxConfig {
        id: MailboxId::from(id),
        company_id: CompanyId::from("acme"),
        name: id.to_string(),
        address: format!("{}@acme.test", id),
        polling_interval_minutes: interval,
        last_polled_at,
        is_active: true,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
struct MockSource {
    mailboxes: Mutex<Vec<MailboxConfig>>,
    recorded: Mutex<Vec<MailboxId>>,
    fail_listing: bool,
}

impl MockSource {
    fn with(mailboxes: Vec<MailboxConfig>) -> Self {
        Self {
            mailboxes: Mutex::new(mailboxes),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MailboxSource for MockSource {
    async fn list_mailboxes(&self) -> Result<Vec<MailboxConfig>> {
        if self.fail_listing {
            return Err(RoutingError::lookup_unavailable("mailbox store offline"));
        }
        Ok(self.mailboxes.lock().clone())
    }

    async fn record_poll(&self, mailbox_id: &MailboxId, polled_at: DateTime<Utc>) -> Result<()> {
        self.recorded.lock().push(mailbox_id.clone());
        for mailbox in self.mailboxes.lock().iter_mut() {
            if &mailbox.id == mailbox_id {
                mailbox.last_polled_at = Some(polled_at);
            }
        }
        Ok(())
    }
}

/// Poller returning a fixed count per mailbox, failing for selected ids
#[derive(Default)]
struct MockPoller {
    counts: HashMap<MailboxId, usize>,
    failing: HashSet<MailboxId>,
    calls: Mutex<Vec<MailboxId>>,
}

#[async_trait]
impl MailboxPoller for MockPoller {
    async fn poll(&self, mailbox: &MailboxConfig) -> anyhow::Result<usize> {
        self.calls.lock().push(mailbox.id.clone());
        if self.failing.contains(&mailbox.id) {
            return Err(anyhow!("connection refused").context("IMAP login failed"));
        }
        Ok(self.counts.get(&mailbox.id).copied().unwrap_or(0))
    }
}

#[tokio::test]
async fn test_failure_does_not_stop_other_mailboxes() {
    let source = Arc::new(MockSource::with(vec![
        mailbox("m1", 5, None),
        mailbox("m2", 5, None),
        mailbox("m3", 5, None),
    ]));
    let poller = Arc::new(MockPoller {
        counts: HashMap::from([(MailboxId::from("m1"), 3), (MailboxId::from("m3"), 4)]),
        failing: HashSet::from([MailboxId::from("m2")]),
        ..Default::default()
    });

    let scheduler = PollScheduler::new(source.clone(), poller.clone());
    let summary = scheduler.run_once(Utc::now()).await.unwrap();

    assert_eq!(summary.polled(), 3);
    assert_eq!(summary.processed_total(), 7);
    assert_eq!(summary.failure_count(), 1);

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures[0].0, &MailboxId::from("m2"));
    assert!(failures[0].1.contains("IMAP login failed"));
    assert!(failures[0].1.contains("connection refused"));

    // Only successful polls advance last_polled_at
    assert_eq!(*source.recorded.lock(), vec![MailboxId::from("m1"), MailboxId::from("m3")]);
}

#[tokio::test]
async fn test_only_due_mailboxes_are_polled() {
    let now = Utc::now();
    let source = Arc::new(MockSource::with(vec![
        mailbox("fresh", 5, Some(now - Duration::minutes(2))),
        mailbox("stale", 5, Some(now - Duration::minutes(5))),
        mailbox("never", 15, None),
    ]));
    let poller = Arc::new(MockPoller::default());

    let summary = PollScheduler::new(source, poller.clone()).run_once(now).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(
        *poller.calls.lock(),
        vec![MailboxId::from("stale"), MailboxId::from("never")]
    );
    assert!(summary
        .results
        .iter()
        .all(|r| r.status == PollStatus::Succeeded { processed: 0 }));
}

#[tokio::test]
async fn test_inactive_and_deleted_mailboxes_are_ignored() {
    let mut inactive = mailbox("inactive", 5, None);
    inactive.is_active = false;
    let mut deleted = mailbox("deleted", 5, None);
    deleted.is_deleted = true;

    let source = Arc::new(MockSource::with(vec![inactive, deleted]));
    let poller = Arc::new(MockPoller::default());

    let summary = PollScheduler::new(source, poller.clone()).run_once(Utc::now()).await.unwrap();
    assert_eq!(summary.polled(), 0);
    assert_eq!(summary.skipped, 0);
    assert!(poller.calls.lock().is_empty());
}

#[tokio::test]
async fn test_successful_poll_is_not_repeated_within_interval() {
    let source = Arc::new(MockSource::with(vec![mailbox("m1", 10, None)]));
    let poller = Arc::new(MockPoller::default());
    let scheduler = PollScheduler::new(source, poller.clone());

    let now = Utc::now();
    assert_eq!(scheduler.run_once(now).await.unwrap().polled(), 1);
    assert_eq!(scheduler.run_once(now + Duration::minutes(9)).await.unwrap().polled(), 0);
    assert_eq!(scheduler.run_once(now + Duration::minutes(10)).await.unwrap().polled(), 1);
    assert_eq!(poller.calls.lock().len(), 2);
}

#[tokio::test]
async fn test_failed_mailbox_is_retried_next_pass() {
    let source = Arc::new(MockSource::with(vec![mailbox("flaky", 10, None)]));
    let poller = Arc::new(MockPoller {
        failing: HashSet::from([MailboxId::from("flaky")]),
        ..Default::default()
    });
    let scheduler = PollScheduler::new(source.clone(), poller.clone());

    let now = Utc::now();
    scheduler.run_once(now).await.unwrap();
    let summary = scheduler.run_once(now + Duration::seconds(30)).await.unwrap();

    assert_eq!(summary.failure_count(), 1);
    assert_eq!(poller.calls.lock().len(), 2);
    assert!(source.recorded.lock().is_empty());
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let source = Arc::new(MockSource {
        fail_listing: true,
        ..Default::default()
    });
    let scheduler = PollScheduler::new(source, Arc::new(MockPoller::default()));

    let err = scheduler.run_once(Utc::now()).await.unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_scheduler_with_mailbox_store() {
    let db = RoutingDatabase::new_in_memory().await.unwrap();
    let polling = PollingConfig {
        tick_interval_secs: 30,
        default_interval_minutes: 7,
    };
    let store = db.mailboxes_with_config(&polling);

    let support = store
        .create_mailbox(CreateMailboxRequest {
            company_id: CompanyId::from("acme"),
            name: "support".to_string(),
            address: "support@acme.test".to_string(),
            polling_interval_minutes: None,
        })
        .await
        .unwrap();
    let sales = store
        .create_mailbox(CreateMailboxRequest {
            company_id: CompanyId::from("acme"),
            name: "sales".to_string(),
            address: "sales@acme.test".to_string(),
            polling_interval_minutes: Some(1),
        })
        .await
        .unwrap();
    let archive = store
        .create_mailbox(CreateMailboxRequest {
            company_id: CompanyId::from("acme"),
            name: "archive".to_string(),
            address: "archive@acme.test".to_string(),
            polling_interval_minutes: Some(1),
        })
        .await
        .unwrap();
    store.set_mailbox_active(&archive.id, false).await.unwrap();

    assert_eq!(support.polling_interval_minutes, 7);
    assert!(support.last_polled_at.is_none());

    let poller = Arc::new(MockPoller {
        counts: HashMap::from([(support.id.clone(), 2)]),
        failing: HashSet::from([sales.id.clone()]),
        ..Default::default()
    });
    let scheduler = PollScheduler::with_config(Arc::new(store.clone()), poller, &polling);

    let now = Utc::now();
    let summary = scheduler.run_once(now).await.unwrap();
    assert_eq!(summary.polled(), 2);
    assert_eq!(summary.processed_total(), 2);

    let support = store.get_mailbox(&support.id).await.unwrap().unwrap();
    assert!(support.last_polled_at.is_some());
    let sales = store.get_mailbox(&sales.id).await.unwrap().unwrap();
    assert!(sales.last_polled_at.is_none());

    store.soft_delete_mailbox(&sales.id).await.unwrap();
    let listed = store.list_active_mailboxes().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, support.id);

    let err = store.mark_polled(&sales.id, now).await.unwrap_err();
    assert!(matches!(err, RoutingError::NotFound(_)));
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let source = Arc::new(MockSource::with(vec![mailbox("m1", 5, None)]));
    let poller = Arc::new(MockPoller::default());
    let scheduler = PollScheduler::new(source, poller.clone()).with_tick(StdDuration::from_millis(10));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    // First tick fires immediately
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(StdDuration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert_eq!(poller.calls.lock().len(), 1);
}

#[tokio::test]
async fn test_run_stops_when_sender_dropped() {
    let scheduler = PollScheduler::new(Arc::new(MockSource::default()), Arc::new(MockPoller::default()))
        .with_tick(StdDuration::from_secs(3600));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { scheduler.run(rx).await });
    drop(tx);

    tokio::time::timeout(StdDuration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}

/// Poller that panics for one mailbox and succeeds for the rest
struct PanickingPoller {
    panics_on: MailboxId,
}

#[async_trait]
impl MailboxPoller for PanickingPoller {
    async fn poll(&self, mailbox: &MailboxConfig) -> anyhow::Result<usize> {
        if mailbox.id == self.panics_on {
            panic!("mailbox parser blew up");
        }
        Ok(3)
    }
}

#[tokio::test]
async fn test_panicking_poller_does_not_stop_the_pass() {
    let source = Arc::new(MockSource::with(vec![mailbox("a", 5, None), mailbox("b", 5, None)]));
    let poller = Arc::new(PanickingPoller {
        panics_on: MailboxId::from("a"),
    });
    let scheduler = PollScheduler::new(source.clone(), poller);

    let summary = scheduler.run_once(Utc::now()).await.unwrap();

    assert_eq!(summary.polled(), 2);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.processed_total(), 3);

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures[0].0, &MailboxId::from("a"));
    assert!(failures[0].1.contains("mailbox parser blew up"));
    assert_eq!(summary.results[1].status, PollStatus::Succeeded { processed: 3 });

    assert_eq!(*source.recorded.lock(), vec![MailboxId::from("b")]);
}

#[tokio::test]
async fn test_run_returns_when_shutdown_already_requested() {
    let source = Arc::new(MockSource::with(vec![mailbox("m1", 5, None)]));
    let poller = Arc::new(MockPoller::default());
    let scheduler = PollScheduler::new(source, poller.clone()).with_tick(StdDuration::from_millis(10));

    let (tx, rx) = watch::channel(true);
    let handle = tokio::spawn(async move { scheduler.run(rx).await });

    tokio::time::timeout(StdDuration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(poller.calls.lock().is_empty());
    drop(tx);
}
