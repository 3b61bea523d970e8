//! Mailbox configuration storage, also serving as the scheduler's
//! [`MailboxSource`](crate::polling::MailboxSource).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Result, RoutingError};
use crate::polling::{MailboxConfig, MailboxSource};
use crate::types::{CompanyId, MailboxId};

const MAILBOX_COLUMNS: &str = "id, company_id, name, address, polling_interval_minutes, last_polled_at, \
     is_active, is_deleted, created_at, updated_at";

/// Request to register a mailbox for polling
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMailboxRequest {
    pub company_id: CompanyId,
    pub name: String,
    pub address: String,
    /// Falls back to the store's default interval when absent
    pub polling_interval_minutes: Option<u32>,
}

#[derive(sqlx::FromRow)]
struct MailboxRow {
    id: String,
    company_id: String,
    name: String,
    address: String,
    polling_interval_minutes: i64,
    last_polled_at: Option<DateTime<Utc>>,
    is_active: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MailboxRow> for MailboxConfig {
    fn from(row: MailboxRow) -> Self {
        MailboxConfig {
            id: MailboxId(row.id),
            company_id: CompanyId(row.company_id),
            name: row.name,
            address: row.address,
            polling_interval_minutes: u32::try_from(row.polling_interval_minutes.max(0)).unwrap_or(u32::MAX),
            last_polled_at: row.last_polled_at,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Mailbox configuration persistence
#[derive(Clone, Debug)]
pub struct MailboxStore {
    pool: SqlitePool,
    default_interval_minutes: u32,
}

impl MailboxStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            default_interval_minutes: 5,
        }
    }

    pub fn with_default_interval(mut self, minutes: u32) -> Self {
        self.default_interval_minutes = minutes;
        self
    }

    pub async fn create_mailbox(&self, request: CreateMailboxRequest) -> Result<MailboxConfig> {
        let id = MailboxId::new();
        let now = Utc::now();
        let interval = request
            .polling_interval_minutes
            .unwrap_or(self.default_interval_minutes);

        sqlx::query(
            "INSERT INTO mailbox_configs (id, company_id, name, address, polling_interval_minutes, last_polled_at,
                is_active, is_deleted, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, NULL, 1, 0, ?, ?)",
        )
        .bind(id.as_str())
        .bind(request.company_id.as_str())
        .bind(&request.name)
        .bind(&request.address)
        .bind(i64::from(interval))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(mailbox_id = %id, address = %request.address, interval, "Registered mailbox");
        self.get_mailbox(&id)
            .await?
            .ok_or_else(|| RoutingError::internal(format!("mailbox {} missing after write", id)))
    }

    pub async fn get_mailbox(&self, mailbox_id: &MailboxId) -> Result<Option<MailboxConfig>> {
        let row = sqlx::query_as::<_, MailboxRow>(&format!(
            "SELECT {} FROM mailbox_configs WHERE id = ?",
            MAILBOX_COLUMNS
        ))
        .bind(mailbox_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MailboxConfig::from))
    }

    /// Active, non-deleted configurations
    pub async fn list_active_mailboxes(&self) -> Result<Vec<MailboxConfig>> {
        let rows = sqlx::query_as::<_, MailboxRow>(&format!(
            "SELECT {} FROM mailbox_configs WHERE is_active = 1 AND is_deleted = 0 ORDER BY name, id",
            MAILBOX_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MailboxConfig::from).collect())
    }

    pub async fn mark_polled(&self, mailbox_id: &MailboxId, polled_at: DateTime<Utc>) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE mailbox_configs SET last_polled_at = ?, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(polled_at)
        .bind(Utc::now())
        .bind(mailbox_id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("mailbox {}", mailbox_id)));
        }
        Ok(())
    }

    pub async fn set_mailbox_active(&self, mailbox_id: &MailboxId, active: bool) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE mailbox_configs SET is_active = ?, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(mailbox_id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("mailbox {}", mailbox_id)));
        }
        Ok(())
    }

    pub async fn soft_delete_mailbox(&self, mailbox_id: &MailboxId) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE mailbox_configs SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(Utc::now())
        .bind(mailbox_id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("mailbox {}", mailbox_id)));
        }
        info!(mailbox_id = %mailbox_id, "Soft-deleted mailbox");
        Ok(())
    }
}

#[async_trait]
impl MailboxSource for MailboxStore {
    async fn list_mailboxes(&self) -> Result<Vec<MailboxConfig>> {
        self.list_active_mailboxes().await
    }

    async fn record_poll(&self, mailbox_id: &MailboxId, polled_at: DateTime<Utc>) -> Result<()> {
        self.mark_polled(mailbox_id, polled_at).await
    }
}
