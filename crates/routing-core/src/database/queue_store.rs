//! # Queue Store Database Operations
//!
//! Queues owned by a company, including the default-queue flag. At most one
//! queue per company carries the flag when writes go through this store:
//! creating a default queue or calling [`QueueStore::set_default_queue`]
//! clears the previous default in the same transaction.
//!
//! Deletion is soft. Deleted and inactive queues are never returned as a
//! company's default.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{Result, RoutingError};
use crate::types::{CompanyId, Queue, QueueId};

const QUEUE_COLUMNS: &str =
    "id, company_id, name, description, is_default, is_active, is_deleted, created_at, updated_at";

/// Request to create a queue
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQueueRequest {
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    /// Make this the company's default queue, replacing any previous default
    #[serde(default)]
    pub is_default: bool,
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    company_id: String,
    name: String,
    description: Option<String>,
    is_default: bool,
    is_active: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QueueRow> for Queue {
    fn from(row: QueueRow) -> Self {
        Queue {
            id: QueueId(row.id),
            company_id: CompanyId(row.company_id),
            name: row.name,
            description: row.description,
            is_default: row.is_default,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Queue persistence
#[derive(Clone, Debug)]
pub struct QueueStore {
    pool: SqlitePool,
}

impl QueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_queue(&self, request: CreateQueueRequest) -> Result<Queue> {
        let id = QueueId::new();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        if request.is_default {
            sqlx::query(
                "UPDATE queues SET is_default = 0, updated_at = ? WHERE company_id = ? AND is_default = 1",
            )
            .bind(now)
            .bind(request.company_id.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO queues (id, company_id, name, description, is_default, is_active, is_deleted, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, 0, ?, ?)",
        )
        .bind(id.as_str())
        .bind(request.company_id.as_str())
        .bind(&request.name)
        .bind(request.description.as_deref())
        .bind(request.is_default)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(queue_id = %id, company_id = %request.company_id, name = %request.name, "Created queue");
        self.require_queue(&id).await
    }

    /// Fetch a queue in any state
    pub async fn get_queue(&self, queue_id: &QueueId) -> Result<Option<Queue>> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM queues WHERE id = ?",
            QUEUE_COLUMNS
        ))
        .bind(queue_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Queue::from))
    }

    /// Non-deleted queues of a company, by name
    pub async fn list_queues(&self, company_id: &CompanyId) -> Result<Vec<Queue>> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM queues WHERE company_id = ? AND is_deleted = 0 ORDER BY name, id",
            QUEUE_COLUMNS
        ))
        .bind(company_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Queue::from).collect())
    }

    /// The company's active, non-deleted default queue.
    ///
    /// Should several queues carry the default flag, the oldest one wins.
    pub async fn find_default_queue(&self, company_id: &CompanyId) -> Result<Option<Queue>> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM queues
             WHERE company_id = ? AND is_default = 1 AND is_active = 1 AND is_deleted = 0
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
            QUEUE_COLUMNS
        ))
        .bind(company_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Queue::from))
    }

    /// Make `queue_id` the company's only default queue
    pub async fn set_default_queue(&self, company_id: &CompanyId, queue_id: &QueueId) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE queues SET is_default = 0, updated_at = ? WHERE company_id = ? AND is_default = 1")
            .bind(now)
            .bind(company_id.as_str())
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE queues SET is_default = 1, updated_at = ? WHERE id = ? AND company_id = ? AND is_deleted = 0",
        )
        .bind(now)
        .bind(queue_id.as_str())
        .bind(company_id.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RoutingError::not_found(format!(
                "queue {} for company {}",
                queue_id, company_id
            )));
        }

        tx.commit().await?;
        debug!(queue_id = %queue_id, company_id = %company_id, "Default queue changed");
        Ok(())
    }

    pub async fn set_queue_active(&self, queue_id: &QueueId, active: bool) -> Result<()> {
        let updated = sqlx::query("UPDATE queues SET is_active = ?, updated_at = ? WHERE id = ? AND is_deleted = 0")
            .bind(active)
            .bind(Utc::now())
            .bind(queue_id.as_str())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("queue {}", queue_id)));
        }
        Ok(())
    }

    pub async fn soft_delete_queue(&self, queue_id: &QueueId) -> Result<()> {
        let updated = sqlx::query("UPDATE queues SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0")
            .bind(Utc::now())
            .bind(queue_id.as_str())
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("queue {}", queue_id)));
        }
        info!(queue_id = %queue_id, "Soft-deleted queue");
        Ok(())
    }

    async fn require_queue(&self, queue_id: &QueueId) -> Result<Queue> {
        self.get_queue(queue_id)
            .await?
            .ok_or_else(|| RoutingError::internal(format!("queue {} missing after write", queue_id)))
    }
}
