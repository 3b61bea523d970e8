//! Database schema for queues, routing rules and mailbox configurations.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

const CREATE_QUEUES: &str = r#"
    CREATE TABLE IF NOT EXISTS queues (
        id TEXT PRIMARY KEY,
        company_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        is_default BOOLEAN NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        is_deleted BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_ROUTING_RULES: &str = r#"
    CREATE TABLE IF NOT EXISTS routing_rules (
        id TEXT PRIMARY KEY,
        company_id TEXT NOT NULL,
        queue_id TEXT NOT NULL REFERENCES queues(id),
        name TEXT NOT NULL,
        description TEXT,
        match_type TEXT NOT NULL,
        match_operator TEXT NOT NULL,
        match_value TEXT NOT NULL DEFAULT '',
        sort_order INTEGER NOT NULL DEFAULT 0,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        is_deleted BOOLEAN NOT NULL DEFAULT 0,
        auto_assign_agent_id TEXT,
        priority_override TEXT,
        tags_to_add TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_MAILBOX_CONFIGS: &str = r#"
    CREATE TABLE IF NOT EXISTS mailbox_configs (
        id TEXT PRIMARY KEY,
        company_id TEXT NOT NULL,
        name TEXT NOT NULL,
        address TEXT NOT NULL,
        polling_interval_minutes INTEGER NOT NULL,
        last_polled_at TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        is_deleted BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_routing_rules_company_order \
     ON routing_rules(company_id, is_active, is_deleted, sort_order)",
    "CREATE INDEX IF NOT EXISTS idx_queues_company_default \
     ON queues(company_id, is_default, is_active, is_deleted)",
    "CREATE INDEX IF NOT EXISTS idx_mailbox_configs_active \
     ON mailbox_configs(is_active, is_deleted)",
];

/// Create all tables and indexes. Safe to run against an existing database.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    debug!("Creating routing database schema");

    sqlx::query(CREATE_QUEUES).execute(pool).await?;
    sqlx::query(CREATE_ROUTING_RULES).execute(pool).await?;
    sqlx::query(CREATE_MAILBOX_CONFIGS).execute(pool).await?;

    for statement in CREATE_INDEXES {
        sqlx::query(*statement).execute(pool).await?;
    }

    Ok(())
}
