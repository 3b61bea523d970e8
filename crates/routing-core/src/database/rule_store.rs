//! # Routing Rule Store
//!
//! Create, update, reorder, deactivate and soft-delete routing rules.
//! Rule definitions are stored as given; a pattern that cannot compile is
//! only discovered at evaluation time, where it simply never matches.
//!
//! [`RuleStore::list_rules`] returns a company's active rules ordered by
//! `sort_order`, then `created_at`, then id, so equal sort orders resolve to
//! the earlier rule.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{Result, RoutingError};
use crate::types::{
    AgentId, CompanyId, MatchOperator, MatchType, QueueId, QueueRef, RoutingRule, RuleId, TicketPriority,
};

const RULE_SELECT: &str = "SELECT r.id, r.company_id, r.queue_id, q.name AS queue_name, r.name, r.description,
        r.match_type, r.match_operator, r.match_value, r.sort_order, r.is_active, r.is_deleted,
        r.auto_assign_agent_id, r.priority_override, r.tags_to_add, r.created_at, r.updated_at
     FROM routing_rules r
     LEFT JOIN queues q ON q.id = r.queue_id";

/// Request to create a routing rule. Definitions are stored as given.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRuleRequest {
    pub company_id: CompanyId,
    pub queue_id: QueueId,
    pub name: String,
    pub description: Option<String>,
    pub match_type: MatchType,
    pub match_operator: MatchOperator,
    pub match_value: String,
    /// Appended after the company's current last rule when absent
    pub sort_order: Option<i64>,
    pub auto_assign_agent_id: Option<AgentId>,
    pub priority_override: Option<TicketPriority>,
    pub tags_to_add: Option<String>,
}

/// Partial update. `None` leaves a field unchanged; for nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRuleRequest {
    pub queue_id: Option<QueueId>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub match_type: Option<MatchType>,
    pub match_operator: Option<MatchOperator>,
    pub match_value: Option<String>,
    pub sort_order: Option<i64>,
    pub auto_assign_agent_id: Option<Option<AgentId>>,
    pub priority_override: Option<Option<TicketPriority>>,
    pub tags_to_add: Option<Option<String>>,
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: String,
    company_id: String,
    queue_id: String,
    queue_name: Option<String>,
    name: String,
    description: Option<String>,
    match_type: String,
    match_operator: String,
    match_value: String,
    sort_order: i64,
    is_active: bool,
    is_deleted: bool,
    auto_assign_agent_id: Option<String>,
    priority_override: Option<String>,
    tags_to_add: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for RoutingRule {
    type Error = RoutingError;

    fn try_from(row: RuleRow) -> Result<Self> {
        let match_type = row.match_type.parse::<MatchType>()?;
        let match_operator = row.match_operator.parse::<MatchOperator>()?;

        let priority_override = match row.priority_override.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse::<TicketPriority>() {
                Ok(priority) => Some(priority),
                Err(_) => {
                    warn!(rule_id = %row.id, priority = %raw, "Ignoring unknown priority override");
                    None
                }
            },
        };

        Ok(RoutingRule {
            id: RuleId(row.id),
            company_id: CompanyId(row.company_id),
            queue: QueueRef {
                id: QueueId(row.queue_id),
                name: row.queue_name.unwrap_or_default(),
            },
            name: row.name,
            description: row.description,
            match_type,
            match_operator,
            match_value: row.match_value,
            sort_order: row.sort_order,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            auto_assign_agent_id: row.auto_assign_agent_id.map(AgentId),
            priority_override,
            tags_to_add: row.tags_to_add,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Routing rule persistence and management
#[derive(Clone, Debug)]
pub struct RuleStore {
    pool: SqlitePool,
}

impl RuleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_rule(&self, request: CreateRuleRequest) -> Result<RoutingRule> {
        let id = RuleId::new();
        let now = Utc::now();

        let sort_order = match request.sort_order {
            Some(order) => order,
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM routing_rules WHERE company_id = ? AND is_deleted = 0",
                )
                .bind(request.company_id.as_str())
                .fetch_one(&self.pool)
                .await?
            }
        };

        sqlx::query(
            "INSERT INTO routing_rules (id, company_id, queue_id, name, description, match_type, match_operator,
                match_value, sort_order, is_active, is_deleted, auto_assign_agent_id, priority_override, tags_to_add,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, 0, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(request.company_id.as_str())
        .bind(request.queue_id.as_str())
        .bind(&request.name)
        .bind(request.description.as_deref())
        .bind(request.match_type.as_str())
        .bind(request.match_operator.as_str())
        .bind(&request.match_value)
        .bind(sort_order)
        .bind(request.auto_assign_agent_id.as_ref().map(AgentId::as_str))
        .bind(request.priority_override.map(|p| p.as_str()))
        .bind(request.tags_to_add.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(
            rule_id = %id,
            company_id = %request.company_id,
            name = %request.name,
            sort_order,
            "Created routing rule"
        );
        self.require_rule(&id).await
    }

    /// Fetch a rule in any state
    pub async fn get_rule(&self, rule_id: &RuleId) -> Result<Option<RoutingRule>> {
        let row = sqlx::query_as::<_, RuleRow>(&format!("{} WHERE r.id = ?", RULE_SELECT))
            .bind(rule_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(RoutingRule::try_from).transpose()
    }

    /// Active, non-deleted rules of a company in evaluation order.
    ///
    /// Rows whose match type or operator is not recognized are skipped: such a
    /// rule can never match.
    pub async fn list_rules(&self, company_id: &CompanyId) -> Result<Vec<RoutingRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "{} WHERE r.company_id = ? AND r.is_active = 1 AND r.is_deleted = 0
             ORDER BY r.sort_order ASC, r.created_at ASC, r.id ASC",
            RULE_SELECT
        ))
        .bind(company_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(convert_rows(rows))
    }

    /// Every non-deleted rule of a company, including inactive ones
    pub async fn list_company_rules(&self, company_id: &CompanyId) -> Result<Vec<RoutingRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "{} WHERE r.company_id = ? AND r.is_deleted = 0
             ORDER BY r.sort_order ASC, r.created_at ASC, r.id ASC",
            RULE_SELECT
        ))
        .bind(company_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(convert_rows(rows))
    }

    pub async fn update_rule(&self, rule_id: &RuleId, request: UpdateRuleRequest) -> Result<RoutingRule> {
        let mut rule = self
            .get_rule(rule_id)
            .await?
            .filter(|rule| !rule.is_deleted)
            .ok_or_else(|| RoutingError::not_found(format!("routing rule {}", rule_id)))?;

        if let Some(queue_id) = request.queue_id {
            rule.queue = QueueRef {
                id: queue_id,
                name: String::new(),
            };
        }
        if let Some(name) = request.name {
            rule.name = name;
        }
        if let Some(description) = request.description {
            rule.description = description;
        }
        if let Some(match_type) = request.match_type {
            rule.match_type = match_type;
        }
        if let Some(match_operator) = request.match_operator {
            rule.match_operator = match_operator;
        }
        if let Some(match_value) = request.match_value {
            rule.match_value = match_value;
        }
        if let Some(sort_order) = request.sort_order {
            rule.sort_order = sort_order;
        }
        if let Some(agent) = request.auto_assign_agent_id {
            rule.auto_assign_agent_id = agent;
        }
        if let Some(priority) = request.priority_override {
            rule.priority_override = priority;
        }
        if let Some(tags) = request.tags_to_add {
            rule.tags_to_add = tags;
        }

        sqlx::query(
            "UPDATE routing_rules SET queue_id = ?, name = ?, description = ?, match_type = ?, match_operator = ?,
                match_value = ?, sort_order = ?, auto_assign_agent_id = ?, priority_override = ?, tags_to_add = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(rule.queue.id.as_str())
        .bind(&rule.name)
        .bind(rule.description.as_deref())
        .bind(rule.match_type.as_str())
        .bind(rule.match_operator.as_str())
        .bind(&rule.match_value)
        .bind(rule.sort_order)
        .bind(rule.auto_assign_agent_id.as_ref().map(AgentId::as_str))
        .bind(rule.priority_override.map(|p| p.as_str()))
        .bind(rule.tags_to_add.as_deref())
        .bind(Utc::now())
        .bind(rule_id.as_str())
        .execute(&self.pool)
        .await?;

        debug!(rule_id = %rule_id, "Updated routing rule");
        self.require_rule(rule_id).await
    }

    /// Renumber a company's rules so they evaluate in the given order.
    ///
    /// Applied atomically: if any id is unknown, deleted or belongs to another
    /// company, nothing changes.
    pub async fn reorder_rules(&self, company_id: &CompanyId, ordered: &[RuleId]) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for (position, rule_id) in ordered.iter().enumerate() {
            let updated = sqlx::query(
                "UPDATE routing_rules SET sort_order = ?, updated_at = ?
                 WHERE id = ? AND company_id = ? AND is_deleted = 0",
            )
            .bind(position as i64 + 1)
            .bind(now)
            .bind(rule_id.as_str())
            .bind(company_id.as_str())
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(RoutingError::not_found(format!(
                    "routing rule {} for company {}",
                    rule_id, company_id
                )));
            }
        }

        tx.commit().await?;
        info!(company_id = %company_id, rule_count = ordered.len(), "Reordered routing rules");
        Ok(())
    }

    pub async fn set_rule_active(&self, rule_id: &RuleId, active: bool) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE routing_rules SET is_active = ?, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(active)
        .bind(Utc::now())
        .bind(rule_id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("routing rule {}", rule_id)));
        }
        debug!(rule_id = %rule_id, active, "Changed routing rule state");
        Ok(())
    }

    pub async fn soft_delete_rule(&self, rule_id: &RuleId) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE routing_rules SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(Utc::now())
        .bind(rule_id.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RoutingError::not_found(format!("routing rule {}", rule_id)));
        }
        info!(rule_id = %rule_id, "Soft-deleted routing rule");
        Ok(())
    }

    async fn require_rule(&self, rule_id: &RuleId) -> Result<RoutingRule> {
        self.get_rule(rule_id)
            .await?
            .ok_or_else(|| RoutingError::internal(format!("routing rule {} missing after write", rule_id)))
    }
}

fn convert_rows(rows: Vec<RuleRow>) -> Vec<RoutingRule> {
    rows.into_iter()
        .filter_map(|row| {
            let rule_id = row.id.clone();
            match RoutingRule::try_from(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(rule_id = %rule_id, error = %e, "Skipping routing rule that can never match");
                    None
                }
            }
        })
        .collect()
}
