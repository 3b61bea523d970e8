//! Core types for the routing core

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoutingError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Tenant identifier. Every rule, queue and mailbox belongs to one company.
    CompanyId
);
string_id!(
    /// Queue identifier
    QueueId
);
string_id!(
    /// Routing rule identifier
    RuleId
);
string_id!(
    /// Support agent identifier
    AgentId
);
string_id!(
    /// Mailbox configuration identifier
    MailboxId
);

/// Which field of a [`RoutingContext`] a rule inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    SenderDomain,
    SubjectKeyword,
    BodyKeyword,
    IssueType,
    System,
    RequesterEmail,
    /// Recognized but never matches: the context carries no company code.
    CompanyCode,
    Tag,
}

/// How a rule's stored value is compared against the field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    /// `match_value` is a comma separated list of alternatives
    In,
}

/// Ticket priority a rule may force onto a routed ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl MatchType {
    pub const ALL: [MatchType; 8] = [
        MatchType::SenderDomain,
        MatchType::SubjectKeyword,
        MatchType::BodyKeyword,
        MatchType::IssueType,
        MatchType::System,
        MatchType::RequesterEmail,
        MatchType::CompanyCode,
        MatchType::Tag,
    ];

    /// Storage encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::SenderDomain => "SenderDomain",
            MatchType::SubjectKeyword => "SubjectKeyword",
            MatchType::BodyKeyword => "BodyKeyword",
            MatchType::IssueType => "IssueType",
            MatchType::System => "System",
            MatchType::RequesterEmail => "RequesterEmail",
            MatchType::CompanyCode => "CompanyCode",
            MatchType::Tag => "Tag",
        }
    }
}

impl MatchOperator {
    pub const ALL: [MatchOperator; 6] = [
        MatchOperator::Equals,
        MatchOperator::Contains,
        MatchOperator::StartsWith,
        MatchOperator::EndsWith,
        MatchOperator::Regex,
        MatchOperator::In,
    ];

    /// Storage encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::Equals => "Equals",
            MatchOperator::Contains => "Contains",
            MatchOperator::StartsWith => "StartsWith",
            MatchOperator::EndsWith => "EndsWith",
            MatchOperator::Regex => "Regex",
            MatchOperator::In => "In",
        }
    }
}

impl TicketPriority {
    /// Storage encoding
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "Low",
            TicketPriority::Medium => "Medium",
            TicketPriority::High => "High",
            TicketPriority::Urgent => "Urgent",
        }
    }
}

impl FromStr for MatchType {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RoutingError::invalid_input(format!("unknown match type: {}", s)))
    }
}

impl FromStr for MatchOperator {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchOperator::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RoutingError::invalid_input(format!("unknown match operator: {}", s)))
    }
}

impl FromStr for TicketPriority {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            "urgent" => Ok(TicketPriority::Urgent),
            other => Err(RoutingError::invalid_input(format!("unknown priority: {}", other))),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue identity plus display name, as carried on rules and results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRef {
    pub id: QueueId,
    pub name: String,
}

/// Rule identity plus display name, recorded on a result for provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    pub id: RuleId,
    pub name: String,
}

/// A ticket queue owned by a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Queue {
    pub fn to_ref(&self) -> QueueRef {
        QueueRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Whether this queue may serve as its company's fallback
    pub fn is_usable_default(&self) -> bool {
        self.is_default && self.is_active && !self.is_deleted
    }
}

/// A company scoped predicate and the actions applied when it matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: RuleId,
    pub company_id: CompanyId,
    pub queue: QueueRef,
    pub name: String,
    pub description: Option<String>,
    pub match_type: MatchType,
    pub match_operator: MatchOperator,
    pub match_value: String,
    /// Evaluation priority, ascending
    pub sort_order: i64,
    pub is_active: bool,
    pub is_deleted: bool,
    pub auto_assign_agent_id: Option<AgentId>,
    pub priority_override: Option<TicketPriority>,
    /// Comma separated tags added to the ticket on match
    pub tags_to_add: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoutingRule {
    /// Whether the engine may evaluate this rule for `company_id`
    pub fn is_eligible_for(&self, company_id: &CompanyId) -> bool {
        self.is_active && !self.is_deleted && &self.company_id == company_id
    }

    pub fn to_ref(&self) -> RuleRef {
        RuleRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Snapshot of ticket attributes presented for a routing decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingContext {
    pub company_id: CompanyId,
    pub sender_domain: Option<String>,
    pub subject: String,
    pub body: String,
    pub issue_type: Option<String>,
    pub system: Option<String>,
    pub requester_email: Option<String>,
    pub tags: BTreeSet<String>,
}

impl RoutingContext {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            ..Default::default()
        }
    }

    pub fn with_sender_domain(mut self, domain: impl Into<String>) -> Self {
        self.sender_domain = Some(domain.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = Some(issue_type.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_requester_email(mut self, email: impl Into<String>) -> Self {
        self.requester_email = Some(email.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Decision produced by the routing engine.
///
/// When no rule matched and the company has no usable default queue, every
/// optional field is empty and `is_default_fallback` is `false`. That is the
/// same flag value a rule match produces, so callers deciding whether the
/// ticket was routed at all should check [`RoutingResult::is_unrouted`]
/// rather than the flag alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingResult {
    pub queue: Option<QueueRef>,
    pub auto_assign_agent_id: Option<AgentId>,
    pub priority_override: Option<TicketPriority>,
    pub tags_to_add: Vec<String>,
    pub matched_rule: Option<RuleRef>,
    pub is_default_fallback: bool,
}

impl RoutingResult {
    pub fn queue_id(&self) -> Option<&QueueId> {
        self.queue.as_ref().map(|q| &q.id)
    }

    pub fn matched_rule_id(&self) -> Option<&RuleId> {
        self.matched_rule.as_ref().map(|r| &r.id)
    }

    /// No rule matched and no default queue was available
    pub fn is_unrouted(&self) -> bool {
        self.queue.is_none() && self.matched_rule.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_storage_encoding() {
        for match_type in MatchType::ALL {
            assert_eq!(match_type.as_str().parse::<MatchType>().unwrap(), match_type);
        }
        for op in MatchOperator::ALL {
            assert_eq!(op.as_str().parse::<MatchOperator>().unwrap(), op);
        }
        assert_eq!("startswith".parse::<MatchOperator>().unwrap(), MatchOperator::StartsWith);
        assert!("Fuzzy".parse::<MatchOperator>().is_err());
        assert!("Department".parse::<MatchType>().is_err());
        assert_eq!("URGENT".parse::<TicketPriority>().unwrap(), TicketPriority::Urgent);
    }

    #[test]
    fn test_context_tags_are_a_set() {
        let ctx = RoutingContext::new(CompanyId::from("c1")).with_tags(["vip", "vip", "billing"]);
        assert_eq!(ctx.tags.len(), 2);
    }

    #[test]
    fn test_empty_result_is_unrouted() {
        let result = RoutingResult::default();
        assert!(result.is_unrouted());
        assert!(!result.is_default_fallback);
        assert!(result.tags_to_add.is_empty());
    }

    #[test]
    fn test_serde_shape() {
        let result = RoutingResult {
            queue: Some(QueueRef {
                id: QueueId::from("q1"),
                name: "Billing".to_string(),
            }),
            priority_override: Some(TicketPriority::High),
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["queue"]["id"], "q1");
        assert_eq!(json["priority_override"], "High");
        assert_eq!(json["tags_to_add"], serde_json::json!([]));
    }
}
