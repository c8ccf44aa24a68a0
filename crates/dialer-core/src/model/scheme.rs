//! QuotaScheme: a versioned plan of cells for a project.

use chrono::{DateTime, Utc};
use dialer_common::UserId;
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, SchemeId};

/// `draft ──publish──▶ published ──archive──▶ archived`, and
/// `draft ──archive──▶ archived`. Only `draft` schemes accept cell edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeStatus {
    Draft,
    Published,
    Archived,
}

impl SchemeStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SchemeStatus::Draft => "draft",
            SchemeStatus::Published => "published",
            SchemeStatus::Archived => "archived",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SchemeStatus::Draft),
            "published" => Some(SchemeStatus::Published),
            "archived" => Some(SchemeStatus::Archived),
            _ => None,
        }
    }

    /// Whether `self -> to` is a legal move in the publication state machine.
    pub fn can_transition_to(&self, to: SchemeStatus) -> bool {
        matches!(
            (self, to),
            (SchemeStatus::Draft, SchemeStatus::Published)
                | (SchemeStatus::Draft, SchemeStatus::Archived)
                | (SchemeStatus::Published, SchemeStatus::Archived)
        )
    }
}

/// Overflow policy governing how a scheme's cells compute capacity and
/// ranking. `soft` and `weighted` share `capacity_limit` (both honor
/// `soft_cap`); they differ only in cell ranking (see `crate::model::cell`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    Strict,
    Soft,
    Weighted,
}

impl OverflowPolicy {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            OverflowPolicy::Strict => "strict",
            OverflowPolicy::Soft => "soft",
            OverflowPolicy::Weighted => "weighted",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(OverflowPolicy::Strict),
            "soft" => Some(OverflowPolicy::Soft),
            "weighted" => Some(OverflowPolicy::Weighted),
            _ => None,
        }
    }
}

/// One dimension a scheme's cells are broken down by (e.g. `gender`, with
/// the values it's expected to take).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub key: String,
    pub values: Option<Vec<String>>,
}

/// A versioned plan of cells for a project. At most one `is_default`
/// scheme per project may be `published` at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaScheme {
    pub id: SchemeId,
    pub project_id: ProjectId,
    pub name: String,
    pub version: i32,
    pub status: SchemeStatus,
    pub dimensions: Vec<Dimension>,
    pub overflow_policy: OverflowPolicy,
    pub priority: i32,
    pub is_default: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
}

impl QuotaScheme {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        overflow_policy: OverflowPolicy,
        created_by: UserId,
    ) -> Self {
        Self {
            id: SchemeId::new(),
            project_id,
            name: name.into(),
            version: 1,
            status: SchemeStatus::Draft,
            dimensions: Vec::new(),
            overflow_policy,
            priority: 0,
            is_default: false,
            published_at: None,
            created_by,
        }
    }

    /// Only `draft` schemes accept cell edits and status mutations to
    /// fields other than `status` itself.
    pub fn can_edit(&self) -> bool {
        matches!(self.status, SchemeStatus::Draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scheme_is_draft() {
        let scheme = QuotaScheme::new(ProjectId::new(), "v1", OverflowPolicy::Strict, UserId::new());
        assert_eq!(scheme.status, SchemeStatus::Draft);
        assert!(scheme.can_edit());
        assert!(scheme.published_at.is_none());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(SchemeStatus::Draft.can_transition_to(SchemeStatus::Published));
        assert!(SchemeStatus::Draft.can_transition_to(SchemeStatus::Archived));
        assert!(SchemeStatus::Published.can_transition_to(SchemeStatus::Archived));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!SchemeStatus::Archived.can_transition_to(SchemeStatus::Published));
        assert!(!SchemeStatus::Published.can_transition_to(SchemeStatus::Draft));
    }

    #[test]
    fn test_overflow_policy_db_roundtrip() {
        for policy in [OverflowPolicy::Strict, OverflowPolicy::Soft, OverflowPolicy::Weighted] {
            assert_eq!(OverflowPolicy::from_db_str(policy.as_db_str()), Some(policy));
        }
    }
}
