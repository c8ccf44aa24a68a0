//! DialerAssignment: a short-lived hold on one sample by one interviewer.

use chrono::{DateTime, Utc};
use dialer_common::UserId;
use serde::{Deserialize, Serialize};

use crate::ids::{AssignmentId, CellId, ProjectId, SampleId, SchemeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Reserved,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Reserved => "reserved",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Failed => "failed",
            AssignmentStatus::Expired => "expired",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "reserved" => Some(AssignmentStatus::Reserved),
            "completed" => Some(AssignmentStatus::Completed),
            "failed" => Some(AssignmentStatus::Failed),
            "expired" => Some(AssignmentStatus::Expired),
            "cancelled" => Some(AssignmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses are sticky: every further transition applied to
    /// them is a no-op, not an error.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AssignmentStatus::Reserved)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerAssignment {
    pub id: AssignmentId,
    pub project_id: ProjectId,
    pub scheme_id: SchemeId,
    pub cell_id: CellId,
    pub interviewer_id: UserId,
    pub sample_id: SampleId,
    pub status: AssignmentStatus,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome_code: Option<String>,
    pub meta: serde_json::Value,
}

impl DialerAssignment {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, AssignmentStatus::Reserved) && self.expires_at > now
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, AssignmentStatus::Reserved) && self.expires_at <= now
    }

    /// Shallow-merge `patch` into `meta`, used on terminal-action calls
    /// that supply extra metadata.
    pub fn merge_meta(&mut self, patch: serde_json::Value) {
        if let (Some(existing), Some(incoming)) = (self.meta.as_object_mut(), patch.as_object()) {
            for (k, v) in incoming {
                existing.insert(k.clone(), v.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!AssignmentStatus::Reserved.is_terminal());
        for status in [
            AssignmentStatus::Completed,
            AssignmentStatus::Failed,
            AssignmentStatus::Expired,
            AssignmentStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_merge_meta() {
        let mut assignment = DialerAssignment {
            id: AssignmentId::new(),
            project_id: ProjectId::new(),
            scheme_id: SchemeId::new(),
            cell_id: CellId::new(),
            interviewer_id: UserId::new(),
            sample_id: SampleId::new(),
            status: AssignmentStatus::Reserved,
            reserved_at: Utc::now(),
            expires_at: Utc::now(),
            completed_at: None,
            outcome_code: None,
            meta: serde_json::json!({"a": 1}),
        };
        assignment.merge_meta(serde_json::json!({"b": 2}));
        assert_eq!(assignment.meta, serde_json::json!({"a": 1, "b": 2}));
    }
}
