//! Project: the container entity schemes, cells, samples and assignments
//! all belong to.

use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Archived,
}

impl ProjectStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProjectStatus::Active),
            "paused" => Some(ProjectStatus::Paused),
            "archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

/// A survey-collection project: the container for schemes, samples and
/// assignments. Administrative fields (owner, membership, panel
/// permissions) live in the outer shell; the core only needs identity and
/// status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub code: String,
    pub name: String,
    pub status: ProjectStatus,
}

impl Project {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProjectId::new(),
            code: code.into(),
            name: name.into(),
            status: ProjectStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ProjectStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_is_active() {
        let project = Project::new("P1", "Pilot study");
        assert!(project.is_active());
    }

    #[test]
    fn test_status_db_roundtrip() {
        for status in [ProjectStatus::Active, ProjectStatus::Paused, ProjectStatus::Archived] {
            let s = status.as_db_str();
            assert_eq!(ProjectStatus::from_db_str(s), Some(status));
        }
    }
}
