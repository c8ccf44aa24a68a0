//! Typed identifiers for every dialer entity.
//!
//! Each id is a newtype over a time-ordered UUID so a `CellId` cannot be
//! passed where an `AssignmentId` is expected. The macro below keeps the six
//! near-identical wrappers from drifting out of sync.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a new, time-ordered id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Borrow the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, ":")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }
    };
}

entity_id!(ProjectId, "project");
entity_id!(SchemeId, "scheme");
entity_id!(CellId, "cell");
entity_id!(SampleId, "sample");
entity_id!(AssignmentId, "assignment");
entity_id!(InterviewId, "interview");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_every_id_kind() {
        let project = ProjectId::new();
        assert_eq!(project, project.to_string().parse().unwrap());

        let cell = CellId::new();
        assert_eq!(cell, cell.to_string().parse().unwrap());

        let assignment = AssignmentId::new();
        assert_eq!(assignment, assignment.to_string().parse().unwrap());
    }

    #[test]
    fn test_distinct_prefixes() {
        let cell = CellId::new();
        let assignment = AssignmentId::new();
        assert!(cell.to_string().starts_with("cell:"));
        assert!(assignment.to_string().starts_with("assignment:"));
    }
}
