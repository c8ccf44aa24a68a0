//! Identity types shared across the dialer core.
//!
//! Interviewers and scheme authors are platform users the core receives
//! by reference; it never owns or CRUDs them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a human user (interviewer, scheme author, …).
///
/// # Example
/// ```
/// use dialer_common::UserId;
///
/// let user = UserId::new();
/// println!("User ID: {}", user);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a user ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid_str = s.strip_prefix("user:").unwrap_or(s);
        Ok(Self(Uuid::parse_str(uuid_str)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip() {
        let user = UserId::new();
        let s = user.to_string();
        let parsed: UserId = s.parse().unwrap();
        assert_eq!(user, parsed);
    }
}
