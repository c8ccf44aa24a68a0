//! The actor type threaded through scheme and assignment lifecycle calls,
//! so a transition can be attributed to a user, the system, or the TTL
//! sweeper in logs without the core depending on the outer shell's auth
//! types.

use dialer_common::UserId;
use serde::{Deserialize, Serialize};

/// Who triggered a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Actor {
    System,
    User { user_id: UserId },
    Sweeper,
}
