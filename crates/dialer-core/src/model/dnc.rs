//! DoNotContactEntry: a read-mostly exclusion set of msisdns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoNotContactEntry {
    pub msisdn: String,
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl DoNotContactEntry {
    pub fn new(msisdn: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            msisdn: msisdn.into(),
            reason,
            added_at: Utc::now(),
        }
    }
}
