//! SampleContact: a candidate phone number materialised from the bank,
//! pooled against one project and (once pooled) one quota cell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CellId, ProjectId, SampleId};
use crate::selector::{matches_selector, Selector};
use dialer_common::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Available,
    Claimed,
    Completed,
    Blocked,
}

impl SampleStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            SampleStatus::Available => "available",
            SampleStatus::Claimed => "claimed",
            SampleStatus::Completed => "completed",
            SampleStatus::Blocked => "blocked",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SampleStatus::Available),
            "claimed" => Some(SampleStatus::Claimed),
            "completed" => Some(SampleStatus::Completed),
            "blocked" => Some(SampleStatus::Blocked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleContact {
    pub id: SampleId,
    pub project_id: ProjectId,
    pub quota_cell_id: Option<CellId>,
    pub phone_id: Option<i64>,
    pub person_id: Option<i64>,
    pub phone_number: String,
    pub gender: Option<String>,
    pub age_band: Option<String>,
    pub province_code: Option<String>,
    pub city_code: Option<String>,
    pub attributes: serde_json::Value,
    pub status: SampleStatus,
    pub attempt_count: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub interviewer_id: Option<UserId>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl SampleContact {
    pub fn new(project_id: ProjectId, phone_number: impl Into<String>) -> Self {
        Self {
            id: SampleId::new(),
            project_id,
            quota_cell_id: None,
            phone_id: None,
            person_id: None,
            phone_number: phone_number.into(),
            gender: None,
            age_band: None,
            province_code: None,
            city_code: None,
            attributes: serde_json::json!({}),
            status: SampleStatus::Available,
            attempt_count: 0,
            last_attempt_at: None,
            interviewer_id: None,
            used_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Promoted columns read straight off the struct; everything else
    /// comes from `attributes`. Empty selector matches all.
    pub fn matches_selector(&self, selector: &Selector) -> bool {
        matches_selector(
            selector,
            |key| match key {
                "gender" => self.gender.clone(),
                "age_band" => self.age_band.clone(),
                "province_code" => self.province_code.clone(),
                "city_code" => self.city_code.clone(),
                _ => None,
            },
            &self.attributes,
        )
    }

    pub fn mark_available(&mut self) {
        self.status = SampleStatus::Available;
        self.interviewer_id = None;
    }

    pub fn mark_completed(&mut self) {
        self.status = SampleStatus::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sample_is_available() {
        let sample = SampleContact::new(ProjectId::new(), "+15551234567");
        assert_eq!(sample.status, SampleStatus::Available);
        assert_eq!(sample.attempt_count, 0);
    }

    #[test]
    fn test_matches_selector_promoted_and_free_form() {
        let mut sample = SampleContact::new(ProjectId::new(), "+15551234567");
        sample.gender = Some("female".to_string());
        sample.attributes = serde_json::json!({"education": "bachelor"});

        let mut selector = Selector::new();
        selector.insert(
            "gender".to_string(),
            crate::selector::SelectorValue::Scalar("female".to_string()),
        );
        selector.insert(
            "education".to_string(),
            crate::selector::SelectorValue::Scalar("bachelor".to_string()),
        );
        assert!(sample.matches_selector(&selector));
    }

    #[test]
    fn test_mark_available_clears_interviewer() {
        let mut sample = SampleContact::new(ProjectId::new(), "+15551234567");
        sample.interviewer_id = Some(UserId::new());
        sample.status = SampleStatus::Claimed;
        sample.mark_available();
        assert_eq!(sample.status, SampleStatus::Available);
        assert!(sample.interviewer_id.is_none());
    }
}
