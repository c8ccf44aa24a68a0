//! Interview: the survey-session record attached one-to-one to an
//! assignment, created eagerly alongside it by the Reservation Engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AssignmentId, InterviewId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: InterviewId,
    pub assignment_id: AssignmentId,
    pub start_form: Option<DateTime<Utc>>,
    pub end_form: Option<DateTime<Utc>>,
    pub status: InterviewStatus,
    pub outcome_code: Option<String>,
    pub meta: serde_json::Value,
}

impl Interview {
    pub fn new(assignment_id: AssignmentId) -> Self {
        Self {
            id: InterviewId::new(),
            assignment_id,
            start_form: None,
            end_form: None,
            status: InterviewStatus::NotStarted,
            outcome_code: None,
            meta: serde_json::json!({}),
        }
    }

    pub fn mark_in_progress(&mut self, assignment_reserved_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.status = InterviewStatus::InProgress;
        self.start_form.get_or_insert(assignment_reserved_at.min(now));
    }

    pub fn mark_completed(
        &mut self,
        outcome_code: Option<String>,
        assignment_reserved_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.status = InterviewStatus::Completed;
        self.start_form = Some(assignment_reserved_at);
        self.end_form = Some(now);
        self.outcome_code = outcome_code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_interview_not_started() {
        let interview = Interview::new(AssignmentId::new());
        assert_eq!(interview.status, InterviewStatus::NotStarted);
        assert!(interview.start_form.is_none());
    }

    #[test]
    fn test_mark_completed_sets_start_end_form_and_outcome() {
        let mut interview = Interview::new(AssignmentId::new());
        let reserved_at = Utc::now() - chrono::Duration::seconds(60);
        let now = Utc::now();
        interview.mark_completed(Some("COMP".to_string()), reserved_at, now);
        assert_eq!(interview.status, InterviewStatus::Completed);
        assert_eq!(interview.start_form, Some(reserved_at));
        assert_eq!(interview.end_form, Some(now));
        assert_eq!(interview.outcome_code.as_deref(), Some("COMP"));
    }
}
