//! Assignment lifecycle: the four terminal transitions a reserved
//! assignment can take, each paired with its cell-counter delta, sample
//! effect, and interview effect.

use chrono::{DateTime, Utc};
use dialer_common::{DialerError, DialerResult};
use sqlx::{Postgres, Transaction};

use crate::ids::AssignmentId;
use crate::model::assignment::{AssignmentStatus, DialerAssignment};
use crate::repository::{AssignmentRepository, InterviewRepository, SampleRepository, SchemeRepository};

async fn load_active<A: AssignmentRepository>(
    repository: &A,
    id: AssignmentId,
) -> DialerResult<Option<DialerAssignment>> {
    let assignment = repository
        .get_assignment(id)
        .await?
        .ok_or_else(|| DialerError::NotFound(id.to_string()))?;
    // Terminal transitions are idempotent no-ops: a caller that retries
    // complete()/fail()/cancel()/expire() on an already-terminal
    // assignment gets the existing state back, not an error.
    if assignment.status.is_terminal() {
        return Ok(None);
    }
    Ok(Some(assignment))
}

async fn apply_transition<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    tx: &mut Transaction<'_, Postgres>,
    assignment: &DialerAssignment,
    new_status: AssignmentStatus,
    now: DateTime<Utc>,
    outcome: Option<String>,
    meta_patch: Option<serde_json::Value>,
    achieved_delta: i64,
) -> DialerResult<()>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    let completed_at = matches!(new_status, AssignmentStatus::Completed).then_some(now);
    assignment_repo
        .update_status(tx, assignment.id, new_status, completed_at, outcome.clone(), meta_patch)
        .await?;

    scheme_repo
        .apply_counter_delta(tx, assignment.cell_id, -1, -1, achieved_delta)
        .await?;

    match new_status {
        AssignmentStatus::Completed => {
            sample_repo.mark_completed(tx, assignment.sample_id).await?;
            let mut interview = interview_repo.get_or_create(tx, assignment.id).await?;
            interview.mark_completed(outcome, assignment.reserved_at, now);
            interview_repo.update(tx, &interview).await?;
        }
        _ => {
            sample_repo.mark_available(tx, assignment.sample_id).await?;
            interview_repo.delete_for_assignment(tx, assignment.id).await?;
        }
    }

    Ok(())
}

/// `reserved -> completed`: cell gains one `achieved`, sample is marked
/// completed, interview is upserted as completed.
pub async fn complete<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    tx: &mut Transaction<'_, Postgres>,
    id: AssignmentId,
    outcome_code: Option<String>,
    meta_patch: Option<serde_json::Value>,
) -> DialerResult<()>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    let Some(assignment) = load_active(assignment_repo, id).await? else {
        return Ok(());
    };
    apply_transition(
        assignment_repo,
        sample_repo,
        scheme_repo,
        interview_repo,
        tx,
        &assignment,
        AssignmentStatus::Completed,
        Utc::now(),
        outcome_code,
        meta_patch,
        1,
    )
    .await
}

/// `reserved -> failed`: sample returns to the pool, interview is dropped.
pub async fn fail<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    tx: &mut Transaction<'_, Postgres>,
    id: AssignmentId,
    outcome_code: Option<String>,
    meta_patch: Option<serde_json::Value>,
) -> DialerResult<()>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    let Some(assignment) = load_active(assignment_repo, id).await? else {
        return Ok(());
    };
    apply_transition(
        assignment_repo,
        sample_repo,
        scheme_repo,
        interview_repo,
        tx,
        &assignment,
        AssignmentStatus::Failed,
        Utc::now(),
        outcome_code,
        meta_patch,
        0,
    )
    .await
}

/// `reserved -> cancelled`: sample returns to the pool, interview is dropped.
pub async fn cancel<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    tx: &mut Transaction<'_, Postgres>,
    id: AssignmentId,
    meta_patch: Option<serde_json::Value>,
) -> DialerResult<()>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    let Some(assignment) = load_active(assignment_repo, id).await? else {
        return Ok(());
    };
    apply_transition(
        assignment_repo,
        sample_repo,
        scheme_repo,
        interview_repo,
        tx,
        &assignment,
        AssignmentStatus::Cancelled,
        Utc::now(),
        None,
        meta_patch,
        0,
    )
    .await
}

/// `reserved -> expired`: same effect as cancel, triggered by the TTL
/// sweeper rather than an interviewer action.
pub async fn expire<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    tx: &mut Transaction<'_, Postgres>,
    id: AssignmentId,
    now: DateTime<Utc>,
) -> DialerResult<()>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    let Some(assignment) = load_active(assignment_repo, id).await? else {
        return Ok(());
    };
    apply_transition(
        assignment_repo,
        sample_repo,
        scheme_repo,
        interview_repo,
        tx,
        &assignment,
        AssignmentStatus::Expired,
        now,
        None,
        None,
        0,
    )
    .await
}
