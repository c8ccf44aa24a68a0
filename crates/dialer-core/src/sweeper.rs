//! TTL sweeper: expires overdue reservations, releasing their
//! samples and counters back to the pool.

use chrono::Utc;
use dialer_common::DialerResult;
use sqlx::PgPool;
use tracing::warn;

use crate::assignment_lifecycle;
use crate::ids::ProjectId;
use crate::repository::{AssignmentRepository, InterviewRepository, SampleRepository, SchemeRepository};

/// Expires every `reserved` assignment past its TTL, optionally scoped to
/// one project. A per-row failure is logged at `warn` and skipped rather
/// than aborting the pass; the return value is always the count of rows
/// actually expired, never the count attempted.
pub async fn sweep_expired<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    pool: &PgPool,
    project_id: Option<ProjectId>,
) -> DialerResult<u64>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    let now = Utc::now();
    let overdue = assignment_repo.list_overdue(project_id, now).await?;

    let mut expired = 0u64;
    for assignment in overdue {
        let result: DialerResult<()> = async {
            let mut tx = pool.begin().await.map_err(dialer_common::DialerError::from)?;
            assignment_lifecycle::expire(
                assignment_repo,
                sample_repo,
                scheme_repo,
                interview_repo,
                &mut tx,
                assignment.id,
                now,
            )
            .await?;
            tx.commit().await.map_err(dialer_common::DialerError::from)?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => expired += 1,
            Err(e) => warn!(assignment_id = %assignment.id, error = %e, "failed to expire overdue assignment"),
        }
    }

    Ok(expired)
}

#[cfg(test)]
mod tests {
    // Exercised via dialer-integration-tests against a live pool; the
    // per-row continue-on-error behavior needs a multi-row fixture that
    // doesn't belong in a unit test.
}
