//! Reservation engine: the critical section. `reserve_next` runs the
//! whole eight-step algorithm as one logical transaction — TTL sweep,
//! actor-uniqueness check, scheme pick, cell ranking, sample claim,
//! assignment + interview creation, counter update.

use chrono::{Duration as ChronoDuration, Utc};
use dialer_common::{DialerError, DialerResult, UserId};
use sqlx::{PgPool, Postgres, Transaction};

use crate::ids::{AssignmentId, ProjectId, SchemeId};
use crate::model::assignment::DialerAssignment;
use crate::model::cell::QuotaCell;
use crate::model::scheme::OverflowPolicy;
use crate::repository::{AssignmentRepository, InterviewRepository, SampleRepository, SchemeRepository};
use crate::scheme_lifecycle;
use crate::sweeper;

/// Rank cells by remaining capacity: `weighted` schemes sort by
/// descending `weighted_score`, everything else by descending
/// `remaining_slots` (unlimited cells first); ties break on `cell.id asc`.
/// Cells without capacity are dropped.
pub fn rank_cells(mut cells: Vec<QuotaCell>, policy: OverflowPolicy) -> Vec<QuotaCell> {
    cells.retain(|cell| cell.has_capacity(policy));
    match policy {
        OverflowPolicy::Weighted => {
            cells.sort_by(|a, b| {
                b.weighted_score(policy)
                    .partial_cmp(&a.weighted_score(policy))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        _ => {
            cells.sort_by(|a, b| {
                let a_key = a.remaining_slots(policy).map(|r| r as i64).unwrap_or(i64::MAX);
                let b_key = b.remaining_slots(policy).map(|r| r as i64).unwrap_or(i64::MAX);
                b_key.cmp(&a_key).then_with(|| a.id.cmp(&b.id))
            });
        }
    }
    cells
}

#[allow(clippy::too_many_arguments)]
pub async fn reserve_next<A, S, Sm, I>(
    assignment_repo: &A,
    sample_repo: &S,
    scheme_repo: &Sm,
    interview_repo: &I,
    pool: &PgPool,
    project_id: ProjectId,
    interviewer_id: UserId,
    ttl_seconds: i64,
    scheme_id: Option<SchemeId>,
) -> DialerResult<DialerAssignment>
where
    A: AssignmentRepository,
    S: SampleRepository,
    Sm: SchemeRepository,
    I: InterviewRepository,
{
    // Step 1: release anything this project's clock has already expired,
    // including any of this interviewer's own stale reservations.
    sweeper::sweep_expired(assignment_repo, sample_repo, scheme_repo, interview_repo, pool, Some(project_id)).await?;

    let now = Utc::now();
    let mut tx = pool.begin().await.map_err(DialerError::from)?;

    // Step 2: actor uniqueness — an interviewer may hold at most one
    // active reservation at a time.
    if assignment_repo
        .lock_active_for_interviewer(&mut tx, interviewer_id, now)
        .await?
        .is_some()
    {
        return Err(DialerError::AlreadyReserved(interviewer_id.to_string()));
    }

    // Step 3: scheme selection.
    let scheme = scheme_lifecycle::pick_for_project(scheme_repo, &mut tx, project_id, scheme_id).await?;

    // Step 4: cell ranking.
    let locked_cells = scheme_repo.lock_cells_skip_locked(&mut tx, scheme.id).await?;
    let ranked = rank_cells(locked_cells, scheme.overflow_policy);
    if ranked.is_empty() {
        return Err(DialerError::NoCapacity);
    }

    // Step 5-7: claim loop.
    for cell in &ranked {
        let Some(sample) = sample_repo
            .claim_next_sample(&mut tx, project_id, cell.id, interviewer_id, now)
            .await?
        else {
            continue;
        };

        let assignment = DialerAssignment {
            id: AssignmentId::new(),
            project_id,
            scheme_id: scheme.id,
            cell_id: cell.id,
            interviewer_id,
            sample_id: sample.id,
            status: crate::model::assignment::AssignmentStatus::Reserved,
            reserved_at: now,
            expires_at: now + ChronoDuration::seconds(ttl_seconds),
            completed_at: None,
            outcome_code: None,
            meta: serde_json::json!({}),
        };
        assignment_repo.insert_assignment(&mut tx, &assignment).await?;
        interview_repo.get_or_create(&mut tx, assignment.id).await?;
        scheme_repo.apply_counter_delta(&mut tx, cell.id, 1, 1, 0).await?;

        tx.commit().await.map_err(DialerError::from)?;
        return Ok(assignment);
    }

    // Step 8: every ranked cell was exhausted before we could claim.
    Err(DialerError::NoSample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SchemeId;
    use crate::selector::Selector;

    fn cell(target: u32, weight: f64) -> QuotaCell {
        let mut cell = QuotaCell::new(SchemeId::new(), Selector::new(), target);
        cell.weight = weight;
        cell
    }

    #[test]
    fn test_rank_cells_drops_full_cells() {
        let mut full = cell(1, 1.0);
        full.achieved = 1;
        let open = cell(1, 1.0);
        let ranked = rank_cells(vec![full, open.clone()], OverflowPolicy::Strict);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, open.id);
    }

    #[test]
    fn test_rank_cells_unlimited_first_for_remaining_slots_policy() {
        let limited = cell(5, 1.0);
        let unlimited = cell(0, 1.0);
        let ranked = rank_cells(vec![limited.clone(), unlimited.clone()], OverflowPolicy::Strict);
        assert_eq!(ranked[0].id, unlimited.id);
    }

    #[test]
    fn test_rank_cells_weighted_orders_by_score_descending() {
        let low = cell(10, 1.0);
        let high = cell(10, 5.0);
        let ranked = rank_cells(vec![low.clone(), high.clone()], OverflowPolicy::Weighted);
        assert_eq!(ranked[0].id, high.id);
    }
}
