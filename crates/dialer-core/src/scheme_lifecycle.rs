//! Scheme lifecycle: publish/archive transitions, cell upserts, and
//! the scheme-selection algorithm the Reservation Engine opens with.

use std::collections::BTreeMap;

use chrono::Utc;
use dialer_common::{DialerError, DialerResult};
use sqlx::{PgPool, Postgres, Transaction};

use crate::ids::{ProjectId, SchemeId};
use crate::lifecycle::Actor;
use crate::model::cell::QuotaCell;
use crate::model::scheme::{OverflowPolicy, QuotaScheme, SchemeStatus};
use crate::repository::SchemeRepository;
use crate::validation::{CellValidator, ValidationConfig};

/// Runs every cell through `CellValidator`, collecting every malformed
/// field across every cell (not just within one cell) before reporting,
/// matching `BulkUpsertCells`' collect-all contract.
fn validate_cells(cells: &[QuotaCell], policy: OverflowPolicy) -> DialerResult<()> {
    let validator = CellValidator::new(ValidationConfig::collect_all());
    let mut messages = Vec::new();
    for cell in cells {
        if let Err(err) = validator.validate(cell.target, cell.soft_cap, cell.weight, &cell.selector, policy) {
            match err {
                DialerError::Validation(msg) => messages.push(msg),
                DialerError::MultipleValidation(msgs) => messages.extend(msgs),
                other => return Err(other),
            }
        }
    }
    match messages.len() {
        0 => Ok(()),
        1 => Err(DialerError::Validation(messages.remove(0))),
        _ => Err(DialerError::MultipleValidation(messages)),
    }
}

/// Per-dimension-value roll-up for `SchemeStats.by_dimension`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DimensionTotals {
    pub target: u64,
    pub achieved: u64,
    pub in_progress: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemeStats {
    pub target_total: u64,
    pub achieved_total: u64,
    pub in_progress_total: u64,
    pub remaining_total: u64,
    /// dimension key -> value (or "Unspecified") -> totals.
    pub by_dimension: BTreeMap<String, BTreeMap<String, DimensionTotals>>,
}

/// Selects the scheme a reservation should draw from: `scheme_id` if
/// given (must be published and belong to the project), else the
/// project's default published scheme, else any published scheme ranked
/// by `priority desc, published_at desc`. Row-locks the scheme it returns.
pub async fn pick_for_project<R: SchemeRepository>(
    repository: &R,
    tx: &mut Transaction<'_, Postgres>,
    project_id: ProjectId,
    scheme_id: Option<SchemeId>,
) -> DialerResult<QuotaScheme> {
    repository.pick_for_project(tx, project_id, scheme_id).await
}

/// `draft -> published`. Stamps `published_at` on first publication,
/// applies `is_default` (when given) before the default-uniqueness
/// sweep, and runs that sweep whenever the scheme is (or becomes) the
/// project's default.
pub async fn publish<R: SchemeRepository>(
    repository: &R,
    pool: &PgPool,
    scheme_id: SchemeId,
    is_default: Option<bool>,
    actor: Actor,
) -> DialerResult<QuotaScheme> {
    let mut tx = pool.begin().await.map_err(DialerError::from)?;
    let scheme = repository
        .get_scheme(scheme_id)
        .await?
        .ok_or_else(|| DialerError::NotFound(scheme_id.to_string()))?;

    if !scheme.status.can_transition_to(SchemeStatus::Published) {
        return Err(DialerError::Validation(format!(
            "scheme {scheme_id} cannot move from {:?} to published",
            scheme.status
        )));
    }
    tracing::info!(%scheme_id, ?actor, "publishing scheme");

    let is_default = is_default.unwrap_or(scheme.is_default);
    let published_at = scheme.published_at.or(Some(Utc::now()));
    repository
        .update_scheme_status(&mut tx, scheme_id, SchemeStatus::Published, is_default, published_at)
        .await?;

    if is_default {
        repository.clear_other_defaults(&mut tx, scheme.project_id, scheme_id).await?;
    }

    tx.commit().await.map_err(DialerError::from)?;
    repository
        .get_scheme(scheme_id)
        .await?
        .ok_or_else(|| DialerError::Internal("scheme vanished after publish".to_string()))
}

/// `draft -> archived` or `published -> archived`. Clears `is_default`.
pub async fn archive<R: SchemeRepository>(
    repository: &R,
    pool: &PgPool,
    scheme_id: SchemeId,
    actor: Actor,
) -> DialerResult<QuotaScheme> {
    let mut tx = pool.begin().await.map_err(DialerError::from)?;
    let scheme = repository
        .get_scheme(scheme_id)
        .await?
        .ok_or_else(|| DialerError::NotFound(scheme_id.to_string()))?;

    if !scheme.status.can_transition_to(SchemeStatus::Archived) {
        return Err(DialerError::Validation(format!(
            "scheme {scheme_id} cannot move from {:?} to archived",
            scheme.status
        )));
    }
    tracing::info!(%scheme_id, ?actor, "archiving scheme");

    repository
        .update_scheme_status(&mut tx, scheme_id, SchemeStatus::Archived, false, scheme.published_at)
        .await?;

    tx.commit().await.map_err(DialerError::from)?;
    repository
        .get_scheme(scheme_id)
        .await?
        .ok_or_else(|| DialerError::Internal("scheme vanished after archive".to_string()))
}

/// Bulk-upserts a draft scheme's cells. Rejects the call outright if the
/// scheme isn't `draft`.
pub async fn bulk_upsert_cells<R: SchemeRepository>(
    repository: &R,
    pool: &PgPool,
    scheme_id: SchemeId,
    cells: Vec<QuotaCell>,
) -> DialerResult<Vec<QuotaCell>> {
    let scheme = repository
        .get_scheme(scheme_id)
        .await?
        .ok_or_else(|| DialerError::NotFound(scheme_id.to_string()))?;
    if !scheme.can_edit() {
        return Err(DialerError::Validation(format!(
            "scheme {scheme_id} is not draft; cells cannot be edited"
        )));
    }
    validate_cells(&cells, scheme.overflow_policy)?;

    let mut tx = pool.begin().await.map_err(DialerError::from)?;
    let upserted = repository.upsert_cells(&mut tx, scheme_id, cells).await?;
    tx.commit().await.map_err(DialerError::from)?;
    Ok(upserted)
}

/// Aggregates a scheme's cells into totals and per-dimension roll-ups.
/// A cell whose selector omits a dimension key contributes to that
/// dimension's `"Unspecified"` bucket.
pub async fn scheme_stats<R: SchemeRepository>(repository: &R, scheme: &QuotaScheme) -> DialerResult<SchemeStats> {
    let cells = repository.list_cells_for_scheme(scheme.id).await?;

    let mut stats = SchemeStats {
        target_total: 0,
        achieved_total: 0,
        in_progress_total: 0,
        remaining_total: 0,
        by_dimension: BTreeMap::new(),
    };

    for dimension in &scheme.dimensions {
        stats.by_dimension.entry(dimension.key.clone()).or_default();
    }

    for cell in &cells {
        let target = cell.target as u64;
        let achieved = cell.achieved as u64;
        let in_progress = cell.in_progress as u64;
        let remaining = cell.remaining_slots(scheme.overflow_policy).map(|r| r as u64).unwrap_or(0);

        stats.target_total += target;
        stats.achieved_total += achieved;
        stats.in_progress_total += in_progress;
        stats.remaining_total += remaining;

        for dimension in &scheme.dimensions {
            let value_key = match cell.selector.get(&dimension.key) {
                Some(crate::selector::SelectorValue::Scalar(v)) => v.clone(),
                Some(crate::selector::SelectorValue::List(values)) => values.join(","),
                None => "Unspecified".to_string(),
            };
            let bucket = stats.by_dimension.entry(dimension.key.clone()).or_default().entry(value_key).or_default();
            bucket.target += target;
            bucket.achieved += achieved;
            bucket.in_progress += in_progress;
            bucket.remaining += remaining;
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_totals_default_is_zero() {
        let totals = DimensionTotals::default();
        assert_eq!(totals.target, 0);
        assert_eq!(totals.remaining, 0);
    }

    #[test]
    fn test_validate_cells_passes_clean_batch() {
        let cells = vec![
            QuotaCell::new(SchemeId::new(), crate::selector::Selector::new(), 10),
            QuotaCell::new(SchemeId::new(), crate::selector::Selector::new(), 20),
        ];
        assert!(validate_cells(&cells, OverflowPolicy::Strict).is_ok());
    }

    #[test]
    fn test_validate_cells_rejects_non_positive_weight() {
        let mut bad = QuotaCell::new(SchemeId::new(), crate::selector::Selector::new(), 10);
        bad.weight = 0.0;
        let cells = vec![bad];
        assert!(matches!(
            validate_cells(&cells, OverflowPolicy::Strict),
            Err(DialerError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_cells_collects_errors_across_multiple_cells() {
        let mut bad_weight = QuotaCell::new(SchemeId::new(), crate::selector::Selector::new(), 10);
        bad_weight.weight = -1.0;
        let mut bad_soft_cap = QuotaCell::new(SchemeId::new(), crate::selector::Selector::new(), 10);
        bad_soft_cap.soft_cap = Some(1);
        let cells = vec![bad_weight, bad_soft_cap];
        let result = validate_cells(&cells, OverflowPolicy::Soft);
        assert!(matches!(result, Err(DialerError::MultipleValidation(errors)) if errors.len() == 2));
    }
}
