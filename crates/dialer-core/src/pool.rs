//! Sample Pool Builder: pulls bank candidates into a cell's sample
//! pool so the Reservation Engine has something to claim.

use dialer_common::{DialerError, DialerResult};
use sqlx::{Postgres, Transaction};

use crate::bank::BankGateway;
use crate::ids::ProjectId;
use crate::model::cell::QuotaCell;
use crate::model::sample::SampleContact;
use crate::repository::SampleRepository;
use crate::selector::{calculate_age, first_matching_band, SelectorPredicate};

const DEFAULT_MULTIPLIER: u32 = 5;
const MIN_FLOOR: u32 = 1000;

/// Effective fetch limit when the caller doesn't supply one: `cell.target`
/// times `multiplier`, floored at `MIN_FLOOR` so small (or zero-target,
/// unlimited) cells still get a workable pool.
fn effective_limit(cell: &QuotaCell, limit: Option<u32>, multiplier: u32) -> i64 {
    if let Some(limit) = limit {
        return limit.max(1) as i64;
    }
    cell.target.saturating_mul(multiplier).max(MIN_FLOOR) as i64
}

/// Pull bank candidates matching `cell.selector` into its sample pool.
///
/// Returns the number of rows the builder *attempted* to insert — not the
/// number that ended up new, since rows already pooled for the project are
/// filtered out by the bank gateway query itself and conflicting inserts
/// are silently ignored (see `SampleRepository::bulk_insert_samples`).
pub async fn build_pool<G: BankGateway, R: SampleRepository>(
    gateway: &G,
    repository: &R,
    tx: &mut Transaction<'_, Postgres>,
    project_id: ProjectId,
    cell: &QuotaCell,
    limit: Option<u32>,
    multiplier: Option<u32>,
) -> DialerResult<u64> {
    let predicate = SelectorPredicate::from_selector(&cell.selector);
    let fetch_limit = effective_limit(cell, limit, multiplier.unwrap_or(DEFAULT_MULTIPLIER));

    let candidates = gateway
        .candidates(project_id, &predicate, fetch_limit)
        .await
        .map_err(|e| match e {
            DialerError::BankUnavailable(msg) => DialerError::BankUnavailable(msg),
            other => other,
        })?;

    let today = SelectorPredicate::today();
    let mut samples = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut sample = SampleContact::new(project_id, candidate.msisdn.clone());
        sample.quota_cell_id = Some(cell.id);
        sample.phone_id = Some(candidate.phone_id);
        sample.person_id = Some(candidate.person_id);
        sample.gender = candidate.gender;
        sample.province_code = candidate.province_code;
        sample.city_code = candidate.city_code;
        if let Some(dob) = candidate.dob {
            let age = calculate_age(dob, today);
            sample.age_band = first_matching_band(&predicate.age_bands, age);
        }
        samples.push(sample);
    }

    repository.bulk_insert_samples(tx, &samples).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SchemeId;
    use crate::selector::Selector;

    fn cell_with(target: u32, soft_cap: Option<u32>) -> QuotaCell {
        let mut cell = QuotaCell::new(SchemeId::new(), Selector::new(), target);
        cell.soft_cap = soft_cap;
        cell
    }

    #[test]
    fn test_effective_limit_uses_explicit_limit() {
        let cell = cell_with(10, None);
        assert_eq!(effective_limit(&cell, Some(42), 5), 42);
    }

    #[test]
    fn test_effective_limit_scales_target_by_multiplier() {
        let cell = cell_with(300, None);
        assert_eq!(effective_limit(&cell, None, 5), 1500);
    }

    #[test]
    fn test_effective_limit_floors_small_cells() {
        let cell = cell_with(10, None);
        assert_eq!(effective_limit(&cell, None, 5), MIN_FLOOR as i64);
    }

    #[test]
    fn test_effective_limit_unlimited_cell_uses_floor() {
        let cell = cell_with(0, None);
        assert_eq!(effective_limit(&cell, None, 5), MIN_FLOOR as i64);
    }
}
