//! QuotaCell: one demographic bucket of a scheme, with its own target and
//! counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CellId;
use crate::ids::SchemeId;
use crate::model::scheme::OverflowPolicy;
use crate::selector::Selector;

/// One demographic bucket of a scheme. `in_progress` and `reserved` are an
/// accounting pair that must stay equal; `achieved` only grows on
/// assignment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaCell {
    pub id: CellId,
    pub scheme_id: SchemeId,
    pub selector: Selector,
    pub label: Option<String>,
    pub target: u32,
    pub soft_cap: Option<u32>,
    pub weight: f64,
    pub achieved: u32,
    pub in_progress: u32,
    pub reserved: u32,
    pub updated_at: DateTime<Utc>,
}

impl QuotaCell {
    pub fn new(scheme_id: SchemeId, selector: Selector, target: u32) -> Self {
        Self {
            id: CellId::new(),
            scheme_id,
            selector,
            label: None,
            target,
            soft_cap: None,
            weight: 1.0,
            achieved: 0,
            in_progress: 0,
            reserved: 0,
            updated_at: Utc::now(),
        }
    }

    /// `strict` caps at `target`; `soft`/`weighted` cap at `soft_cap` when
    /// set, else fall back to `target`; `target == 0` with no `soft_cap` is
    /// unlimited (`None`).
    pub fn capacity_limit(&self, policy: OverflowPolicy) -> Option<u32> {
        let limit = match policy {
            OverflowPolicy::Strict => self.target,
            OverflowPolicy::Soft | OverflowPolicy::Weighted => self.soft_cap.unwrap_or(self.target),
        };
        if limit == 0 && self.soft_cap.is_none() {
            None
        } else {
            Some(limit)
        }
    }

    /// `max(0, capacity_limit - (achieved + in_progress))`, or `None` when
    /// the cell is unlimited.
    pub fn remaining_slots(&self, policy: OverflowPolicy) -> Option<u32> {
        let limit = self.capacity_limit(policy)?;
        let committed = self.achieved + self.in_progress;
        Some(limit.saturating_sub(committed))
    }

    pub fn has_capacity(&self, policy: OverflowPolicy) -> bool {
        match self.remaining_slots(policy) {
            None => true,
            Some(remaining) => remaining > 0,
        }
    }

    /// `weight * remaining_slots`; unlimited cells score `+inf`.
    pub fn weighted_score(&self, policy: OverflowPolicy) -> f64 {
        match self.remaining_slots(policy) {
            None => f64::INFINITY,
            Some(remaining) => self.weight * remaining as f64,
        }
    }

    /// Non-transactional helper used by in-memory tests; the production
    /// path mutates counters via an atomic `UPDATE` in the repository, not
    /// by loading the struct, mutating it, and writing it back.
    pub fn increment_in_progress(&mut self) {
        self.in_progress += 1;
        self.reserved += 1;
    }

    pub fn decrement_in_progress(&mut self, completed: bool) {
        self.in_progress = self.in_progress.saturating_sub(1);
        self.reserved = self.reserved.saturating_sub(1);
        if completed {
            self.achieved += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(target: u32, soft_cap: Option<u32>, weight: f64) -> QuotaCell {
        let mut cell = QuotaCell::new(SchemeId::new(), Selector::new(), target);
        cell.soft_cap = soft_cap;
        cell.weight = weight;
        cell
    }

    #[test]
    fn test_strict_capacity_limit_is_target() {
        let cell = cell(10, Some(5), 1.0);
        assert_eq!(cell.capacity_limit(OverflowPolicy::Strict), Some(10));
    }

    #[test]
    fn test_soft_capacity_limit_prefers_soft_cap() {
        let cell = cell(10, Some(5), 1.0);
        assert_eq!(cell.capacity_limit(OverflowPolicy::Soft), Some(5));
        assert_eq!(cell.capacity_limit(OverflowPolicy::Weighted), Some(5));
    }

    #[test]
    fn test_soft_capacity_limit_falls_back_to_target() {
        let cell = cell(10, None, 1.0);
        assert_eq!(cell.capacity_limit(OverflowPolicy::Soft), Some(10));
    }

    #[test]
    fn test_zero_target_no_soft_cap_is_unlimited() {
        let cell = cell(0, None, 1.0);
        assert_eq!(cell.capacity_limit(OverflowPolicy::Strict), None);
        assert!(cell.has_capacity(OverflowPolicy::Strict));
        assert_eq!(cell.weighted_score(OverflowPolicy::Strict), f64::INFINITY);
    }

    #[test]
    fn test_zero_target_with_soft_cap_is_limited() {
        let cell = cell(0, Some(3), 1.0);
        assert_eq!(cell.capacity_limit(OverflowPolicy::Soft), Some(3));
    }

    #[test]
    fn test_remaining_slots_never_negative() {
        let mut cell = cell(2, None, 1.0);
        cell.achieved = 2;
        cell.in_progress = 2;
        assert_eq!(cell.remaining_slots(OverflowPolicy::Strict), Some(0));
        assert!(!cell.has_capacity(OverflowPolicy::Strict));
    }

    #[test]
    fn test_weighted_score() {
        let mut cell = cell(10, None, 2.0);
        cell.achieved = 4;
        assert_eq!(cell.weighted_score(OverflowPolicy::Weighted), 12.0);
    }

    #[test]
    fn test_increment_and_decrement_in_progress_pair() {
        let mut cell = cell(5, None, 1.0);
        cell.increment_in_progress();
        assert_eq!(cell.in_progress, cell.reserved);
        cell.decrement_in_progress(true);
        assert_eq!(cell.in_progress, 0);
        assert_eq!(cell.reserved, 0);
        assert_eq!(cell.achieved, 1);
    }
}
