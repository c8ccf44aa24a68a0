//! Dialer service facade: the single entry point the rest of the survey
//! platform calls into. Wires the Store, Bank Gateway, and the five
//! algorithmic components together behind one struct so a caller never
//! has to assemble a transaction or a repository by hand.

use chrono::Utc;
use dialer_common::{DialerResult, UserId};
use sqlx::PgPool;
use tracing::instrument;

use crate::bank::{BankGateway, PgBankGateway};
use crate::ids::{AssignmentId, CellId, ProjectId, SchemeId};
use crate::lifecycle::Actor;
use crate::model::assignment::DialerAssignment;
use crate::model::cell::QuotaCell;
use crate::model::scheme::{OverflowPolicy, QuotaScheme};
use crate::pool;
use crate::repository::{
    PgAssignmentRepository, PgInterviewRepository, PgSampleRepository, PgSchemeRepository,
};
use crate::reservation;
use crate::scheme_lifecycle::{self, SchemeStats};
use crate::sweeper;
use crate::validation::{validate_scheme_name, validate_ttl};

pub struct DialerService {
    pool: PgPool,
    schemes: PgSchemeRepository,
    samples: PgSampleRepository,
    assignments: PgAssignmentRepository,
    interviews: PgInterviewRepository,
    bank: PgBankGateway,
}

impl DialerService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            schemes: PgSchemeRepository::new(pool.clone()),
            samples: PgSampleRepository::new(pool.clone()),
            assignments: PgAssignmentRepository::new(pool.clone()),
            interviews: PgInterviewRepository::new(pool.clone()),
            bank: PgBankGateway::new(pool.clone()),
            pool,
        }
    }

    /// The one critical-section operation: claim a sample, open an
    /// assignment, and open its interview, all in one transaction.
    #[instrument(name = "dialer.reserve_next", skip(self), fields(%project_id, %interviewer_id, ttl_seconds, ?scheme_id))]
    pub async fn reserve_next(
        &self,
        project_id: ProjectId,
        interviewer_id: UserId,
        ttl_seconds: i64,
        scheme_id: Option<SchemeId>,
    ) -> DialerResult<DialerAssignment> {
        validate_ttl(ttl_seconds)?;
        reservation::reserve_next(
            &self.assignments,
            &self.samples,
            &self.schemes,
            &self.interviews,
            &self.pool,
            project_id,
            interviewer_id,
            ttl_seconds,
            scheme_id,
        )
        .await
    }

    #[instrument(name = "dialer.complete_assignment", skip(self, meta_patch), fields(assignment_id = %id))]
    pub async fn complete_assignment(
        &self,
        id: AssignmentId,
        outcome_code: Option<String>,
        meta_patch: Option<serde_json::Value>,
    ) -> DialerResult<()> {
        let mut tx = self.pool.begin().await.map_err(dialer_common::DialerError::from)?;
        crate::assignment_lifecycle::complete(
            &self.assignments,
            &self.samples,
            &self.schemes,
            &self.interviews,
            &mut tx,
            id,
            outcome_code,
            meta_patch,
        )
        .await?;
        tx.commit().await.map_err(dialer_common::DialerError::from)?;
        Ok(())
    }

    #[instrument(name = "dialer.fail_assignment", skip(self, meta_patch, reason), fields(assignment_id = %id))]
    pub async fn fail_assignment(
        &self,
        id: AssignmentId,
        outcome_code: Option<String>,
        meta_patch: Option<serde_json::Value>,
        reason: Option<String>,
    ) -> DialerResult<()> {
        let outcome_code = Some(outcome_code.unwrap_or_else(|| "FAIL".to_string()));
        let meta_patch = match reason {
            Some(reason) => {
                let mut patch = meta_patch.unwrap_or_else(|| serde_json::json!({}));
                if let Some(object) = patch.as_object_mut() {
                    object.insert("failure_reason".to_string(), serde_json::Value::String(reason));
                }
                Some(patch)
            }
            None => meta_patch,
        };
        let mut tx = self.pool.begin().await.map_err(dialer_common::DialerError::from)?;
        crate::assignment_lifecycle::fail(
            &self.assignments,
            &self.samples,
            &self.schemes,
            &self.interviews,
            &mut tx,
            id,
            outcome_code,
            meta_patch,
        )
        .await?;
        tx.commit().await.map_err(dialer_common::DialerError::from)?;
        Ok(())
    }

    #[instrument(name = "dialer.cancel_assignment", skip(self, meta_patch), fields(assignment_id = %id))]
    pub async fn cancel_assignment(
        &self,
        id: AssignmentId,
        meta_patch: Option<serde_json::Value>,
    ) -> DialerResult<()> {
        let mut tx = self.pool.begin().await.map_err(dialer_common::DialerError::from)?;
        crate::assignment_lifecycle::cancel(
            &self.assignments,
            &self.samples,
            &self.schemes,
            &self.interviews,
            &mut tx,
            id,
            meta_patch,
        )
        .await?;
        tx.commit().await.map_err(dialer_common::DialerError::from)?;
        Ok(())
    }

    #[instrument(name = "dialer.expire_assignment", skip(self), fields(assignment_id = %id))]
    pub async fn expire_assignment(&self, id: AssignmentId) -> DialerResult<()> {
        let mut tx = self.pool.begin().await.map_err(dialer_common::DialerError::from)?;
        crate::assignment_lifecycle::expire(
            &self.assignments,
            &self.samples,
            &self.schemes,
            &self.interviews,
            &mut tx,
            id,
            Utc::now(),
        )
        .await?;
        tx.commit().await.map_err(dialer_common::DialerError::from)?;
        Ok(())
    }

    /// Runs the TTL sweep on demand (outside of `reserve_next`'s inline
    /// call), e.g. from a scheduled task.
    #[instrument(name = "dialer.sweep_expired", skip(self), fields(?project_id))]
    pub async fn sweep_expired(&self, project_id: Option<ProjectId>) -> DialerResult<u64> {
        sweeper::sweep_expired(&self.assignments, &self.samples, &self.schemes, &self.interviews, &self.pool, project_id)
            .await
    }

    #[instrument(name = "dialer.publish_scheme", skip(self, actor), fields(scheme_id = %scheme_id, ?is_default))]
    pub async fn publish_scheme(
        &self,
        scheme_id: SchemeId,
        is_default: Option<bool>,
        actor: Actor,
    ) -> DialerResult<QuotaScheme> {
        scheme_lifecycle::publish(&self.schemes, &self.pool, scheme_id, is_default, actor).await
    }

    #[instrument(name = "dialer.archive_scheme", skip(self, actor), fields(scheme_id = %scheme_id))]
    pub async fn archive_scheme(&self, scheme_id: SchemeId, actor: Actor) -> DialerResult<QuotaScheme> {
        scheme_lifecycle::archive(&self.schemes, &self.pool, scheme_id, actor).await
    }

    #[instrument(name = "dialer.bulk_upsert_cells", skip(self, cells), fields(scheme_id = %scheme_id, cell_count = cells.len()))]
    pub async fn bulk_upsert_cells(&self, scheme_id: SchemeId, cells: Vec<QuotaCell>) -> DialerResult<Vec<QuotaCell>> {
        scheme_lifecycle::bulk_upsert_cells(&self.schemes, &self.pool, scheme_id, cells).await
    }

    #[instrument(name = "dialer.scheme_stats", skip(self), fields(scheme_id = %scheme_id))]
    pub async fn scheme_stats(&self, scheme_id: SchemeId) -> DialerResult<SchemeStats> {
        let scheme = self
            .schemes
            .get_scheme(scheme_id)
            .await?
            .ok_or_else(|| dialer_common::DialerError::NotFound(scheme_id.to_string()))?;
        scheme_lifecycle::scheme_stats(&self.schemes, &scheme).await
    }

    /// Pulls bank candidates into `cell_id`'s sample pool. The cell's
    /// owning scheme supplies the project id the gateway pools against.
    #[instrument(name = "dialer.build_pool", skip(self), fields(cell_id = %cell_id, limit, multiplier))]
    pub async fn build_pool(
        &self,
        cell_id: CellId,
        limit: Option<u32>,
        multiplier: Option<u32>,
    ) -> DialerResult<u64> {
        let cell = self
            .schemes
            .get_cell(cell_id)
            .await?
            .ok_or_else(|| dialer_common::DialerError::NotFound(cell_id.to_string()))?;
        let scheme = self
            .schemes
            .get_scheme(cell.scheme_id)
            .await?
            .ok_or_else(|| dialer_common::DialerError::NotFound(cell.scheme_id.to_string()))?;
        let mut tx = self.pool.begin().await.map_err(dialer_common::DialerError::from)?;
        let attempted =
            pool::build_pool(&self.bank, &self.samples, &mut tx, scheme.project_id, &cell, limit, multiplier).await?;
        tx.commit().await.map_err(dialer_common::DialerError::from)?;
        Ok(attempted)
    }

    /// Creates a new draft scheme; validates the name up front.
    #[instrument(name = "dialer.create_scheme", skip(self, name, created_by), fields(%project_id, ?overflow_policy))]
    pub async fn create_scheme(
        &self,
        project_id: ProjectId,
        name: impl Into<String>,
        overflow_policy: OverflowPolicy,
        created_by: UserId,
    ) -> DialerResult<QuotaScheme> {
        let name = name.into();
        validate_scheme_name(&name)?;
        let scheme = QuotaScheme::new(project_id, name, overflow_policy, created_by);
        let mut tx = self.pool.begin().await.map_err(dialer_common::DialerError::from)?;
        self.schemes.insert_scheme(&mut tx, &scheme).await?;
        tx.commit().await.map_err(dialer_common::DialerError::from)?;
        Ok(scheme)
    }
}
