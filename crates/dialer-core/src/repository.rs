//! The transactional repository layer over PostgreSQL.
//!
//! Every repository here issues raw, parameterised queries rather than a
//! compile-time-checked macro, so the crate builds without a live
//! database; every `sqlx::Error` is mapped into `DialerError` at the
//! boundary. `SELECT ... FOR UPDATE [SKIP LOCKED]` is how the two
//! isolation facilities the engine needs (pessimistic row locks,
//! skip-locked selection) are actually expressed.

use chrono::{DateTime, Utc};
use dialer_common::{DialerError, DialerResult, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::ids::{AssignmentId, CellId, InterviewId, ProjectId, SampleId, SchemeId};
use crate::model::assignment::{AssignmentStatus, DialerAssignment};
use crate::model::cell::QuotaCell;
use crate::model::interview::{Interview, InterviewStatus};
use crate::model::sample::{SampleContact, SampleStatus};
use crate::model::scheme::{OverflowPolicy, QuotaScheme, SchemeStatus};

fn map_db_err(e: sqlx::Error) -> DialerError {
    DialerError::from(e)
}

fn row_to_cell(row: &sqlx::postgres::PgRow) -> Result<QuotaCell, sqlx::Error> {
    let selector_json: serde_json::Value = row.try_get("selector")?;
    Ok(QuotaCell {
        id: CellId::from_uuid(row.try_get("id")?),
        scheme_id: SchemeId::from_uuid(row.try_get("scheme_id")?),
        selector: serde_json::from_value(selector_json).unwrap_or_default(),
        label: row.try_get("label")?,
        target: row.try_get::<i64, _>("target")? as u32,
        soft_cap: row.try_get::<Option<i64>, _>("soft_cap")?.map(|v| v as u32),
        weight: row.try_get("weight")?,
        achieved: row.try_get::<i64, _>("achieved")? as u32,
        in_progress: row.try_get::<i64, _>("in_progress")? as u32,
        reserved: row.try_get::<i64, _>("reserved")? as u32,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_sample(row: &sqlx::postgres::PgRow) -> Result<SampleContact, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    Ok(SampleContact {
        id: SampleId::from_uuid(row.try_get("id")?),
        project_id: ProjectId::from_uuid(row.try_get("project_id")?),
        quota_cell_id: row.try_get::<Option<uuid::Uuid>, _>("quota_cell_id")?.map(CellId::from_uuid),
        phone_id: row.try_get("phone_id")?,
        person_id: row.try_get("person_id")?,
        phone_number: row.try_get("phone_number")?,
        gender: row.try_get("gender")?,
        age_band: row.try_get("age_band")?,
        province_code: row.try_get("province_code")?,
        city_code: row.try_get("city_code")?,
        attributes: row.try_get("attributes")?,
        status: SampleStatus::from_db_str(&status_str).unwrap_or(SampleStatus::Available),
        attempt_count: row.try_get::<i64, _>("attempt_count")? as u32,
        last_attempt_at: row.try_get("last_attempt_at")?,
        interviewer_id: row.try_get::<Option<uuid::Uuid>, _>("interviewer_id")?.map(UserId::from_uuid),
        used_at: row.try_get("used_at")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_assignment(row: &sqlx::postgres::PgRow) -> Result<DialerAssignment, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    Ok(DialerAssignment {
        id: AssignmentId::from_uuid(row.try_get("id")?),
        project_id: ProjectId::from_uuid(row.try_get("project_id")?),
        scheme_id: SchemeId::from_uuid(row.try_get("scheme_id")?),
        cell_id: CellId::from_uuid(row.try_get("cell_id")?),
        interviewer_id: UserId::from_uuid(row.try_get("interviewer_id")?),
        sample_id: SampleId::from_uuid(row.try_get("sample_id")?),
        status: AssignmentStatus::from_db_str(&status_str).unwrap_or(AssignmentStatus::Reserved),
        reserved_at: row.try_get("reserved_at")?,
        expires_at: row.try_get("expires_at")?,
        completed_at: row.try_get("completed_at")?,
        outcome_code: row.try_get("outcome_code")?,
        meta: row.try_get("meta")?,
    })
}

fn row_to_interview(row: &sqlx::postgres::PgRow) -> Result<Interview, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    Ok(Interview {
        id: InterviewId::from_uuid(row.try_get("id")?),
        assignment_id: AssignmentId::from_uuid(row.try_get("assignment_id")?),
        start_form: row.try_get("start_form")?,
        end_form: row.try_get("end_form")?,
        status: match status_str.as_str() {
            "in_progress" => InterviewStatus::InProgress,
            "completed" => InterviewStatus::Completed,
            _ => InterviewStatus::NotStarted,
        },
        outcome_code: row.try_get("outcome_code")?,
        meta: row.try_get("meta")?,
    })
}

fn row_to_scheme(row: &sqlx::postgres::PgRow) -> Result<QuotaScheme, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let policy_str: String = row.try_get("overflow_policy")?;
    let dims_json: serde_json::Value = row.try_get("dimensions")?;
    Ok(QuotaScheme {
        id: SchemeId::from_uuid(row.try_get("id")?),
        project_id: ProjectId::from_uuid(row.try_get("project_id")?),
        name: row.try_get("name")?,
        version: row.try_get("version")?,
        status: SchemeStatus::from_db_str(&status_str).unwrap_or(SchemeStatus::Draft),
        dimensions: serde_json::from_value(dims_json).unwrap_or_default(),
        overflow_policy: OverflowPolicy::from_db_str(&policy_str).unwrap_or(OverflowPolicy::Strict),
        priority: row.try_get("priority")?,
        is_default: row.try_get("is_default")?,
        published_at: row.try_get("published_at")?,
        created_by: UserId::from_uuid(row.try_get("created_by")?),
    })
}

/// Scheme and cell persistence: publication state, default-uniqueness,
/// cell ranking reads, and atomic counter updates.
#[trait_variant::make(SchemeRepository: Send)]
pub trait LocalSchemeRepository {
    async fn insert_scheme(&self, tx: &mut Transaction<'_, Postgres>, scheme: &QuotaScheme) -> DialerResult<()>;

    async fn get_scheme(&self, id: SchemeId) -> DialerResult<Option<QuotaScheme>>;

    async fn update_scheme_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: SchemeId,
        status: SchemeStatus,
        is_default: bool,
        published_at: Option<DateTime<Utc>>,
    ) -> DialerResult<()>;

    /// Clears `is_default` on every other scheme in the project; run on
    /// publish and on any explicit default flip to keep at most one
    /// default published scheme per project.
    async fn clear_other_defaults(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: ProjectId,
        except: SchemeId,
    ) -> DialerResult<()>;

    /// Scheme selection: `scheme_id` given, or prefer `is_default AND
    /// published`, else any published, ordered by `priority desc,
    /// published_at desc`. Locks the returned row.
    async fn pick_for_project(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: ProjectId,
        scheme_id: Option<SchemeId>,
    ) -> DialerResult<QuotaScheme>;

    async fn upsert_cells(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scheme_id: SchemeId,
        cells: Vec<QuotaCell>,
    ) -> DialerResult<Vec<QuotaCell>>;

    /// Row-locks every cell of the scheme using `SKIP LOCKED`; cells
    /// currently locked by a concurrent reservation are simply absent
    /// from the result.
    async fn lock_cells_skip_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scheme_id: SchemeId,
    ) -> DialerResult<Vec<QuotaCell>>;

    async fn get_cell(&self, id: CellId) -> DialerResult<Option<QuotaCell>>;

    async fn list_cells_for_scheme(&self, scheme_id: SchemeId) -> DialerResult<Vec<QuotaCell>>;

    /// Atomic in-place counter update; never a read-modify-write across
    /// the application boundary.
    async fn apply_counter_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cell_id: CellId,
        in_progress_delta: i64,
        reserved_delta: i64,
        achieved_delta: i64,
    ) -> DialerResult<()>;
}

pub struct PgSchemeRepository {
    pool: PgPool,
}

impl PgSchemeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SchemeRepository for PgSchemeRepository {
    async fn insert_scheme(&self, tx: &mut Transaction<'_, Postgres>, scheme: &QuotaScheme) -> DialerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dialer.quota_schemes
                (id, project_id, name, version, status, dimensions, overflow_policy, priority, is_default, published_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(scheme.id.as_uuid())
        .bind(scheme.project_id.as_uuid())
        .bind(&scheme.name)
        .bind(scheme.version)
        .bind(scheme.status.as_db_str())
        .bind(serde_json::to_value(&scheme.dimensions).unwrap_or_default())
        .bind(scheme.overflow_policy.as_db_str())
        .bind(scheme.priority)
        .bind(scheme.is_default)
        .bind(scheme.published_at)
        .bind(scheme.created_by.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_scheme(&self, id: SchemeId) -> DialerResult<Option<QuotaScheme>> {
        let row = sqlx::query("SELECT * FROM dialer.quota_schemes WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(row_to_scheme).transpose().map_err(map_db_err)
    }

    async fn update_scheme_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: SchemeId,
        status: SchemeStatus,
        is_default: bool,
        published_at: Option<DateTime<Utc>>,
    ) -> DialerResult<()> {
        sqlx::query(
            "UPDATE dialer.quota_schemes SET status = $2, is_default = $3, published_at = COALESCE($4, published_at) WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_db_str())
        .bind(is_default)
        .bind(published_at)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn clear_other_defaults(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: ProjectId,
        except: SchemeId,
    ) -> DialerResult<()> {
        sqlx::query("UPDATE dialer.quota_schemes SET is_default = FALSE WHERE project_id = $1 AND id <> $2")
            .bind(project_id.as_uuid())
            .bind(except.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn pick_for_project(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: ProjectId,
        scheme_id: Option<SchemeId>,
    ) -> DialerResult<QuotaScheme> {
        if let Some(scheme_id) = scheme_id {
            let row = sqlx::query(
                "SELECT * FROM dialer.quota_schemes WHERE id = $1 AND project_id = $2 AND status = 'published' FOR UPDATE",
            )
            .bind(scheme_id.as_uuid())
            .bind(project_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_err)?;
            return row
                .as_ref()
                .map(row_to_scheme)
                .transpose()
                .map_err(map_db_err)?
                .ok_or(DialerError::NoSchemeAvailable);
        }

        let row = sqlx::query(
            r#"
            SELECT * FROM dialer.quota_schemes
            WHERE project_id = $1 AND status = 'published'
            ORDER BY is_default DESC, priority DESC, published_at DESC NULLS LAST
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_err)?;

        row.as_ref()
            .map(row_to_scheme)
            .transpose()
            .map_err(map_db_err)?
            .ok_or(DialerError::NoSchemeAvailable)
    }

    async fn upsert_cells(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scheme_id: SchemeId,
        cells: Vec<QuotaCell>,
    ) -> DialerResult<Vec<QuotaCell>> {
        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            let row = sqlx::query(
                r#"
                INSERT INTO dialer.quota_cells
                    (id, scheme_id, selector, label, target, soft_cap, weight, achieved, in_progress, reserved, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, 0, now())
                ON CONFLICT (scheme_id, selector) DO UPDATE SET
                    label = EXCLUDED.label,
                    target = EXCLUDED.target,
                    soft_cap = EXCLUDED.soft_cap,
                    weight = EXCLUDED.weight,
                    updated_at = now()
                RETURNING *
                "#,
            )
            .bind(cell.id.as_uuid())
            .bind(scheme_id.as_uuid())
            .bind(serde_json::to_value(&cell.selector).unwrap_or_default())
            .bind(&cell.label)
            .bind(cell.target as i64)
            .bind(cell.soft_cap.map(|v| v as i64))
            .bind(cell.weight)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_db_err)?;
            out.push(row_to_cell(&row).map_err(map_db_err)?);
        }
        Ok(out)
    }

    async fn lock_cells_skip_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scheme_id: SchemeId,
    ) -> DialerResult<Vec<QuotaCell>> {
        let rows = sqlx::query("SELECT * FROM dialer.quota_cells WHERE scheme_id = $1 FOR UPDATE SKIP LOCKED")
            .bind(scheme_id.as_uuid())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_db_err)?;
        rows.iter().map(row_to_cell).collect::<Result<_, _>>().map_err(map_db_err)
    }

    async fn get_cell(&self, id: CellId) -> DialerResult<Option<QuotaCell>> {
        let row = sqlx::query("SELECT * FROM dialer.quota_cells WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(row_to_cell).transpose().map_err(map_db_err)
    }

    async fn list_cells_for_scheme(&self, scheme_id: SchemeId) -> DialerResult<Vec<QuotaCell>> {
        let rows = sqlx::query("SELECT * FROM dialer.quota_cells WHERE scheme_id = $1 ORDER BY id")
            .bind(scheme_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
        rows.iter().map(row_to_cell).collect::<Result<_, _>>().map_err(map_db_err)
    }

    async fn apply_counter_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cell_id: CellId,
        in_progress_delta: i64,
        reserved_delta: i64,
        achieved_delta: i64,
    ) -> DialerResult<()> {
        sqlx::query(
            r#"
            UPDATE dialer.quota_cells
            SET in_progress = GREATEST(0, in_progress + $2),
                reserved = GREATEST(0, reserved + $3),
                achieved = GREATEST(0, achieved + $4),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(cell_id.as_uuid())
        .bind(in_progress_delta)
        .bind(reserved_delta)
        .bind(achieved_delta)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }
}

/// Sample persistence: bulk pool inserts and the `SKIP LOCKED` claim query.
#[trait_variant::make(SampleRepository: Send)]
pub trait LocalSampleRepository {
    async fn bulk_insert_samples(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        samples: &[SampleContact],
    ) -> DialerResult<u64>;

    /// One available, active, non-DNC sample for the cell, ordered
    /// `last_attempt_at asc nulls first, id asc`, row-locked with
    /// `SKIP LOCKED`. Returns `None` if none is free.
    async fn claim_next_sample(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: ProjectId,
        cell_id: CellId,
        interviewer_id: UserId,
        now: DateTime<Utc>,
    ) -> DialerResult<Option<SampleContact>>;

    async fn mark_available(&self, tx: &mut Transaction<'_, Postgres>, id: SampleId) -> DialerResult<()>;

    async fn mark_completed(&self, tx: &mut Transaction<'_, Postgres>, id: SampleId) -> DialerResult<()>;

    async fn get_sample(&self, id: SampleId) -> DialerResult<Option<SampleContact>>;
}

pub struct PgSampleRepository {
    pool: PgPool,
}

impl PgSampleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SampleRepository for PgSampleRepository {
    async fn bulk_insert_samples(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        samples: &[SampleContact],
    ) -> DialerResult<u64> {
        let mut attempted = 0u64;
        for sample in samples {
            sqlx::query(
                r#"
                INSERT INTO dialer.sample_contacts
                    (id, project_id, quota_cell_id, phone_id, person_id, phone_number, gender, age_band,
                     province_code, city_code, attributes, status, attempt_count, is_active, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'available', 0, TRUE, now())
                ON CONFLICT (project_id, quota_cell_id, phone_id) DO NOTHING
                "#,
            )
            .bind(sample.id.as_uuid())
            .bind(sample.project_id.as_uuid())
            .bind(sample.quota_cell_id.map(|c| *c.as_uuid()))
            .bind(sample.phone_id)
            .bind(sample.person_id)
            .bind(&sample.phone_number)
            .bind(&sample.gender)
            .bind(&sample.age_band)
            .bind(&sample.province_code)
            .bind(&sample.city_code)
            .bind(&sample.attributes)
            .execute(&mut **tx)
            .await
            .map_err(map_db_err)?;
            // Counts attempted inserts, not post-conflict effective ones —
            // a pool builder rerun against an already-pooled cell reports
            // the same attempted count every time.
            attempted += 1;
        }
        Ok(attempted)
    }

    async fn claim_next_sample(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        project_id: ProjectId,
        cell_id: CellId,
        interviewer_id: UserId,
        now: DateTime<Utc>,
    ) -> DialerResult<Option<SampleContact>> {
        let row = sqlx::query(
            r#"
            SELECT sc.* FROM dialer.sample_contacts sc
            LEFT JOIN dialer.do_not_contact_entries d ON d.msisdn = sc.phone_number
            WHERE sc.project_id = $1
              AND sc.quota_cell_id = $2
              AND sc.status = 'available'
              AND sc.is_active
              AND d.msisdn IS NULL
            ORDER BY sc.last_attempt_at ASC NULLS FIRST, sc.id ASC
            FOR UPDATE OF sc SKIP LOCKED
            LIMIT 1
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(cell_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_err)?;

        let Some(row) = row else { return Ok(None) };
        let mut sample = row_to_sample(&row).map_err(map_db_err)?;

        sqlx::query(
            r#"
            UPDATE dialer.sample_contacts
            SET status = 'claimed', attempt_count = attempt_count + 1,
                last_attempt_at = $2, interviewer_id = $3, used_at = $2
            WHERE id = $1
            "#,
        )
        .bind(sample.id.as_uuid())
        .bind(now)
        .bind(interviewer_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;

        sample.status = SampleStatus::Claimed;
        sample.attempt_count += 1;
        sample.last_attempt_at = Some(now);
        sample.interviewer_id = Some(interviewer_id);
        sample.used_at = Some(now);
        Ok(Some(sample))
    }

    async fn mark_available(&self, tx: &mut Transaction<'_, Postgres>, id: SampleId) -> DialerResult<()> {
        sqlx::query("UPDATE dialer.sample_contacts SET status = 'available', interviewer_id = NULL WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn mark_completed(&self, tx: &mut Transaction<'_, Postgres>, id: SampleId) -> DialerResult<()> {
        sqlx::query("UPDATE dialer.sample_contacts SET status = 'completed' WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_sample(&self, id: SampleId) -> DialerResult<Option<SampleContact>> {
        let row = sqlx::query("SELECT * FROM dialer.sample_contacts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(row_to_sample).transpose().map_err(map_db_err)
    }
}

/// Assignment and interview persistence.
#[trait_variant::make(AssignmentRepository: Send)]
pub trait LocalAssignmentRepository {
    /// Locks the interviewer's active (reserved, unexpired) assignment,
    /// if any, for the uniqueness check a reservation attempt opens with.
    async fn lock_active_for_interviewer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        interviewer_id: UserId,
        now: DateTime<Utc>,
    ) -> DialerResult<Option<DialerAssignment>>;

    async fn insert_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        assignment: &DialerAssignment,
    ) -> DialerResult<()>;

    async fn get_assignment(&self, id: AssignmentId) -> DialerResult<Option<DialerAssignment>>;

    async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: AssignmentId,
        status: AssignmentStatus,
        completed_at: Option<DateTime<Utc>>,
        outcome_code: Option<String>,
        meta_patch: Option<serde_json::Value>,
    ) -> DialerResult<()>;

    /// `reserved` assignments whose TTL elapsed, ordered by id, for the
    /// sweeper to expire one by one.
    async fn list_overdue(
        &self,
        project_id: Option<ProjectId>,
        now: DateTime<Utc>,
    ) -> DialerResult<Vec<DialerAssignment>>;
}

pub struct PgAssignmentRepository {
    pool: PgPool,
}

impl PgAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AssignmentRepository for PgAssignmentRepository {
    async fn lock_active_for_interviewer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        interviewer_id: UserId,
        now: DateTime<Utc>,
    ) -> DialerResult<Option<DialerAssignment>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM dialer.dialer_assignments
            WHERE interviewer_id = $1 AND status = 'reserved' AND expires_at > $2
            ORDER BY reserved_at DESC
            FOR UPDATE
            LIMIT 1
            "#,
        )
        .bind(interviewer_id.as_uuid())
        .bind(now)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_err)?;
        row.as_ref().map(row_to_assignment).transpose().map_err(map_db_err)
    }

    async fn insert_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        assignment: &DialerAssignment,
    ) -> DialerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dialer.dialer_assignments
                (id, project_id, scheme_id, cell_id, interviewer_id, sample_id, status, reserved_at, expires_at, meta)
            VALUES ($1, $2, $3, $4, $5, $6, 'reserved', $7, $8, $9)
            "#,
        )
        .bind(assignment.id.as_uuid())
        .bind(assignment.project_id.as_uuid())
        .bind(assignment.scheme_id.as_uuid())
        .bind(assignment.cell_id.as_uuid())
        .bind(assignment.interviewer_id.as_uuid())
        .bind(assignment.sample_id.as_uuid())
        .bind(assignment.reserved_at)
        .bind(assignment.expires_at)
        .bind(&assignment.meta)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn get_assignment(&self, id: AssignmentId) -> DialerResult<Option<DialerAssignment>> {
        let row = sqlx::query("SELECT * FROM dialer.dialer_assignments WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        row.as_ref().map(row_to_assignment).transpose().map_err(map_db_err)
    }

    async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: AssignmentId,
        status: AssignmentStatus,
        completed_at: Option<DateTime<Utc>>,
        outcome_code: Option<String>,
        meta_patch: Option<serde_json::Value>,
    ) -> DialerResult<()> {
        sqlx::query(
            r#"
            UPDATE dialer.dialer_assignments
            SET status = $2, completed_at = COALESCE($3, completed_at),
                outcome_code = COALESCE($4, outcome_code),
                meta = CASE WHEN $5::jsonb IS NULL THEN meta ELSE meta || $5::jsonb END
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(status.as_db_str())
        .bind(completed_at)
        .bind(outcome_code)
        .bind(meta_patch)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn list_overdue(
        &self,
        project_id: Option<ProjectId>,
        now: DateTime<Utc>,
    ) -> DialerResult<Vec<DialerAssignment>> {
        let rows = match project_id {
            Some(project_id) => {
                sqlx::query(
                    "SELECT * FROM dialer.dialer_assignments WHERE project_id = $1 AND status = 'reserved' AND expires_at <= $2 ORDER BY id",
                )
                .bind(project_id.as_uuid())
                .bind(now)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM dialer.dialer_assignments WHERE status = 'reserved' AND expires_at <= $1 ORDER BY id",
                )
                .bind(now)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_err)?;
        rows.iter().map(row_to_assignment).collect::<Result<_, _>>().map_err(map_db_err)
    }
}

#[trait_variant::make(InterviewRepository: Send)]
pub trait LocalInterviewRepository {
    /// Idempotent: the Reservation Engine calls this inline with
    /// assignment creation, so a retry of the same assignment never
    /// creates a second interview row.
    async fn get_or_create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        assignment_id: AssignmentId,
    ) -> DialerResult<Interview>;

    async fn update(&self, tx: &mut Transaction<'_, Postgres>, interview: &Interview) -> DialerResult<()>;

    async fn delete_for_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        assignment_id: AssignmentId,
    ) -> DialerResult<()>;
}

pub struct PgInterviewRepository {
    pool: PgPool,
}

impl PgInterviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl InterviewRepository for PgInterviewRepository {
    async fn get_or_create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        assignment_id: AssignmentId,
    ) -> DialerResult<Interview> {
        let row = sqlx::query(
            r#"
            INSERT INTO dialer.interviews (id, assignment_id, status, meta)
            VALUES ($1, $2, 'not_started', '{}'::jsonb)
            ON CONFLICT (assignment_id) DO UPDATE SET assignment_id = EXCLUDED.assignment_id
            RETURNING *
            "#,
        )
        .bind(InterviewId::new().as_uuid())
        .bind(assignment_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_err)?;
        row_to_interview(&row).map_err(map_db_err)
    }

    async fn update(&self, tx: &mut Transaction<'_, Postgres>, interview: &Interview) -> DialerResult<()> {
        let status_str = match interview.status {
            InterviewStatus::NotStarted => "not_started",
            InterviewStatus::InProgress => "in_progress",
            InterviewStatus::Completed => "completed",
        };
        sqlx::query(
            r#"
            UPDATE dialer.interviews
            SET start_form = $2, end_form = $3, status = $4, outcome_code = $5, meta = $6
            WHERE id = $1
            "#,
        )
        .bind(interview.id.as_uuid())
        .bind(interview.start_form)
        .bind(interview.end_form)
        .bind(status_str)
        .bind(&interview.outcome_code)
        .bind(&interview.meta)
        .execute(&mut **tx)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete_for_assignment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        assignment_id: AssignmentId,
    ) -> DialerResult<()> {
        sqlx::query("DELETE FROM dialer.interviews WHERE assignment_id = $1")
            .bind(assignment_id.as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DialerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DialerError::NotFound(_)));
    }
}
