//! Shared test fixtures for the dialer core's integration suite.
//!
//! Builders here hand back fully-formed domain objects (not DB rows), so
//! tests can exercise the pure ranking/capacity/selector-matching paths
//! and the lifecycle transition functions directly, without a live
//! Postgres connection.

use dialer_common::UserId;
use dialer_core::{
    DialerAssignment, DoNotContactEntry, Interview, OverflowPolicy, Project, ProjectId, QuotaCell,
    QuotaScheme, SampleContact, SampleId, Selector,
};

/// A project, its default scheme, and an interviewer, ready to hang cells
/// and samples off of.
pub struct TestFixture {
    pub project: Project,
    pub scheme: QuotaScheme,
    pub interviewer_id: UserId,
}

impl TestFixture {
    pub fn new(overflow_policy: OverflowPolicy) -> Self {
        let project = Project::new("P-TEST", "Integration test project");
        let mut scheme = QuotaScheme::new(project.id, "v1", overflow_policy, UserId::new());
        scheme.is_default = true;
        Self {
            project,
            scheme,
            interviewer_id: UserId::new(),
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project.id
    }

    /// A cell with the given target/soft_cap/weight, already bound to this
    /// fixture's scheme, with an empty (match-all) selector.
    pub fn cell(&self, target: u32, soft_cap: Option<u32>, weight: f64) -> QuotaCell {
        let mut cell = QuotaCell::new(self.scheme.id, Selector::new(), target);
        cell.soft_cap = soft_cap;
        cell.weight = weight;
        cell
    }

    /// A sample contact available to this fixture's project.
    pub fn sample(&self, phone_number: impl Into<String>) -> SampleContact {
        SampleContact::new(self.project.id, phone_number)
    }

    /// A freshly reserved assignment binding `cell_id`/`sample_id` to this
    /// fixture's interviewer, expiring `ttl_seconds` from `now`.
    pub fn assignment(
        &self,
        cell_id: dialer_core::CellId,
        sample_id: SampleId,
        now: chrono::DateTime<chrono::Utc>,
        ttl_seconds: i64,
    ) -> DialerAssignment {
        DialerAssignment {
            id: dialer_core::AssignmentId::new(),
            project_id: self.project.id,
            scheme_id: self.scheme.id,
            cell_id,
            interviewer_id: self.interviewer_id,
            sample_id,
            status: dialer_core::AssignmentStatus::Reserved,
            reserved_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_seconds),
            completed_at: None,
            outcome_code: None,
            meta: serde_json::json!({}),
        }
    }

    pub fn interview(&self, assignment_id: dialer_core::AssignmentId) -> Interview {
        Interview::new(assignment_id)
    }

    pub fn dnc_entry(&self, msisdn: impl Into<String>) -> DoNotContactEntry {
        DoNotContactEntry::new(msisdn, Some("test exclusion".to_string()))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new(OverflowPolicy::Strict)
    }
}

/// Live-Postgres test context, used only by tests behind the `database`
/// feature. Not exercised by the default suite, which runs entirely
/// against in-memory domain objects.
#[cfg(feature = "database")]
pub struct TestDatabase {
    pub pool: sqlx::PgPool,
}

#[cfg(feature = "database")]
impl TestDatabase {
    pub fn test_database_url() -> String {
        std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/dialer_test".to_string())
    }

    pub async fn new() -> Result<Self, sqlx::Error> {
        let pool = sqlx::PgPool::connect(&Self::test_database_url()).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Truncate in dependency order so the schema's foreign keys don't
    /// complain between test runs.
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        sqlx::query("TRUNCATE TABLE dialer.interviews CASCADE").execute(&self.pool).await?;
        sqlx::query("TRUNCATE TABLE dialer.dialer_assignments CASCADE").execute(&self.pool).await?;
        sqlx::query("TRUNCATE TABLE dialer.sample_contacts CASCADE").execute(&self.pool).await?;
        sqlx::query("TRUNCATE TABLE dialer.quota_cells CASCADE").execute(&self.pool).await?;
        sqlx::query("TRUNCATE TABLE dialer.quota_schemes CASCADE").execute(&self.pool).await?;
        Ok(())
    }
}

/// Assert that a result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err.
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
}
