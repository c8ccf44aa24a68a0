//! Bank Gateway: read-only selector-predicate queries against the
//! external `bank.bank_person` / `bank.bank_phone` tables, honoring the
//! do-not-contact set and the project's already-pooled phones.
//!
//! The dialer core never migrates or writes these tables — it only issues
//! `SELECT`s joining them, which is why this is its own narrow trait
//! rather than folded into the general store.

use chrono::NaiveDate;
use dialer_common::{DialerError, DialerResult};
use sqlx::{PgPool, Row};

use crate::ids::ProjectId;
use crate::selector::SelectorPredicate;

/// One candidate row the gateway can hand to the sample pool builder.
#[derive(Debug, Clone)]
pub struct BankCandidate {
    pub phone_id: i64,
    pub msisdn: String,
    pub person_id: i64,
    pub gender: Option<String>,
    pub dob: Option<NaiveDate>,
    pub province_code: Option<String>,
    pub city_code: Option<String>,
}

#[trait_variant::make(BankGateway: Send)]
pub trait LocalBankGateway {
    /// Candidates ordered deterministically by `phone_id` ascending,
    /// bounded by `limit`. Only `is_mobile AND is_active` phones are
    /// returned; phones in the DNC set or already pooled for `project_id`
    /// are excluded.
    async fn candidates(
        &self,
        project_id: ProjectId,
        predicate: &SelectorPredicate,
        limit: i64,
    ) -> DialerResult<Vec<BankCandidate>>;
}

pub struct PgBankGateway {
    pool: PgPool,
}

impl PgBankGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BankGateway for PgBankGateway {
    async fn candidates(
        &self,
        project_id: ProjectId,
        predicate: &SelectorPredicate,
        limit: i64,
    ) -> DialerResult<Vec<BankCandidate>> {
        let today = SelectorPredicate::today();

        // Age ranges collapse to one inclusive [min, max] window: the
        // widest band spanning every range the selector asked for. A row
        // is re-checked against the individual bands by the pool builder
        // once it knows the candidate's exact age.
        let (min_dob, max_dob) = if predicate.age_ranges.is_empty() {
            (None, None)
        } else {
            let min_age = predicate.age_ranges.iter().map(|r| r.min_age).min().unwrap();
            let max_age = predicate.age_ranges.iter().map(|r| r.max_age).max().unwrap();
            let max_dob = today
                .checked_sub_signed(chrono::Duration::days(min_age as i64 * 365))
                .unwrap_or(today);
            let min_dob = today
                .checked_sub_signed(chrono::Duration::days((max_age as i64 + 1) * 365))
                .unwrap_or(today);
            (Some(min_dob), Some(max_dob))
        };

        let rows = sqlx::query(
            r#"
            SELECT ph.phone_id, ph.msisdn, p.person_id, p.gender, p.dob,
                   p.province_code, p.city_code
            FROM bank.bank_phone ph
            JOIN bank.bank_person p ON p.person_id = ph.person_id
            LEFT JOIN dialer.do_not_contact_entries d ON d.msisdn = ph.msisdn
            WHERE ph.is_mobile = TRUE
              AND ph.is_active = TRUE
              AND d.msisdn IS NULL
              AND ($1::text[] IS NULL OR p.gender = ANY($1))
              AND ($2::text[] IS NULL OR p.province_code = ANY($2))
              AND ($3::text[] IS NULL OR p.city_code = ANY($3))
              AND ($4::date IS NULL OR p.dob >= $4)
              AND ($5::date IS NULL OR p.dob <= $5)
              AND NOT EXISTS (
                  SELECT 1 FROM dialer.sample_contacts sc
                  WHERE sc.phone_number = ph.msisdn AND sc.project_id = $6
              )
            ORDER BY ph.phone_id ASC
            LIMIT $7
            "#,
        )
        .bind(predicate.gender_in.as_deref())
        .bind(predicate.province_code_in.as_deref())
        .bind(predicate.city_code_in.as_deref())
        .bind(min_dob)
        .bind(max_dob)
        .bind(project_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DialerError::BankUnavailable(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(BankCandidate {
                    phone_id: row.try_get("phone_id").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                    msisdn: row.try_get("msisdn").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                    person_id: row.try_get("person_id").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                    gender: row.try_get("gender").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                    dob: row.try_get("dob").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                    province_code: row.try_get("province_code").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                    city_code: row.try_get("city_code").map_err(|e| DialerError::BankUnavailable(e.to_string()))?,
                })
            })
            .collect()
    }
}
