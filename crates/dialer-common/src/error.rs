//! Unified error type for the dialer core.

use thiserror::Error;

/// Result type alias for dialer operations.
pub type DialerResult<T> = Result<T, DialerError>;

/// Unified error type for all dialer core operations.
///
/// Callers distinguish `NoSchemeAvailable` / `NoCapacity` / `NoSample` so
/// the UI can explain why a reservation could not be made, and treat
/// `TerminalTransition` as an idempotent success rather than a failure.
#[derive(Error, Debug)]
pub enum DialerError {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("validation failed with {0} errors")]
    MultipleValidation(Vec<String>),

    // ─────────────────────────────────────────────────────────────────────────
    // Permission (resolved by the outer shell; present for completeness)
    // ─────────────────────────────────────────────────────────────────────────
    #[error("permission denied: {0}")]
    Permission(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Conflict
    // ─────────────────────────────────────────────────────────────────────────
    #[error("conflict: {0}")]
    Conflict(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Reservation-specific
    // ─────────────────────────────────────────────────────────────────────────
    #[error("interviewer {0} already has an active reservation")]
    AlreadyReserved(String),

    #[error("no published quota scheme is available for this project")]
    NoSchemeAvailable,

    #[error("no quota cell with available capacity was found")]
    NoCapacity,

    #[error("no available sample contact could be claimed")]
    NoSample,

    // ─────────────────────────────────────────────────────────────────────────
    // Bank gateway
    // ─────────────────────────────────────────────────────────────────────────
    #[error("bank schema unavailable: {0}")]
    BankUnavailable(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    #[error("transition requested on a terminal assignment")]
    TerminalTransition,

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────
    #[error("not found: {0}")]
    NotFound(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Infrastructure
    // ─────────────────────────────────────────────────────────────────────────
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for DialerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DialerError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::RowNotFound => DialerError::NotFound("row not found".to_string()),
            _ => DialerError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_transition_display() {
        let err = DialerError::TerminalTransition;
        assert_eq!(err.to_string(), "transition requested on a terminal assignment");
    }

    #[test]
    fn test_already_reserved_display() {
        let err = DialerError::AlreadyReserved("user:abc".to_string());
        assert!(err.to_string().contains("user:abc"));
    }
}
