//! # dialer-common
//!
//! Shared types and utilities for the dialer core: the reservation engine
//! (`dialer-core`) and its integration tests depend on this crate for
//! identifiers, the unified error type, health reporting, and configuration.

pub mod error;
pub mod health;
pub mod identity;

#[cfg(feature = "config")]
pub mod config;

pub use error::{DialerError, DialerResult};
pub use health::{health_check, HealthResponse};
pub use identity::UserId;

#[cfg(feature = "config")]
pub use config::{
    load_config, load_dialer_config, DatabaseConfig, DialerConfig, ObservabilityConfig,
    ReservationConfig,
};
