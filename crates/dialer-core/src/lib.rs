//! # dialer-core
//!
//! The dialer core of a survey-collection platform: a transactional
//! reservation engine that hands out the next phone number an interviewer
//! should call, enforcing per-project quota targets broken down by
//! demographic dimensions (gender, age band, province, city, …).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         dialer-core                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  Sample Pool │  │  Reservation │  │  Assignment  │          │
//! │  │    Builder   │→ │    Engine    │→ │   Lifecycle  │          │
//! │  └──────────────┘  └──────────────┘  └──────────────┘          │
//! │         ↓                  ↓                  ↓                 │
//! │  ┌──────────────────────────────────────────────────┐          │
//! │  │         PostgreSQL (row locks + SKIP LOCKED)       │          │
//! │  └──────────────────────────────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What this crate does
//!
//! - **Quota schemes**: versioned plans of demographic cells with a
//!   draft → published → archived lifecycle and default-uniqueness.
//! - **Sample pools**: materialises candidate contacts from an external
//!   bank of persons/phones under a cell's selector, minus DNC, minus
//!   already-pooled numbers.
//! - **Reservations**: hands an interviewer the next number to call,
//!   ranking cells by capacity under strict/soft/weighted overflow
//!   policies and claiming samples under `SKIP LOCKED` contention.
//! - **Lifecycle**: complete/fail/cancel/expire transitions that keep
//!   cell counters, sample status, and the paired interview record
//!   consistent, plus a TTL sweeper that reclaims overdue reservations.
//!
//! ## Pattern Source
//!
//! Built on the same store/lifecycle/validation conventions as the rest
//! of this lineage's services, adapted to the dialer domain's
//! transactional reservation semantics.

pub mod assignment_lifecycle;
pub mod bank;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod pool;
pub mod repository;
pub mod reservation;
pub mod scheme_lifecycle;
pub mod selector;
pub mod service;
pub mod sweeper;
pub mod validation;

pub use bank::{BankCandidate, BankGateway, PgBankGateway};
pub use ids::{AssignmentId, CellId, InterviewId, ProjectId, SampleId, SchemeId};
pub use lifecycle::Actor;
pub use model::{
    AssignmentStatus, Dimension, DialerAssignment, DoNotContactEntry, Interview, InterviewStatus,
    OverflowPolicy, Project, ProjectStatus, QuotaCell, QuotaScheme, SampleContact, SampleStatus,
    SchemeStatus,
};
pub use repository::{
    AssignmentRepository, InterviewRepository, PgAssignmentRepository, PgInterviewRepository,
    PgSampleRepository, PgSchemeRepository, SampleRepository, SchemeRepository,
};
pub use reservation::rank_cells;
pub use scheme_lifecycle::{DimensionTotals, SchemeStats};
pub use selector::{Selector, SelectorPredicate, SelectorValue};
pub use service::DialerService;
