//! Data model: the entities the dialer core operates on.

pub mod assignment;
pub mod cell;
pub mod dnc;
pub mod interview;
pub mod project;
pub mod sample;
pub mod scheme;

pub use assignment::{AssignmentStatus, DialerAssignment};
pub use cell::QuotaCell;
pub use dnc::DoNotContactEntry;
pub use interview::{Interview, InterviewStatus};
pub use project::{Project, ProjectStatus};
pub use sample::{SampleContact, SampleStatus};
pub use scheme::{Dimension, OverflowPolicy, QuotaScheme, SchemeStatus};
