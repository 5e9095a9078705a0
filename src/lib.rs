//! Plain-text continuing medical education credit tracking.
//!
//! Certificates, self-reported activities, and requirements are YAML files
//! stored in a directory. Progress towards each requirement is always
//! computed from the records, never stored.

pub mod domain;
pub use domain::{
    Config, CreditRecord, CreditType, CreditTypes, Credits, Filters, Progress, RecordSource,
    Requirement, RequirementKind, YearRange, compute_all, compute_progress,
};

/// Filesystem storage for records, requirements, and configuration.
pub mod storage;
pub use storage::{Ledger, Loaded};
