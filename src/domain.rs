//! Domain models for CME credit tracking.
//!
//! This module contains the core domain types including credit records,
//! requirements, the progress engine, and the user's configuration.

/// Credit-type tags and their normalization.
pub mod credit_type;
pub use credit_type::{CreditType, CreditTypes, InvalidCreditTypeError};

/// Certificates and self-reported activities.
pub mod record;
pub use record::{CreditRecord, Credits, CreditsError, RecordError, RecordSource};

/// Requirement domain model.
pub mod requirement;
pub use requirement::{Filters, Requirement, RequirementError, RequirementKind, YearRange};

pub mod progress;
pub use progress::{Progress, compute_all, compute_progress};

pub mod catalog;
pub use catalog::{Catalog, CatalogError, CustomCreditType, Profession};

mod npi;
pub use npi::{Npi, NpiError};

pub mod report;

mod config;
pub use config::{Config, ConfigError};
