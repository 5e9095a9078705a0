//! Filesystem storage for the ledger.

pub mod import;
pub mod ledger;
mod record_data;
mod requirement_data;

pub use import::{ImportReport, ImportRow};
pub use ledger::{
    InitError, InvalidFile, Ledger, LedgerError, LedgerLoadError, LoadError, Loaded, LookupError,
    SaveError, Unloaded,
};
pub use record_data::RecordData;
pub use requirement_data::{RequirementData, RequirementDataError};
