// On-disk shape of requirements.
//
// Progress fields are never written. Files from older versions may still
// carry a stored `credits_earned`; it is ignored on load.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    CreditTypes, Credits, Filters, Requirement, RequirementError, RequirementKind, YearRange,
};

/// A requirement as stored in a YAML file. The UUID is the file stem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementData {
    /// Display name.
    pub name: String,
    /// Obligation category.
    #[serde(default, rename = "requirement_type")]
    pub kind: RequirementKind,
    /// Credit target.
    pub credits_required: Decimal,
    /// Acceptable credit types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credit_types: Vec<String>,
    /// Legacy single credit type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_type: Option<String>,
    /// Acceptable providers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
    /// Acceptable subjects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    /// First eligible year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    /// Last eligible year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    /// Due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Lifecycle flag.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

/// A requirement file held an invalid value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequirementDataError {
    /// The credit target is negative or too large.
    #[error(transparent)]
    InvalidTarget(#[from] crate::domain::CreditsError),
    /// Any other validation failure.
    #[error(transparent)]
    Invalid(#[from] RequirementError),
}

impl RequirementData {
    /// Validates the data and builds a domain requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the target is not positive, or
    /// the year range is inverted.
    pub fn into_requirement(self, id: Uuid) -> Result<Requirement, RequirementDataError> {
        let filters = Filters {
            credit_types: CreditTypes::normalize(&self.credit_types, self.credit_type.as_deref()),
            providers: Filters::names(&self.providers),
            subjects: Filters::names(&self.subjects),
            years: YearRange::new(self.start_year, self.end_year)?,
        };
        let credits_required = Credits::new(self.credits_required)?;

        let mut requirement =
            Requirement::new_with_uuid(id, self.name, self.kind, filters, credits_required)?;
        requirement.set_due_date(self.due_date);
        requirement.set_notes(self.notes);
        requirement.is_active = self.is_active;
        if let Some(created) = self.created {
            requirement.created = created;
        }
        Ok(requirement)
    }
}

impl From<&Requirement> for RequirementData {
    fn from(requirement: &Requirement) -> Self {
        let filters = &requirement.filters;
        Self {
            name: requirement.name.clone(),
            kind: requirement.kind,
            credits_required: requirement.credits_required.value(),
            credit_types: filters.credit_types.clone().into(),
            credit_type: None,
            providers: filters.providers.iter().cloned().collect(),
            subjects: filters.subjects.iter().cloned().collect(),
            start_year: filters.years.start(),
            end_year: filters.years.end(),
            due_date: requirement.due_date,
            notes: requirement.notes.clone(),
            is_active: requirement.is_active,
            created: Some(requirement.created),
        }
    }
}
