use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CreditTypes, Credits};

/// The category of obligation a requirement tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// State licence renewal.
    LicenseRenewal,
    /// Specialty board recertification.
    BoardRecert,
    /// Hospital credentialing or privileges.
    Hospital,
    /// A personal learning goal.
    #[default]
    Personal,
}

impl RequirementKind {
    /// Stable machine readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LicenseRenewal => "license_renewal",
            Self::BoardRecert => "board_recert",
            Self::Hospital => "hospital",
            Self::Personal => "personal",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "license_renewal" | "license" => Ok(Self::LicenseRenewal),
            "board_recert" | "board" => Ok(Self::BoardRecert),
            "hospital" => Ok(Self::Hospital),
            "personal" => Ok(Self::Personal),
            other => Err(format!("unknown requirement kind '{other}'")),
        }
    }
}

/// Inclusive bounds on the completion year of eligible records.
///
/// A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearRange {
    start: Option<i32>,
    end: Option<i32>,
}

impl YearRange {
    /// A range with no bounds on either side.
    pub const UNBOUNDED: Self = Self {
        start: None,
        end: None,
    };

    /// Creates a year range.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::InvertedYearRange`] if both bounds are set
    /// and `start` is after `end`.
    pub fn new(start: Option<i32>, end: Option<i32>) -> Result<Self, RequirementError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(RequirementError::InvertedYearRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one year.
    #[must_use]
    pub const fn single(year: i32) -> Self {
        Self {
            start: Some(year),
            end: Some(year),
        }
    }

    /// The first eligible year, if bounded.
    #[must_use]
    pub const fn start(self) -> Option<i32> {
        self.start
    }

    /// The last eligible year, if bounded.
    #[must_use]
    pub const fn end(self) -> Option<i32> {
        self.end
    }

    /// Whether `year` falls inside the range.
    #[must_use]
    pub fn contains(self, year: i32) -> bool {
        self.start.is_none_or(|start| year >= start) && self.end.is_none_or(|end| year <= end)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, None) => f.write_str("any year"),
            (Some(start), Some(end)) if start == end => write!(f, "{start}"),
            (Some(start), Some(end)) => write!(f, "{start}–{end}"),
            (Some(start), None) => write!(f, "{start} onwards"),
            (None, Some(end)) => write!(f, "up to {end}"),
        }
    }
}

/// The criteria a record must meet to count towards a requirement.
///
/// Filters are conjunctive; values within one filter are alternatives. An
/// empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Acceptable credit types. Empty means any type.
    pub credit_types: CreditTypes,
    /// Acceptable provider names, matched exactly. Empty means any provider.
    pub providers: BTreeSet<String>,
    /// Acceptable subjects, matched exactly. Empty means any subject.
    pub subjects: BTreeSet<String>,
    /// Eligible completion years.
    pub years: YearRange,
}

impl Filters {
    /// Collects provider or subject names, trimming whitespace and dropping
    /// blanks.
    #[must_use]
    pub fn names<I, S>(values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(|value| value.as_ref().trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Whether no filter restricts anything.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.credit_types.is_empty()
            && self.providers.is_empty()
            && self.subjects.is_empty()
            && self.years == YearRange::UNBOUNDED
    }
}

/// A user-defined credit goal.
///
/// Progress towards the goal is never stored here; it is computed from the
/// live record set by [`crate::domain::progress::compute_progress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) kind: RequirementKind,
    pub(crate) filters: Filters,
    pub(crate) credits_required: Credits,
    pub(crate) due_date: Option<NaiveDate>,
    pub(crate) notes: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created: DateTime<Utc>,
}

impl Requirement {
    /// Construct a new, active requirement with a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is blank or `credits_required` is zero.
    pub fn new(
        name: impl Into<String>,
        kind: RequirementKind,
        filters: Filters,
        credits_required: Credits,
    ) -> Result<Self, RequirementError> {
        Self::new_with_uuid(Uuid::new_v4(), name, kind, filters, credits_required)
    }

    pub(crate) fn new_with_uuid(
        id: Uuid,
        name: impl Into<String>,
        kind: RequirementKind,
        filters: Filters,
        credits_required: Credits,
    ) -> Result<Self, RequirementError> {
        let mut requirement = Self {
            id,
            name: String::new(),
            kind,
            filters,
            credits_required: Credits::ZERO,
            due_date: None,
            notes: None,
            is_active: true,
            created: Utc::now(),
        };
        requirement.set_name(name)?;
        requirement.set_credits_required(credits_required)?;
        Ok(requirement)
    }

    /// The unique, stable identifier of this requirement.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What kind of obligation this is.
    #[must_use]
    pub const fn kind(&self) -> RequirementKind {
        self.kind
    }

    /// The matching criteria.
    #[must_use]
    pub const fn filters(&self) -> &Filters {
        &self.filters
    }

    /// The credit target.
    #[must_use]
    pub const fn credits_required(&self) -> Credits {
        self.credits_required
    }

    /// When the requirement must be met, if set.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Free text notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Whether the requirement is still being tracked.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// When the requirement was created.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Rename the requirement.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::MissingName`] if `name` is blank.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), RequirementError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RequirementError::MissingName);
        }
        self.name = trimmed.to_string();
        Ok(())
    }

    /// Change the kind of obligation.
    pub const fn set_kind(&mut self, kind: RequirementKind) {
        self.kind = kind;
    }

    /// Replace the matching criteria.
    pub fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
    }

    /// Mutable access to the matching criteria.
    pub const fn filters_mut(&mut self) -> &mut Filters {
        &mut self.filters
    }

    /// Change the credit target.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::NonPositiveTarget`] if `credits` is zero.
    pub fn set_credits_required(&mut self, credits: Credits) -> Result<(), RequirementError> {
        if credits.is_zero() {
            return Err(RequirementError::NonPositiveTarget);
        }
        self.credits_required = credits;
        Ok(())
    }

    /// Set or clear the due date.
    pub const fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
    }

    /// Set or clear the notes. Blank notes are stored as `None`.
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
    }

    /// Stop tracking the requirement while keeping it for history.
    ///
    /// Returns `true` if the requirement was active.
    pub const fn deactivate(&mut self) -> bool {
        let was_active = self.is_active;
        self.is_active = false;
        was_active
    }

    /// Resume tracking an inactive requirement.
    ///
    /// Returns `true` if the requirement was inactive.
    pub const fn reactivate(&mut self) -> bool {
        let was_inactive = !self.is_active;
        self.is_active = true;
        was_inactive
    }
}

/// A requirement failed validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequirementError {
    /// The name is blank.
    #[error("requirement name must not be blank")]
    MissingName,
    /// The credit target is zero.
    #[error("credits required must be greater than zero")]
    NonPositiveTarget,
    /// The start year is after the end year.
    #[error("start year {start} is after end year {end}")]
    InvertedYearRange {
        /// First year.
        start: i32,
        /// Last year.
        end: i32,
    },
}
