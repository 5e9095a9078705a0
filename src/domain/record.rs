use std::{fmt, iter::Sum, ops::Add, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::CreditTypes;

/// A non-negative, exact credit amount of at most [`Credits::MAX`].
///
/// Credits are usually awarded in quarter or half increments, so they are
/// held as a [`Decimal`] to keep sums exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Credits(Decimal);

impl Credits {
    /// Zero credits.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest amount a single record or requirement may carry.
    pub const MAX: Self = Self(Decimal::from_parts(10_000, 0, 0, false, 0));

    /// Creates a credit amount.
    ///
    /// # Errors
    ///
    /// Returns [`CreditsError`] if `value` is below zero or above
    /// [`Credits::MAX`].
    pub fn new(value: Decimal) -> Result<Self, CreditsError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CreditsError::Negative(value));
        }
        if value > Self::MAX.0 {
            return Err(CreditsError::TooLarge(value));
        }
        Ok(Self(value))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Credits {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Credits {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl TryFrom<Decimal> for Credits {
    type Error = CreditsError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Credits {
    type Err = ParseCreditsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| ParseCreditsError::NotANumber(s.to_string()))?;
        Ok(Self::new(value)?)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// A credit amount outside `0..=Credits::MAX` was supplied.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CreditsError {
    /// The amount is below zero.
    #[error("credits must not be negative (got {0})")]
    Negative(Decimal),
    /// The amount is above [`Credits::MAX`].
    #[error("credits must not exceed {max} (got {0})", max = Credits::MAX)]
    TooLarge(Decimal),
}

/// Errors from parsing a credit amount from text.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseCreditsError {
    /// The text is not a decimal number.
    #[error("'{0}' is not a decimal number")]
    NotANumber(String),
    /// The number is out of range.
    #[error(transparent)]
    OutOfRange(#[from] CreditsError),
}

/// Where a record came from.
///
/// Both sources are matched against requirements in exactly the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// A certificate issued by a CME provider.
    Certificate,
    /// An activity the clinician reported themselves.
    #[serde(alias = "self-reported")]
    SelfReported,
}

impl RecordSource {
    /// Both sources, in storage order.
    pub const ALL: [Self; 2] = [Self::Certificate, Self::SelfReported];

    /// Stable machine readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::SelfReported => "self_reported",
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "certificate" | "cert" => Ok(Self::Certificate),
            "self_reported" | "self" => Ok(Self::SelfReported),
            other => Err(format!(
                "unknown record source '{other}' (expected 'certificate' or 'self-reported')"
            )),
        }
    }
}

/// A completed learning activity that earns credits.
///
/// This is either a certificate or a self-reported activity. Records are
/// validated on construction; anything reaching the progress engine is
/// well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRecord {
    pub(crate) id: Uuid,
    pub(crate) source: RecordSource,
    pub(crate) title: String,
    pub(crate) credit_types: CreditTypes,
    pub(crate) provider: String,
    pub(crate) subject: Option<String>,
    pub(crate) credits: Credits,
    pub(crate) completion_date: NaiveDate,
    pub(crate) expiration_date: Option<NaiveDate>,
    pub(crate) certificate_number: Option<String>,
    pub(crate) created: DateTime<Utc>,
}

impl CreditRecord {
    /// Construct a new record with a fresh UUID and no credit types or
    /// subject.
    ///
    /// # Errors
    ///
    /// Returns an error if `title` or `provider` is blank.
    pub fn new(
        source: RecordSource,
        title: impl Into<String>,
        provider: impl Into<String>,
        credits: Credits,
        completion_date: NaiveDate,
    ) -> Result<Self, RecordError> {
        Self::new_with_uuid(
            Uuid::new_v4(),
            source,
            title,
            provider,
            credits,
            completion_date,
        )
    }

    pub(crate) fn new_with_uuid(
        id: Uuid,
        source: RecordSource,
        title: impl Into<String>,
        provider: impl Into<String>,
        credits: Credits,
        completion_date: NaiveDate,
    ) -> Result<Self, RecordError> {
        let title = non_blank(title.into(), RecordError::MissingTitle)?;
        let provider = non_blank(provider.into(), RecordError::MissingProvider)?;

        Ok(Self {
            id,
            source,
            title,
            credit_types: CreditTypes::new(),
            provider,
            subject: None,
            credits,
            completion_date,
            expiration_date: None,
            certificate_number: None,
            created: Utc::now(),
        })
    }

    /// Replace the record's credit types.
    #[must_use]
    pub fn with_credit_types(mut self, credit_types: CreditTypes) -> Self {
        self.credit_types = credit_types;
        self
    }

    /// Set the record's subject. Blank subjects are stored as `None`.
    #[must_use]
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.set_subject(subject);
        self
    }

    /// Set the certificate's expiration date.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ExpiresBeforeCompletion`] if the date precedes
    /// the completion date.
    pub fn with_expiration_date(mut self, date: Option<NaiveDate>) -> Result<Self, RecordError> {
        self.set_expiration_date(date)?;
        Ok(self)
    }

    /// Set the certificate number printed on the certificate.
    #[must_use]
    pub fn with_certificate_number(mut self, number: Option<String>) -> Self {
        self.set_certificate_number(number);
        self
    }

    /// Move the record to another source.
    pub const fn set_source(&mut self, source: RecordSource) {
        self.source = source;
    }

    /// Replace the title.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingTitle`] if `title` is blank.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), RecordError> {
        self.title = non_blank(title.into(), RecordError::MissingTitle)?;
        Ok(())
    }

    /// Replace the provider.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingProvider`] if `provider` is blank.
    pub fn set_provider(&mut self, provider: impl Into<String>) -> Result<(), RecordError> {
        self.provider = non_blank(provider.into(), RecordError::MissingProvider)?;
        Ok(())
    }

    /// Replace the credits awarded.
    pub const fn set_credits(&mut self, credits: Credits) {
        self.credits = credits;
    }

    /// Replace the credit types.
    pub fn set_credit_types(&mut self, credit_types: CreditTypes) {
        self.credit_types = credit_types;
    }

    /// Replace the subject. Blank subjects are stored as `None`.
    pub fn set_subject(&mut self, subject: Option<String>) {
        self.subject = subject.and_then(|s| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });
    }

    /// Change the completion date.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ExpiresBeforeCompletion`] if the record already
    /// expires before `date`.
    pub fn set_completion_date(&mut self, date: NaiveDate) -> Result<(), RecordError> {
        if let Some(expires) = self.expiration_date.filter(|expires| *expires < date) {
            return Err(RecordError::ExpiresBeforeCompletion {
                completed: date,
                expires,
            });
        }
        self.completion_date = date;
        Ok(())
    }

    /// Change or clear the expiration date.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::ExpiresBeforeCompletion`] if the date precedes
    /// the completion date.
    pub fn set_expiration_date(&mut self, date: Option<NaiveDate>) -> Result<(), RecordError> {
        if let Some(expires) = date.filter(|expires| *expires < self.completion_date) {
            return Err(RecordError::ExpiresBeforeCompletion {
                completed: self.completion_date,
                expires,
            });
        }
        self.expiration_date = date;
        Ok(())
    }

    /// Change or clear the certificate number.
    pub fn set_certificate_number(&mut self, number: Option<String>) {
        self.certificate_number = number.filter(|n| !n.trim().is_empty());
    }

    /// The unique, stable identifier of this record.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Whether this is a certificate or a self-reported activity.
    #[must_use]
    pub const fn source(&self) -> RecordSource {
        self.source
    }

    /// The activity title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The normalized credit types this record satisfies.
    #[must_use]
    pub const fn credit_types(&self) -> &CreditTypes {
        &self.credit_types
    }

    /// The issuing organization.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The topic of the activity, if recorded.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Credits awarded.
    #[must_use]
    pub const fn credits(&self) -> Credits {
        self.credits
    }

    /// When the activity was completed.
    #[must_use]
    pub const fn completion_date(&self) -> NaiveDate {
        self.completion_date
    }

    /// The calendar year of completion, used for year range filtering.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.completion_date.year()
    }

    /// When the certificate expires, if it does.
    #[must_use]
    pub const fn expiration_date(&self) -> Option<NaiveDate> {
        self.expiration_date
    }

    /// The certificate number, if any.
    #[must_use]
    pub fn certificate_number(&self) -> Option<&str> {
        self.certificate_number.as_deref()
    }

    /// When the record was entered.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

fn non_blank(value: String, error: RecordError) -> Result<String, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(error)
    } else {
        Ok(trimmed.to_string())
    }
}

/// A record failed validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// The title is blank.
    #[error("record title must not be blank")]
    MissingTitle,
    /// The provider is blank.
    #[error("record provider must not be blank")]
    MissingProvider,
    /// The credit amount is out of range.
    #[error(transparent)]
    InvalidCredits(#[from] CreditsError),
    /// The certificate expires before it was earned.
    #[error("expiration date {expires} is before completion date {completed}")]
    ExpiresBeforeCompletion {
        /// Completion date.
        completed: NaiveDate,
        /// Expiration date.
        expires: NaiveDate,
    },
}
