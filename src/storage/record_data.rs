// On-disk shape of certificates and self-reported activities.
//
// Files have been written with a scalar `credit_type`, a `credit_types` list,
// or both. Both shapes are accepted here and normalized before a domain
// record is built.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CreditRecord, CreditTypes, Credits, RecordError, RecordSource};

/// A record as stored in a YAML file.
///
/// The record's UUID is the file stem and the source is the directory, so
/// neither is repeated in the file body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    /// Activity title.
    pub title: String,
    /// Issuing organization.
    pub provider: String,
    /// Credits awarded.
    pub credits: Decimal,
    /// Credit-type tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credit_types: Vec<String>,
    /// Legacy single credit-type tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_type: Option<String>,
    /// Topic of the activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Completion date (`YYYY-MM-DD`).
    pub completion_date: NaiveDate,
    /// Expiration date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<NaiveDate>,
    /// Certificate number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_number: Option<String>,
    /// When the record was entered. Older files lack this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl RecordData {
    /// Validates the data and builds a domain record.
    ///
    /// # Errors
    ///
    /// Returns an error if the credits are negative, the title or provider
    /// is blank, or the certificate expires before it was completed.
    pub fn into_record(self, id: Uuid, source: RecordSource) -> Result<CreditRecord, RecordError> {
        let credit_types = CreditTypes::normalize(&self.credit_types, self.credit_type.as_deref());
        let credits = Credits::new(self.credits)?;

        let mut record = CreditRecord::new_with_uuid(
            id,
            source,
            self.title,
            self.provider,
            credits,
            self.completion_date,
        )?
        .with_credit_types(credit_types)
        .with_subject(self.subject)
        .with_certificate_number(self.certificate_number)
        .with_expiration_date(self.expiration_date)?;

        if let Some(created) = self.created {
            record.created = created;
        }
        Ok(record)
    }
}

impl From<&CreditRecord> for RecordData {
    fn from(record: &CreditRecord) -> Self {
        Self {
            title: record.title.clone(),
            provider: record.provider.clone(),
            credits: record.credits.value(),
            credit_types: record.credit_types.clone().into(),
            // kept for readers that only understand the scalar field
            credit_type: record.credit_types.first().map(ToString::to_string),
            subject: record.subject.clone(),
            completion_date: record.completion_date,
            expiration_date: record.expiration_date,
            certificate_number: record.certificate_number.clone(),
            created: Some(record.created),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::CreditsError;

    fn parse(yaml: &str) -> Result<CreditRecord, RecordError> {
        let data: RecordData = serde_yaml::from_str(yaml).unwrap();
        data.into_record(Uuid::new_v4(), RecordSource::Certificate)
    }

    #[test]
    fn legacy_scalar_shape_is_normalized() {
        let legacy = parse(
            "title: ACLS\nprovider: AHA\ncredits: 4\ncredit_type: ama_cat1\ncompletion_date: 2025-02-01\n",
        )
        .unwrap();
        let list = parse(
            "title: ACLS\nprovider: AHA\ncredits: 4\ncredit_types: [ama_cat1]\ncompletion_date: 2025-02-01\n",
        )
        .unwrap();

        assert_eq!(legacy.credit_types(), list.credit_types());
    }

    #[test]
    fn fractional_credits_are_exact() {
        let record = parse(
            "title: Grand Rounds\nprovider: Mayo Clinic\ncredits: 0.1\ncompletion_date: 2025-02-01\n",
        )
        .unwrap();
        assert_eq!(record.credits().value(), dec!(0.1));
    }

    #[test]
    fn negative_credits_are_rejected() {
        let error = parse(
            "title: Grand Rounds\nprovider: Mayo Clinic\ncredits: -1\ncompletion_date: 2025-02-01\n",
        )
        .unwrap_err();
        assert!(matches!(error, RecordError::InvalidCredits(_)));
    }

    #[test]
    fn implausibly_large_credits_are_rejected() {
        let error = parse(
            "title: Grand Rounds\nprovider: Mayo Clinic\ncredits: '79228162514264337593543950335'\ncompletion_date: 2025-02-01\n",
        )
        .unwrap_err();
        assert!(matches!(
            error,
            RecordError::InvalidCredits(CreditsError::TooLarge(_))
        ));
    }

    #[test]
    fn missing_completion_date_fails_to_parse() {
        let result: Result<RecordData, _> =
            serde_yaml::from_str("title: A\nprovider: B\ncredits: 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn round_trip_writes_both_shapes() {
        let record = parse(
            "title: Board review\nprovider: ABIM\ncredits: 2.25\ncredit_types: [moc, ama_cat1]\nsubject: Cardiology\ncompletion_date: 2024-11-30\n",
        )
        .unwrap();

        let data = RecordData::from(&record);
        assert_eq!(data.credit_type.as_deref(), Some("ama_cat1"));
        assert_eq!(data.credit_types, vec!["ama_cat1", "moc"]);

        let yaml = serde_yaml::to_string(&data).unwrap();
        let reloaded: RecordData = serde_yaml::from_str(&yaml).unwrap();
        let reloaded = reloaded
            .into_record(record.id(), RecordSource::Certificate)
            .unwrap();
        assert_eq!(reloaded, record);
    }
}
