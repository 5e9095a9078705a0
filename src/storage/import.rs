//! Bulk import of records from a YAML list.
//!
//! Each list item is decoded on its own so one malformed row does not stop
//! the rest from being imported.

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{CreditRecord, CreditTypes, Credits, RecordError, RecordSource};

/// One row of an import file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportRow {
    /// Where the row came from. Defaults to a certificate.
    #[serde(default)]
    pub source: Option<RecordSource>,
    /// Activity title.
    pub title: String,
    /// Issuing organization.
    pub provider: String,
    /// Credits awarded. Missing means zero.
    #[serde(default)]
    pub credits: Decimal,
    /// Credit-type tags, as a list or a comma separated string.
    #[serde(default)]
    pub credit_types: Tags,
    /// Legacy single credit-type tag.
    #[serde(default)]
    pub credit_type: Option<String>,
    /// Topic.
    #[serde(default)]
    pub subject: Option<String>,
    /// Completion date.
    pub completion_date: NaiveDate,
    /// Expiration date.
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    /// Certificate number.
    #[serde(default)]
    pub certificate_number: Option<String>,
}

/// Credit-type tags written either as a YAML list or as `"a, b"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    /// `[a, b]`
    List(Vec<String>),
    /// `"a, b"`
    Joined(String),
    /// No tags.
    #[default]
    None,
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(tags) => tags,
            Self::Joined(tags) => tags.split(',').map(str::to_string).collect(),
            Self::None => Vec::new(),
        }
    }
}

impl ImportRow {
    /// Validates the row and builds a new record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if the row would not make a valid record.
    pub fn into_record(self) -> Result<CreditRecord, RecordError> {
        let credit_types =
            CreditTypes::normalize(self.credit_types.into_vec(), self.credit_type.as_deref());

        CreditRecord::new_with_uuid(
            Uuid::new_v4(),
            self.source.unwrap_or(RecordSource::Certificate),
            self.title,
            self.provider,
            Credits::new(self.credits)?,
            self.completion_date,
        )?
        .with_credit_types(credit_types)
        .with_subject(self.subject)
        .with_certificate_number(self.certificate_number)
        .with_expiration_date(self.expiration_date)
    }
}

/// The outcome of an import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Ids of the records that were saved, in row order.
    pub imported: Vec<Uuid>,
    /// Rejected rows as `(row number, reason)`. Rows are numbered from one.
    pub errors: Vec<(usize, String)>,
}

/// Failed to read an import file.
#[derive(Debug, thiserror::Error)]
pub enum ImportFileError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The import file.
        path: std::path::PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The file is not a YAML list.
    #[error("import file must be a YAML list of records: {0}")]
    NotAList(#[from] serde_yaml::Error),
}

/// Reads an import file, decoding each row independently.
///
/// # Errors
///
/// Fails only if the file cannot be read or is not a YAML list. Rows that
/// fail to decode are returned as `Err` with the reason.
pub fn read_rows(path: &Path) -> Result<Vec<Result<ImportRow, String>>, ImportFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rows(&content)
}

fn parse_rows(content: &str) -> Result<Vec<Result<ImportRow, String>>, ImportFileError> {
    let values: Vec<serde_yaml::Value> = serde_yaml::from_str(content)?;
    Ok(values
        .into_iter()
        .map(|value| serde_yaml::from_value(value).map_err(|e| e.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use super::*;
    use crate::storage::Ledger;

    const FILE: &str = r#"
- title: ACLS
  provider: AHA
  credits: 4
  credit_types: "ama_cat1, moc"
  completion_date: 2025-03-01
- title: Missing date
  provider: AHA
  credits: 1
- title: Journal club
  provider: Self
  source: self-reported
  credits: 0.5
  credit_type: ama_cat2
  completion_date: 2025-04-02
- title: Bad credits
  provider: AHA
  credits: -2
  completion_date: 2025-04-02
"#;

    #[test]
    fn joined_tags_are_split() {
        let rows = parse_rows(FILE).unwrap();
        let record = rows[0].clone().unwrap().into_record().unwrap();
        assert_eq!(
            record.credit_types(),
            &CreditTypes::normalize(["ama_cat1", "moc"], None)
        );
    }

    #[test]
    fn non_list_file_is_rejected() {
        assert!(parse_rows("title: ACLS\n").is_err());
    }

    #[test]
    fn import_saves_valid_rows_and_reports_the_rest() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = Ledger::new(tmp.path().to_path_buf()).load_all().unwrap();

        let report = ledger.import(parse_rows(FILE).unwrap());

        assert_eq!(report.imported.len(), 2);
        let failed: Vec<usize> = report.errors.iter().map(|(row, _)| *row).collect();
        assert_eq!(failed, vec![2, 4]);

        let reloaded = Ledger::new(tmp.path().to_path_buf()).load_all().unwrap();
        assert_eq!(reloaded.records().len(), 2);
        let journal = reloaded
            .records()
            .iter()
            .find(|r| r.source() == RecordSource::SelfReported)
            .unwrap();
        assert_eq!(journal.credits().value(), dec!(0.5));
    }
}
