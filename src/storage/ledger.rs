//! A filesystem backed store of credit records and requirements.
//!
//! The [`Ledger`] keeps one YAML file per record or requirement:
//!
//! ```text
//! .cme/config.toml
//! certificates/<uuid>.yaml
//! self-reported/<uuid>.yaml
//! requirements/<uuid>.yaml
//! ```
//!
//! Loading is the validation boundary: every file is parsed and checked
//! before anything reaches the domain layer, so the progress engine only ever
//! sees well-formed values.

use std::{
    ffi::OsStr,
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use rayon::iter::{Either, IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::{
    domain::{
        Config, ConfigError, CreditRecord, Progress, RecordError, RecordSource, Requirement,
        RequirementError, compute_all, compute_progress,
        report::{self, YearSummary},
    },
    storage::{
        import::{ImportReport, ImportRow},
        record_data::RecordData,
        requirement_data::{RequirementData, RequirementDataError},
    },
};

/// Directory holding ledger metadata.
pub const META_DIR: &str = ".cme";
const CONFIG_FILE: &str = "config.toml";
const REQUIREMENTS_DIR: &str = "requirements";

/// Directory holding records from `source`.
#[must_use]
pub const fn records_dir(source: RecordSource) -> &'static str {
    match source {
        RecordSource::Certificate => "certificates",
        RecordSource::SelfReported => "self-reported",
    }
}

/// The loaded contents of a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    config: Config,
    records: Vec<CreditRecord>,
    requirements: Vec<Requirement>,
}

/// A ledger that has not been read from disk yet.
#[derive(Debug, PartialEq, Eq)]
pub struct Unloaded;

/// A filesystem backed store of credit records and requirements.
#[derive(Debug)]
pub struct Ledger<S> {
    /// The root of the directory the ledger is stored in.
    root: PathBuf,
    state: S,
}

impl<S> Ledger<S> {
    /// The root directory of the ledger.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(META_DIR).join(CONFIG_FILE)
    }
}

impl Ledger<Unloaded> {
    /// Opens a ledger at the given path.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Unloaded,
        }
    }

    /// Create the ledger layout and write `config`.
    ///
    /// # Errors
    ///
    /// Fails if the metadata directory already exists or any directory or
    /// file cannot be created.
    pub fn init(self, config: Config) -> Result<Ledger<Loaded>, InitError> {
        let meta = self.root.join(META_DIR);
        if meta.exists() {
            return Err(InitError::AlreadyInitialized(meta));
        }

        std::fs::create_dir_all(&meta)?;
        config.save(&self.config_path())?;
        for dir in RecordSource::ALL
            .map(records_dir)
            .into_iter()
            .chain([REQUIREMENTS_DIR])
        {
            std::fs::create_dir_all(self.root.join(dir))?;
        }

        tracing::info!("Initialized ledger in {}", self.root.display());

        Ok(Ledger {
            root: self.root,
            state: Loaded {
                config,
                records: Vec::new(),
                requirements: Vec::new(),
            },
        })
    }

    /// Load all records and requirements from disk.
    ///
    /// # Errors
    ///
    /// Fails if the configuration file exists but cannot be read. Files that
    /// fail to parse or validate are collected into
    /// [`LedgerLoadError::InvalidFiles`], unless `allow_invalid_records` is set
    /// in the configuration, in which case they are skipped with a warning.
    pub fn load_all(self) -> Result<Ledger<Loaded>, LedgerLoadError> {
        let (ledger, invalid) = self.load_lenient()?;

        if !invalid.is_empty() {
            if !ledger.config().allow_invalid_records {
                return Err(LedgerLoadError::InvalidFiles(invalid));
            }
            for file in &invalid {
                tracing::warn!("Skipping {file}");
            }
        }

        Ok(ledger)
    }

    /// Load every valid file, returning the invalid ones alongside the ledger
    /// whatever the configuration says.
    ///
    /// # Errors
    ///
    /// Fails if the configuration file exists but cannot be read.
    pub fn load_lenient(self) -> Result<(Ledger<Loaded>, Vec<InvalidFile>), ConfigError> {
        let config = load_config(&self.config_path())?;

        let record_paths: Vec<(PathBuf, RecordSource)> = RecordSource::ALL
            .into_iter()
            .flat_map(|source| {
                collect_yaml_paths(&self.root.join(records_dir(source)))
                    .into_iter()
                    .map(move |path| (path, source))
            })
            .collect();
        let requirement_paths = collect_yaml_paths(&self.root.join(REQUIREMENTS_DIR));

        let (mut records, mut invalid): (Vec<_>, Vec<_>) = record_paths
            .par_iter()
            .map(|(path, source)| load_record(path, *source))
            .partition_map(split_result);

        let (mut requirements, invalid_requirements): (Vec<_>, Vec<_>) = requirement_paths
            .par_iter()
            .map(|path| load_requirement(path))
            .partition_map(split_result);
        invalid.extend(invalid_requirements);
        invalid.sort_by(|a, b| a.path.cmp(&b.path));

        records.sort_by(|a, b| {
            a.completion_date()
                .cmp(&b.completion_date())
                .then_with(|| a.id().cmp(&b.id()))
        });
        requirements.sort_by(|a, b| {
            a.created()
                .cmp(&b.created())
                .then_with(|| a.id().cmp(&b.id()))
        });

        tracing::debug!(
            "Loaded {} records and {} requirements from {} ({} invalid files)",
            records.len(),
            requirements.len(),
            self.root.display(),
            invalid.len()
        );

        let ledger = Ledger {
            root: self.root,
            state: Loaded {
                config,
                records,
                requirements,
            },
        };
        Ok((ledger, invalid))
    }
}

fn split_result<T>(result: Result<T, InvalidFile>) -> Either<T, InvalidFile> {
    match result {
        Ok(value) => Either::Left(value),
        Err(error) => Either::Right(error),
    }
}

fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match Config::load(path) {
        Err(ConfigError::Read(e)) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
        result => result,
    }
}

fn collect_yaml_paths(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(OsStr::to_str),
                Some("yaml" | "yml")
            )
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn id_from_path(path: &Path) -> Result<Uuid, LoadError> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .and_then(|stem| Uuid::parse_str(stem).ok())
        .ok_or(LoadError::InvalidFileName)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let file = File::open(path)?;
    Ok(serde_yaml::from_reader(BufReader::new(file))?)
}

fn load_record(path: &Path, source: RecordSource) -> Result<CreditRecord, InvalidFile> {
    let load = || -> Result<CreditRecord, LoadError> {
        let id = id_from_path(path)?;
        let data: RecordData = read_yaml(path)?;
        Ok(data.into_record(id, source)?)
    };
    load().map_err(|error| InvalidFile::new(path, error))
}

fn load_requirement(path: &Path) -> Result<Requirement, InvalidFile> {
    let load = || -> Result<Requirement, LoadError> {
        let id = id_from_path(path)?;
        let data: RequirementData = read_yaml(path)?;
        Ok(data.into_requirement(id)?)
    };
    load().map_err(|error| InvalidFile::new(path, error))
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), SaveError> {
    let io_error = |source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_yaml::to_writer(&mut writer, value)?;
    writer.flush().map_err(io_error)
}

impl Ledger<Loaded> {
    /// The ledger configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.state.config
    }

    /// Mutable access to the configuration. Call [`Self::save_config`] to
    /// persist changes.
    pub const fn config_mut(&mut self) -> &mut Config {
        &mut self.state.config
    }

    /// Write the configuration to disk.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        let path = self.config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        self.state.config.save(&path)
    }

    /// All records, oldest completion first.
    #[must_use]
    pub fn records(&self) -> &[CreditRecord] {
        &self.state.records
    }

    /// All requirements, including inactive ones, in creation order.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.state.requirements
    }

    fn record_path(&self, source: RecordSource, id: Uuid) -> PathBuf {
        self.root.join(records_dir(source)).join(format!("{id}.yaml"))
    }

    fn requirement_path(&self, id: Uuid) -> PathBuf {
        self.root.join(REQUIREMENTS_DIR).join(format!("{id}.yaml"))
    }

    /// Save a new record and add it to the ledger.
    ///
    /// # Errors
    ///
    /// Fails if the record file cannot be written.
    pub fn add_record(&mut self, record: CreditRecord) -> Result<&CreditRecord, SaveError> {
        write_yaml(
            &self.record_path(record.source(), record.id()),
            &RecordData::from(&record),
        )?;
        tracing::info!("Added {} record {}", record.source(), record.id());

        let index = self.state.records.len();
        self.state.records.push(record);
        Ok(&self.state.records[index])
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Fails if no record has the given id or its file cannot be removed.
    pub fn remove_record(&mut self, id: Uuid) -> Result<CreditRecord, LedgerError> {
        let position = self
            .state
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| LookupError::not_found("record", id))?;

        let path = self.record_path(self.state.records[position].source(), id);
        std::fs::remove_file(&path).map_err(|source| SaveError::Io { path, source })?;

        tracing::info!("Removed record {id}");
        Ok(self.state.records.remove(position))
    }

    /// Apply `edit` to a record and save it.
    ///
    /// The edit runs on a copy; if it fails, or the file cannot be written,
    /// the ledger is left unchanged. A change of source moves the file to the
    /// other source's directory.
    ///
    /// # Errors
    ///
    /// Fails if no record has the given id, the edit is rejected, or the file
    /// cannot be written.
    pub fn update_record<F>(&mut self, id: Uuid, edit: F) -> Result<&CreditRecord, LedgerError>
    where
        F: FnOnce(&mut CreditRecord) -> Result<(), RecordError>,
    {
        let position = self
            .state
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| LookupError::not_found("record", id))?;

        let previous_source = self.state.records[position].source();
        let mut updated = self.state.records[position].clone();
        edit(&mut updated)?;

        let path = self.record_path(updated.source(), id);
        write_yaml(&path, &RecordData::from(&updated))?;
        if updated.source() != previous_source {
            let old_path = self.record_path(previous_source, id);
            if let Err(source) = std::fs::remove_file(&old_path) {
                let _ = std::fs::remove_file(&path);
                return Err(SaveError::Io {
                    path: old_path,
                    source,
                }
                .into());
            }
            tracing::debug!(
                "Moved record {id} from {previous_source} to {}",
                updated.source()
            );
        }

        tracing::info!("Updated record {id}");
        self.state.records[position] = updated;
        Ok(&self.state.records[position])
    }

    /// Save a new requirement and add it to the ledger.
    ///
    /// # Errors
    ///
    /// Fails if the requirement file cannot be written.
    pub fn add_requirement(&mut self, requirement: Requirement) -> Result<&Requirement, SaveError> {
        write_yaml(
            &self.requirement_path(requirement.id()),
            &RequirementData::from(&requirement),
        )?;
        tracing::info!("Added requirement {} ({})", requirement.name(), requirement.id());

        let index = self.state.requirements.len();
        self.state.requirements.push(requirement);
        Ok(&self.state.requirements[index])
    }

    /// Apply `edit` to a requirement and save it.
    ///
    /// The edit runs on a copy; if it fails, or the file cannot be written,
    /// the ledger is left unchanged.
    ///
    /// # Errors
    ///
    /// Fails if no requirement has the given id, the edit is rejected, or the
    /// file cannot be written.
    pub fn update_requirement<F>(&mut self, id: Uuid, edit: F) -> Result<&Requirement, LedgerError>
    where
        F: FnOnce(&mut Requirement) -> Result<(), RequirementError>,
    {
        let position = self
            .state
            .requirements
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| LookupError::not_found("requirement", id))?;

        let mut updated = self.state.requirements[position].clone();
        edit(&mut updated)?;
        write_yaml(&self.requirement_path(id), &RequirementData::from(&updated))?;

        tracing::info!("Updated requirement {} ({id})", updated.name());
        self.state.requirements[position] = updated;
        Ok(&self.state.requirements[position])
    }

    /// Permanently delete a requirement.
    ///
    /// Records are never touched.
    ///
    /// # Errors
    ///
    /// Fails if no requirement has the given id or its file cannot be
    /// removed.
    pub fn delete_requirement(&mut self, id: Uuid) -> Result<Requirement, LedgerError> {
        let position = self
            .state
            .requirements
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| LookupError::not_found("requirement", id))?;

        let path = self.requirement_path(id);
        std::fs::remove_file(&path).map_err(|source| SaveError::Io { path, source })?;

        tracing::info!("Deleted requirement {id}");
        Ok(self.state.requirements.remove(position))
    }

    /// Find a requirement by full id or unique id prefix.
    ///
    /// # Errors
    ///
    /// Fails if nothing matches, or more than one requirement matches the
    /// prefix.
    pub fn find_requirement(&self, id: &str) -> Result<&Requirement, LookupError> {
        find_by_prefix("requirement", &self.state.requirements, id, Requirement::id)
    }

    /// Find a record by full id or unique id prefix.
    ///
    /// # Errors
    ///
    /// Fails if nothing matches, or more than one record matches the prefix.
    pub fn find_record(&self, id: &str) -> Result<&CreditRecord, LookupError> {
        find_by_prefix("record", &self.state.records, id, CreditRecord::id)
    }

    /// Progress towards one requirement, computed from the current records.
    #[must_use]
    pub fn progress(&self, requirement: &Requirement) -> Progress {
        compute_progress(requirement, &self.state.records)
    }

    /// Progress towards every requirement from a single snapshot of the
    /// records. Inactive requirements are skipped unless
    /// `include_inactive` is set.
    #[must_use]
    pub fn progress_all(&self, include_inactive: bool) -> Vec<(&Requirement, Progress)> {
        compute_all(&self.state.requirements, &self.state.records)
            .into_iter()
            .filter(|(requirement, _)| include_inactive || requirement.is_active())
            .collect()
    }

    /// Credits completed in `year`, grouped by credit type.
    #[must_use]
    pub fn summary(&self, year: i32) -> YearSummary {
        report::summarize_year(&self.state.records, year)
    }

    /// One summary per year from `start` to `end`.
    #[must_use]
    pub fn year_over_year(&self, start: i32, end: i32) -> Vec<YearSummary> {
        report::year_over_year(&self.state.records, start, end)
    }

    /// Active requirements due on or after `today`, up to the configured
    /// limit.
    #[must_use]
    pub fn upcoming_deadlines(&self, today: NaiveDate) -> Vec<&Requirement> {
        report::upcoming_deadlines(
            &self.state.requirements,
            today,
            self.state.config.upcoming_limit(),
        )
    }

    /// Import many records, saving each valid row and collecting the errors
    /// of the rest.
    ///
    /// Rows are numbered from one.
    pub fn import(&mut self, rows: Vec<Result<ImportRow, String>>) -> ImportReport {
        let mut report = ImportReport::default();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let outcome = row
                .and_then(|row| row.into_record().map_err(|e| e.to_string()))
                .and_then(|record| {
                    self.add_record(record)
                        .map(CreditRecord::id)
                        .map_err(|e| e.to_string())
                });

            match outcome {
                Ok(id) => report.imported.push(id),
                Err(error) => {
                    tracing::debug!("Import row {row_number} rejected: {error}");
                    report.errors.push((row_number, error));
                }
            }
        }

        report
    }
}

fn find_by_prefix<'a, T>(
    kind: &'static str,
    items: &'a [T],
    id: &str,
    key: impl Fn(&T) -> Uuid,
) -> Result<&'a T, LookupError> {
    let needle = id.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(LookupError::NotFound {
            kind,
            id: id.to_string(),
        });
    }

    let mut matches = items
        .iter()
        .filter(|item| key(item).to_string().starts_with(&needle));

    match (matches.next(), matches.count()) {
        (Some(item), 0) => Ok(item),
        (Some(_), rest) => Err(LookupError::Ambiguous {
            kind,
            id: id.to_string(),
            count: rest + 1,
        }),
        (None, _) => Err(LookupError::NotFound {
            kind,
            id: id.to_string(),
        }),
    }
}

/// Failed to create a new ledger.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// A ledger already exists at the root.
    #[error("Ledger already initialized (found existing {})", .0.display())]
    AlreadyInitialized(PathBuf),
    /// A directory could not be created.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The configuration could not be written.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a single file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The file is not valid YAML for its kind.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    /// The file stem is not a UUID.
    #[error("file name is not a UUID")]
    InvalidFileName,
    /// The record failed validation.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The requirement failed validation.
    #[error(transparent)]
    Requirement(#[from] RequirementDataError),
}

/// A file that failed to load, and why.
#[derive(Debug)]
pub struct InvalidFile {
    /// Path to the file.
    pub path: PathBuf,
    /// The failure.
    pub error: LoadError,
}

impl InvalidFile {
    fn new(path: &Path, error: LoadError) -> Self {
        Self {
            path: path.to_path_buf(),
            error,
        }
    }
}

impl fmt::Display for InvalidFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Failed to load a ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerLoadError {
    /// The configuration file could not be read.
    Config(#[from] ConfigError),
    /// One or more files failed to parse or validate.
    InvalidFiles(Vec<InvalidFile>),
}

impl fmt::Display for LedgerLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(error) => write!(f, "{error}"),
            Self::InvalidFiles(files) => {
                write!(f, "Invalid files: ")?;
                for (i, file) in files.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{file}")?;
                }
                Ok(())
            }
        }
    }
}

/// Failed to write a file.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Filesystem error.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// Serialization error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// A record or requirement could not be found.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing matched.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// What was being looked up.
        kind: &'static str,
        /// The id or prefix supplied.
        id: String,
    },
    /// The prefix matched several items.
    #[error("{kind} id '{id}' is ambiguous ({count} matches); use more characters")]
    Ambiguous {
        /// What was being looked up.
        kind: &'static str,
        /// The prefix supplied.
        id: String,
        /// How many items matched.
        count: usize,
    },
}

impl LookupError {
    fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// A ledger mutation failed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The target does not exist.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// The requirement edit was rejected.
    #[error(transparent)]
    Invalid(#[from] RequirementError),
    /// The record edit was rejected.
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
    /// The change could not be persisted.
    #[error(transparent)]
    Save(#[from] SaveError),
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{CreditTypes, Credits, Filters, RequirementKind, YearRange};

    fn setup_temp_ledger() -> (TempDir, Ledger<Loaded>) {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let path = tmp.path().to_path_buf();
        (tmp, Ledger::new(path).init(Config::default()).unwrap())
    }

    fn reload(ledger: &Ledger<Loaded>) -> Ledger<Loaded> {
        Ledger::new(ledger.root().to_path_buf()).load_all().unwrap()
    }

    fn certificate(provider: &str, credits: rust_decimal::Decimal, completed: &str) -> CreditRecord {
        CreditRecord::new(
            RecordSource::Certificate,
            "Course",
            provider,
            Credits::new(credits).unwrap(),
            completed.parse().unwrap(),
        )
        .unwrap()
        .with_credit_types(CreditTypes::normalize(["ama_cat1"], None))
    }

    fn licence(target: rust_decimal::Decimal) -> Requirement {
        Requirement::new(
            "State licence",
            RequirementKind::LicenseRenewal,
            Filters {
                credit_types: CreditTypes::normalize(["ama_cat1"], None),
                ..Filters::default()
            },
            Credits::new(target).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn init_twice_fails() {
        let (tmp, _ledger) = setup_temp_ledger();
        let result = Ledger::new(tmp.path().to_path_buf()).init(Config::default());
        assert!(matches!(result, Err(InitError::AlreadyInitialized(_))));
    }

    #[test]
    fn uninitialized_root_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new(tmp.path().to_path_buf()).load_all().unwrap();
        assert!(ledger.records().is_empty());
        assert_eq!(ledger.config(), &Config::default());
    }

    #[test]
    fn load_all_reads_all_saved_files() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let record = certificate("Mayo Clinic", dec!(2.5), "2025-01-10");
        let self_reported = CreditRecord::new(
            RecordSource::SelfReported,
            "Journal club",
            "Self",
            Credits::new(dec!(1)).unwrap(),
            "2025-02-01".parse().unwrap(),
        )
        .unwrap();
        ledger.add_record(record.clone()).unwrap();
        ledger.add_record(self_reported.clone()).unwrap();
        let requirement = ledger.add_requirement(licence(dec!(10))).unwrap().clone();

        let reloaded = reload(&ledger);
        assert_eq!(reloaded.records(), &[record, self_reported]);
        assert_eq!(reloaded.requirements(), &[requirement]);
    }

    #[test]
    fn progress_reflects_current_records() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let requirement = ledger.add_requirement(licence(dec!(5))).unwrap().clone();

        assert_eq!(ledger.progress(&requirement).credits_earned, dec!(0));

        let record = ledger
            .add_record(certificate("Mayo Clinic", dec!(5), "2025-01-10"))
            .unwrap()
            .id();
        assert!(ledger.progress(&requirement).is_complete);

        ledger.remove_record(record).unwrap();
        let progress = ledger.progress(&requirement);
        assert_eq!(progress.matching_count, 0);
        assert!(!progress.is_complete);
    }

    #[test]
    fn deleting_requirement_keeps_records() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        ledger
            .add_record(certificate("Mayo Clinic", dec!(1), "2025-01-10"))
            .unwrap();
        let id = ledger.add_requirement(licence(dec!(5))).unwrap().id();

        ledger.delete_requirement(id).unwrap();

        let reloaded = reload(&ledger);
        assert!(reloaded.requirements().is_empty());
        assert_eq!(reloaded.records().len(), 1);
    }

    #[test]
    fn update_is_persisted() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let id = ledger.add_requirement(licence(dec!(5))).unwrap().id();

        ledger
            .update_requirement(id, |r| {
                r.filters_mut().years = YearRange::new(Some(2024), Some(2025))?;
                r.deactivate();
                Ok(())
            })
            .unwrap();

        let reloaded = reload(&ledger);
        let requirement = &reloaded.requirements()[0];
        assert!(!requirement.is_active());
        assert_eq!(requirement.filters().years.start(), Some(2024));
    }

    #[test]
    fn rejected_update_leaves_requirement_unchanged() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let original = ledger.add_requirement(licence(dec!(5))).unwrap().clone();

        let result = ledger.update_requirement(original.id(), |r| {
            r.set_name("Renamed")?;
            r.set_credits_required(Credits::ZERO)
        });

        assert!(matches!(result, Err(LedgerError::Invalid(_))));
        assert_eq!(ledger.requirements(), &[original.clone()]);
        assert_eq!(reload(&ledger).requirements(), &[original]);
    }

    #[test]
    fn edited_record_changes_progress() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let requirement = ledger.add_requirement(licence(dec!(5))).unwrap().clone();
        let id = ledger
            .add_record(certificate("Mayo Clinic", dec!(1), "2025-01-10"))
            .unwrap()
            .id();
        assert!(!ledger.progress(&requirement).is_complete);

        ledger
            .update_record(id, |r| {
                r.set_credits(Credits::new(dec!(5)).unwrap());
                Ok(())
            })
            .unwrap();

        let progress = ledger.progress(&requirement);
        assert_eq!(progress.credits_earned, dec!(5));
        assert!(progress.is_complete);
        assert_eq!(reload(&ledger).progress(&requirement), progress);
    }

    #[test]
    fn changing_source_moves_the_record_file() {
        let (tmp, mut ledger) = setup_temp_ledger();
        let id = ledger
            .add_record(certificate("Mayo Clinic", dec!(1), "2025-01-10"))
            .unwrap()
            .id();

        ledger
            .update_record(id, |r| {
                r.set_source(RecordSource::SelfReported);
                Ok(())
            })
            .unwrap();

        let file = format!("{id}.yaml");
        let certificates = tmp.path().join(records_dir(RecordSource::Certificate));
        let self_reported = tmp.path().join(records_dir(RecordSource::SelfReported));
        assert!(!certificates.join(&file).exists());
        assert!(self_reported.join(&file).exists());

        let reloaded = reload(&ledger);
        assert_eq!(reloaded.records().len(), 1);
        assert_eq!(reloaded.records()[0].source(), RecordSource::SelfReported);
    }

    #[test]
    fn rejected_record_edit_leaves_record_unchanged() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let original = ledger
            .add_record(certificate("Mayo Clinic", dec!(1), "2025-01-10"))
            .unwrap()
            .clone();

        let result = ledger.update_record(original.id(), |r| {
            r.set_credits(Credits::new(dec!(3)).unwrap());
            r.set_provider("  ")
        });

        assert!(matches!(result, Err(LedgerError::InvalidRecord(_))));
        assert_eq!(ledger.records(), &[original.clone()]);
        assert_eq!(reload(&ledger).records(), &[original]);
    }

    #[test]
    fn progress_all_skips_inactive_unless_asked() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        ledger.add_requirement(licence(dec!(5))).unwrap();
        let inactive = ledger.add_requirement(licence(dec!(10))).unwrap().id();
        ledger
            .update_requirement(inactive, |r| {
                r.deactivate();
                Ok(())
            })
            .unwrap();

        assert_eq!(ledger.progress_all(false).len(), 1);
        assert_eq!(ledger.progress_all(true).len(), 2);
    }

    #[test]
    fn invalid_file_is_reported() {
        let (tmp, _ledger) = setup_temp_ledger();
        let bad = tmp
            .path()
            .join(records_dir(RecordSource::Certificate))
            .join(format!("{}.yaml", Uuid::new_v4()));
        std::fs::write(
            &bad,
            "title: A\nprovider: B\ncredits: -3\ncompletion_date: 2025-01-01\n",
        )
        .unwrap();

        let error = Ledger::new(tmp.path().to_path_buf())
            .load_all()
            .unwrap_err();
        let LedgerLoadError::InvalidFiles(files) = error else {
            panic!("expected invalid files, got {error}");
        };
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, bad);
        assert!(matches!(files[0].error, LoadError::Record(_)));
    }

    #[test]
    fn invalid_files_are_skipped_when_allowed() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.allow_invalid_records = true;
        let mut ledger = Ledger::new(tmp.path().to_path_buf()).init(config).unwrap();
        ledger
            .add_record(certificate("Mayo Clinic", dec!(1), "2025-01-10"))
            .unwrap();
        std::fs::write(
            tmp.path().join(REQUIREMENTS_DIR).join("not-a-uuid.yaml"),
            "name: Licence\ncredits_required: 5\n",
        )
        .unwrap();

        let reloaded = reload(&ledger);
        assert_eq!(reloaded.records().len(), 1);
        assert!(reloaded.requirements().is_empty());
    }

    #[test]
    fn lenient_load_returns_invalid_files_alongside_valid_ones() {
        let (tmp, mut ledger) = setup_temp_ledger();
        ledger.add_requirement(licence(dec!(5))).unwrap();
        let bad = tmp
            .path()
            .join(REQUIREMENTS_DIR)
            .join(format!("{}.yaml", Uuid::new_v4()));
        std::fs::write(&bad, "name: Licence\ncredits_required: 0\n").unwrap();

        let (reloaded, invalid) = Ledger::new(tmp.path().to_path_buf())
            .load_lenient()
            .unwrap();
        assert_eq!(reloaded.requirements().len(), 1);
        assert_eq!(invalid.len(), 1);
        assert!(matches!(invalid[0].error, LoadError::Requirement(_)));
    }

    #[test]
    fn find_by_prefix_resolves_unique_ids() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        let id = ledger.add_requirement(licence(dec!(5))).unwrap().id();
        let full = id.to_string();

        assert_eq!(ledger.find_requirement(&full[..8]).unwrap().id(), id);
        assert_eq!(
            ledger.find_requirement(&full.to_uppercase()).unwrap().id(),
            id
        );
        assert!(matches!(
            ledger.find_requirement("zzzz"),
            Err(LookupError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.find_requirement(""),
            Err(LookupError::NotFound { .. })
        ));
    }

    #[test]
    fn ambiguous_prefix_is_rejected() {
        let items = [
            Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000001").unwrap(),
            Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000002").unwrap(),
        ];
        let result = find_by_prefix("record", &items, "aaaa", |id| *id);
        assert_eq!(
            result,
            Err(LookupError::Ambiguous {
                kind: "record",
                id: "aaaa".into(),
                count: 2
            })
        );
    }

    #[test]
    fn upcoming_deadlines_respect_configured_limit() {
        let (_tmp, mut ledger) = setup_temp_ledger();
        ledger.config_mut().set_upcoming_limit(1);
        for due in ["2026-11-01", "2026-12-01"] {
            let mut requirement = licence(dec!(5));
            requirement.set_due_date(Some(due.parse().unwrap()));
            ledger.add_requirement(requirement).unwrap();
        }

        let upcoming = ledger.upcoming_deadlines("2026-10-19".parse().unwrap());
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].due_date(), Some("2026-11-01".parse().unwrap()));
    }
}
