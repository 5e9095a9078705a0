use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{CustomCreditType, Npi, Profession};

/// The user's profile and ledger settings.
///
/// Stored as TOML in `.cme/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// The clinician's profession, which selects the standard credit-type
    /// catalog.
    pub profession: Profession,

    /// The clinician's National Provider Identifier, if recorded.
    pub npi: Option<Npi>,

    /// User-defined credit types.
    pub custom_credit_types: Vec<CustomCreditType>,

    /// Whether files that fail validation are skipped with a warning instead
    /// of aborting the load.
    pub allow_invalid_records: bool,

    /// Maximum number of upcoming deadlines to show.
    upcoming_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profession: Profession::default(),
            npi: None,
            custom_credit_types: Vec::new(),
            allow_invalid_records: false,
            upcoming_limit: default_upcoming_limit(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }

    /// Returns the maximum number of upcoming deadlines to show.
    #[must_use]
    pub const fn upcoming_limit(&self) -> usize {
        self.upcoming_limit
    }

    /// Sets the maximum number of upcoming deadlines to show.
    ///
    /// A limit of zero is raised to one.
    pub fn set_upcoming_limit(&mut self, limit: usize) {
        self.upcoming_limit = limit.max(1);
    }
}

const fn default_upcoming_limit() -> usize {
    5
}

/// Errors from reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    /// The file is not valid configuration TOML.
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),
    /// The file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        profession: Profession,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        npi: Option<Npi>,

        #[serde(default)]
        allow_invalid_records: bool,

        #[serde(default = "default_upcoming_limit")]
        upcoming_limit: usize,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        custom_credit_types: Vec<CustomCreditType>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                profession,
                npi,
                allow_invalid_records,
                upcoming_limit,
                custom_credit_types,
            } => Self {
                profession,
                npi,
                custom_credit_types,
                allow_invalid_records,
                upcoming_limit: upcoming_limit.max(1),
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            profession: config.profession,
            npi: config.npi,
            allow_invalid_records: config.allow_invalid_records,
            upcoming_limit: config.upcoming_limit,
            custom_credit_types: config.custom_credit_types,
        }
    }
}
