//! Credit-type catalogs.
//!
//! The catalog maps credit-type tags to human readable names. It is a
//! display concern only: progress is computed on tag identity and never
//! consults the catalog.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::CreditType;

/// The clinician's profession, which selects the standard catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profession {
    /// Physicians (MD/DO).
    #[default]
    Physician,
    /// Nurse practitioners and physician assistants.
    NpPa,
    /// Registered nurses.
    Nurse,
}

impl Profession {
    /// Stable machine readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physician => "physician",
            Self::NpPa => "np_pa",
            Self::Nurse => "nurse",
        }
    }

    /// The standard credit types for this profession.
    #[must_use]
    pub const fn standard_types(self) -> &'static [StandardType] {
        match self {
            Self::Physician => PHYSICIAN,
            Self::NpPa => NP_PA,
            Self::Nurse => NURSE,
        }
    }
}

impl fmt::Display for Profession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profession {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "physician" => Ok(Self::Physician),
            "np_pa" | "np" | "pa" => Ok(Self::NpPa),
            "nurse" => Ok(Self::Nurse),
            other => Err(format!(
                "invalid profession '{other}' (expected physician, np_pa or nurse)"
            )),
        }
    }
}

/// A built-in credit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardType {
    /// Tag stored on records.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
}

const fn standard(id: &'static str, name: &'static str, description: &'static str) -> StandardType {
    StandardType {
        id,
        name,
        description,
    }
}

const PHYSICIAN: &[StandardType] = &[
    standard("ama_cat1", "AMA PRA Category 1", "Gold standard for physician CME"),
    standard("ama_cat2", "AMA PRA Category 2", "Self-reported educational activities"),
    standard("aoa_1a", "AOA Category 1-A", "Osteopathic medical teaching"),
    standard("aoa_1b", "AOA Category 1-B", "Board certification activities"),
    standard("moc", "MOC/MOL", "Maintenance of Certification/Licensure"),
    standard("self_assessment", "Self-Assessment", "Knowledge self-assessment"),
    standard("ethics", "Medical Ethics", "Ethics credits"),
    standard("pain_mgmt", "Pain Management", "Pain management/opioid prescribing"),
];

const NP_PA: &[StandardType] = &[
    standard("aanp_contact", "AANP Contact Hours", "NP contact hours"),
    standard("aapa_cat1", "AAPA Category 1", "PA Category 1 credits"),
    standard("ama_cat1", "AMA PRA Category 1", "Accepted for NP/PA"),
    standard("pharmacology", "Pharmacology CE", "Pharmacology continuing education"),
    standard("ancc_contact", "ANCC Contact Hours", "Nursing contact hours"),
    standard("self_assessment", "Self-Assessment", "Knowledge self-assessment"),
];

const NURSE: &[StandardType] = &[
    standard("ancc_contact", "ANCC Contact Hours", "Primary nursing CE"),
    standard("cne", "CNE Credits", "Continuing nursing education"),
    standard("pharmacology", "Pharmacology CE", "Required for NPs/CNSs"),
    standard("specialty", "Specialty CE", "Specialty-specific education"),
    standard("ethics", "Nursing Ethics", "Ethics credits"),
    standard("cultural", "Cultural Competency", "Cultural competency training"),
];

/// A credit type defined by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCreditType {
    /// Tag stored on records, of the form `custom_<8 hex digits>`.
    pub id: CreditType,
    /// Display name, unique per user ignoring case.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One row of a rendered catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Tag stored on records.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Whether the user defined this type.
    pub is_custom: bool,
}

/// The credit types available to a user: the standard list for their
/// profession followed by their custom types.
#[derive(Debug, Clone, Copy)]
pub struct Catalog<'a> {
    profession: Profession,
    custom: &'a [CustomCreditType],
}

impl<'a> Catalog<'a> {
    /// Builds a catalog view.
    #[must_use]
    pub const fn new(profession: Profession, custom: &'a [CustomCreditType]) -> Self {
        Self { profession, custom }
    }

    /// All entries, standard types first.
    #[must_use]
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let standard = self
            .profession
            .standard_types()
            .iter()
            .map(|t| CatalogEntry {
                id: t.id.to_string(),
                name: t.name.to_string(),
                description: t.description.to_string(),
                is_custom: false,
            });
        let custom = self.custom.iter().map(|t| CatalogEntry {
            id: t.id.to_string(),
            name: t.name.clone(),
            description: t
                .description
                .clone()
                .unwrap_or_else(|| "Custom credit type".to_string()),
            is_custom: true,
        });
        standard.chain(custom).collect()
    }

    /// The display name for `tag`.
    ///
    /// Tags not in the catalog (for example from another profession's list)
    /// are shown as-is.
    #[must_use]
    pub fn display_name<'t>(&self, tag: &'t CreditType) -> &'t str
    where
        'a: 't,
    {
        if let Some(standard) = self
            .profession
            .standard_types()
            .iter()
            .find(|t| t.id == tag.as_str())
        {
            return standard.name;
        }
        self.custom
            .iter()
            .find(|t| &t.id == tag)
            .map_or(tag.as_str(), |t| t.name.as_str())
    }
}

/// Adds a custom credit type to `custom`, returning its new tag.
///
/// # Errors
///
/// Returns an error if the name is blank or an existing custom type already
/// uses the same name, ignoring case.
pub fn add_custom_type(
    custom: &mut Vec<CustomCreditType>,
    name: &str,
    description: Option<String>,
) -> Result<CreditType, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::MissingName);
    }
    if custom.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
        return Err(CatalogError::DuplicateName(name.to_string()));
    }

    let simple = Uuid::new_v4().simple().to_string();
    let id = CreditType::new(format!("custom_{}", &simple[..8]))
        .map_err(|_| CatalogError::MissingName)?;

    custom.push(CustomCreditType {
        id: id.clone(),
        name: name.to_string(),
        description: description.filter(|d| !d.trim().is_empty()),
    });

    tracing::info!("Added custom credit type {id} ({name})");
    Ok(id)
}

/// Removes the custom credit type with the given tag.
///
/// # Errors
///
/// Returns [`CatalogError::NotFound`] if no custom type has that tag.
pub fn remove_custom_type(
    custom: &mut Vec<CustomCreditType>,
    id: &str,
) -> Result<CustomCreditType, CatalogError> {
    let position = custom
        .iter()
        .position(|t| t.id.as_str() == id)
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
    Ok(custom.remove(position))
}

/// Errors from editing the custom catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The name is blank.
    #[error("custom credit type name must not be blank")]
    MissingName,
    /// The name is already taken.
    #[error("a custom credit type named '{0}' already exists")]
    DuplicateName(String),
    /// No custom type with that tag.
    #[error("custom credit type '{0}' not found")]
    NotFound(String),
}
