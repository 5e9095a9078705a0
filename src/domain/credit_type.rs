use std::{collections::BTreeSet, fmt, ops::Deref, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};

/// A credit-type tag, such as `ama_cat1` or `moc`.
///
/// Tags are compared by exact identity. Surrounding whitespace is trimmed on
/// construction; what remains must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CreditType(NonEmptyString);

impl CreditType {
    /// Creates a new tag from a string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCreditTypeError`] if the string is empty or only
    /// whitespace.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidCreditTypeError> {
        let s = s.into();
        let trimmed = s.trim();
        NonEmptyString::new(trimmed.to_string())
            .map(Self)
            .map_err(|_| InvalidCreditTypeError(s))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for CreditType {
    type Error = InvalidCreditTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CreditType {
    type Error = InvalidCreditTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CreditType> for String {
    fn from(value: CreditType) -> Self {
        value.0.as_str().to_owned()
    }
}

impl FromStr for CreditType {
    type Err = InvalidCreditTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Deref for CreditType {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl AsRef<str> for CreditType {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CreditType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a credit-type tag is blank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid credit type '{0}': must contain at least one non-whitespace character")]
pub struct InvalidCreditTypeError(String);

/// The set of credit-type tags carried by a record or accepted by a
/// requirement.
///
/// Records and requirements have been stored in two shapes over time: a
/// legacy scalar `credit_type` and the newer `credit_types` list. Both are
/// funnelled through [`CreditTypes::normalize`] so nothing downstream ever
/// needs to know which shape a value came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditTypes(BTreeSet<CreditType>);

impl CreditTypes {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Lifts both stored shapes into a single tag set.
    ///
    /// The result is the union of `list` and `legacy`. Blank entries are
    /// dropped rather than rejected, since older records were written with
    /// empty placeholders.
    #[must_use]
    pub fn normalize<I, S>(list: I, legacy: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = list
            .into_iter()
            .filter_map(|tag| CreditType::new(tag.as_ref()).ok())
            .chain(legacy.and_then(|tag| CreditType::new(tag).ok()))
            .collect();
        Self(tags)
    }

    /// Whether the set contains no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of tags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set contains `tag`.
    #[must_use]
    pub fn contains(&self, tag: &CreditType) -> bool {
        self.0.contains(tag)
    }

    /// Whether the two sets share at least one tag.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        // iterate the smaller set
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.0.iter().any(|tag| large.0.contains(tag))
    }

    /// Adds a tag, returning `true` if it was not already present.
    pub fn insert(&mut self, tag: CreditType) -> bool {
        self.0.insert(tag)
    }

    /// Iterates the tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &CreditType> {
        self.0.iter()
    }

    /// The first tag in sorted order, if any.
    ///
    /// Used when writing the legacy scalar field alongside the list.
    #[must_use]
    pub fn first(&self) -> Option<&CreditType> {
        self.0.first()
    }

    /// Renders the tags as a comma separated string.
    #[must_use]
    pub fn joined(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(CreditType::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl FromIterator<CreditType> for CreditTypes {
    fn from_iter<T: IntoIterator<Item = CreditType>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CreditTypes {
    type Item = &'a CreditType;
    type IntoIter = std::collections::btree_set::Iter<'a, CreditType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<CreditTypes> for Vec<String> {
    fn from(value: CreditTypes) -> Self {
        value.0.into_iter().map(String::from).collect()
    }
}
