//! The mapping from assistant labels to remote assistant identifiers.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Maps human-readable labels to opaque assistant identifiers.
///
/// Entries keep their insertion order, so the first one can serve as the
/// default selection. A label may be present with an empty identifier,
/// which means the deployment forgot to configure it; such labels don't
/// [`resolve`](Self::resolve).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantDirectory {
    entries: Vec<(String, String)>,
}

impl AssistantDirectory {
    /// Creates an empty directory.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assistant, replacing the identifier of an existing label
    /// in place.
    pub fn with_assistant<L, I>(mut self, label: L, assistant_id: I) -> Self
    where
        L: Into<String>,
        I: Into<String>,
    {
        self.insert(label, assistant_id);
        self
    }

    /// Adds an assistant, replacing the identifier of an existing label
    /// in place.
    pub fn insert<L, I>(&mut self, label: L, assistant_id: I)
    where
        L: Into<String>,
        I: Into<String>,
    {
        let label = label.into();
        let assistant_id = assistant_id.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, id)) => *id = assistant_id,
            None => self.entries.push((label, assistant_id)),
        }
    }

    /// Returns the identifier configured for `label`.
    pub fn resolve(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, id)| id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Returns whether `label` is listed, configured or not.
    #[inline]
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    /// Returns the labels in insertion order.
    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Returns the first label.
    #[inline]
    pub fn first_label(&self) -> Option<&str> {
        self.entries.first().map(|(l, _)| l.as_str())
    }

    /// Returns the number of labels.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the directory has no labels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Error returned when parsing an [`AssistantDirectory`] fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDirectoryError {
    entry: String,
}

impl ParseDirectoryError {
    /// Returns the entry that could not be parsed.
    #[inline]
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

impl Display for ParseDirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected `Label=assistant_id`, got {:?}", self.entry)
    }
}

impl StdError for ParseDirectoryError {}

/// Parses `Label=asst_id` entries separated by `;` or newlines. Blank
/// entries are skipped and whitespace around both sides is trimmed.
impl FromStr for AssistantDirectory {
    type Err = ParseDirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut directory = Self::new();
        for entry in s.split([';', '\n']) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((label, assistant_id)) = entry.split_once('=') else {
                return Err(ParseDirectoryError {
                    entry: entry.to_owned(),
                });
            };
            let label = label.trim();
            if label.is_empty() {
                return Err(ParseDirectoryError {
                    entry: entry.to_owned(),
                });
            }
            directory.insert(label, assistant_id.trim());
        }
        Ok(directory)
    }
}
