//! Prefixed identifiers for change subjects.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of the type prefix, e.g. `loadbal`.
pub const PREFIX_LEN: usize = 7;
/// Length of the unique part after the separator.
pub const ID_PART_LEN: usize = 21;

/// Identifier of the form `<prefix>-<id>`, such as `loadbal-6qt1bo3ztrvqpzlwyerrq`.
///
/// The prefix names the resource type; the id part is unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrefixedId(String);

impl PrefixedId {
    /// Generate a new random ID for the given prefix.
    pub fn generate(prefix: &str) -> Result<Self> {
        validate_prefix(prefix)?;

        let a = Uuid::new_v4().simple().to_string();
        let b = Uuid::new_v4().simple().to_string();
        let id: String = a.chars().chain(b.chars()).take(ID_PART_LEN).collect();

        Ok(Self(format!("{}-{}", prefix, id)))
    }

    /// Parse and validate an existing ID.
    pub fn parse(s: &str) -> Result<Self> {
        let (prefix, id) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidId(format!("{}: missing separator", s)))?;

        validate_prefix(prefix)?;

        if id.len() != ID_PART_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidId(format!(
                "{}: id part must be {} alphanumeric characters",
                s, ID_PART_LEN
            )));
        }

        Ok(Self(s.to_string()))
    }

    /// The resource-type prefix.
    pub fn prefix(&self) -> &str {
        self.0.split_once('-').map(|(p, _)| p).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() != PREFIX_LEN
        || !prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(Error::InvalidId(format!(
            "prefix {:?} must be {} lowercase alphanumeric characters",
            prefix, PREFIX_LEN
        )));
    }
    Ok(())
}

impl fmt::Display for PrefixedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PrefixedId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PrefixedId {
    type Error = Error;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PrefixedId> for String {
    fn from(id: PrefixedId) -> Self {
        id.0
    }
}

impl AsRef<str> for PrefixedId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
