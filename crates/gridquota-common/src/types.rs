//! Core type definitions for GridQuota
//!
//! Identifiers and small enums shared by the tree model, the store and the CLI.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the user owning a quota document.
///
/// The identifier names the backing file (`<user>.xml`), so it is validated
/// to never contain anything that could escape the storage root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a new user identifier (validates file-name safety)
    pub fn new(id: impl Into<String>) -> Result<Self, UserIdError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), UserIdError> {
        if id.is_empty() {
            return Err(UserIdError::Empty);
        }
        if id.len() > 255 {
            return Err(UserIdError::TooLong);
        }
        if id == "." || id == ".." {
            return Err(UserIdError::Reserved);
        }
        for c in id.chars() {
            if c == '/' || c == '\\' || c == '\0' {
                return Err(UserIdError::PathSeparator);
            }
            if c.is_control() {
                return Err(UserIdError::InvalidChar(c));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({:?})", self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Errors that can occur when creating a user identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdError {
    #[error("user id must not be empty")]
    Empty,
    #[error("user id must be at most 255 bytes")]
    TooLong,
    #[error("user id must not be '.' or '..'")]
    Reserved,
    #[error("user id must not contain path separators")]
    PathSeparator,
    #[error("user id contains invalid character: {0:?}")]
    InvalidChar(char),
}

/// Content stamp of a stored document, used for optimistic concurrency checks
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0:016x}")]
pub struct Revision(u64);

impl Revision {
    /// Revision of a document that does not exist on disk
    pub const ABSENT: Self = Self(0);

    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({:016x})", self.0)
    }
}

/// Level of the quota hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[display("browser")]
    Browser,
    #[display("version")]
    Version,
    #[display("region")]
    Region,
    #[display("host")]
    Host,
}

impl NodeKind {
    /// Element name used in the on-disk document
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Version => "version",
            Self::Region => "region",
            Self::Host => "host",
        }
    }

    /// Attribute that identifies a node among its siblings
    #[must_use]
    pub const fn key_attribute(self) -> &'static str {
        match self {
            Self::Version => "number",
            Self::Browser | Self::Region | Self::Host => "name",
        }
    }
}

/// Ordering policy for listing a quota tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ListMode {
    /// Regions and hosts sorted by name, browsers and versions in document order
    #[default]
    #[display("sorted")]
    Sorted,
    /// Everything in document order
    #[display("raw")]
    Raw,
}

impl FromStr for ListMode {
    type Err = ParseListModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sorted" => Ok(Self::Sorted),
            "raw" => Ok(Self::Raw),
            _ => Err(ParseListModeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for ListMode {
    type Error = ParseListModeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Error returned when parsing an unknown listing mode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown list mode '{0}', expected 'sorted' or 'raw'")]
pub struct ParseListModeError(pub String);
