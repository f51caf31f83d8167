//! Error types for GridQuota
//!
//! This module defines the common error type used by the tree codec, the
//! mutation engine and the document store.

use crate::types::{NodeKind, Revision, UserId, UserIdError};
use thiserror::Error;

/// Common result type for GridQuota operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for GridQuota
#[derive(Debug, Error)]
pub enum Error {
    // Document errors
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("schema violation in <{element}>: {reason}")]
    SchemaViolation { element: String, reason: String },

    // Lookup errors
    #[error("{kind} '{key}' not found")]
    NotFound { kind: NodeKind, key: String },

    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: NodeKind, key: String },

    #[error("quota document not found for user {0}")]
    DocumentNotFound(UserId),

    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] UserIdError),

    // Concurrency errors
    #[error("document for user {user} was modified concurrently: expected revision {expected}, found {actual}")]
    Conflict {
        user: UserId,
        expected: Revision,
        actual: Revision,
    },

    // Storage errors
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a malformed document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create a schema violation error for the given element
    pub fn schema(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error for a node of the quota tree
    pub fn not_found(kind: NodeKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Create an already exists error for a node of the quota tree
    pub fn already_exists(kind: NodeKind, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            key: key.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DocumentNotFound(_))
    }

    /// Check if this is a concurrent modification error
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if the stored document itself is unusable
    #[must_use]
    pub const fn is_corrupt_document(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument(_) | Self::SchemaViolation { .. }
        )
    }

    /// Process exit code for command line front-ends
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::DocumentNotFound(_) => 2,
            Self::MalformedDocument(_) | Self::SchemaViolation { .. } => 3,
            Self::Conflict { .. } | Self::AlreadyExists { .. } => 4,
            Self::InvalidUserId(_) | Self::Configuration(_) => 64,
            Self::Io(_) | Self::Serialization(_) => 74,
        }
    }
}
