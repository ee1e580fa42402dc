//! Error types for the plan synchronization system.
//!
//! This module provides the error hierarchy for every stage of a plan's
//! lifecycle: configuration, document parsing, synchronization preconditions,
//! remote transfers, and plan file storage.

use std::path::PathBuf;
use thiserror::Error;

use crate::resource::ResourceKind;
use crate::device::TransferOp;

/// The main error type for the plan synchronization system.
#[derive(Debug, Error)]
pub enum PlanSyncError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan document errors.
    #[error("Malformed document: {0}")]
    Document(#[from] DocumentError),

    /// Synchronization precondition errors.
    #[error("Invalid operation: {0}")]
    Sync(#[from] SyncError),

    /// Remote transfer errors.
    #[error("Remote transfer error: {0}")]
    Remote(#[from] RemoteError),

    /// Plan file storage errors.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// Structural or version validation failures while loading a plan document.
///
/// A document that fails with any of these is never partially applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The bytes are not valid JSON.
    #[error("Invalid JSON: {message}")]
    InvalidJson {
        /// Parser message.
        message: String,
    },

    /// The top-level `fileType` tag does not match.
    #[error("Wrong file type: expected '{expected}', found '{found}'")]
    WrongFileType {
        /// Expected tag.
        expected: String,
        /// Tag found in the document.
        found: String,
    },

    /// The format version lies outside the supported range.
    #[error("Unsupported file version {found}, supported range is {min}..={max}")]
    UnsupportedVersion {
        /// Version found in the document.
        found: i64,
        /// Lowest supported version.
        min: i64,
        /// Highest supported version.
        max: i64,
    },

    /// A required key is missing.
    #[error("Missing required key '{key}'")]
    MissingKey {
        /// Name of the missing key.
        key: String,
    },

    /// A section is present but not well formed.
    #[error("Invalid '{section}' section: {message}")]
    InvalidSection {
        /// Section name.
        section: String,
        /// Description of the problem.
        message: String,
    },

    /// A line of a waypoint text file could not be parsed.
    #[error("Invalid waypoint line {line}: {message}")]
    InvalidWaypointLine {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// The content matches none of the accepted formats.
    #[error("Unknown plan format{}", .hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default())]
    UnknownFormat {
        /// Optional hint, usually the file extension.
        hint: Option<String>,
    },
}

/// Operation invoked in a disallowed state.
///
/// Reported to the caller; no state is mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The operation needs a connected device.
    #[error("{operation} called while offline")]
    Offline {
        /// Rejected operation.
        operation: &'static str,
    },

    /// The operation is only legal from the editing surface.
    #[error("{operation} called from the live-operation surface")]
    WrongSurface {
        /// Rejected operation.
        operation: &'static str,
    },

    /// A cascade is already running.
    #[error("{operation} called while a sync is in progress")]
    SyncInProgress {
        /// Rejected operation.
        operation: &'static str,
    },
}

/// Failures reported by a device's transfer managers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// A cascade stage failed on the device side.
    #[error("{op} of {kind} failed: {reason}")]
    StageFailed {
        /// Sub-resource whose transfer failed.
        kind: ResourceKind,
        /// Request that failed.
        op: TransferOp,
        /// Reason given by the transfer manager.
        reason: String,
    },

    /// The device returned data that does not parse as the expected section.
    #[error("Device returned an invalid {kind}: {message}")]
    InvalidPayload {
        /// Sub-resource whose payload was rejected.
        kind: ResourceKind,
        /// Description of the problem.
        message: String,
    },

    /// The identity has no transport (the offline stand-in).
    #[error("No transport available for {kind}")]
    NoTransport {
        /// Sub-resource that was addressed.
        kind: ResourceKind,
    },
}

/// Plan file storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The plan file was not found.
    #[error("Plan file not found: {path}")]
    NotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The plan file could not be read.
    #[error("Failed to read {path}: {message}")]
    ReadFailed {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },

    /// The plan file could not be written.
    #[error("Failed to write {path}: {message}")]
    WriteFailed {
        /// Path being written.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },
}

/// Result type alias for plan synchronization operations.
pub type Result<T> = std::result::Result<T, PlanSyncError>;

impl PlanSyncError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the operation was rejected because of the current state.
    #[must_use]
    pub const fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::Sync(_))
    }

    /// Returns true if a document failed structural or version validation.
    #[must_use]
    pub const fn is_malformed_document(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl DocumentError {
    /// Creates an invalid section error.
    #[must_use]
    pub fn invalid_section(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSection {
            section: section.into(),
            message: message.into(),
        }
    }

    /// Creates a missing key error.
    #[must_use]
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey { key: key.into() }
    }
}

impl StoreError {
    /// Creates a write error.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a read error.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}
