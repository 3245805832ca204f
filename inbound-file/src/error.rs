//! Error types for the inbound file adapter.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Invalid adapter configuration. Raised before the adapter exists.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The `regEx` option does not compile.
    #[error("invalid file name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A `filter` was supplied that cannot be called.
    #[error("Filter must be a function")]
    FilterNotCallable,

    /// The options document is malformed.
    #[error("invalid options: {0}")]
    Options(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Options(e.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Options(e.to_string())
    }
}

/// Errors reported while ingesting files.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The trigger message carried no payload.
    #[error("No payload in the message")]
    MissingPayload,

    /// The payload is not one of the recognized shapes.
    #[error("No matching payload in the message for this step")]
    UnsupportedPayload,

    /// The `files` field of a request is not a list of strings.
    #[error("The 'files' property of the payload object must be an array of strings")]
    InvalidFilesField,

    /// A relative reference arrived without a base directory.
    #[error("For relative file names the directory is mandatory: '{0}'")]
    MissingDirectoryForRelativePath(String),

    /// The resolved file is missing, not a regular file, or cannot be read.
    #[error("The file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The file passed the existence check but could not be opened or stat'ed.
    #[error("failed to open '{}': {source}", .path.display())]
    StatOrStreamFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The downstream endpoint no longer accepts messages.
    #[error("outbound endpoint closed")]
    EndpointClosed,

    /// The adapter is not running.
    #[error("adapter is not running")]
    NotRunning,

    /// Directory watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] ingest_directory_watcher::WatcherError),
}

impl IngestError {
    /// The kind of this error, for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPayload => ErrorKind::MissingPayload,
            Self::UnsupportedPayload => ErrorKind::UnsupportedPayload,
            Self::InvalidFilesField => ErrorKind::InvalidFilesField,
            Self::MissingDirectoryForRelativePath(_) => ErrorKind::MissingDirectoryForRelativePath,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::StatOrStreamFailure { .. } => ErrorKind::StatOrStreamFailure,
            Self::EndpointClosed => ErrorKind::EndpointClosed,
            Self::NotRunning => ErrorKind::NotRunning,
            Self::Watcher(_) => ErrorKind::Watcher,
        }
    }

    /// The file this error concerns, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileNotFound(path) | Self::StatOrStreamFailure { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Flat classification of [`IngestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingPayload,
    UnsupportedPayload,
    InvalidFilesField,
    MissingDirectoryForRelativePath,
    FileNotFound,
    StatOrStreamFailure,
    EndpointClosed,
    NotRunning,
    Watcher,
}
