//! Messages emitted for accepted files.

use std::fs::Metadata;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs::File;
use uuid::Uuid;

use crate::trigger::{ResolvedFileRequest, TriggerMessage};

/// File status captured when the stream was opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Size in bytes.
    pub size: u64,

    /// Last modification time.
    pub modified: Option<DateTime<Utc>>,

    /// Last access time.
    pub accessed: Option<DateTime<Utc>>,

    /// Creation time, where the platform records it.
    pub created: Option<DateTime<Utc>>,

    /// Whether the file is read-only.
    pub readonly: bool,

    /// Whether the path is a regular file.
    pub is_file: bool,
}

impl From<&Metadata> for FileStat {
    fn from(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            accessed: metadata.accessed().ok().map(DateTime::<Utc>::from),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
            readonly: metadata.permissions().readonly(),
            is_file: metadata.is_file(),
        }
    }
}

/// Metadata describing an emitted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name without directory.
    pub file_name: String,

    /// Directory containing the file.
    pub directory: PathBuf,

    /// Status at open time.
    pub file_stat: FileStat,
}

impl FileInfo {
    /// Full path of the file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// One accepted file, handed downstream with its stream already open.
///
/// The receiver owns `payload`; the adapter never reads or closes it.
#[derive(Debug)]
pub struct OutboundFileMessage {
    /// Message identity.
    pub id: Uuid,

    /// The trigger that requested this file, if any.
    pub parent_id: Option<Uuid>,

    /// Header copied from the trigger.
    pub header: Map<String, Value>,

    /// File metadata.
    pub info: FileInfo,

    /// Open stream positioned at the start of the file.
    pub payload: File,
}

impl OutboundFileMessage {
    pub(crate) fn new(
        request: ResolvedFileRequest,
        metadata: &Metadata,
        payload: File,
        trigger: Option<&TriggerMessage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: trigger.map(|t| t.id),
            header: trigger.map(|t| t.header.clone()).unwrap_or_default(),
            info: FileInfo {
                file_name: request.base_name,
                directory: request.directory,
                file_stat: FileStat::from(metadata),
            },
            payload,
        }
    }

    /// File name without directory.
    pub fn file_name(&self) -> &str {
        &self.info.file_name
    }
}
