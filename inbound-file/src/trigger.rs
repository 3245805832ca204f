//! Trigger messages and their resolution into file requests.

use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{IngestError, Result};

/// An externally supplied request to ingest files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerMessage {
    /// Message identity, echoed on outbound messages and error reports.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Host header, copied onto outbound messages.
    #[serde(default)]
    pub header: Map<String, Value>,

    /// Which files to ingest. See [`TriggerPayload`].
    #[serde(default)]
    pub payload: Option<Value>,
}

impl TriggerMessage {
    /// Create a trigger with the given payload.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            header: Map::new(),
            payload: Some(payload.into()),
        }
    }

    /// Create a trigger without a payload.
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            header: Map::new(),
            payload: None,
        }
    }

    /// Add a header entry.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }
}

/// The recognized payload shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerPayload {
    /// One file reference. Must be absolute.
    File(String),

    /// Several independent file references. Each must be absolute.
    Files(Vec<String>),

    /// File references sharing an optional base directory.
    Request {
        directory: Option<PathBuf>,
        files: Vec<String>,
    },
}

impl TriggerPayload {
    /// Classify a raw payload.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Err(IngestError::MissingPayload),
            Some(Value::String(s)) if s.is_empty() => Err(IngestError::MissingPayload),
            Some(Value::String(s)) => Ok(Self::File(s.clone())),
            Some(Value::Array(items)) => string_list(items)
                .map(Self::Files)
                .ok_or(IngestError::UnsupportedPayload),
            Some(Value::Object(object)) => {
                let Some(files) = object.get("files") else {
                    return Err(IngestError::UnsupportedPayload);
                };
                let files = match files {
                    Value::Array(items) => string_list(items).ok_or(IngestError::InvalidFilesField)?,
                    _ => return Err(IngestError::InvalidFilesField),
                };
                let directory = match object.get("directory") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(dir)) if dir.is_empty() => None,
                    Some(Value::String(dir)) => Some(PathBuf::from(dir)),
                    Some(_) => return Err(IngestError::UnsupportedPayload),
                };
                Ok(Self::Request { directory, files })
            }
            Some(_) => Err(IngestError::UnsupportedPayload),
        }
    }

    /// Split into the shared base directory and the individual references.
    pub fn into_entries(self) -> (Option<PathBuf>, Vec<String>) {
        match self {
            Self::File(file) => (None, vec![file]),
            Self::Files(files) => (None, files),
            Self::Request { directory, files } => (directory, files),
        }
    }
}

fn string_list(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// A file reference normalized to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFileRequest {
    /// Normalized absolute path.
    pub absolute_path: PathBuf,

    /// Directory containing the file.
    pub directory: PathBuf,

    /// File name without directory.
    pub base_name: String,
}

impl ResolvedFileRequest {
    /// Resolve a reference against an optional base directory.
    ///
    /// Absolute references ignore `base_dir`. Relative references need one;
    /// a relative `base_dir` is taken from the working directory.
    pub fn resolve(base_dir: Option<&Path>, reference: &str) -> Result<Self> {
        let reference_path = Path::new(reference);
        if reference_path.is_absolute() {
            return Self::from_path(reference_path);
        }

        match base_dir {
            Some(dir) => Self::from_path(&dir.join(reference_path)),
            None => Err(IngestError::MissingDirectoryForRelativePath(
                reference.to_string(),
            )),
        }
    }

    /// Normalize a path into a request.
    pub fn from_path(path: &Path) -> Result<Self> {
        let absolute_path = path
            .absolutize()
            .map_err(|source| IngestError::StatOrStreamFailure {
                path: path.to_path_buf(),
                source,
            })?
            .into_owned();

        let Some(base_name) = absolute_path.file_name() else {
            return Err(IngestError::FileNotFound(absolute_path));
        };
        let base_name = base_name.to_string_lossy().into_owned();
        let directory = absolute_path
            .parent()
            .map_or_else(|| absolute_path.clone(), Path::to_path_buf);

        Ok(Self {
            absolute_path,
            directory,
            base_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kind_of(value: Option<Value>) -> ErrorKind {
        TriggerPayload::from_value(value.as_ref()).unwrap_err().kind()
    }

    #[test]
    fn test_string_payload() {
        let payload = TriggerPayload::from_value(Some(&json!("/fixtures/existing_file.csv")));
        assert_eq!(
            payload.unwrap(),
            TriggerPayload::File("/fixtures/existing_file.csv".to_string())
        );
    }

    #[test]
    fn test_array_payload() {
        let payload =
            TriggerPayload::from_value(Some(&json!(["/fixtures/a.csv", "/fixtures/b.csv"])))
                .unwrap();
        let (directory, files) = payload.into_entries();
        assert_eq!(directory, None);
        assert_eq!(files, vec!["/fixtures/a.csv", "/fixtures/b.csv"]);
    }

    #[test]
    fn test_request_payload() {
        let payload = TriggerPayload::from_value(Some(&json!({
            "directory": "/fixtures",
            "files": ["gumbo.csv", "existing_file.csv"]
        })))
        .unwrap();
        assert_eq!(
            payload,
            TriggerPayload::Request {
                directory: Some(PathBuf::from("/fixtures")),
                files: vec!["gumbo.csv".to_string(), "existing_file.csv".to_string()],
            }
        );
    }

    #[test]
    fn test_rejected_payloads() {
        assert_eq!(kind_of(None), ErrorKind::MissingPayload);
        assert_eq!(kind_of(Some(Value::Null)), ErrorKind::MissingPayload);
        assert_eq!(kind_of(Some(json!(""))), ErrorKind::MissingPayload);
        assert_eq!(kind_of(Some(json!(42))), ErrorKind::UnsupportedPayload);
        assert_eq!(kind_of(Some(json!(["/a.csv", 7]))), ErrorKind::UnsupportedPayload);
        assert_eq!(kind_of(Some(json!({"dir": "/x"}))), ErrorKind::UnsupportedPayload);
        assert_eq!(
            kind_of(Some(json!({"directory": 3, "files": []}))),
            ErrorKind::UnsupportedPayload
        );
        assert_eq!(
            kind_of(Some(json!({"files": "a.csv"}))),
            ErrorKind::InvalidFilesField
        );
        assert_eq!(
            kind_of(Some(json!({"files": ["a.csv", null]}))),
            ErrorKind::InvalidFilesField
        );
    }

    #[test]
    fn test_resolve_absolute_ignores_directory() {
        let request =
            ResolvedFileRequest::resolve(Some(Path::new("/elsewhere")), "/fixtures/a.csv").unwrap();
        assert_eq!(request.absolute_path, PathBuf::from("/fixtures/a.csv"));
        assert_eq!(request.directory, PathBuf::from("/fixtures"));
        assert_eq!(request.base_name, "a.csv");
    }

    #[test]
    fn test_resolve_relative_against_directory() {
        let request =
            ResolvedFileRequest::resolve(Some(Path::new("/fixtures/in")), "../a.csv").unwrap();
        assert_eq!(request.absolute_path, PathBuf::from("/fixtures/a.csv"));
        assert_eq!(request.directory, PathBuf::from("/fixtures"));
    }

    #[test]
    fn test_resolve_relative_without_directory() {
        let err = ResolvedFileRequest::resolve(None, "a.csv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingDirectoryForRelativePath);
    }

    #[test]
    fn test_trigger_message_defaults() {
        let message: TriggerMessage =
            serde_json::from_value(json!({ "payload": "/fixtures/a.csv" })).unwrap();
        assert!(message.header.is_empty());
        assert_eq!(message.payload, Some(json!("/fixtures/a.csv")));
    }
}
