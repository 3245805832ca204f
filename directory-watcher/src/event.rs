//! File events from directory watching.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

/// A file that arrived in, or was already present in, a watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// The kind of event.
    pub kind: FileEventKind,

    /// Absolute path to the file.
    pub path: PathBuf,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Kind of file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// File appeared after watching started.
    Added,

    /// File was already present and replay was requested.
    Existing,
}

/// What a raw notify event says about one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change {
    /// The path may now hold a file; check the file system to find out.
    Present,

    /// The path no longer holds the file it used to.
    Gone,
}

/// Break a notify event down into per-path changes.
pub(crate) fn changes(event: &notify::Event) -> Vec<(Change, PathBuf)> {
    use notify::EventKind;

    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Remove(_) => tag(Change::Gone, &event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => tag(Change::Gone, &event.paths),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(event.paths.len());
            let mut paths = event.paths.iter();
            if let Some(from) = paths.next() {
                out.push((Change::Gone, from.clone()));
            }
            out.extend(paths.map(|to| (Change::Present, to.clone())));
            out
        }
        // Creation, move-into, writes and anything the backend cannot classify.
        _ => tag(Change::Present, &event.paths),
    }
}

fn tag(change: Change, paths: &[PathBuf]) -> Vec<(Change, PathBuf)> {
    paths.iter().map(|p| (change, p.clone())).collect()
}
