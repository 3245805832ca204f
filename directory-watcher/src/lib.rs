//! # Directory Watcher
//!
//! This crate observes a root directory and reports every regular file that
//! arrives in it. Files already present when watching starts are either
//! replayed as [`FileEventKind::Existing`] or silently recorded as known.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Directory Watcher                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WatchConfig ──► notify watcher ──► KnownFiles ──► FileEvent    │
//! │       │                                  ▲                      │
//! │       ▼                                  │                      │
//! │  scan_existing ──────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod scan;
pub mod watcher;

pub use config::WatchConfig;
pub use error::{Result, WatcherError};
pub use event::{FileEvent, FileEventKind};
pub use scan::scan_existing;
pub use watcher::DirectoryWatcher;
