//! # Inbound File Adapter
//!
//! Watches a directory for arriving files, or accepts explicit requests
//! naming files, and hands each accepted file downstream as an open stream
//! together with its metadata.
//!
//! ## Flow
//!
//! ```text
//!  DirectoryWatcher ── FileEvent ──► Selector ──┐
//!                                               ├──► emit ──► OutboundEndpoint
//!  TriggerMessage ── TriggerPayload ── resolve ─┘      │
//!                                                      └──► ErrorSink (failures)
//! ```
//!
//! Selection only applies to watched files. Explicit requests name their
//! files directly.

pub mod adapter;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod selector;
pub mod trigger;

pub use adapter::{ComponentState, InboundFileAdapter, TriggerOutcome};
pub use config::{AdapterConfig, AdapterOptions};
pub use endpoint::{
    EndpointError, ErrorReport, ErrorSink, LogErrorSink, OutboundEndpoint, TRIGGER_ENDPOINT,
    WATCH_ENDPOINT,
};
pub use error::{ConfigError, ErrorKind, IngestError, Result};
pub use message::{FileInfo, FileStat, OutboundFileMessage};
pub use selector::{FileFilter, Selector};
pub use trigger::{ResolvedFileRequest, TriggerMessage, TriggerPayload};
