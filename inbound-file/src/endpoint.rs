//! The adapter's outward seams: where messages go and where errors go.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::error;
use uuid::Uuid;

use crate::error::{ErrorKind, IngestError};
use crate::message::OutboundFileMessage;

/// Endpoint name for externally triggered requests.
pub const TRIGGER_ENDPOINT: &str = "inFileTrigger";

/// Endpoint name for directory events.
pub const WATCH_ENDPOINT: &str = "watchDir";

/// The downstream consumer refused a message.
#[derive(Error, Debug)]
#[error("endpoint closed")]
pub struct EndpointError;

/// Downstream consumer of accepted files.
#[async_trait]
pub trait OutboundEndpoint: Send + Sync {
    /// Take ownership of one message.
    async fn receive(&self, message: OutboundFileMessage) -> Result<(), EndpointError>;
}

#[async_trait]
impl OutboundEndpoint for mpsc::Sender<OutboundFileMessage> {
    async fn receive(&self, message: OutboundFileMessage) -> Result<(), EndpointError> {
        self.send(message).await.map_err(|_| EndpointError)
    }
}

#[async_trait]
impl OutboundEndpoint for mpsc::UnboundedSender<OutboundFileMessage> {
    async fn receive(&self, message: OutboundFileMessage) -> Result<(), EndpointError> {
        self.send(message).map_err(|_| EndpointError)
    }
}

/// A runtime failure, scoped to the request that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// What went wrong.
    pub kind: ErrorKind,

    /// Human readable description.
    pub message: String,

    /// Endpoint the request arrived on.
    pub endpoint: String,

    /// The trigger that caused it, if any.
    pub trigger_id: Option<Uuid>,

    /// The file concerned, if known.
    pub path: Option<PathBuf>,
}

impl ErrorReport {
    /// Describe an error raised while handling a request.
    pub fn new(error: &IngestError, endpoint: &str, trigger_id: Option<Uuid>) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            endpoint: endpoint.to_string(),
            trigger_id,
            path: error.path().map(PathBuf::from),
        }
    }
}

/// Side channel for runtime failures.
pub trait ErrorSink: Send + Sync {
    /// Record one failure.
    fn report(&self, report: ErrorReport);
}

/// Writes reports to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, report: ErrorReport) {
        error!(
            kind = ?report.kind,
            endpoint = %report.endpoint,
            trigger_id = ?report.trigger_id,
            "{}",
            report.message
        );
    }
}

impl ErrorSink for mpsc::UnboundedSender<ErrorReport> {
    fn report(&self, report: ErrorReport) {
        // The collector going away must not affect ingestion.
        let _ = self.send(report);
    }
}
