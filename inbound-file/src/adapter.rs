//! The inbound file adapter.
//!
//! Files reach the adapter by two routes: a [`DirectoryWatcher`] reporting
//! arrivals, or a [`TriggerMessage`] naming files explicitly. Both end in
//! [`Emitter::emit`], which checks the file, opens it and hands the open
//! stream downstream.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use ingest_directory_watcher::{DirectoryWatcher, FileEvent};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{AdapterConfig, AdapterOptions};
use crate::endpoint::{
    ErrorReport, ErrorSink, LogErrorSink, OutboundEndpoint, TRIGGER_ENDPOINT, WATCH_ENDPOINT,
};
use crate::error::{ConfigError, IngestError, Result};
use crate::message::OutboundFileMessage;
use crate::selector::Selector;
use crate::trigger::{ResolvedFileRequest, TriggerMessage, TriggerPayload};

/// Lifecycle state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    /// Built but never started.
    Created,

    /// Watching (if configured) and accepting triggers.
    Running,

    /// Stopped; may be started again.
    Stopped,
}

/// Result of one trigger message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// The trigger this outcome belongs to.
    pub trigger_id: Uuid,

    /// Files handed downstream.
    pub emitted: Vec<PathBuf>,

    /// Failures, already reported to the error sink.
    pub errors: Vec<ErrorReport>,
}

impl TriggerOutcome {
    fn new(trigger_id: Uuid) -> Self {
        Self {
            trigger_id,
            emitted: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether every entry was emitted.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An active directory subscription.
struct Subscription {
    watcher: DirectoryWatcher,
    forwarder: JoinHandle<()>,
}

/// Turns watched or requested files into [`OutboundFileMessage`]s.
///
/// Cloning is cheap; clones share lifecycle and subscription.
#[derive(Clone)]
pub struct InboundFileAdapter {
    config: Arc<AdapterConfig>,
    emitter: Emitter,
    state: Arc<RwLock<ComponentState>>,
    /// Held for the whole of `start` and `stop`, so transitions never overlap.
    subscription: Arc<Mutex<Option<Subscription>>>,
}

impl InboundFileAdapter {
    /// Create an adapter from a validated configuration.
    pub fn new(config: AdapterConfig, endpoint: Arc<dyn OutboundEndpoint>) -> Self {
        let config = Arc::new(config);
        let emitter = Emitter {
            name: Arc::from(config.name.as_str()),
            selector: config.selector.clone(),
            endpoint,
            errors: Arc::new(LogErrorSink),
        };

        Self {
            config,
            emitter,
            state: Arc::new(RwLock::new(ComponentState::Created)),
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    /// Validate options and create an adapter.
    pub fn from_options(
        options: AdapterOptions,
        endpoint: Arc<dyn OutboundEndpoint>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(AdapterConfig::configure(options)?, endpoint))
    }

    /// Create an adapter that sends to a channel.
    pub fn with_channel(
        config: AdapterConfig,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<OutboundFileMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(config, Arc::new(tx)), rx)
    }

    /// Route runtime failures to `sink` instead of the log.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.emitter.errors = sink;
        self
    }

    /// Instance name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configuration this adapter runs with.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ComponentState {
        *self.state.read().await
    }

    /// Start the adapter. Starting a running adapter does nothing.
    ///
    /// With a watch directory configured this returns once the subscription
    /// is in place. If the watch cannot be set up the state is unchanged.
    pub async fn start(&self) -> Result<()> {
        let mut subscription = self.subscription.lock().await;
        if *self.state.read().await == ComponentState::Running {
            return Ok(());
        }

        if let Some(watch) = &self.config.watch {
            let (mut watcher, events) = DirectoryWatcher::new(watch.clone());
            watcher.start().await?;

            info!(
                adapter = %self.name(),
                directory = %watch.path.display(),
                replay = watch.replay_existing,
                "Start watching directory"
            );
            let forwarder = tokio::spawn(self.emitter.clone().forward(events));
            *subscription = Some(Subscription { watcher, forwarder });
        }

        *self.state.write().await = ComponentState::Running;
        debug!(adapter = %self.name(), "Adapter running");
        Ok(())
    }

    /// Stop the adapter. Stopping an adapter that is not running does nothing.
    ///
    /// Emissions already under way are left to finish.
    pub async fn stop(&self) {
        let mut subscription = self.subscription.lock().await;
        if *self.state.read().await != ComponentState::Running {
            return;
        }

        if let Some(mut active) = subscription.take() {
            active.watcher.stop().await;
            active.forwarder.abort();
            info!(adapter = %self.name(), "Stop watching directory");
        }

        *self.state.write().await = ComponentState::Stopped;
        debug!(adapter = %self.name(), "Adapter stopped");
    }

    /// Handle an externally supplied file request.
    ///
    /// Never fails as a whole: each entry is processed on its own and every
    /// failure goes to the error sink as well as into the outcome.
    pub async fn receive_trigger(&self, message: TriggerMessage) -> TriggerOutcome {
        let mut outcome = TriggerOutcome::new(message.id);

        if self.state().await != ComponentState::Running {
            outcome.errors.push(self.emitter.report(
                &IngestError::NotRunning,
                TRIGGER_ENDPOINT,
                Some(message.id),
            ));
            return outcome;
        }

        let (directory, files) = match TriggerPayload::from_value(message.payload.as_ref()) {
            Ok(payload) => payload.into_entries(),
            Err(e) => {
                outcome
                    .errors
                    .push(self.emitter.report(&e, TRIGGER_ENDPOINT, Some(message.id)));
                return outcome;
            }
        };

        debug!(
            adapter = %self.name(),
            trigger_id = %message.id,
            entries = files.len(),
            "Received trigger"
        );

        let entries = files
            .iter()
            .map(|reference| self.emitter.trigger_entry(directory.as_deref(), reference, &message));
        for result in join_all(entries).await {
            match result {
                Ok(path) => outcome.emitted.push(path),
                Err(report) => outcome.errors.push(report),
            }
        }

        outcome
    }

    /// Accept a trigger now and process it in the background.
    pub fn dispatch_trigger(&self, message: TriggerMessage) -> JoinHandle<TriggerOutcome> {
        let adapter = self.clone();
        tokio::spawn(async move { adapter.receive_trigger(message).await })
    }
}

/// What every emission needs; shared by the trigger path and the watcher task.
#[derive(Clone)]
struct Emitter {
    name: Arc<str>,
    selector: Selector,
    endpoint: Arc<dyn OutboundEndpoint>,
    errors: Arc<dyn ErrorSink>,
}

impl Emitter {
    /// Report a failure to the error sink and hand back the report.
    fn report(&self, error: &IngestError, endpoint: &str, trigger_id: Option<Uuid>) -> ErrorReport {
        let report = ErrorReport::new(error, endpoint, trigger_id);
        self.errors.report(report.clone());
        report
    }

    /// Resolve and emit one entry of a trigger.
    async fn trigger_entry(
        &self,
        directory: Option<&Path>,
        reference: &str,
        trigger: &TriggerMessage,
    ) -> std::result::Result<PathBuf, ErrorReport> {
        let result = match ResolvedFileRequest::resolve(directory, reference) {
            Ok(candidate) => self.emit(candidate, Some(trigger)).await,
            Err(e) => Err(e),
        };
        result.map_err(|e| self.report(&e, TRIGGER_ENDPOINT, Some(trigger.id)))
    }

    /// Drain watcher events until the subscription goes away.
    async fn forward(self, mut events: mpsc::Receiver<FileEvent>) {
        while let Some(event) = events.recv().await {
            let candidate = match ResolvedFileRequest::from_path(&event.path) {
                Ok(candidate) => candidate,
                Err(e) => {
                    self.report(&e, WATCH_ENDPOINT, None);
                    continue;
                }
            };

            if !self.selector.accepts(&candidate.base_name) {
                debug!(adapter = %self.name, file = %candidate.base_name, "File not selected");
                continue;
            }

            let emitter = self.clone();
            tokio::spawn(async move {
                if let Err(e) = emitter.emit(candidate, None).await {
                    emitter.report(&e, WATCH_ENDPOINT, None);
                }
            });
        }
        debug!(adapter = %self.name, "Watch event stream closed");
    }

    /// Check, open, stat and hand over one file.
    async fn emit(
        &self,
        candidate: ResolvedFileRequest,
        trigger: Option<&TriggerMessage>,
    ) -> Result<PathBuf> {
        let path = candidate.absolute_path.clone();

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => return Err(IngestError::FileNotFound(path)),
        }

        let file = File::open(&path)
            .await
            .map_err(|e| open_failure(path.clone(), e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|source| IngestError::StatOrStreamFailure {
                path: path.clone(),
                source,
            })?;

        let message = OutboundFileMessage::new(candidate, &metadata, file, trigger);
        self.endpoint
            .receive(message)
            .await
            .map_err(|_| IngestError::EndpointClosed)?;

        debug!(adapter = %self.name, file = %path.display(), "Emitted file");
        Ok(path)
    }
}

/// Classify a failed open. A file that vanished or cannot be read counts as
/// not existing; anything else is a stream failure.
fn open_failure(path: PathBuf, source: io::Error) -> IngestError {
    match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            IngestError::FileNotFound(path)
        }
        _ => IngestError::StatOrStreamFailure { path, source },
    }
}
