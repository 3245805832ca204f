//! Directory watcher implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use path_absolutize::Absolutize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::error::{Result, WatcherError};
use crate::event::{Change, FileEvent, FileEventKind, changes};
use crate::scan::scan_existing;

/// Files the watcher has already accounted for.
type KnownFiles = Arc<Mutex<HashSet<PathBuf>>>;

/// The watched root as configured and as the file system resolves it.
///
/// Notify is pointed at the canonical root; every path handed out is
/// rebased onto the configured one so symlinked roots keep their name.
#[derive(Debug, Clone)]
struct Roots {
    configured: PathBuf,
    canonical: PathBuf,
}

impl Roots {
    fn rebase(&self, path: &Path) -> PathBuf {
        match path.strip_prefix(&self.canonical) {
            Ok(rest) if rest.as_os_str().is_empty() => self.configured.clone(),
            Ok(rest) => self.configured.join(rest),
            Err(_) => path.to_path_buf(),
        }
    }
}

/// Directory watcher that reports each file arriving under its root once.
pub struct DirectoryWatcher {
    /// What to watch and how.
    config: WatchConfig,

    /// Absolute configured root, set once watching has started.
    root: Option<PathBuf>,

    /// Internal notify watcher.
    watcher: Option<RecommendedWatcher>,

    /// Files already reported or present at start.
    known: KnownFiles,

    /// Task delivering events found while starting.
    replay: Option<JoinHandle<()>>,

    /// Event sender.
    event_tx: mpsc::Sender<FileEvent>,

    /// Whether the watcher is running.
    running: bool,
}

impl DirectoryWatcher {
    /// Create a new directory watcher and the receiver for its events.
    pub fn new(config: WatchConfig) -> (Self, mpsc::Receiver<FileEvent>) {
        let (event_tx, event_rx) = mpsc::channel(1000);

        let watcher = Self {
            config,
            root: None,
            watcher: None,
            known: Arc::new(Mutex::new(HashSet::new())),
            replay: None,
            event_tx,
            running: false,
        };

        (watcher, event_rx)
    }

    /// Start watching the configured directory.
    ///
    /// Returns once the notify subscription is registered and the files
    /// already present have been recorded. Replayed events are delivered
    /// in the background.
    pub async fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(()); // Already running
        }

        let path = self.config.path.clone();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|_| WatcherError::DirectoryNotFound(path.display().to_string()))?;
        if !metadata.is_dir() {
            return Err(WatcherError::NotADirectory(path.display().to_string()));
        }
        let configured = path.absolutize()?.into_owned();
        let canonical = dunce::canonicalize(&configured)?;
        let roots = Roots {
            configured,
            canonical,
        };

        // Everything listed before the watch exists is pre-existing, whatever
        // notify reports about it later.
        let existing = self.list_files(&roots).await?;
        {
            let mut known = self.known.lock().await;
            known.clear();
            known.extend(existing.iter().cloned());
        }

        let mut watcher = notify::recommended_watcher(event_handler(
            self.known.clone(),
            self.event_tx.clone(),
            roots.clone(),
        ))?;
        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&roots.canonical, mode)?;
        debug!("Started watching: {}", roots.canonical.display());

        // Files created between the listing and the watch registration.
        let mut arrived = Vec::new();
        {
            let listing = self.list_files(&roots).await?;
            let mut known = self.known.lock().await;
            for file in listing {
                if known.insert(file.clone()) {
                    arrived.push(file);
                }
            }
        }

        let mut pending: Vec<FileEvent> = Vec::new();
        if self.config.replay_existing {
            info!(
                "Replaying {} existing files in {}",
                existing.len(),
                roots.configured.display()
            );
            pending.extend(
                existing
                    .into_iter()
                    .map(|file| FileEvent::new(FileEventKind::Existing, file)),
            );
        }
        pending.extend(
            arrived
                .into_iter()
                .map(|file| FileEvent::new(FileEventKind::Added, file)),
        );

        if !pending.is_empty() {
            let event_tx = self.event_tx.clone();
            self.replay = Some(tokio::spawn(async move {
                for event in pending {
                    if event_tx.send(event).await.is_err() {
                        debug!("Event receiver dropped during replay");
                        break;
                    }
                }
            }));
        }

        info!("Directory watcher started: {}", roots.configured.display());
        self.watcher = Some(watcher);
        self.root = Some(roots.configured);
        self.running = true;

        Ok(())
    }

    /// Stop watching. Calling this while stopped does nothing.
    pub async fn stop(&mut self) {
        if !self.running {
            return;
        }

        if let Some(replay) = self.replay.take() {
            replay.abort();
        }

        // Dropping the notify watcher ends the subscription.
        self.watcher = None;

        self.known.lock().await.clear();
        self.running = false;
        info!("Directory watcher stopped");
    }

    /// Check if the watcher is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The absolute configured root, once started.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Files currently accounted for.
    pub async fn known_files(&self) -> Vec<PathBuf> {
        self.known.lock().await.iter().cloned().collect()
    }

    /// List the files under the root, in configured-root form.
    async fn list_files(&self, roots: &Roots) -> Result<Vec<PathBuf>> {
        let canonical = roots.canonical.clone();
        let max_depth = self.config.max_depth();
        let follow = self.config.follow_symlinks;

        let files =
            tokio::task::spawn_blocking(move || scan_existing(&canonical, max_depth, follow))
                .await
                .map_err(|e| WatcherError::Io(std::io::Error::other(e)))?;

        Ok(files.iter().map(|file| roots.rebase(file)).collect())
    }
}

/// Build the callback run on the notify thread.
fn event_handler(
    known: KnownFiles,
    event_tx: mpsc::Sender<FileEvent>,
    roots: Roots,
) -> impl FnMut(notify::Result<notify::Event>) + Send + 'static {
    move |res| match res {
        Ok(event) => {
            for (change, path) in changes(&event) {
                let path = roots.rebase(&path);
                let added = {
                    let mut known = known.blocking_lock();
                    match change {
                        Change::Gone => {
                            known.retain(|p| !p.starts_with(&path));
                            false
                        }
                        Change::Present if path.is_file() => known.insert(path.clone()),
                        Change::Present => {
                            if !path.exists() {
                                known.retain(|p| !p.starts_with(&path));
                            }
                            false
                        }
                    }
                };

                if added {
                    debug!("File added: {}", path.display());
                    let event = FileEvent::new(FileEventKind::Added, path);
                    if let Err(e) = event_tx.blocking_send(event) {
                        error!("Failed to send file event: {e}");
                    }
                }
            }
        }
        Err(e) => {
            error!("Watch error: {e}");
        }
    }
}
