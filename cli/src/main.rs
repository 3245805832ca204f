//! `inbound-file`: run the inbound file adapter from the command line.
//!
//! Watched files and files requested on stdin (one JSON trigger or bare path
//! per line) are printed to stdout as JSON lines, one per emitted file.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ingest_inbound_file::{
    AdapterConfig, AdapterOptions, InboundFileAdapter, OutboundFileMessage, TriggerMessage,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "inbound-file", version, about = "Emit files as they arrive in a directory")]
struct Cli {
    /// TOML file with adapter options.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory to watch.
    #[arg(long, short = 'w')]
    watch_dir: Option<PathBuf>,

    /// Only emit watched files whose name matches this pattern.
    #[arg(long = "regex")]
    reg_ex: Option<String>,

    /// Also emit files already in the watched directory.
    #[arg(long)]
    include_existing: bool,

    /// Do not watch subdirectories.
    #[arg(long)]
    non_recursive: bool,

    /// Adapter name used in logs.
    #[arg(long)]
    name: Option<String>,
}

impl Cli {
    /// Merge the config file, if any, with command line overrides.
    fn options(&self) -> anyhow::Result<AdapterOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                AdapterOptions::from_toml_str(&text)
                    .with_context(|| format!("invalid options in {}", path.display()))?
            }
            None => AdapterOptions::new(),
        };

        if let Some(name) = &self.name {
            options.name = Some(name.clone());
        }
        if let Some(dir) = &self.watch_dir {
            options.watch_dir = Some(dir.clone());
        }
        if let Some(pattern) = &self.reg_ex {
            options.reg_ex = Some(pattern.clone());
        }
        if self.include_existing {
            options.only_read_new_files = false;
        }
        if self.non_recursive {
            options.recursive = false;
        }

        Ok(options)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AdapterConfig::configure(cli.options()?).context("invalid configuration")?;
    let watching = config.watch.is_some();

    let (adapter, messages) = InboundFileAdapter::with_channel(config, 256);
    adapter.start().await?;

    let printer = tokio::spawn(print_messages(messages));
    let mut intake = tokio::spawn(read_triggers(adapter.clone(), spawn_stdin_reader()));

    let input_done = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            false
        }
        result = &mut intake => {
            result??;
            if watching {
                info!("Input closed; watching until interrupted");
                tokio::signal::ctrl_c().await?;
            }
            true
        }
    };

    adapter.stop().await;
    drop(adapter);
    if !input_done {
        // The intake task holds an adapter handle; the printer ends once it is gone.
        intake.abort();
        let _ = intake.await;
    }

    printer.await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read stdin on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(64);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    });
    rx
}

/// Feed stdin lines to the adapter until end of input.
async fn read_triggers(
    adapter: InboundFileAdapter,
    mut lines: mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = adapter.receive_trigger(parse_trigger(line)).await;
        debug!(
            trigger_id = %outcome.trigger_id,
            emitted = outcome.emitted.len(),
            failed = outcome.errors.len(),
            "Trigger processed"
        );
    }
    Ok(())
}

/// A line is a full trigger message, a bare JSON payload, or a plain path.
fn parse_trigger(line: &str) -> TriggerMessage {
    match serde_json::from_str::<Value>(line) {
        Ok(value) if value.get("payload").is_some() => serde_json::from_value(value.clone())
            .unwrap_or_else(|_| TriggerMessage::new(value)),
        Ok(value) => TriggerMessage::new(value),
        Err(_) => TriggerMessage::new(line),
    }
}

/// Print one JSON line per emitted file, draining each stream to count its bytes.
async fn print_messages(mut messages: mpsc::Receiver<OutboundFileMessage>) {
    while let Some(mut message) = messages.recv().await {
        let bytes = match tokio::io::copy(&mut message.payload, &mut tokio::io::sink()).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to read {}: {e}", message.info.path().display());
                None
            }
        };

        let line = json!({
            "id": message.id,
            "parent_id": message.parent_id,
            "file_name": message.info.file_name,
            "directory": message.info.directory,
            "file_stat": message.info.file_stat,
            "bytes": bytes,
        });
        println!("{line}");
    }
}
