//! Adapter configuration.
//!
//! [`AdapterOptions`] is what a host hands over, in the host's own camelCase
//! keys. [`AdapterConfig::configure`] validates it into the immutable form the
//! adapter runs with.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use ingest_directory_watcher::WatchConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::selector::{FileFilter, Selector};

/// Name used when the host does not supply one.
pub const DEFAULT_NAME: &str = "inbound-file";

/// Options supplied by the host.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterOptions {
    /// Instance name, used in logs.
    #[serde(default)]
    pub name: Option<String>,

    /// Step type as registered with the host. Opaque here.
    #[serde(default, rename = "type")]
    pub step_type: Option<String>,

    /// Directory to watch for arriving files.
    #[serde(default)]
    pub watch_dir: Option<PathBuf>,

    /// Ignore files already in `watch_dir` when watching starts.
    #[serde(default = "default_true")]
    pub only_read_new_files: bool,

    /// Pattern the base file name must match.
    #[serde(default)]
    pub reg_ex: Option<String>,

    /// Watch subdirectories of `watch_dir` as well.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Follow symbolic links below `watch_dir` when listing its files.
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Predicate over base file names. Wins over `reg_ex`.
    #[serde(skip)]
    pub filter: Option<FileFilter>,
}

fn default_true() -> bool {
    true
}

impl AdapterOptions {
    /// Options with nothing watched and every file accepted.
    pub fn new() -> Self {
        Self {
            name: None,
            step_type: None,
            watch_dir: None,
            only_read_new_files: true,
            reg_ex: None,
            recursive: true,
            follow_symlinks: false,
            filter: None,
        }
    }

    /// Parse options from the host's JSON document.
    pub fn from_json(value: Value) -> Result<Self, ConfigError> {
        if value.get("filter").is_some_and(|f| !f.is_null()) {
            return Err(ConfigError::FilterNotCallable);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(input)?;
        if table.contains_key("filter") {
            return Err(ConfigError::FilterNotCallable);
        }
        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Set the instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the directory to watch.
    pub fn with_watch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.watch_dir = Some(dir.into());
        self
    }

    /// Set whether files present at start are ignored.
    pub fn only_read_new_files(mut self, only_new: bool) -> Self {
        self.only_read_new_files = only_new;
        self
    }

    /// Set the file name pattern.
    pub fn with_reg_ex(mut self, pattern: impl Into<String>) -> Self {
        self.reg_ex = Some(pattern.into());
        self
    }

    /// Set whether subdirectories are watched.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set whether symbolic links below the watch directory are followed.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the file name predicate.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdapterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterOptions")
            .field("name", &self.name)
            .field("step_type", &self.step_type)
            .field("watch_dir", &self.watch_dir)
            .field("only_read_new_files", &self.only_read_new_files)
            .field("reg_ex", &self.reg_ex)
            .field("recursive", &self.recursive)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Validated, immutable adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Instance name.
    pub name: String,

    /// Directory watching, if a directory was configured.
    pub watch: Option<WatchConfig>,

    /// File name selection for watched files.
    pub selector: Selector,
}

impl AdapterConfig {
    /// Validate options. Performs no I/O.
    pub fn configure(options: AdapterOptions) -> Result<Self, ConfigError> {
        let pattern = match options.reg_ex.as_deref() {
            Some(p) if !p.is_empty() => Some(Regex::new(p)?),
            _ => None,
        };

        let watch = options
            .watch_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| {
                WatchConfig::new(dir)
                    .replay_existing(!options.only_read_new_files)
                    .with_recursive(options.recursive)
                    .with_follow_symlinks(options.follow_symlinks)
            });

        Ok(Self {
            name: options.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            watch,
            selector: Selector::new(options.filter, pattern),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn test_only_name_given() {
        let options = AdapterOptions::from_json(json!({
            "type": "inbound-file",
            "name": "myfileInbound"
        }))
        .unwrap();
        assert!(options.only_read_new_files);

        let config = AdapterConfig::configure(options).unwrap();
        assert_eq!(config.name, "myfileInbound");
        assert!(config.watch.is_none());
        assert!(matches!(config.selector, Selector::AcceptAll));
    }

    #[test]
    fn test_reg_ex_given() {
        let options = AdapterOptions::from_json(json!({
            "name": "myfileInbound",
            "regEx": ".*\\.csv"
        }))
        .unwrap();

        let config = AdapterConfig::configure(options).unwrap();
        match config.selector {
            Selector::Pattern(pattern) => assert_eq!(pattern.as_str(), ".*\\.csv"),
            other => panic!("expected a pattern selector, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_reg_ex_is_rejected() {
        let options = AdapterOptions::new().with_reg_ex("gum_(");
        let result = AdapterConfig::configure(options);
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }

    #[test]
    fn test_filter_in_json_is_not_a_function() {
        let result = AdapterOptions::from_json(json!({
            "name": "myfileInbound",
            "regEx": ".*\\.csv",
            "filter": "a"
        }));
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FilterNotCallable));
        assert_eq!(err.to_string(), "Filter must be a function");
    }

    #[test]
    fn test_watch_dir_maps_to_watch_config() {
        let options = AdapterOptions::from_json(json!({
            "watchDir": "/data/inbox",
            "onlyReadNewFiles": false,
            "recursive": false,
            "followSymlinks": true
        }))
        .unwrap();

        let watch = AdapterConfig::configure(options).unwrap().watch.unwrap();
        assert_eq!(watch.path, Path::new("/data/inbox"));
        assert!(watch.replay_existing);
        assert!(!watch.recursive);
        assert!(watch.follow_symlinks);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let options = AdapterOptions::new().with_watch_dir("").with_reg_ex("");
        let config = AdapterConfig::configure(options).unwrap();
        assert!(config.watch.is_none());
        assert!(matches!(config.selector, Selector::AcceptAll));
    }

    #[test]
    fn test_filter_wins_over_reg_ex() {
        let options = AdapterOptions::new()
            .with_reg_ex("^gum_")
            .with_filter(|name| name.ends_with(".txt"));
        let config = AdapterConfig::configure(options).unwrap();
        assert!(config.selector.accepts("notes.txt"));
        assert!(!config.selector.accepts("gum_1.csv"));
    }

    #[test]
    fn test_toml_options() {
        let options = AdapterOptions::from_toml_str(
            r#"
            name = "drop-box"
            watchDir = "/data/inbox"
            regEx = "\\.csv$"
            "#,
        )
        .unwrap();
        assert_eq!(options.name.as_deref(), Some("drop-box"));
        assert_eq!(options.reg_ex.as_deref(), Some("\\.csv$"));
        assert!(options.only_read_new_files);

        let result = AdapterOptions::from_toml_str("filter = \"yes\"");
        assert!(matches!(result, Err(ConfigError::FilterNotCallable)));
    }
}
