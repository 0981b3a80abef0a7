//! TOML configuration: grammar fixtures and synchronizer tunables.
//!
//! The file lives at `~/.config/orgweave/config.toml` unless the
//! `ORGWEAVE_CONFIG` environment variable points elsewhere. Tilde and
//! environment variables in `notes_path` are expanded on load.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use orgweave_engine::{Syntax, SyntaxOptions};

pub const CONFIG_PATH_VAR: &str = "ORGWEAVE_CONFIG";
const DEFAULT_LOCATION: &str = "~/.config/orgweave/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn default_todo_keywords() -> Vec<String> {
    vec!["TODO".to_owned()]
}

fn default_done_keywords() -> Vec<String> {
    vec!["DONE".to_owned()]
}

fn default_tab_width() -> usize {
    8
}

fn default_sync_duration_ms() -> u64 {
    40
}

fn default_sync_idle_ms() -> u64 {
    600
}

/// Grammar fixtures and synchronizer tunables loaded from TOML.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for `.org` files.
    pub notes_path: PathBuf,
    #[serde(default = "default_todo_keywords")]
    pub todo_keywords: Vec<String>,
    #[serde(default = "default_done_keywords")]
    pub done_keywords: Vec<String>,
    /// Tag alignment column; 0 keeps a single space.
    #[serde(default)]
    pub tags_column: i32,
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,
    /// Wall-clock budget of one synchronizer slice, in milliseconds.
    #[serde(default = "default_sync_duration_ms")]
    pub sync_duration_ms: u64,
    /// Idle delay before resuming a partial sync, in milliseconds.
    #[serde(default = "default_sync_idle_ms")]
    pub sync_idle_ms: u64,
}

/// Expand `~` and `$VARS`; a path that fails to expand is kept verbatim.
fn expand(path: PathBuf) -> PathBuf {
    match shellexpand::full(&path.to_string_lossy()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path,
    }
}

impl Config {
    /// Load from `config_path`; a missing file is not an error.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let path = config_path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Read { path: path.to_owned(), source }),
        };
        let mut config: Config = toml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_owned(), source })?;
        config.notes_path = expand(config.notes_path);
        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> Result<(), ConfigError> {
        let path = config_path.as_ref();
        let content = toml::to_string_pretty(self)?;
        let io_err = |source| ConfigError::Write { path: path.to_owned(), source };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)
    }

    /// `$ORGWEAVE_CONFIG` when set, the default location otherwise.
    pub fn config_path() -> PathBuf {
        match std::env::var_os(CONFIG_PATH_VAR) {
            Some(overridden) => expand(PathBuf::from(overridden)),
            None => expand(PathBuf::from(DEFAULT_LOCATION)),
        }
    }

    /// Compile the engine syntax table from this configuration.
    pub fn syntax(&self) -> Syntax {
        Syntax::new(SyntaxOptions {
            todo_keywords: self.todo_keywords.clone(),
            done_keywords: self.done_keywords.clone(),
            tags_column: self.tags_column,
            tab_width: self.tab_width,
            ..SyntaxOptions::default()
        })
    }

    pub fn sync_duration(&self) -> Duration {
        Duration::from_millis(self.sync_duration_ms)
    }

    pub fn sync_idle(&self) -> Duration {
        Duration::from_millis(self.sync_idle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            notes_path: PathBuf::new(),
            todo_keywords: default_todo_keywords(),
            done_keywords: default_done_keywords(),
            tags_column: 0,
            tab_width: default_tab_width(),
            sync_duration_ms: default_sync_duration_ms(),
            sync_idle_ms: default_sync_idle_ms(),
        }
    }
}
