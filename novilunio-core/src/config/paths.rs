//! Per-bot data directories.
//!
//! Each bot owns one flat directory holding its JSON stores and exports:
//! - powl: `./.pollbot/` (override with `POWL_DATA_DIR`)
//! - roblin: `./.roblin/` (override with `ROBLIN_DATA_DIR`)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::store::StoreError;

/// Which bot a data directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    Powl,
    Roblin,
}

impl BotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Powl => "powl",
            Self::Roblin => "roblin",
        }
    }

    fn default_dir(self) -> &'static str {
        match self {
            Self::Powl => ".pollbot",
            Self::Roblin => ".roblin",
        }
    }

    fn env_override(self) -> &'static str {
        match self {
            Self::Powl => "POWL_DATA_DIR",
            Self::Roblin => "ROBLIN_DATA_DIR",
        }
    }
}

impl std::fmt::Display for BotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root directory of a bot's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the directory for `kind`, honouring its env override.
    pub fn resolve(kind: BotKind) -> Self {
        match std::env::var(kind.env_override()) {
            Ok(dir) if !dir.trim().is_empty() => Self::new(dir),
            _ => Self::new(kind.default_dir()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })
    }

    pub fn join(&self, file: impl AsRef<Path>) -> PathBuf {
        self.root.join(file)
    }

    pub fn poll_history(&self) -> PathBuf {
        self.join("poll_history.json")
    }

    pub fn poll_settings(&self) -> PathBuf {
        self.join("poll_settings.json")
    }

    pub fn watch_settings(&self) -> PathBuf {
        self.join("settings.json")
    }

    pub fn watch_state(&self) -> PathBuf {
        self.join("watch_state.json")
    }

    /// Delete every regular file in the directory, returning how many went.
    pub fn reset(&self) -> Result<usize, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }

        info!(dir = %self.root.display(), removed, "data directory reset");
        Ok(removed)
    }
}
