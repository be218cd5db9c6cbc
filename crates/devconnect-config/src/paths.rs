//! File system layout for the client (`~/.devconnect`).

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Everything the client writes lives under one base directory.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// `~/.devconnect`. Fails when the platform reports no home directory.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("no home directory for ~/.devconnect".to_string()))?;

        Ok(Self {
            base_dir: home.join(".devconnect"),
        })
    }

    /// Root the layout somewhere else, e.g. a temp dir in tests.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// `config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `tokens.json`, the file-backed token store.
    pub fn tokens_file(&self) -> PathBuf {
        self.base_dir.join("tokens.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// JSONL log written by the observability layer.
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("client.jsonl")
    }

    /// Create the base and log directories if missing.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
