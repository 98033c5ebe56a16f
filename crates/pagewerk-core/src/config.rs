// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PagewerkError, Result};

/// Environment variable naming the default engine data directory.
pub const DATA_PATH_ENV: &str = "PAGEWERK_DATAPATH";

/// Settings for a worker thread and the engine it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// OS thread name, visible in debuggers and logs.
    pub thread_name: String,
    /// Engine data directory used when `init` does not name one.
    pub data_path: Option<PathBuf>,
    /// Resolution (PPI) assumed for pages that carry none.
    pub default_resolution: u32,
    /// Progress updates buffered per call before newer ones are dropped.
    pub progress_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "pagewerk-worker".into(),
            data_path: None,
            default_resolution: 300,
            progress_capacity: 1,
        }
    }
}

impl WorkerConfig {
    /// Defaults, with the data path taken from [`DATA_PATH_ENV`] when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_path = lookup(DATA_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Self {
            data_path,
            ..Self::default()
        }
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "Worker config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.thread_name.is_empty() || self.thread_name.contains('\0') {
            return Err(PagewerkError::Config(
                "thread_name must be non-empty and free of NUL bytes".into(),
            ));
        }
        if self.default_resolution == 0 {
            return Err(PagewerkError::Config(
                "default_resolution must be positive".into(),
            ));
        }
        if self.progress_capacity == 0 {
            return Err(PagewerkError::Config(
                "progress_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
