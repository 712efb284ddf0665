// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DB: &str = "LEDGERLINE_DB";
pub const ENV_CONFIG: &str = "LEDGERLINE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file; defaults to `<data_dir>/ledgerline.sqlite`.
    pub database: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            log_filter: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Config {
    /// `$LEDGERLINE_CONFIG`, else `<config_dir>/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(p) = std::env::var(ENV_CONFIG) {
            return Ok(PathBuf::from(p));
        }
        let proj = crate::db::project_dirs()?;
        Ok(proj.config_dir().join("config.toml"))
    }

    /// Loads the config file (if any) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let cfg = Self::load_from(&path)?;
        Ok(cfg.with_env(|k| std::env::var(k).ok()))
    }

    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(ENV_DB).filter(|s| !s.trim().is_empty()) {
            self.database = Some(PathBuf::from(db.trim()));
        }
        self
    }

    /// `--db` on the command line beats every other source.
    pub fn with_database(mut self, db: Option<PathBuf>) -> Self {
        if db.is_some() {
            self.database = db;
        }
        self
    }
}
