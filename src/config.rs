use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_DATABASE: &str = "saleql.db";
const DEFAULT_HISTORY: &str = ".saleql_history";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database file; `:memory:` keeps everything in memory.
    pub database: PathBuf,
    /// Line history of the interactive shell.
    pub history: PathBuf,
    /// `tracing` filter directives, from `SALEQL_LOG` or else `RUST_LOG`.
    pub log: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    saleql_database: Option<PathBuf>,
    #[serde(default)]
    saleql_history: Option<PathBuf>,
    #[serde(default)]
    saleql_log: Option<String>,
    #[serde(default)]
    rust_log: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse SALEQL_* environment variables")?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        Self {
            database: raw
                .saleql_database
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            history: raw
                .saleql_history
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY)),
            log: raw.saleql_log.or(raw.rust_log),
        }
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, database: Option<PathBuf>, history: Option<PathBuf>) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(history) = history {
            self.history = history;
        }
        self
    }
}
