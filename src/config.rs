//! Engine configuration and checkpoint backend resolution.
//!
//! Configuration is deliberately small: which checkpoint backend to use,
//! where the SQLite database lives, and the runaway-cycle step budget.
//! Database naming resolves through the environment (`.env` files honored
//! via dotenvy) so deployments configure storage without code changes.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::checkpoint::{Checkpointer, InMemoryCheckpointer};
use crate::engine::DEFAULT_MAX_STEPS;

/// Environment variable naming the full SQLite URL, highest precedence.
pub const ENV_SQLITE_URL: &str = "STATELOOM_SQLITE_URL";
/// Environment variable naming just the database file.
pub const ENV_SQLITE_DB_NAME: &str = "SQLITE_DB_NAME";
/// Database file used when nothing is configured.
pub const DEFAULT_SQLITE_DB_NAME: &str = "stateloom.db";

/// Checkpoint backend selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CheckpointerType {
    /// Process-local, lost on restart. The default.
    #[default]
    InMemory,
    /// Durable SQLite store.
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Failures while resolving configuration into a runnable engine.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not prepare checkpoint database file '{path}'")]
    #[diagnostic(
        code(stateloom::config::db_file),
        help("check the path is writable; SQLite will not create parent directories")
    )]
    DatabaseFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint backend initialization failed")]
    #[diagnostic(code(stateloom::config::checkpointer))]
    Checkpointer(#[from] crate::checkpoint::CheckpointerError),
}

/// Configuration for constructing an [`Engine`](crate::engine::Engine).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Runaway-cycle budget per run.
    pub max_steps: u64,
    /// Which checkpoint backend to construct.
    pub checkpointer: CheckpointerType,
    /// SQLite database file, overriding the environment lookup.
    pub sqlite_db_name: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            checkpointer: CheckpointerType::default(),
            sqlite_db_name: None,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_checkpointer(mut self, checkpointer: CheckpointerType) -> Self {
        self.checkpointer = checkpointer;
        self
    }

    #[must_use]
    pub fn with_sqlite_db_name(mut self, name: impl Into<String>) -> Self {
        self.sqlite_db_name = Some(name.into());
        self
    }

    /// Resolves the SQLite database file name: explicit config, then
    /// `SQLITE_DB_NAME` from the environment (`.env` honored), then the
    /// default.
    #[must_use]
    pub fn resolve_sqlite_db_name(&self) -> String {
        if let Some(name) = &self.sqlite_db_name {
            return name.clone();
        }
        dotenvy::dotenv().ok();
        std::env::var(ENV_SQLITE_DB_NAME).unwrap_or_else(|_| DEFAULT_SQLITE_DB_NAME.to_string())
    }

    /// Constructs the configured checkpoint backend.
    ///
    /// For SQLite, `STATELOOM_SQLITE_URL` takes precedence over the file
    /// name resolution; when a file name is used, the file is created first
    /// because SQLite will not create it on connect.
    pub async fn create_checkpointer(&self) -> Result<Arc<dyn Checkpointer>, ConfigError> {
        match self.checkpointer {
            CheckpointerType::InMemory => Ok(Arc::new(InMemoryCheckpointer::new())),
            #[cfg(feature = "sqlite")]
            CheckpointerType::Sqlite => {
                dotenvy::dotenv().ok();
                let url = match std::env::var(ENV_SQLITE_URL) {
                    Ok(url) => url,
                    Err(_) => {
                        let db_name = self.resolve_sqlite_db_name();
                        if !std::path::Path::new(&db_name).exists() {
                            std::fs::File::create(&db_name).map_err(|source| {
                                ConfigError::DatabaseFile {
                                    path: db_name.clone(),
                                    source,
                                }
                            })?;
                        }
                        format!("sqlite://{db_name}")
                    }
                };
                tracing::info!(url = %url, "connecting sqlite checkpointer");
                let checkpointer = crate::checkpoint::SqliteCheckpointer::connect(&url).await?;
                Ok(Arc::new(checkpointer))
            }
        }
    }
}
