//! Configuration management
//!
//! Values come from the process environment (a `.env` file is honoured) and
//! can be overridden by CLI flags afterwards.

use clap::ValueEnum;
use hotel_common::{ImportError, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "hotel_db";
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "password";

/// Default maximum database connections in the pool.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default minimum database connections in the pool.
pub const DEFAULT_DB_MIN_CONNECTIONS: u32 = 0;

/// Default pool acquire timeout in seconds.
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 10;

/// Rows per batch, for parent and dependent inserts alike.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Batches allowed to wait for the writer before the reader suspends.
pub const DEFAULT_MAX_PENDING_BATCHES: usize = 4;

/// Rows between two progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

// ============================================================================
// Batch Failure Policy
// ============================================================================

/// What the loader does when a batch cannot be committed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailurePolicy {
    /// Stop at the first failed batch and fail the run
    #[default]
    Abort,
    /// Count the batch's rows as skipped and keep loading
    Continue,
}

impl fmt::Display for BatchFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Continue => f.write_str("continue"),
        }
    }
}

impl FromStr for BatchFailurePolicy {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            other => Err(ImportError::config(format!(
                "unknown batch failure policy '{}' (expected abort or continue)",
                other
            ))),
        }
    }
}

// ============================================================================
// Import Configuration
// ============================================================================

/// Batching and reporting knobs shared by both import kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub max_pending_batches: usize,
    pub on_batch_failure: BatchFailurePolicy,
    pub progress_interval: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
            on_batch_failure: BatchFailurePolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ImportConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            batch_size: parse_or(&get, "IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            max_pending_batches: parse_or(
                &get,
                "IMPORT_MAX_PENDING_BATCHES",
                DEFAULT_MAX_PENDING_BATCHES,
            )?,
            on_batch_failure: match get("IMPORT_ON_BATCH_FAILURE") {
                Some(raw) => raw.parse()?,
                None => BatchFailurePolicy::default(),
            },
            progress_interval: parse_or(&get, "IMPORT_PROGRESS_INTERVAL", DEFAULT_PROGRESS_INTERVAL)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_pending_batches(mut self, max_pending_batches: usize) -> Self {
        self.max_pending_batches = max_pending_batches;
        self
    }

    pub fn with_batch_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.on_batch_failure = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ImportError::config("batch size must be greater than 0"));
        }
        if self.max_pending_batches == 0 {
            return Err(ImportError::config(
                "max pending batches must be greater than 0",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Connection settings for the PostgreSQL pool
#[derive(Clone)]
pub struct DbConfig {
    /// Full URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            name: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            min_connections: DEFAULT_DB_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_DB_IDLE_TIMEOUT_SECS,
        }
    }
}

// password stays out of Debug output
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("target", &self.target())
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .finish()
    }
}

impl DbConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            url: get("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            host: text("DB_HOST", DEFAULT_DB_HOST),
            port: parse_or(&get, "DB_PORT", DEFAULT_DB_PORT)?,
            name: text("DB_NAME", DEFAULT_DB_NAME),
            user: text("DB_USER", DEFAULT_DB_USER),
            password: text("DB_PASSWORD", DEFAULT_DB_PASSWORD),
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", DEFAULT_DB_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_or(
                &get,
                "DB_ACQUIRE_TIMEOUT",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_or(&get, "DB_IDLE_TIMEOUT", DEFAULT_DB_IDLE_TIMEOUT_SECS)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ImportError::config(
                "database max_connections must be greater than 0",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ImportError::config(format!(
                "database min_connections ({}) cannot be greater than max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.url.is_none() && self.host.trim().is_empty() {
            return Err(ImportError::config("database host cannot be empty"));
        }
        Ok(())
    }

    /// Connection options for the pool
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| ImportError::config(format!("invalid DATABASE_URL: {}", e))),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .database(&self.name)
                .username(&self.user)
                .password(&self.password)),
        }
    }

    /// Connection target without credentials, for logs
    pub fn target(&self) -> String {
        match &self.url {
            Some(url) => match url.rsplit_once('@') {
                Some((_, host)) => host.to_string(),
                None => url.clone(),
            },
            None => format!("{}:{}/{}", self.host, self.port, self.name),
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ImportError::config(format!("{}='{}': {}", key, raw, e))),
        _ => Ok(default),
    }
}
