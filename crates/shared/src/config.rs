//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage backend selection.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Planning engine tunables.
    #[serde(default)]
    pub planning: PlanningConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL. Required for the postgres backend.
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Which store backs the repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; data is lost on restart.
    #[default]
    Memory,
    /// PostgreSQL through SeaORM.
    Postgres,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Load the demo school dataset on startup (memory backend only).
    #[serde(default)]
    pub seed_demo: bool,
}

/// Planning engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanningConfig {
    /// Fixed trimester split applied when modules carry no period breakdown.
    #[serde(default)]
    pub period_split: PeriodSplitConfig,
    /// Maximum number of rendered statements kept in cache.
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: u64,
    /// Time-to-live of a cached statement, in seconds.
    #[serde(default = "default_statement_cache_ttl")]
    pub statement_cache_ttl_secs: u64,
    /// Optional TOML file replacing the default PCG account mapping table.
    #[serde(default)]
    pub account_mapping_file: Option<String>,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            period_split: PeriodSplitConfig::default(),
            statement_cache_capacity: default_statement_cache_capacity(),
            statement_cache_ttl_secs: default_statement_cache_ttl(),
            account_mapping_file: None,
        }
    }
}

fn default_statement_cache_capacity() -> u64 {
    256
}

fn default_statement_cache_ttl() -> u64 {
    300 // 5 minutes
}

/// Trimester split in percent. Must total exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PeriodSplitConfig {
    /// First trimester share (percent).
    pub t1: Decimal,
    /// Second trimester share (percent).
    pub t2: Decimal,
    /// Third (summer) trimester share (percent).
    pub t3: Decimal,
}

impl Default for PeriodSplitConfig {
    fn default() -> Self {
        Self {
            t1: Decimal::from(40),
            t2: Decimal::from(30),
            t3: Decimal::from(30),
        }
    }
}

impl PeriodSplitConfig {
    /// Checks that every share lies in 0..=100 and that the shares total 100.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        for (name, share) in [("t1", self.t1), ("t2", self.t2), ("t3", self.t3)] {
            if share < Decimal::ZERO || share > Decimal::ONE_HUNDRED {
                return Err(format!("period_split.{name} must be between 0 and 100, got {share}"));
            }
        }
        let total = self.t1 + self.t2 + self.t3;
        if total != Decimal::ONE_HUNDRED {
            return Err(format!("period_split must total 100, got {total}"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or fails validation.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SCHOOLPLAN").separator("__"))
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Cross-field validation that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing the problem.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(config::ConfigError::Message(
                "database.url is required when storage.backend = \"postgres\"".to_string(),
            ));
        }
        self.planning
            .period_split
            .validate()
            .map_err(config::ConfigError::Message)
    }
}
