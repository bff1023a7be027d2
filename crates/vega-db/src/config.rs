//! # POS Configuration
//!
//! Settings for one register terminal.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     VEGA_DB_PATH, VEGA_STORE_ID, VEGA_STORE_NAME, VEGA_TERMINAL_CODE,   │
//! │     VEGA_TAX_RATE (percent), VEGA_TAX_ENABLED, VEGA_MAX_COMMIT_ATTEMPTS │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/vegapos/vega.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.vega.vegapos/vega.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/vega/vega.db"
//! max_connections = 5
//!
//! [store]
//! id = "store-001"
//! name = "Downtown Branch"
//! terminal_code = "01"
//!
//! [tax]
//! rate_bps = 1600   # 16%
//! enabled = true
//!
//! [checkout]
//! max_commit_attempts = 3
//! retry_backoff_ms = 50
//! ```

use std::path::PathBuf;
use std::time::Duration;

use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use vega_core::pricing::TaxPolicy;
use vega_core::validation::{validate_tax_rate_bps, validate_terminal_code};
use vega_core::TaxRate;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid environment variable {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `vega.db` in the platform data dir.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "vega", "vegapos")
        .map(|dirs| dirs.data_dir().join("vega.db"))
        .unwrap_or_else(|| PathBuf::from("vega.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Goes into every sale number: `YYYYMMDD-<terminal_code>-NNNN`.
    #[serde(default = "default_terminal_code")]
    pub terminal_code: String,
}

fn default_terminal_code() -> String {
    "01".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            id: "default-store".to_string(),
            name: "Default Store".to_string(),
            terminal_code: default_terminal_code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Basis points: 1600 = 16%.
    #[serde(default)]
    pub rate_bps: u32,

    #[serde(default)]
    pub enabled: bool,
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            rate_bps: 0,
            enabled: false,
        }
    }
}

impl TaxSettings {
    pub fn policy(&self) -> TaxPolicy {
        TaxPolicy::new(TaxRate::from_bps(self.rate_bps), self.enabled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Total attempts for a commit that hits a persistence conflict.
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,

    /// First delay between attempts; doubles on each further conflict.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Ceiling for a single retry delay.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(1);

fn default_max_commit_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    50
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            max_commit_attempts: default_max_commit_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl CheckoutSettings {
    /// Retry schedule for conflicting commits. The attempt count is bounded
    /// by `max_commit_attempts`, not by elapsed time.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.retry_backoff_ms),
            max_interval: MAX_RETRY_BACKOFF,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// PosConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl PosConfig {
    /// Loads defaults, then the TOML file (explicit path or the platform
    /// default), then environment overrides, then validates.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading POS config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load POS config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        info!(?path, "POS config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.store.id.trim().is_empty() {
            return Err(ConfigError::Invalid("store.id must not be empty".into()));
        }

        validate_terminal_code(&self.store.terminal_code)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate_tax_rate_bps(self.tax.rate_bps).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.checkout.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid(
                "checkout.max_commit_attempts must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    // Split from the env lookup so tests don't touch process state.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(path) = var("VEGA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(id) = var("VEGA_STORE_ID") {
            self.store.id = id;
        }

        if let Some(name) = var("VEGA_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(code) = var("VEGA_TERMINAL_CODE") {
            debug!(terminal_code = %code, "Overriding terminal code from environment");
            self.store.terminal_code = code;
        }

        // Percentage, e.g. "16" or "8.25".
        if let Some(rate) = var("VEGA_TAX_RATE") {
            let pct: f64 = rate.parse().map_err(|_| invalid_env("VEGA_TAX_RATE", &rate))?;
            if !(0.0..=100.0).contains(&pct) {
                return Err(invalid_env("VEGA_TAX_RATE", &rate));
            }
            self.tax.rate_bps = TaxRate::from_percentage(pct).bps();
        }

        if let Some(enabled) = var("VEGA_TAX_ENABLED") {
            self.tax.enabled = match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid_env("VEGA_TAX_ENABLED", &enabled)),
            };
        }

        if let Some(attempts) = var("VEGA_MAX_COMMIT_ATTEMPTS") {
            self.checkout.max_commit_attempts = attempts
                .parse()
                .map_err(|_| invalid_env("VEGA_MAX_COMMIT_ATTEMPTS", &attempts))?;
        }

        Ok(())
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vega", "vegapos")
            .map(|dirs| dirs.config_dir().join("vega.toml"))
    }
}

fn invalid_env(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
