//! TOML run configuration.
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```toml
//! [strategy]
//! sma_early_window = 60
//! sma_late_window = 252
//! trading_days_per_year = 252
//!
//! [data]
//! lookback_years = 5
//!
//! [sizing]
//! max_spread_scale = 0.30
//! buying_power_fraction = 0.5
//!
//! [broker]
//! base_url = "https://paper-api.alpaca.markets"
//! ```
//!
//! Broker credentials may live in the file but are normally taken from
//! `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use smacross_core::engine::signal::{DEFAULT_SMA_EARLY_WINDOW, DEFAULT_SMA_LATE_WINDOW};
use smacross_core::CrossoverConfig;
use thiserror::Error;

pub const TRADING_DAYS_PER_YEAR: u32 = 252;
pub const DEFAULT_MAX_SPREAD_SCALE: f64 = 0.30;
pub const DEFAULT_BUYING_POWER_FRACTION: f64 = 0.5;
pub const DEFAULT_LOOKBACK_YEARS: u32 = 5;
pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";

pub const ENV_KEY_ID: &str = "APCA_API_KEY_ID";
pub const ENV_SECRET_KEY: &str = "APCA_API_SECRET_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("missing broker credential: set {0} or [broker] in the config file")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SmacrossConfig {
    pub strategy: StrategySection,
    pub data: DataSection,
    pub sizing: SizingConfig,
    pub broker: BrokerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub sma_early_window: usize,
    pub sma_late_window: usize,
    pub trading_days_per_year: u32,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            sma_early_window: DEFAULT_SMA_EARLY_WINDOW,
            sma_late_window: DEFAULT_SMA_LATE_WINDOW,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub lookback_years: u32,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            lookback_years: DEFAULT_LOOKBACK_YEARS,
        }
    }
}

/// Order sizing constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Relative SMA spread at which the incremental buy shrinks to zero.
    pub max_spread_scale: f64,
    /// Share of non-margin buying power committed per order.
    pub buying_power_fraction: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            max_spread_scale: DEFAULT_MAX_SPREAD_SCALE,
            buying_power_fraction: DEFAULT_BUYING_POWER_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    pub base_url: String,
    pub key_id: Option<String>,
    pub secret_key: Option<String>,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            base_url: PAPER_BASE_URL.to_string(),
            key_id: None,
            secret_key: None,
        }
    }
}

/// Resolved API credentials.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub key_id: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl BrokerSection {
    /// Credentials from the environment, falling back to the file.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    /// Same as `credentials`, with an injectable environment lookup.
    pub fn credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let pick = |name: &'static str, file: &Option<String>| {
            env(name)
                .filter(|v| !v.is_empty())
                .or_else(|| file.clone())
                .ok_or(ConfigError::MissingCredential(name))
        };
        Ok(Credentials {
            key_id: pick(ENV_KEY_ID, &self.key_id)?,
            secret_key: pick(ENV_SECRET_KEY, &self.secret_key)?,
        })
    }
}

impl SmacrossConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn crossover(&self) -> CrossoverConfig {
        CrossoverConfig::new(self.strategy.sma_early_window, self.strategy.sma_late_window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crossover()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.strategy.trading_days_per_year == 0 {
            return Err(ConfigError::Invalid(
                "trading_days_per_year must be > 0".into(),
            ));
        }
        if self.data.lookback_years == 0 {
            return Err(ConfigError::Invalid("lookback_years must be > 0".into()));
        }
        if !(self.sizing.max_spread_scale > 0.0 && self.sizing.max_spread_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "max_spread_scale must be a positive number, got {}",
                self.sizing.max_spread_scale
            )));
        }
        let fraction = self.sizing.buying_power_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "buying_power_fraction must be in (0, 1], got {fraction}"
            )));
        }
        Ok(())
    }
}
