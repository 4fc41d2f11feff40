//! Configuration loaded from the environment.
//!
//! Values come from the process environment, with a `.env` file loaded first
//! when present. Everything is optional; the defaults price with the standard
//! rate table.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::pricing::{BoltOnPricing, PricingEngine, RateTable};

pub const BOLT_ON_PRICING_VAR: &str = "QUOTE_BOLT_ON_PRICING";
pub const RATE_TABLE_VAR: &str = "QUOTE_RATE_TABLE";
pub const LOG_FILTER_VAR: &str = "QUOTE_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read rate table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rate table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid rate table: {}", .errors.join("; "))]
    InvalidRateTable { errors: Vec<String> },
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bolt_on_pricing: BoltOnPricing,
    /// JSON rate table replacing the built-in one
    pub rate_table_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bolt_on_pricing: BoltOnPricing::default(),
            rate_table_path: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bolt_on_pricing = match get(BOLT_ON_PRICING_VAR) {
            Some(value) => value.parse()?,
            None => BoltOnPricing::default(),
        };

        Ok(Self {
            bolt_on_pricing,
            rate_table_path: get(RATE_TABLE_VAR).map(PathBuf::from),
            log_filter: get(LOG_FILTER_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    /// Configured rate table, or the built-in one
    pub fn rate_table(&self) -> Result<RateTable, ConfigError> {
        match &self.rate_table_path {
            Some(path) => load_rate_table(path),
            None => Ok(RateTable::default()),
        }
    }

    /// Build a pricing engine from these settings
    pub fn engine(&self) -> Result<PricingEngine, ConfigError> {
        let rates = self.rate_table()?;
        info!(bolt_on_pricing = ?self.bolt_on_pricing, "Pricing engine configured");
        Ok(PricingEngine::new(rates, self.bolt_on_pricing))
    }
}

/// Read and validate a JSON rate table
pub fn load_rate_table(path: &Path) -> Result<RateTable, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rates = parse_rate_table(&contents)?;
    info!("Loaded rate table from {}", path.display());
    Ok(rates)
}

/// Parse and validate a JSON rate table
pub fn parse_rate_table(json: &str) -> Result<RateTable, ConfigError> {
    let rates: RateTable = serde_json::from_str(json)?;
    rates.validate()?;
    Ok(rates)
}
