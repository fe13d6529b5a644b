//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the file named by `FORECAST_CONFIG`) and
//! deserializes into strongly-typed structs. Every field has a default,
//! so a partial file or no file at all still yields a usable config.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "FORECAST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppSection {
    pub title: String,
    /// Period the forecasts cover, shown in the page heading.
    pub forecast_period: String,
    pub model_description: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: "Sales Forecast System".to_string(),
            forecast_period: "November 2015".to_string(),
            model_description: "LightGBM with 30+ engineered features".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    /// Required per-shop, per-item forecast table.
    pub predictions_path: String,
    /// Optional item metadata. Unset disables category display.
    pub items_path: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            predictions_path: "result.csv".to_string(),
            items_path: Some("data/items.csv".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8501,
        }
    }
}

impl DashboardConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults if the file is absent.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!(path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Config path from the environment, else `config.toml`.
    pub fn path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
