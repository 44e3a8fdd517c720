use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::binance::rest::DEFAULT_REST_BASE_URL;
use crate::csv_sink::TimeFormat;
use crate::error::DownloadError;
use crate::model::candle::ColumnMode;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const REST_BASE_URL_ENV: &str = "KLINE_REST_BASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub binance: BinanceConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_rest_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    #[serde(default)]
    pub column_mode: ColumnMode,
    /// Pause between page requests, in seconds.
    #[serde(default)]
    pub throttle_seconds: Option<f64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub time_format: TimeFormat,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            column_mode: ColumnMode::default(),
            throttle_seconds: None,
            output_dir: default_output_dir(),
            time_format: TimeFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_rest_base_url() -> String {
    DEFAULT_REST_BASE_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Converts a throttle in seconds into a sleep duration.
pub fn throttle_duration(seconds: Option<f64>) -> Result<Option<Duration>, DownloadError> {
    match seconds {
        None => Ok(None),
        Some(s) if s.is_finite() && s >= 0.0 => Ok(Some(Duration::from_secs_f64(s))),
        Some(s) => Err(DownloadError::Config(format!(
            "throttle_seconds must be a non-negative number, got {}",
            s
        ))),
    }
}

impl DownloadConfig {
    pub fn throttle(&self) -> Result<Option<Duration>, DownloadError> {
        throttle_duration(self.throttle_seconds)
    }
}

impl Config {
    /// Reads `.env`, then `path` if it exists, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, DownloadError> {
        dotenvy::dotenv().ok();

        let mut config = if path.exists() {
            let config_str = std::fs::read_to_string(path)?;
            Self::from_toml_str(&config_str)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(REST_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.binance.rest_base_url = url.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, DownloadError> {
        toml::from_str(s).map_err(|e| DownloadError::Config(format!("failed to parse config: {}", e)))
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.binance.rest_base_url.trim().is_empty() {
            return Err(DownloadError::Config(
                "binance.rest_base_url must not be empty".to_string(),
            ));
        }
        self.download.throttle()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let toml_str = r#"
[binance]
rest_base_url = "https://api.binance.com"

[download]
column_mode = "extended"
throttle_seconds = 0.5
output_dir = "data"
time_format = "millis"

[logging]
level = "debug"
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert_eq!(config.binance.rest_base_url, "https://api.binance.com");
        assert_eq!(config.download.column_mode, ColumnMode::Extended);
        assert_eq!(
            config.download.throttle().unwrap(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(config.download.output_dir, PathBuf::from("data"));
        assert_eq!(config.download.time_format, TimeFormat::Millis);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.binance.rest_base_url, DEFAULT_REST_BASE_URL);
        assert_eq!(config.download.column_mode, ColumnMode::Ohlcv);
        assert_eq!(config.download.throttle().unwrap(), None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_negative_throttle() {
        let config = Config::from_toml_str("[download]\nthrottle_seconds = -1.0\n").unwrap();
        assert!(matches!(config.validate(), Err(DownloadError::Config(_))));
    }

    #[test]
    fn rejects_unknown_column_mode() {
        assert!(Config::from_toml_str("[download]\ncolumn_mode = \"full\"\n").is_err());
    }
}
