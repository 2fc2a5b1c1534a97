/// Service configuration.
///
/// Settings come from an optional `econmon.toml` file plus the environment.
/// `.env` files are honoured through `dotenv`, and `FRED_API_KEY` in the
/// environment always wins over an `api_key` written in the TOML file so
/// keys can stay out of checked-in configuration.

use serde::Deserialize;
use std::path::Path;

use crate::logging::LogLevel;
use crate::model::EconError;

pub const DEFAULT_CONFIG_PATH: &str = "./econmon.toml";
pub const API_KEY_ENV: &str = "FRED_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred";

// ---------------------------------------------------------------------------
// File structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FredSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    /// `limit` passed to the series search endpoint during discovery.
    pub search_limit: u32,
    pub timeout_secs: u64,
}

impl Default for FredSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            search_limit: 10,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fred: FredSettings,
    pub logging: LoggingSettings,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Parses a TOML document. Missing tables and keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Config, EconError> {
        toml::from_str(text).map_err(|e| EconError::Configuration(e.to_string()))
    }

    /// Loads `path` if it exists (defaults otherwise), then applies the
    /// environment. A missing file is not an error; a malformed one is.
    pub fn load(path: &Path) -> Result<Config, EconError> {
        dotenv::dotenv().ok();

        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|e| {
                EconError::Configuration(format!("cannot read {}: {}", path.display(), e))
            })?;
            Config::from_toml_str(&text)?
        } else {
            Config::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.fred.api_key = Some(key);
        }

        Ok(config)
    }

    /// The API key, or a configuration error if none is set.
    pub fn api_key(&self) -> Result<&str, EconError> {
        match self.fred.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(EconError::Configuration(format!(
                "no API key: set {} or [fred].api_key",
                API_KEY_ENV
            ))),
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.logging.level).unwrap_or(LogLevel::Info)
    }
}
