//! Editor configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `SIGNCRAFT_API_URL` - Base URL of the SignCraft API (default: `http://127.0.0.1:4000`)
//! - `SIGNCRAFT_EDITOR_DIR` - Directory for the local project store (default: `.signcraft`)
//! - `SIGNCRAFT_PRICE_DEBOUNCE_MS` - Quiet period before repricing an edited canvas (default: 2000)
//! - `SIGNCRAFT_FONTS_URL` - Where preview fonts are downloaded from (default: `<api>/fonts/`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::reconciler::DEFAULT_DEBOUNCE;

const DEFAULT_API_URL: &str = "http://127.0.0.1:4000";
const DEFAULT_DATA_DIR: &str = ".signcraft";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Editor runtime configuration.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Base URL of the HTTP API
    pub api_url: Url,
    /// Root directory of the file-backed store
    pub data_dir: PathBuf,
    /// Debounce after canvas mutations
    pub price_debounce: Duration,
    /// Base URL for font files used in SVG previews
    pub fonts_url: Url,
}

impl EditorConfig {
    /// Configuration for an API at `api_url`, with default store location,
    /// debounce and font URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` cannot be a base URL.
    pub fn new(api_url: Url) -> Result<Self, ConfigError> {
        let fonts_url = api_url.join("fonts/").map_err(|e| {
            ConfigError::InvalidEnvVar("SIGNCRAFT_API_URL".to_string(), e.to_string())
        })?;
        Ok(Self {
            api_url,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            price_debounce: DEFAULT_DEBOUNCE,
            fonts_url,
        })
    }

    /// Load configuration from environment variables, with defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let raw_api_url =
            get_optional_env("SIGNCRAFT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(parse_url("SIGNCRAFT_API_URL", &raw_api_url)?)?;

        if let Some(raw) = get_optional_env("SIGNCRAFT_FONTS_URL") {
            config.fonts_url = parse_url("SIGNCRAFT_FONTS_URL", &raw)?;
        }
        if let Some(dir) = get_optional_env("SIGNCRAFT_EDITOR_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get_optional_env("SIGNCRAFT_PRICE_DEBOUNCE_MS") {
            let millis = raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("SIGNCRAFT_PRICE_DEBOUNCE_MS".to_string(), e.to_string())
            })?;
            config.price_debounce = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
