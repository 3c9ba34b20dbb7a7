//! API server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SIGNCRAFT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SIGNCRAFT_JWT_SECRET` - Token signing secret, min 32 chars, high entropy (falls back to `secretKey`)
//!
//! ## Optional
//! - `SIGNCRAFT_HOST` - Bind address (default: 127.0.0.1)
//! - `SIGNCRAFT_PORT` - Listen port (default: 4000)
//! - `SIGNCRAFT_LAYOUT_SERVER` - Public URL of the editor, used in emails, documents and CORS
//!   (falls back to `VITE_LAYOUT_SERVER`, default: `http://localhost:5173`)
//! - `SIGNCRAFT_JWT_TTL_HOURS` - Token lifetime (default: 24)
//! - `SIGNCRAFT_ICONS_DIR` - Icon asset directory (default: `assets/icons`)
//! - `SIGNCRAFT_CHROME_BIN` - Headless Chromium binary for PDF rendering
//! - `SIGNCRAFT_HOME_COUNTRY` - Seller country for the default VAT table (default: UA)
//! - `GMAIL_USER_SEND` / `GMAIL_PASS` - SMTP login; both enable order emails
//! - `SMTP_HOST` / `SMTP_PORT` - SMTP relay (default: smtp.gmail.com:587)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling (default: 1.0 / 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the editor front end
    pub public_url: String,
    /// Token signing settings
    pub jwt: JwtConfig,
    /// Directory holding icon assets
    pub icons_dir: PathBuf,
    /// Headless browser used to print PDFs
    pub chrome_bin: Option<PathBuf>,
    /// Seller country (ISO 3166-1 alpha-2)
    pub home_country: String,
    /// Outgoing mail, if configured
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Token signing settings.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// Token lifetime in hours
    pub ttl_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// SMTP configuration for order emails.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SIGNCRAFT_DATABASE_URL")?;
        let host = get_env_or_default("SIGNCRAFT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SIGNCRAFT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SIGNCRAFT_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SIGNCRAFT_PORT".to_string(), e.to_string()))?;
        let public_url = get_optional_env("SIGNCRAFT_LAYOUT_SERVER")
            .or_else(|| get_optional_env("VITE_LAYOUT_SERVER"))
            .unwrap_or_else(|| "http://localhost:5173".to_string());
        url::Url::parse(&public_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SIGNCRAFT_LAYOUT_SERVER".to_string(), e.to_string())
        })?;

        let jwt = JwtConfig::from_env()?;
        let email = EmailConfig::from_env()?;

        let home_country = get_env_or_default("SIGNCRAFT_HOME_COUNTRY", "UA").to_ascii_uppercase();
        if home_country.len() != 2 || !home_country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar(
                "SIGNCRAFT_HOME_COUNTRY".to_string(),
                "must be a two-letter country code".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            public_url,
            jwt,
            icons_dir: PathBuf::from(get_env_or_default("SIGNCRAFT_ICONS_DIR", "assets/icons")),
            chrome_bin: get_optional_env("SIGNCRAFT_CHROME_BIN").map(PathBuf::from),
            home_country,
            email,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let (key, value) = match std::env::var("SIGNCRAFT_JWT_SECRET") {
            Ok(value) => ("SIGNCRAFT_JWT_SECRET", value),
            Err(_) => (
                "secretKey",
                std::env::var("secretKey")
                    .map_err(|_| ConfigError::MissingEnvVar("SIGNCRAFT_JWT_SECRET".to_string()))?,
            ),
        };
        validate_secret_strength(&value, key)?;
        let secret = SecretString::from(value);
        validate_jwt_secret(&secret, key)?;

        let ttl_hours = get_env_or_default("SIGNCRAFT_JWT_TTL_HOURS", "24")
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "SIGNCRAFT_JWT_TTL_HOURS".to_string(),
                    "must be a positive number of hours".to_string(),
                )
            })?;

        Ok(Self { secret, ttl_hours })
    }
}

impl EmailConfig {
    /// Email is optional: both `GMAIL_USER_SEND` and `GMAIL_PASS` must be set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(username), Some(password)) = (
            get_optional_env("GMAIL_USER_SEND"),
            get_optional_env("GMAIL_PASS"),
        ) else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host: get_env_or_default("SMTP_HOST", "smtp.gmail.com"),
            smtp_port,
            from_address: username.clone(),
            smtp_username: username,
            smtp_password: SecretString::from(password),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a sampling rate in `0.0..=1.0`.
fn get_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    raw.parse::<f32>()
        .ok()
        .filter(|r| (0.0..=1.0).contains(r))
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "must be between 0 and 1".to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
