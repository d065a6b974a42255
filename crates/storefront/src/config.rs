//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DRAPE_DATABASE_URL` - Base URL of the remote document store
//!
//! ## Optional
//! - `DRAPE_DATABASE_AUTH` - Database secret or ID token (high entropy)
//! - `DRAPE_STORAGE_PATH` - Client storage file (default: .drape/storage.json)
//! - `DRAPE_SHIPPING_FEE` - Flat shipping fee (default: 10)
//! - `DRAPE_FREE_SHIPPING_THRESHOLD` - Subtotals above this ship free (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;

use drape_core::{Money, ShippingPolicy};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default location of the client storage file.
pub const DEFAULT_STORAGE_PATH: &str = ".drape/storage.json";

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

/// Storefront application configuration.
///
/// Implements `Debug` manually to redact the database auth secret.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the remote document store
    pub database_url: Url,
    /// Database secret or ID token appended to every request
    pub database_auth: Option<SecretString>,
    /// Client storage file
    pub storage_path: PathBuf,
    /// Shipping fee rules
    pub shipping: ShippingPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("database_url", &self.database_url.as_str())
            .field(
                "database_auth",
                &self.database_auth.as_ref().map(|_| "[REDACTED]"),
            )
            .field("storage_path", &self.storage_path)
            .field("shipping", &self.shipping)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
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
    /// if the auth secret fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_env("DRAPE_DATABASE_URL")?;
        let database_url = Url::parse(&database_url).map_err(|e| {
            ConfigError::InvalidEnvVar("DRAPE_DATABASE_URL".to_string(), e.to_string())
        })?;
        let database_auth = get_optional_validated_secret("DRAPE_DATABASE_AUTH")?;
        let storage_path =
            PathBuf::from(get_env_or_default("DRAPE_STORAGE_PATH", DEFAULT_STORAGE_PATH));

        let shipping = ShippingPolicy {
            flat_fee: get_money_or_default("DRAPE_SHIPPING_FEE", "10")?,
            free_threshold: get_money_or_default("DRAPE_FREE_SHIPPING_THRESHOLD", "100")?,
        };

        Ok(Self {
            database_url,
            database_auth,
            storage_path,
            shipping,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for a store at `database_url` with every default applied.
    #[must_use]
    pub fn new(database_url: Url) -> Self {
        Self {
            database_url,
            database_auth: None,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            shipping: ShippingPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a non-negative decimal amount with a default value.
fn get_money_or_default(key: &str, default: &str) -> Result<Money, ConfigError> {
    parse_money(&get_env_or_default(key, default), key)
}

fn parse_money(raw: &str, var_name: &str) -> Result<Money, ConfigError> {
    let amount: Decimal = raw
        .trim()
        .parse()
        .map_err(|e: rust_decimal::Error| {
            ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string())
        })?;
    if amount.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(Money::new(amount))
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the generated database secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate an optional secret from environment.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(None);
    };
    validate_secret_strength(&value, key)?;
    Ok(Some(SecretString::from(value)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-database-secret", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababab", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("Qm7zK2pX9vLr4TbN8cYw1HdS", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(
            parse_money("12.50", "FEE").unwrap(),
            Money::new(Decimal::new(1250, 2))
        );
        assert!(matches!(
            parse_money("ten", "FEE"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_money("-1", "FEE").is_err());
    }

    #[test]
    fn test_new_uses_defaults() {
        let config = StorefrontConfig::new(Url::parse("https://db.example.com").unwrap());
        assert_eq!(config.storage_path, PathBuf::from(DEFAULT_STORAGE_PATH));
        assert_eq!(config.shipping, ShippingPolicy::default());
        assert!(config.database_auth.is_none());
    }

    #[test]
    fn test_debug_redacts_auth() {
        let mut config = StorefrontConfig::new(Url::parse("https://db.example.com").unwrap());
        config.database_auth = Some(SecretString::from("Qm7zK2pX9vLr4TbN8cYw1HdS"));
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("Qm7zK2pX9vLr4TbN8cYw1HdS"));
    }
}
