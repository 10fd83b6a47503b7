//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LEARNLY_DATABASE_URL` - `PostgreSQL` connection string
//! - `LEARNLY_BASE_URL` - Public URL for the API
//! - `ACTIVATION_SECRET` - Signing secret for activation tickets
//! - `ACCESS_TOKEN_SECRET` - Signing secret for access tokens
//! - `REFRESH_TOKEN_SECRET` - Signing secret for refresh tokens
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Mail delivery
//! - `STRIPE_SECRET_KEY`, `STRIPE_PUBLISHABLE_KEY` - Payments
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` - Media
//!
//! ## Optional
//! - `LEARNLY_HOST` - Bind address (default: 127.0.0.1)
//! - `LEARNLY_PORT` - Listen port (default: 8000)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `CLOUDINARY_UPLOAD_PRESET` - Unsigned upload preset (default: avatars)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
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

/// Learnly API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the API (drives the Secure cookie flag)
    pub base_url: String,
    /// Token signing secrets
    pub tokens: TokenSecrets,
    /// SMTP mail delivery configuration
    pub smtp: SmtpConfig,
    /// Stripe payments configuration
    pub stripe: StripeConfig,
    /// Cloudinary media configuration
    pub cloudinary: CloudinaryConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (e.g., "production")
    pub sentry_environment: Option<String>,
}

/// Signing secrets for the three token kinds.
///
/// Access and refresh use distinct secrets so a leaked access secret
/// cannot mint refresh tokens; activation tickets use a third.
/// Implements `Debug` manually to redact all fields.
#[derive(Clone)]
pub struct TokenSecrets {
    /// Activation ticket signing secret
    pub activation: SecretString,
    /// Access token signing secret
    pub access: SecretString,
    /// Refresh token signing secret
    pub refresh: SecretString,
}

impl std::fmt::Debug for TokenSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSecrets")
            .field("activation", &"[REDACTED]")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// SMTP mail delivery configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP relay hostname
    pub host: String,
    /// SMTP port (default 587, STARTTLS)
    pub port: u16,
    /// SMTP username
    pub username: String,
    /// SMTP password
    pub password: SecretString,
    /// From address for outgoing mail
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Stripe payments configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Server-side API key
    pub secret_key: SecretString,
    /// Publishable key (safe to expose to clients)
    pub publishable_key: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("publishable_key", &self.publishable_key)
            .finish()
    }
}

/// Cloudinary media storage configuration.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (appears in upload URLs)
    pub cloud_name: String,
    /// API key
    pub api_key: String,
    /// API secret (admin API basic auth)
    pub api_secret: SecretString,
    /// Unsigned upload preset for avatar uploads
    pub upload_preset: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("upload_preset", &self.upload_preset)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    /// A misconfigured signing key is therefore fatal at startup, never
    /// discovered per-request.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("LEARNLY_DATABASE_URL")?;
        let host = get_env_or_default("LEARNLY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("LEARNLY_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("LEARNLY_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("LEARNLY_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("LEARNLY_BASE_URL")?;

        let tokens = TokenSecrets::from_env()?;
        let smtp = SmtpConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            tokens,
            smtp,
            stripe,
            cloudinary,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public base URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl TokenSecrets {
    fn from_env() -> Result<Self, ConfigError> {
        let activation = get_validated_secret("ACTIVATION_SECRET")?;
        let access = get_validated_secret("ACCESS_TOKEN_SECRET")?;
        let refresh = get_validated_secret("REFRESH_TOKEN_SECRET")?;

        validate_secret_length(&activation, "ACTIVATION_SECRET")?;
        validate_secret_length(&access, "ACCESS_TOKEN_SECRET")?;
        validate_secret_length(&refresh, "REFRESH_TOKEN_SECRET")?;

        Ok(Self {
            activation,
            access,
            refresh,
        })
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: get_required_env("SMTP_HOST")?,
            port: get_env_or_default("SMTP_PORT", "587")
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        })
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            publishable_key: get_required_env("STRIPE_PUBLISHABLE_KEY")?,
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_required_secret("CLOUDINARY_API_SECRET")?,
            upload_preset: get_env_or_default("CLOUDINARY_UPLOAD_PRESET", "avatars"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like signing keys have high entropy)
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

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
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
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-signing-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_secret_length_too_short() {
        let secret = SecretString::from("short");
        let result = validate_secret_length(&secret, "TEST_TOKEN");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_length_valid() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_secret_length(&secret, "TEST_TOKEN");
        assert!(result.is_ok());
    }

    #[test]
    fn test_is_secure_from_base_url() {
        let config = test_config("https://api.learnly.dev");
        assert!(config.is_secure());

        let config = test_config("http://localhost:8000");
        assert!(!config.is_secure());
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config("http://localhost:8000");
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config("http://localhost:8000");
        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("smtp.example.net"));
        assert!(debug_output.contains("pk_test_visible"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("smtp-password-value"));
        assert!(!debug_output.contains("sk_test_hidden"));
    }

    fn test_config(base_url: &str) -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/learnly_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_url: base_url.to_string(),
            tokens: TokenSecrets {
                activation: SecretString::from("a".repeat(32)),
                access: SecretString::from("b".repeat(32)),
                refresh: SecretString::from("c".repeat(32)),
            },
            smtp: SmtpConfig {
                host: "smtp.example.net".to_string(),
                port: 587,
                username: "mailer".to_string(),
                password: SecretString::from("smtp-password-value"),
                from_address: "Learnly <no-reply@learnly.dev>".to_string(),
            },
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_hidden"),
                publishable_key: "pk_test_visible".to_string(),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "learnly".to_string(),
                api_key: "1234567890".to_string(),
                api_secret: SecretString::from("cloudinary-secret"),
                upload_preset: "avatars".to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}
