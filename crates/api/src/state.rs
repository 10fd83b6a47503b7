//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::email::EmailService;
use crate::services::media::{CloudinaryClient, MediaError};
use crate::services::payments::{PaymentError, StripeClient};
use crate::services::session::SessionCache;
use crate::services::tokens::TokenService;

/// Error constructing application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("payment client error: {0}")]
    Payment(#[from] PaymentError),
    #[error("media client error: {0}")]
    Media(#[from] MediaError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    sessions: SessionCache,
    tokens: TokenService,
    mailer: EmailService,
    payments: StripeClient,
    media: CloudinaryClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if any collaborator client fails to construct.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let sessions = SessionCache::new();
        let tokens = TokenService::new(&config.tokens, sessions.clone());
        let mailer = EmailService::new(&config.smtp)?;
        let payments = StripeClient::new(&config.stripe)?;
        let media = CloudinaryClient::new(&config.cloudinary)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                tokens,
                mailer,
                payments,
                media,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the session cache.
    #[must_use]
    pub fn sessions(&self) -> &SessionCache {
        &self.inner.sessions
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn mailer(&self) -> &EmailService {
        &self.inner.mailer
    }

    /// Get a reference to the Stripe client.
    #[must_use]
    pub fn payments(&self) -> &StripeClient {
        &self.inner.payments
    }

    /// Get a reference to the Cloudinary client.
    #[must_use]
    pub fn media(&self) -> &CloudinaryClient {
        &self.inner.media
    }
}
