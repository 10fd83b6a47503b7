//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// Token failures never escape as raw library errors: every expired or
/// malformed token resolves to one of these typed variants before the
/// handler boundary, where it is translated to "please log in again".
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] learnly_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid email or password")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("email already registered")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Activation ticket past its 5-minute window.
    #[error("activation ticket expired")]
    ExpiredTicket,

    /// Supplied activation code does not match the embedded one.
    #[error("invalid activation code")]
    CodeMismatch,

    /// Activation ticket failed signature or structural checks.
    #[error("invalid activation ticket")]
    InvalidTicket,

    /// Access token missing, malformed, or expired.
    #[error("not authenticated")]
    Unauthenticated,

    /// Refresh token failed signature or expiry checks.
    #[error("could not refresh token")]
    InvalidRefreshToken,

    /// No live session for a cryptographically valid refresh token.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Administrative access required.
    #[error("admin access required")]
    Forbidden,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing failed (key/serialization problem).
    #[error("token signing error: {0}")]
    Signing(jsonwebtoken::errors::Error),
}
