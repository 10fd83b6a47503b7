//! Token service.
//!
//! The one stateful part of authentication: issues and verifies the three
//! signed token kinds (activation tickets, access tokens, refresh tokens)
//! and drives the session cache alongside them.
//!
//! Three distinct HMAC secrets are used so a leaked access secret cannot
//! mint refresh tokens or activation tickets. All verification runs with
//! zero leeway, so expiry boundaries are exact.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use learnly_core::UserId;

use crate::config::TokenSecrets;
use crate::models::{PendingUser, User};
use crate::services::auth::AuthError;
use crate::services::session::SessionCache;

/// Activation tickets expire 5 minutes after issuance.
const ACTIVATION_TICKET_TTL_SECS: i64 = 5 * 60;
/// Access tokens are valid for 24 hours.
const ACCESS_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
/// Refresh tokens are valid for 3 days.
const REFRESH_TOKEN_TTL_SECS: i64 = 3 * 24 * 60 * 60;

/// Claims carried by an activation ticket.
///
/// The candidate user rides inside the ticket so nothing is persisted
/// until the email owner proves possession of the code.
#[derive(Debug, Serialize, Deserialize)]
struct ActivationClaims {
    user: PendingUser,
    code: String,
    exp: i64,
    iat: i64,
}

/// Claims shared by access and refresh tokens: just the user id.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: i64,
    iat: i64,
}

/// An issued activation ticket plus the code mailed to the user.
#[derive(Debug)]
pub struct IssuedActivation {
    /// Signed, time-boxed ticket handed back to the client.
    pub ticket: String,
    /// 4-digit code delivered out-of-band (email).
    pub code: String,
}

/// An access/refresh pair. The two are always issued together.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

/// Token lifetimes, overridable in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub activation: Duration,
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            activation: Duration::seconds(ACTIVATION_TICKET_TTL_SECS),
            access: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh: Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }
}

/// Encoding/decoding keys derived from one secret.
struct KeyPair {
    enc: EncodingKey,
    dec: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            enc: EncodingKey::from_secret(bytes),
            dec: DecodingKey::from_secret(bytes),
        }
    }
}

/// Issues and verifies signed tokens, and keeps the session cache in step.
pub struct TokenService {
    activation: KeyPair,
    access: KeyPair,
    refresh: KeyPair,
    ttls: TokenTtls,
    sessions: SessionCache,
}

impl TokenService {
    /// Create a token service with production lifetimes.
    #[must_use]
    pub fn new(secrets: &TokenSecrets, sessions: SessionCache) -> Self {
        Self::with_ttls(secrets, sessions, TokenTtls::default())
    }

    /// Create a token service with custom lifetimes.
    #[must_use]
    pub fn with_ttls(secrets: &TokenSecrets, sessions: SessionCache, ttls: TokenTtls) -> Self {
        Self {
            activation: KeyPair::from_secret(&secrets.activation),
            access: KeyPair::from_secret(&secrets.access),
            refresh: KeyPair::from_secret(&secrets.refresh),
            ttls,
            sessions,
        }
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Issue a signed, time-boxed activation ticket for a registration
    /// candidate, returning the ticket and the 4-digit code to mail.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails; key misconfiguration
    /// is caught at startup by config validation, not here.
    pub fn issue_activation_ticket(
        &self,
        pending: &PendingUser,
    ) -> Result<IssuedActivation, AuthError> {
        let code = generate_activation_code();
        let now = Utc::now();
        let claims = ActivationClaims {
            user: pending.clone(),
            code: code.clone(),
            exp: (now + self.ttls.activation).timestamp(),
            iat: now.timestamp(),
        };

        let ticket = encode(&Header::default(), &claims, &self.activation.enc)
            .map_err(AuthError::Signing)?;

        Ok(IssuedActivation { ticket, code })
    }

    /// Verify an activation ticket and its code, recovering the candidate.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ExpiredTicket` past the 5-minute window (the
    /// code is not even compared then), `AuthError::CodeMismatch` when the
    /// supplied code differs from the embedded one, and
    /// `AuthError::InvalidTicket` for signature or structural failures.
    pub fn verify_activation(&self, ticket: &str, code: &str) -> Result<PendingUser, AuthError> {
        let data = decode::<ActivationClaims>(ticket, &self.activation.dec, &strict_validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredTicket,
                _ => AuthError::InvalidTicket,
            })?;

        if data.claims.code != code {
            return Err(AuthError::CodeMismatch);
        }

        Ok(data.claims.user)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Issue an access/refresh pair for a user and (re)write the session
    /// cache entry. The two tokens are always minted together.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub async fn issue_session_tokens(&self, user: &User) -> Result<SessionTokens, AuthError> {
        let access = self.sign_session_token(user.id, &self.access.enc, self.ttls.access)?;
        let refresh = self.sign_session_token(user.id, &self.refresh.enc, self.ttls.refresh)?;

        self.sessions.insert(user).await;

        Ok(SessionTokens { access, refresh })
    }

    /// Verify an access token and return the user id it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` for any failure: expired,
    /// malformed, or signed with the wrong key.
    pub fn verify_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<SessionClaims>(token, &self.access.dec, &strict_validation())
            .map_err(|_| AuthError::Unauthenticated)?;

        parse_subject(&data.claims.sub).ok_or(AuthError::Unauthenticated)
    }

    /// Rotate a refresh token into a fresh access/refresh pair.
    ///
    /// The token must verify cryptographically AND a live session entry
    /// must exist for its user id: a logged-out or deleted user's refresh
    /// token is inert even while its signature is still valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` for signature or expiry
    /// failures and `AuthError::SessionExpired` when no session entry
    /// exists (the caller must log in again).
    pub async fn rotate_from_refresh_token(
        &self,
        token: &str,
    ) -> Result<(User, SessionTokens), AuthError> {
        let data = decode::<SessionClaims>(token, &self.refresh.dec, &strict_validation())
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let user_id = parse_subject(&data.claims.sub).ok_or(AuthError::InvalidRefreshToken)?;

        let snapshot = self
            .sessions
            .get(user_id)
            .await
            .ok_or(AuthError::SessionExpired)?;

        // Re-issuing also refreshes the cache entry's TTL.
        let tokens = self.issue_session_tokens(&snapshot).await?;

        Ok((snapshot, tokens))
    }

    /// Evict the session entry for a user (logout, account deletion).
    pub async fn revoke_session(&self, user_id: UserId) {
        self.sessions.remove(user_id).await;
    }

    fn sign_session_token(
        &self,
        user_id: UserId,
        key: &EncodingKey,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, key).map_err(AuthError::Signing)
    }
}

/// HS256 validation with zero leeway, so expiry boundaries are exact.
fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

/// Parse the `sub` claim back into a `UserId`.
fn parse_subject(sub: &str) -> Option<UserId> {
    sub.parse::<i32>().ok().map(UserId::new)
}

/// Generate a random 4-digit activation code (1000-9999).
fn generate_activation_code() -> String {
    let code: u32 = rand::rng().random_range(1000..10_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use learnly_core::{Email, UserRole};

    fn secrets() -> TokenSecrets {
        TokenSecrets {
            activation: SecretString::from("activation-test-key-0123456789ab"),
            access: SecretString::from("access-test-key-0123456789abcdef"),
            refresh: SecretString::from("refresh-test-key-0123456789abcde"),
        }
    }

    fn service(sessions: SessionCache) -> TokenService {
        TokenService::new(&secrets(), sessions)
    }

    fn pending() -> PendingUser {
        PendingUser {
            name: "Alice".to_string(),
            email: Email::parse("alice@example.com").unwrap(),
            password_hash: "$argon2id$stub".to_string(),
        }
    }

    fn user(id: i32) -> User {
        User {
            id: UserId::new(id),
            name: "Alice".to_string(),
            email: Email::parse("alice@example.com").unwrap(),
            phone: None,
            avatar: None,
            role: UserRole::User,
            courses: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_activation_code_is_four_digits() {
        for _ in 0..100 {
            let code: u32 = generate_activation_code().parse().unwrap();
            assert!((1000..10_000).contains(&code));
        }
    }

    #[test]
    fn test_activation_roundtrip_with_correct_code() {
        let svc = service(SessionCache::new());
        let issued = svc.issue_activation_ticket(&pending()).unwrap();

        let recovered = svc.verify_activation(&issued.ticket, &issued.code).unwrap();
        assert_eq!(recovered.email.as_str(), "alice@example.com");
        assert_eq!(recovered.name, "Alice");
    }

    #[test]
    fn test_activation_rejects_wrong_code() {
        let svc = service(SessionCache::new());
        let issued = svc.issue_activation_ticket(&pending()).unwrap();

        let wrong = if issued.code == "1234" { "4321" } else { "1234" };
        assert!(matches!(
            svc.verify_activation(&issued.ticket, wrong),
            Err(AuthError::CodeMismatch)
        ));
    }

    #[test]
    fn test_activation_rejects_expired_ticket_even_with_correct_code() {
        let ttls = TokenTtls {
            activation: Duration::seconds(-60),
            ..TokenTtls::default()
        };
        let svc = TokenService::with_ttls(&secrets(), SessionCache::new(), ttls);
        let issued = svc.issue_activation_ticket(&pending()).unwrap();

        assert!(matches!(
            svc.verify_activation(&issued.ticket, &issued.code),
            Err(AuthError::ExpiredTicket)
        ));
    }

    #[test]
    fn test_activation_rejects_ticket_signed_with_other_key() {
        let svc = service(SessionCache::new());
        let other_secrets = TokenSecrets {
            activation: SecretString::from("a-completely-different-key-12345"),
            access: SecretString::from("access-test-key-0123456789abcdef"),
            refresh: SecretString::from("refresh-test-key-0123456789abcde"),
        };
        let other = TokenService::new(&other_secrets, SessionCache::new());
        let issued = other.issue_activation_ticket(&pending()).unwrap();

        assert!(matches!(
            svc.verify_activation(&issued.ticket, &issued.code),
            Err(AuthError::InvalidTicket)
        ));
    }

    #[tokio::test]
    async fn test_issue_then_verify_access_token() {
        let svc = service(SessionCache::new());
        let tokens = svc.issue_session_tokens(&user(7)).await.unwrap();

        let user_id = svc.verify_access_token(&tokens.access).unwrap();
        assert_eq!(user_id, UserId::new(7));
    }

    #[tokio::test]
    async fn test_expired_access_token_is_unauthenticated() {
        let ttls = TokenTtls {
            access: Duration::seconds(-60),
            ..TokenTtls::default()
        };
        let svc = TokenService::with_ttls(&secrets(), SessionCache::new(), ttls);
        let tokens = svc.issue_session_tokens(&user(7)).await.unwrap();

        assert!(matches!(
            svc.verify_access_token(&tokens.access),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_valid_access_token() {
        // Distinct secrets: a refresh token must not pass access checks.
        let svc = service(SessionCache::new());
        let tokens = svc.issue_session_tokens(&user(7)).await.unwrap();

        assert!(matches!(
            svc.verify_access_token(&tokens.refresh),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_issuing_tokens_writes_session_entry() {
        let sessions = SessionCache::new();
        let svc = service(sessions.clone());
        svc.issue_session_tokens(&user(8)).await.unwrap();

        assert!(sessions.get(UserId::new(8)).await.is_some());
    }

    #[tokio::test]
    async fn test_rotation_succeeds_while_session_lives() {
        let sessions = SessionCache::new();
        let svc = service(sessions.clone());
        let tokens = svc.issue_session_tokens(&user(9)).await.unwrap();

        let (snapshot, new_tokens) = svc.rotate_from_refresh_token(&tokens.refresh).await.unwrap();
        assert_eq!(snapshot.id, UserId::new(9));
        assert_eq!(svc.verify_access_token(&new_tokens.access).unwrap(), UserId::new(9));

        // Rotation refreshes the cache entry.
        assert!(sessions.get(UserId::new(9)).await.is_some());
    }

    #[tokio::test]
    async fn test_rotation_fails_after_session_eviction() {
        let sessions = SessionCache::new();
        let svc = service(sessions.clone());
        let tokens = svc.issue_session_tokens(&user(10)).await.unwrap();

        // Simulate logout: the refresh token is still cryptographically
        // valid, but the session gate is gone.
        svc.revoke_session(UserId::new(10)).await;

        assert!(matches!(
            svc.rotate_from_refresh_token(&tokens.refresh).await,
            Err(AuthError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_rotation_rejects_expired_refresh_token() {
        let ttls = TokenTtls {
            refresh: Duration::seconds(-60),
            ..TokenTtls::default()
        };
        let sessions = SessionCache::new();
        let svc = TokenService::with_ttls(&secrets(), sessions, ttls);
        let tokens = svc.issue_session_tokens(&user(11)).await.unwrap();

        assert!(matches!(
            svc.rotate_from_refresh_token(&tokens.refresh).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[tokio::test]
    async fn test_rotation_rejects_garbage_token() {
        let svc = service(SessionCache::new());
        assert!(matches!(
            svc.rotate_from_refresh_token("not-a-token").await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }
}
