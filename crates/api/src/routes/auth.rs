//! Authentication route handlers.
//!
//! Tokens travel as httpOnly cookies. The access token is additionally
//! returned in the JSON body for clients that prefer an Authorization
//! header; the refresh token never leaves the cookie.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use time::Duration;

use crate::error::{Result, clear_sentry_user};
use crate::middleware::auth::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::middleware::RequireAuth;
use crate::models::Avatar;
use crate::services::auth::{AuthError, AuthService};
use crate::services::tokens::SessionTokens;
use crate::state::AppState;

/// Access cookie lifetime, matching the access token (24 hours).
const ACCESS_COOKIE_TTL: Duration = Duration::hours(24);

/// Refresh cookie lifetime, matching the refresh token (3 days).
const REFRESH_COOKIE_TTL: Duration = Duration::days(3);

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// `POST /registration` — validate the candidate, mail the activation
/// code, and return the sealed ticket. No account is persisted yet.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    let pending = auth
        .begin_registration(&req.name, &req.email, &req.password)
        .await?;

    let issued = state.tokens().issue_activation_ticket(&pending)?;

    state
        .mailer()
        .send_activation_code(pending.email.as_str(), &pending.name, &issued.code)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Please check your email {} to activate your account", pending.email),
            "activationToken": issued.ticket,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    pub activation_token: String,
    pub activation_code: String,
}

/// `POST /activate-user` — verify ticket and code, then persist the
/// account. A replayed ticket fails on the duplicate-email re-check.
pub async fn activate_user(
    State(state): State<AppState>,
    Json(req): Json<ActivationRequest>,
) -> Result<impl IntoResponse> {
    let pending = state
        .tokens()
        .verify_activation(&req.activation_token, &req.activation_code)?;

    let auth = AuthService::new(state.pool());
    let user = auth.complete_activation(&pending).await?;

    tracing::info!(user_id = %user.id, "Account activated");

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /login` — password login; sets both token cookies.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    let user = auth.login_with_password(&req.email, &req.password).await?;

    let tokens = state.tokens().issue_session_tokens(&user).await?;
    let jar = set_session_cookies(jar, &tokens, state.config().is_secure());

    Ok((
        jar,
        Json(json!({
            "success": true,
            "user": user,
            "accessToken": tokens.access,
        })),
    ))
}

/// `GET /logout` — evict the session and clear both cookies.
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    state.tokens().revoke_session(user.id).await;
    clear_sentry_user();

    let jar = clear_session_cookies(jar);

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    ))
}

/// `GET /refresh-token` — rotate the refresh cookie into a fresh pair.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    let token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::InvalidRefreshToken)?;

    let (_user, tokens) = state.tokens().rotate_from_refresh_token(&token).await?;
    let jar = set_session_cookies(jar, &tokens, state.config().is_secure());

    Ok((
        jar,
        Json(json!({
            "success": true,
            "accessToken": tokens.access,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SocialAuthRequest {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// `POST /social-auth` — find-or-create by email, then token issuance.
///
/// The avatar here is a URL from the identity provider, not a stored
/// asset, so its `public_id` stays empty and it is never destroyed.
pub async fn social_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SocialAuthRequest>,
) -> Result<impl IntoResponse> {
    let avatar = req.avatar.map(|url| Avatar {
        public_id: String::new(),
        url,
    });

    let auth = AuthService::new(state.pool());
    let user = auth
        .social_login(&req.name, &req.email, avatar.as_ref())
        .await?;

    let tokens = state.tokens().issue_session_tokens(&user).await?;
    let jar = set_session_cookies(jar, &tokens, state.config().is_secure());

    Ok((
        jar,
        Json(json!({
            "success": true,
            "user": user,
            "accessToken": tokens.access,
        })),
    ))
}

/// Set both token cookies. httpOnly always; Secure when the public base
/// URL is HTTPS.
fn set_session_cookies(jar: CookieJar, tokens: &SessionTokens, secure: bool) -> CookieJar {
    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access.clone(),
        ACCESS_COOKIE_TTL,
        secure,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh.clone(),
        REFRESH_COOKIE_TTL,
        secure,
    ))
}

/// Clear both token cookies.
fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/"))
        .remove(Cookie::build((REFRESH_TOKEN_COOKIE, "")).path("/"))
}

fn token_cookie(name: &'static str, value: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(ttl)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cookies_are_http_only() {
        let cookie = token_cookie(ACCESS_TOKEN_COOKIE, "tok".to_string(), ACCESS_COOKIE_TTL, true);
        assert_eq!(cookie.name(), "access_token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(ACCESS_COOKIE_TTL));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_secure_flag_follows_base_url_scheme() {
        let cookie = token_cookie(REFRESH_TOKEN_COOKIE, "tok".to_string(), REFRESH_COOKIE_TTL, false);
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_logout_clears_both_cookies() {
        let tokens = SessionTokens {
            access: "access-token".to_string(),
            refresh: "refresh-token".to_string(),
        };
        let jar = set_session_cookies(CookieJar::new(), &tokens, false);
        assert!(jar.get(ACCESS_TOKEN_COOKIE).is_some());
        assert!(jar.get(REFRESH_TOKEN_COOKIE).is_some());

        let jar = clear_session_cookies(jar);
        assert!(jar.get(ACCESS_TOKEN_COOKIE).is_none());
        assert!(jar.get(REFRESH_TOKEN_COOKIE).is_none());
    }
}
