//! Authentication extractors.
//!
//! Handlers take `RequireAuth` (any logged-in user) or `RequireAdmin`
//! (role check on top). Both verify the access-token cookie AND demand a
//! live session entry: a cryptographically valid token whose session has
//! been revoked (logout, account deletion) does not authenticate.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::error::{AppError, set_sentry_user};
use crate::models::User;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Cookie holding the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        Ok(Self(user))
    }
}

/// Extractor that requires a logged-in admin.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;

        if !user.role.is_admin() {
            return Err(AuthError::Forbidden.into());
        }

        Ok(Self(user))
    }
}

/// Shared authentication path: cookie, token, then session gate.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);

    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::Unauthenticated)?;

    let user_id = state.tokens().verify_access_token(&token)?;

    // No fallback to the user store: an absent session entry means the
    // session was revoked or expired, regardless of token validity.
    let user = state
        .sessions()
        .get(user_id)
        .await
        .ok_or(AuthError::SessionExpired)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(user)
}
