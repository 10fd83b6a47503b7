//! User profile route handlers.
//!
//! Every mutation re-reads the user and overwrites the session snapshot,
//! so the cache never serves a stale profile to the next request.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use learnly_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, users::UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Avatar;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// `GET /me` — current user profile, cache-first with store fallback.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = match state.sessions().get(user.id).await {
        Some(snapshot) => snapshot,
        None => {
            // The entry was evicted between extraction and here.
            let fresh = AuthService::new(state.pool()).get_user(user.id).await?;
            state.sessions().insert(&fresh).await;
            fresh
        }
    };

    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateInfoRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// `PUT /update-user-info` — change name and/or email.
pub async fn update_info(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<UpdateInfoRequest>,
) -> Result<impl IntoResponse> {
    let email = req
        .email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(AuthError::InvalidEmail)?;

    let users = UserRepository::new(state.pool());
    let updated = users
        .update_profile(user.id, req.name.as_deref(), email.as_ref())
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AppError::Auth(AuthError::UserAlreadyExists),
            other => AppError::Database(other),
        })?;

    state.sessions().insert(&updated).await;

    Ok(Json(json!({ "success": true, "user": updated })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// `PUT /update-user-password` — verify the old password, set the new one.
pub async fn update_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool());
    auth.change_password(user.id, &req.old_password, &req.new_password)
        .await?;

    let refreshed = auth.get_user(user.id).await?;
    state.sessions().insert(&refreshed).await;

    Ok(Json(json!({ "success": true, "user": refreshed })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    /// Base64 data URI as sent by the client.
    pub avatar: String,
}

/// `PUT /update-user-avatar` — upload the new image, destroy the old one.
pub async fn update_avatar(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<UpdateAvatarRequest>,
) -> Result<impl IntoResponse> {
    // Reclaim the previous asset. Social-auth avatars are external URLs
    // with no public id and nothing to destroy.
    if let Some(old) = &user.avatar {
        if !old.public_id.is_empty() {
            state.media().delete_asset(&old.public_id).await?;
        }
    }

    let asset = state.media().upload_avatar(&req.avatar).await?;
    let avatar = Avatar {
        public_id: asset.public_id,
        url: asset.secure_url,
    };

    let users = UserRepository::new(state.pool());
    users.set_avatar(user.id, &avatar).await?;

    let refreshed = AuthService::new(state.pool()).get_user(user.id).await?;
    state.sessions().insert(&refreshed).await;

    Ok(Json(json!({ "success": true, "user": refreshed })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub email: String,
    pub role: String,
}

/// `PUT /update-user-role` — admin only; target looked up by email.
pub async fn update_role(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse> {
    let role: UserRole = req
        .role
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid role: {}", req.role)))?;

    let updated = AuthService::new(state.pool())
        .set_role_by_email(&req.email, role)
        .await?;

    // Refresh the snapshot only if the target is logged in; inserting
    // unconditionally would mint a session for a logged-out user.
    if state.sessions().get(updated.id).await.is_some() {
        state.sessions().insert(&updated).await;
    }

    Ok(Json(json!({ "success": true, "user": updated })))
}

/// `DELETE /delete-user/{id}` — admin only; evicts any live session.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let user_id = UserId::new(id);

    let users = UserRepository::new(state.pool());
    if !users.delete(user_id).await? {
        return Err(AppError::NotFound("User".to_string()));
    }

    state.sessions().remove(user_id).await;

    tracing::info!(user_id = %user_id, "User deleted");

    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}
