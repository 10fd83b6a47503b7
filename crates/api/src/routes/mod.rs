//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (DB ping)
//!
//! # Auth (/api/v1)
//! POST /registration                  - Start registration, mail activation code
//! POST /activate-user                 - Verify code, persist the account
//! POST /login                         - Password login, set token cookies
//! GET  /logout                        - Evict session, clear cookies
//! GET  /refresh-token                 - Rotate tokens from the refresh cookie
//! POST /social-auth                   - Social sign-in (find-or-create)
//!
//! # Users (/api/v1)
//! GET    /me                          - Current user profile
//! PUT    /update-user-info            - Change name/email
//! PUT    /update-user-password        - Change password
//! PUT    /update-user-avatar          - Upload new avatar
//! PUT    /update-user-role            - Change a user's role (admin)
//! DELETE /delete-user/{id}            - Delete an account (admin)
//!
//! # Orders (/api/v1)
//! POST /create-order                  - Record a purchase after payment
//! GET  /payment/publishable-key       - Stripe publishable key
//! POST /payment                       - Create a payment intent
//! ```

pub mod auth;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/registration", post(auth::register))
        .route("/activate-user", post(auth::activate_user))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/refresh-token", get(auth::refresh_token))
        .route("/social-auth", post(auth::social_auth))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/update-user-info", put(users::update_info))
        .route("/update-user-password", put(users::update_password))
        .route("/update-user-avatar", put(users::update_avatar))
        .route("/update-user-role", put(users::update_role))
        .route("/delete-user/{id}", delete(users::delete_user))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(orders::create_order))
        .route("/payment/publishable-key", get(orders::publishable_key))
        .route("/payment", post(orders::create_payment))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    let v1 = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(order_routes());

    Router::new().nest("/api/v1", v1)
}
