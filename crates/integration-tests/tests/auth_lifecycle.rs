//! Registration and activation lifecycle against a real database.
//!
//! Run with:
//! ```bash
//! DATABASE_URL=postgres://localhost/learnly_test \
//!     cargo test -p learnly-integration-tests -- --ignored
//! ```

use secrecy::SecretString;
use sqlx::PgPool;

use learnly_api::config::TokenSecrets;
use learnly_api::services::auth::{AuthError, AuthService};
use learnly_api::services::session::SessionCache;
use learnly_api::services::tokens::TokenService;

// ===== Helpers =====

async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

fn token_service() -> TokenService {
    let secrets = TokenSecrets {
        activation: SecretString::from("activation-test-key-0123456789ab"),
        access: SecretString::from("access-test-key-0123456789abcdef"),
        refresh: SecretString::from("refresh-test-key-0123456789abcde"),
    };
    TokenService::new(&secrets, SessionCache::new())
}

/// Unique email per run so reruns do not collide with leftover rows.
fn unique_email(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{prefix}-{nanos}@example.com")
}

async fn user_count(pool: &PgPool, email: &str) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM learnly.\"user\" WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("count query")
}

// ===== Registration Tests =====

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_duplicate_registration_is_rejected_before_ticket_issuance() {
    let pool = test_pool().await;
    let auth = AuthService::new(&pool);
    let email = unique_email("dup");

    let pending = auth
        .begin_registration("Alice", &email, "password123")
        .await
        .expect("first registration");
    auth.complete_activation(&pending)
        .await
        .expect("activation");

    // A second registration for the same email fails before any ticket
    // could be issued, so no new activation path opens.
    let result = auth
        .begin_registration("Alice Again", &email, "password123")
        .await;
    assert!(matches!(result, Err(AuthError::UserAlreadyExists)));

    assert_eq!(user_count(&pool, &email).await, 1);
}

// ===== Activation Tests =====

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database"]
async fn test_activation_creates_exactly_one_account_and_replay_fails() {
    let pool = test_pool().await;
    let auth = AuthService::new(&pool);
    let tokens = token_service();
    let email = unique_email("activate");

    let pending = auth
        .begin_registration("Bob", &email, "password123")
        .await
        .expect("registration");
    let issued = tokens
        .issue_activation_ticket(&pending)
        .expect("ticket issuance");

    let recovered = tokens
        .verify_activation(&issued.ticket, &issued.code)
        .expect("ticket verification");
    auth.complete_activation(&recovered)
        .await
        .expect("activation");

    assert_eq!(user_count(&pool, &email).await, 1);

    // The ticket still verifies within its window, but replaying it
    // hits the unique email constraint and persists nothing.
    let replayed = tokens
        .verify_activation(&issued.ticket, &issued.code)
        .expect("ticket is still within its window");
    let result = auth.complete_activation(&replayed).await;
    assert!(matches!(result, Err(AuthError::UserAlreadyExists)));

    assert_eq!(user_count(&pool, &email).await, 1);
}
