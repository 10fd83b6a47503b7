//! Session cache.
//!
//! Keeps a TTL-evicting snapshot of each logged-in user, keyed by user id.
//! The cache is an authorization gate for refresh-token rotation: an
//! absent entry means "not logged in", never "user does not exist". The
//! user store stays authoritative; this layer only avoids a database read
//! on every authenticated request.

use std::time::Duration;

use moka::future::Cache;

use learnly_core::UserId;

use crate::models::User;

/// Session lifetime: 7 days.
///
/// Deliberately longer than the refresh-token lifetime (3 days) so a
/// rotation near the refresh expiry boundary never races cache eviction.
pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// TTL-evicting store of user snapshots, shared across handlers.
///
/// Cloning is cheap and all clones share the same underlying cache.
/// Writes are last-writer-wins overwrites; each insert restarts the TTL.
#[derive(Clone)]
pub struct SessionCache {
    cache: Cache<String, User>,
}

impl SessionCache {
    /// Create a cache with the production TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    /// Create a cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Look up the session snapshot for a user.
    pub async fn get(&self, user_id: UserId) -> Option<User> {
        self.cache.get(&user_id.to_string()).await
    }

    /// Write (or overwrite) the session snapshot, restarting its TTL.
    pub async fn insert(&self, snapshot: &User) {
        self.cache
            .insert(snapshot.id.to_string(), snapshot.clone())
            .await;
    }

    /// Evict the session for a user (logout, account deletion).
    pub async fn remove(&self, user_id: UserId) {
        self.cache.invalidate(&user_id.to_string()).await;
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use learnly_core::{Email, UserRole};

    fn snapshot(id: i32) -> User {
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

    #[tokio::test]
    async fn test_insert_then_get() {
        let sessions = SessionCache::new();
        sessions.insert(&snapshot(1)).await;

        let cached = sessions.get(UserId::new(1)).await.unwrap();
        assert_eq!(cached.name, "Alice");
    }

    #[tokio::test]
    async fn test_absent_entry_is_none() {
        let sessions = SessionCache::new();
        assert!(sessions.get(UserId::new(99)).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_evicts() {
        let sessions = SessionCache::new();
        sessions.insert(&snapshot(2)).await;
        sessions.remove(UserId::new(2)).await;

        assert!(sessions.get(UserId::new(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let sessions = SessionCache::with_ttl(Duration::from_millis(20));
        sessions.insert(&snapshot(3)).await;
        assert!(sessions.get(UserId::new(3)).await.is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(sessions.get(UserId::new(3)).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_overwrites_last_writer_wins() {
        let sessions = SessionCache::new();
        sessions.insert(&snapshot(4)).await;

        let mut updated = snapshot(4);
        updated.name = "Alice Updated".to_string();
        sessions.insert(&updated).await;

        let cached = sessions.get(UserId::new(4)).await.unwrap();
        assert_eq!(cached.name, "Alice Updated");
    }
}
