//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnly_core::{CourseId, Email, UserId, UserRole};

/// A platform user.
///
/// This is also the snapshot stored in the session cache, keyed by the
/// user id. It deliberately excludes the password hash: credentials stay
/// in the user store and are fetched only when verifying a login or a
/// password change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (unique key).
    pub email: Email,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Optional profile picture.
    pub avatar: Option<Avatar>,
    /// Permission level.
    pub role: UserRole,
    /// Courses the user has purchased.
    pub courses: Vec<CourseId>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user already owns the given course.
    #[must_use]
    pub fn owns_course(&self, course_id: CourseId) -> bool {
        self.courses.contains(&course_id)
    }
}

/// A profile picture stored with the media collaborator.
///
/// `public_id` is the handle needed to destroy the asset when a new
/// avatar replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Avatar {
    pub public_id: String,
    pub url: String,
}

/// A registration candidate embedded in an activation ticket.
///
/// Never persisted: it exists only inside the signed ticket until the
/// user proves ownership of the email with the activation code. The
/// password is hashed before it enters the ticket, so the ticket never
/// carries plaintext credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
}
