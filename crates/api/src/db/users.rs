//! User repository for database operations.
//!
//! Queries use the runtime-checked sqlx API so the crate builds without a
//! live database; row shapes are pinned by `FromRow` structs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use learnly_core::{CourseId, Email, UserId, UserRole};

use super::{RepositoryError, map_unique_violation};
use crate::models::user::{Avatar, User};

/// Row shape for `learnly.user`.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    avatar_public_id: Option<String>,
    avatar_url: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_USER: &str = "SELECT id, name, email, phone, avatar_public_id, avatar_url, role, \
                           created_at, updated_at FROM learnly.\"user\"";

impl UserRow {
    /// Convert a row into the domain type, attaching purchased courses.
    fn into_user(self, courses: Vec<CourseId>) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role: UserRole = self.role.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;
        let avatar = match (self.avatar_public_id, self.avatar_url) {
            (Some(public_id), Some(url)) => Some(Avatar { public_id, url }),
            _ => None,
        };

        Ok(User {
            id: UserId::new(self.id),
            name: self.name,
            email,
            phone: self.phone,
            avatar,
            role,
            courses,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(r) => {
                let courses = self.course_ids(UserId::new(r.id)).await?;
                Ok(Some(r.into_user(courses)?))
            }
            None => Ok(None),
        }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(r) => {
                let courses = self.course_ids(id).await?;
                Ok(Some(r.into_user(courses)?))
            }
            None => Ok(None),
        }
    }

    /// Create a new user.
    ///
    /// `password_hash` is `None` for social-auth accounts, which never
    /// hold a local credential.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: Option<&str>,
        avatar: Option<&Avatar>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO learnly.\"user\" (name, email, password_hash, avatar_public_id, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, email, phone, avatar_public_id, avatar_url, role, \
                       created_at, updated_at",
        )
        .bind(name)
        .bind(email.as_str())
        .bind(password_hash)
        .bind(avatar.map(|a| a.public_id.as_str()))
        .bind(avatar.map(|a| a.url.as_str()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        row.into_user(Vec::new())
    }

    /// Get the password hash for a user, together with the user itself.
    ///
    /// Returns `None` if no user exists for the email, or if the account
    /// has no local credential (social auth).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(i32, Option<String>)> =
            sqlx::query_as("SELECT id, password_hash FROM learnly.\"user\" WHERE email = $1")
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        let Some((id, Some(hash))) = row else {
            return Ok(None);
        };

        let user = self
            .get_by_id(UserId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok(Some((user, hash)))
    }

    /// Get the password hash for a user by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM learnly.\"user\" WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        Ok(hash.flatten())
    }

    /// Update name and/or email, returning the updated user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email already exists.
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&Email>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE learnly.\"user\" \
             SET name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING id, name, email, phone, avatar_public_id, avatar_url, role, \
                       created_at, updated_at",
        )
        .bind(id.as_i32())
        .bind(name)
        .bind(email.map(Email::as_str))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?
        .ok_or(RepositoryError::NotFound)?;

        let courses = self.course_ids(id).await?;
        row.into_user(courses)
    }

    /// Replace the password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_hash(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE learnly.\"user\" SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace the avatar.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_avatar(&self, id: UserId, avatar: &Avatar) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE learnly.\"user\" \
             SET avatar_public_id = $2, avatar_url = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(&avatar.public_id)
        .bind(&avatar.url)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Change the role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE learnly.\"user\" SET role = $2, updated_at = now() WHERE id = $1")
                .bind(id.as_i32())
                .bind(role)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a user. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM learnly.\"user\" WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Purchased course ids for a user, oldest first.
    async fn course_ids(&self, user_id: UserId) -> Result<Vec<CourseId>, RepositoryError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "SELECT course_id FROM learnly.user_course WHERE user_id = $1 ORDER BY purchased_at",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(CourseId::new).collect())
    }
}
