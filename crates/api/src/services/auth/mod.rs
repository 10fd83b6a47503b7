//! Authentication service.
//!
//! Registration is a two-phase flow: `begin_registration` validates the
//! candidate and hands back a `PendingUser` for the token service to seal
//! into an activation ticket; `complete_activation` persists the account
//! once the emailed code has been verified. Nothing touches the user
//! store between the two phases.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use learnly_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{Avatar, PendingUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles registration, activation, login, social sign-in, and
/// credential changes. Token issuance lives in the token service; this
/// service only decides WHO is authenticated.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Registration & Activation
    // =========================================================================

    /// Validate a registration request and produce the activation
    /// candidate. The password is hashed here, before the candidate
    /// leaves the process boundary inside a ticket.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn begin_registration(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PendingUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        Ok(PendingUser {
            name: name.trim().to_string(),
            email,
            password_hash,
        })
    }

    /// Persist an activated candidate as a real account.
    ///
    /// The duplicate check from `begin_registration` is re-run by the
    /// database unique constraint: two tickets for the same email can
    /// both verify, but only the first activation wins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email was registered
    /// while the ticket was outstanding.
    pub async fn complete_activation(&self, pending: &PendingUser) -> Result<User, AuthError> {
        let user = self
            .users
            .create(
                &pending.name,
                &pending.email,
                Some(&pending.password_hash),
                None,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is
    /// wrong, or if the account has no local credential (social sign-in
    /// accounts cannot log in with a password).
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Social sign-in: find the account for an email, creating it on
    /// first contact. Social accounts carry no password hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    pub async fn social_login(
        &self,
        name: &str,
        email: &str,
        avatar: Option<&Avatar>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        if let Some(user) = self.users.get_by_email(&email).await? {
            return Ok(user);
        }

        match self.users.create(name.trim(), &email, None, avatar).await {
            Ok(user) => Ok(user),
            // Concurrent first contact: the other request created it.
            Err(RepositoryError::Conflict(_)) => self
                .users
                .get_by_email(&email)
                .await?
                .ok_or(AuthError::UserNotFound),
            Err(other) => Err(AuthError::Repository(other)),
        }
    }

    // =========================================================================
    // Credential Changes
    // =========================================================================

    /// Change a user's password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the old password is
    /// wrong or the account has no local credential.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet
    /// requirements.
    pub async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let current_hash = self
            .users
            .get_password_hash_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(old_password, &current_hash)?;

        let new_hash = hash_password(new_password)?;
        self.users.set_password_hash(user_id, &new_hash).await?;

        Ok(())
    }

    /// Promote or demote a user, looked up by email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no account exists for the email.
    pub async fn set_role_by_email(&self, email: &str, role: UserRole) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.users.set_role(user.id, role).await?;

        self.users
            .get_by_id(user.id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_too_short() {
        let result = validate_password("short");
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_validate_password_minimum_length() {
        assert!(validate_password("eightch8").is_ok());
    }

    #[test]
    fn test_hash_then_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(matches!(
            verify_password("incorrect horse battery", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }
}
