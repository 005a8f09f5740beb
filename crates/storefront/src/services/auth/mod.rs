//! Authentication service.
//!
//! Email/password accounts hashed with Argon2id, plus find-or-create for
//! Google sign-ins. Google accounts have no password hash and can only sign
//! in through Google.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use tennis_shop_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::google::GoogleProfile;
use crate::models::user::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form after extraction.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Authentication service.
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

    /// Register a new customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Required` for blank fields,
    /// `AuthError::InvalidEmail` if the email format is invalid,
    /// `AuthError::WeakPassword` if the password is too short, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let full_name = required(&form.full_name, "Full name")?;
        required(&form.email, "Email")?;
        if form.password.is_empty() {
            return Err(AuthError::Required("Password"));
        }

        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;
        let password_hash = hash_password(&form.password)?;

        let user = self
            .users
            .create(&NewUser {
                full_name,
                email: &email,
                password_hash: Some(&password_hash),
                phone: optional(form.phone.as_deref()),
                address: optional(form.address.as_deref()),
                role: Role::Customer,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check an email and password. Returns `None` on any mismatch, including
    /// accounts that only sign in with Google.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Ok(None);
        }
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };

        let Some((user, Some(password_hash))) = self.users.get_with_password_hash(&email).await?
        else {
            return Ok(None);
        };

        match verify_password(password, &password_hash) {
            Ok(()) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    }

    /// Find the account for a Google profile, creating a password-less
    /// customer on first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if Google's email does not parse.
    pub async fn login_with_google(&self, profile: &GoogleProfile) -> Result<User, AuthError> {
        let email = Email::parse(profile.email.as_deref().unwrap_or_default())?;

        if let Some(user) = self.users.get_by_email(&email).await? {
            return Ok(user);
        }

        let full_name = profile.display_name();
        let created = self
            .users
            .create(&NewUser {
                full_name: &full_name,
                email: &email,
                password_hash: None,
                phone: None,
                address: None,
                role: Role::Customer,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User created from Google sign-in");
                Ok(user)
            }
            // Two callbacks racing on the same new account
            Err(RepositoryError::Conflict(_)) => self
                .users
                .get_by_email(&email)
                .await?
                .ok_or(AuthError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Update the signed-in user's own profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Required` for a blank name and
    /// `AuthError::UserNotFound` if the account is gone.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        full_name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<User, AuthError> {
        let full_name = required(full_name, "Full name")?;
        self.users
            .update_profile(user_id, full_name, optional(phone), optional(address))
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change a password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoPassword` for Google-only accounts,
    /// `AuthError::InvalidCredentials` if `current` is wrong and
    /// `AuthError::WeakPassword` if `new` is too short.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::NoPassword)?;

        verify_password(current, &hash)?;
        validate_password(new)?;

        let new_hash = hash_password(new)?;
        if !self.users.set_password_hash(user_id, &new_hash).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
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

/// Trimmed value, or `AuthError::Required` if blank.
pub(crate) fn required<'s>(value: &'s str, field: &'static str) -> Result<&'s str, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Required(field));
    }
    Ok(value)
}

/// Trimmed value, `None` if blank.
pub(crate) fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
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
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("forehand-winner").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("forehand-winner", &hash).is_ok());
        assert!(matches!(
            verify_password("double-fault", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "plaintext-from-old-db"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_required_and_optional_trim() {
        assert_eq!(required("  Lan  ", "Full name").unwrap(), "Lan");
        assert!(matches!(
            required("   ", "Full name"),
            Err(AuthError::Required("Full name"))
        ));
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" 0901 ")), Some("0901"));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_user_messages_hide_internals() {
        assert_eq!(
            AuthError::UserAlreadyExists.user_message(),
            "User with this email already exists"
        );
        assert_eq!(
            AuthError::PasswordHash.user_message(),
            "Something went wrong, please try again."
        );
    }
}
