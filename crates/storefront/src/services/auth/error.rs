//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tennis_shop_core::EmailError),

    /// A required form field was blank.
    #[error("{0} is required")]
    Required(&'static str),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The account signs in with Google and has no password to change.
    #[error("account has no password")]
    NoPassword,

    /// Admins cannot delete their own account.
    #[error("cannot delete your own account")]
    CannotDeleteSelf,

    /// Role id does not exist.
    #[error("unknown role: {0}")]
    UnknownRole(i32),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show on a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
            Self::Required(field) => format!("{field} is required."),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::UserNotFound => "User not found.".to_string(),
            Self::UserAlreadyExists => "User with this email already exists".to_string(),
            Self::WeakPassword(msg) => msg.clone(),
            Self::NoPassword => "This account signs in with Google.".to_string(),
            Self::CannotDeleteSelf => "You cannot delete your own account.".to_string(),
            Self::UnknownRole(_) => "Selected role does not exist.".to_string(),
            Self::Repository(_) | Self::PasswordHash => {
                "Something went wrong, please try again.".to_string()
            }
        }
    }
}
