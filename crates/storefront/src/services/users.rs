//! Admin user management.

use sqlx::PgPool;

use tennis_shop_core::{Email, Role, UserId};

use super::auth::{AuthError, optional, required};
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::User;

/// Admin edit form.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Back-office operations on user accounts.
pub struct UserService<'a> {
    users: UserRepository<'a>,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list_all().await?)
    }

    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }

    /// Edit a user's details, including their email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email belongs to someone
    /// else, and `AuthError::UserNotFound` if the user is gone.
    pub async fn update_user(&self, id: UserId, form: &UserUpdate) -> Result<User, AuthError> {
        let full_name = required(&form.full_name, "Full name")?;
        required(&form.email, "Email")?;
        let email = Email::parse(&form.email)?;

        self.users
            .update_details(
                id,
                full_name,
                &email,
                optional(form.phone.as_deref()),
                optional(form.address.as_deref()),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete a user. Admins cannot delete themselves.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CannotDeleteSelf` when `id == acting_admin` and
    /// `AuthError::UserNotFound` if nothing was deleted.
    pub async fn delete_user(&self, acting_admin: UserId, id: UserId) -> Result<(), AuthError> {
        if acting_admin == id {
            return Err(AuthError::CannotDeleteSelf);
        }
        if !self.users.delete(id).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = %id, admin_id = %acting_admin, "User deleted");
        Ok(())
    }

    /// Assign a role by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownRole` if `role_id` is not a known role.
    pub async fn change_role(&self, id: UserId, role_id: i32) -> Result<(), AuthError> {
        let roles = self.users.roles().await?;
        if !roles.iter().any(|(rid, _)| *rid == role_id) {
            return Err(AuthError::UnknownRole(role_id));
        }
        if !self.users.set_role(id, Role::from_id(role_id)).await? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = %id, role_id, "User role changed");
        Ok(())
    }

    /// `(id, name)` pairs for the role picker.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn roles(&self) -> Result<Vec<(i32, String)>, AuthError> {
        Ok(self.users.roles().await?)
    }
}
