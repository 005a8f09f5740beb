//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tennis_shop_core::{Email, Role, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::user::User;

const USER_COLUMNS: &str = "id, full_name, email, phone, address, role_id, created_at, \
                            (password_hash IS NOT NULL) AS has_password";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    full_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    role_id: i32,
    created_at: DateTime<Utc>,
    has_password: bool,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            full_name: row.full_name,
            email,
            phone: row.phone,
            address: row.address,
            role: Role::from_id(row.role_id),
            created_at: row.created_at,
            has_password: row.has_password,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

/// Fields for a new account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub full_name: &'a str,
    pub email: &'a Email,
    /// `None` for accounts created via Google sign-in.
    pub password_hash: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub role: Role,
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

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM shop.app_user WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM shop.app_user WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user together with their password hash.
    ///
    /// The hash is `None` for accounts that only sign in with Google.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let sql =
            format!("SELECT {USER_COLUMNS}, password_hash FROM shop.app_user WHERE email = $1");
        let row = sqlx::query_as::<_, CredentialRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        row.map(|r| -> Result<_, RepositoryError> {
            Ok((User::try_from(r.user)?, r.password_hash))
        })
        .transpose()
    }

    /// Get the password hash for a user ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, Option<String>>(
            "SELECT password_hash FROM shop.app_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hash.flatten())
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser<'_>) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO shop.app_user (full_name, email, password_hash, phone, address, role_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new_user.full_name)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.phone)
            .bind(new_user.address)
            .bind(new_user.role.id())
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email"))?;

        row.try_into()
    }

    /// List all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        self.list(None).await
    }

    /// The `limit` most recently registered users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<User>, RepositoryError> {
        self.list(Some(limit)).await
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM shop.app_user
             ORDER BY created_at DESC, id DESC
             LIMIT $1"
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Count all users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop.app_user")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Update the self-service profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_profile(
        &self,
        id: UserId,
        full_name: &str,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "UPDATE shop.app_user SET full_name = $2, phone = $3, address = $4
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(full_name)
            .bind(phone)
            .bind(address)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Admin edit: profile fields plus email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email belongs to another user.
    pub async fn update_details(
        &self,
        id: UserId,
        full_name: &str,
        email: &Email,
        phone: Option<&str>,
        address: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!(
            "UPDATE shop.app_user SET full_name = $2, email = $3, phone = $4, address = $5
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(full_name)
            .bind(email)
            .bind(phone)
            .bind(address)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email"))?;

        row.map(TryInto::try_into).transpose()
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE shop.app_user SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails (including an
    /// unknown role id, rejected by the foreign key).
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE shop.app_user SET role_id = $2 WHERE id = $1")
            .bind(id)
            .bind(role.id())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user. Their cart, orders and reviews cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.app_user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All roles as `(id, name)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn roles(&self) -> Result<Vec<(i32, String)>, RepositoryError> {
        let roles = sqlx::query_as::<_, (i32, String)>(
            "SELECT id, name FROM shop.user_role ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(roles)
    }
}
