//! Newsletter subscriber repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tennis_shop_core::{Email, SubscriberId};

use super::RepositoryError;
use crate::models::newsletter::Subscriber;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: SubscriberId,
    email: String,
    subscribed_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = RepositoryError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid subscriber email: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email,
            subscribed_at: row.subscribed_at,
        })
    }
}

/// Repository for newsletter subscribers.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a subscriber. Returns false if the email was already subscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn subscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let inserted = sqlx::query_scalar::<_, SubscriberId>(
            "INSERT INTO shop.newsletter_subscriber (email) VALUES ($1)
             ON CONFLICT (email) DO NOTHING
             RETURNING id",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    /// All subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, subscribed_at FROM shop.newsletter_subscriber
             ORDER BY subscribed_at DESC, id DESC",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Remove a subscriber.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: SubscriberId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.newsletter_subscriber WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
