//! Newsletter sign-up.

use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::{Email, EmailError, SubscriberId};

use crate::db::{NewsletterRepository, RepositoryError};
use crate::models::Subscriber;

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("Please enter a valid email address.")]
    InvalidEmail(#[from] EmailError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of a sign-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Subscribed,
    AlreadySubscribed,
}

impl Subscription {
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Subscribed => "Thanks for subscribing to our newsletter!",
            Self::AlreadySubscribed => "You are already subscribed to our newsletter.",
        }
    }
}

pub struct NewsletterService<'a> {
    repo: NewsletterRepository<'a>,
}

impl<'a> NewsletterService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: NewsletterRepository::new(pool),
        }
    }

    /// Subscribe an address. Subscribing twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::InvalidEmail` for a malformed address.
    pub async fn subscribe(&self, email: &str) -> Result<Subscription, NewsletterError> {
        let email = Email::parse(email)?;
        if self.repo.subscribe(&email).await? {
            tracing::info!(email = %email, "Newsletter subscription added");
            Ok(Subscription::Subscribed)
        } else {
            Ok(Subscription::AlreadySubscribed)
        }
    }

    /// All subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Subscriber>, NewsletterError> {
        Ok(self.repo.list().await?)
    }

    /// Remove a subscriber. Returns false if there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns `NewsletterError::Repository` if the delete fails.
    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<bool, NewsletterError> {
        Ok(self.repo.delete(id).await?)
    }
}
