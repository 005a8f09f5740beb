//! User account model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tennis_shop_core::{Email, Role, UserId};

/// A storefront user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// False for accounts created through Google sign-in.
    pub has_password: bool,
}

impl User {
    #[must_use]
    pub fn phone_or_empty(&self) -> &str {
        self.phone.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn address_or_empty(&self) -> &str {
        self.address.as_deref().unwrap_or_default()
    }
}
