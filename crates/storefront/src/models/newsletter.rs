//! Newsletter subscriber model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tennis_shop_core::{Email, SubscriberId};

#[derive(Debug, Clone, Serialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub subscribed_at: DateTime<Utc>,
}
