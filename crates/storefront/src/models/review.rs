//! Product review model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tennis_shop_core::{ProductId, ReviewId, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub full_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Filled and empty stars for display, e.g. `★★★★☆`.
    #[must_use]
    pub fn stars(&self) -> String {
        let filled = usize::try_from(self.rating.clamp(0, 5)).unwrap_or_default();
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }
}
