//! Blog post model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tennis_shop_core::BlogPostId;

#[derive(Debug, Clone, Serialize)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub slug: String,
    pub title: String,
    /// Markdown source.
    pub content: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub views: i32,
}
