//! Blog post repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tennis_shop_core::BlogPostId;

use super::RepositoryError;
use crate::models::blog::BlogPost;

const POST_COLUMNS: &str = "id, slug, title, content, excerpt, author, image_url, category, \
                            created_at, updated_at, is_published, views";

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: BlogPostId,
    slug: String,
    title: String,
    content: String,
    excerpt: Option<String>,
    author: Option<String>,
    image_url: Option<String>,
    category: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    is_published: bool,
    views: i32,
}

impl From<PostRow> for BlogPost {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            excerpt: row.excerpt,
            author: row.author,
            image_url: row.image_url,
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_published: row.is_published,
            views: row.views,
        }
    }
}

/// Fields for importing a post.
#[derive(Debug, Clone)]
pub struct PostUpsert {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_published: bool,
}

/// Repository for blog posts.
pub struct BlogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogRepository<'a> {
    /// Create a new blog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published posts, newest first, optionally limited.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(&self, limit: Option<i64>) -> Result<Vec<BlogPost>, RepositoryError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM shop.blog_post
             WHERE is_published
             ORDER BY created_at DESC, id DESC
             LIMIT $1"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Fetch a published post and count the view in the same statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn view_published(&self, id: BlogPostId) -> Result<Option<BlogPost>, RepositoryError> {
        let sql = format!(
            "UPDATE shop.blog_post SET views = views + 1
             WHERE id = $1 AND is_published
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Other published posts in a category, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(
        &self,
        category: &str,
        exclude: BlogPostId,
        limit: i64,
    ) -> Result<Vec<BlogPost>, RepositoryError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM shop.blog_post
             WHERE is_published AND category = $1 AND id <> $2
             ORDER BY created_at DESC, id DESC
             LIMIT $3"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(category)
            .bind(exclude)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert or refresh a post keyed by slug. View counts are preserved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(&self, post: &PostUpsert) -> Result<BlogPostId, RepositoryError> {
        let id = sqlx::query_scalar::<_, BlogPostId>(
            "INSERT INTO shop.blog_post
                 (slug, title, content, excerpt, author, image_url, category, created_at, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (slug) DO UPDATE SET
                 title = EXCLUDED.title, content = EXCLUDED.content,
                 excerpt = EXCLUDED.excerpt, author = EXCLUDED.author,
                 image_url = EXCLUDED.image_url, category = EXCLUDED.category,
                 is_published = EXCLUDED.is_published, updated_at = now()
             RETURNING id",
        )
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.excerpt.as_deref())
        .bind(post.author.as_deref())
        .bind(post.image_url.as_deref())
        .bind(post.category.as_deref())
        .bind(post.created_at)
        .bind(post.is_published)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }
}
