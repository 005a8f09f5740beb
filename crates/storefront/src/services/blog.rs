//! Blog posts.
//!
//! Post bodies are authored as Markdown (raw HTML allowed) and rendered with
//! comrak when displayed.

use comrak::{Options, markdown_to_html};
use sqlx::PgPool;

use tennis_shop_core::BlogPostId;

use crate::db::{BlogRepository, RepositoryError};
use crate::models::BlogPost;

/// Posts shown on the home page.
pub const HOME_POSTS: i64 = 3;

/// Related posts shown under an article.
pub const RELATED_POSTS: i64 = 3;

/// A post ready to display.
#[derive(Debug, Clone)]
pub struct Article {
    pub post: BlogPost,
    pub content_html: String,
    pub related: Vec<BlogPost>,
}

pub struct BlogService<'a> {
    repo: BlogRepository<'a>,
}

impl<'a> BlogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: BlogRepository::new(pool),
        }
    }

    /// Published posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(&self) -> Result<Vec<BlogPost>, RepositoryError> {
        self.repo.list_published(None).await
    }

    /// The `n` newest published posts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, n: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        self.repo.list_published(Some(n.max(0))).await
    }

    /// A published post with its rendered body and related posts. Counts a view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for missing or unpublished posts.
    pub async fn get_published(&self, id: BlogPostId) -> Result<Article, RepositoryError> {
        let post = self
            .repo
            .view_published(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let related = self.related(&post, RELATED_POSTS).await?;
        Ok(Article {
            content_html: render_markdown(&post.content),
            post,
            related,
        })
    }

    /// Other published posts in the same category. Uncategorized posts have none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(&self, post: &BlogPost, n: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        match post.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => {
                self.repo.related(category, post.id, n.max(0)).await
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Render a post body to HTML.
#[must_use]
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.r#unsafe = true;
    markdown_to_html(content, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_renders() {
        let html = render_markdown("# Stringing\n\nUse **poly** for spin.");
        assert!(html.contains("<h1>Stringing</h1>"));
        assert!(html.contains("<strong>poly</strong>"));
    }

    #[test]
    fn test_html_content_passes_through() {
        let html = render_markdown("<p class=\"lead\">Grip sizes</p>");
        assert!(html.contains("<p class=\"lead\">Grip sizes</p>"));
    }
}
