//! Blog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use tennis_shop_core::BlogPostId;

use super::context::PageContext;
use crate::error::Result;
use crate::filters;
use crate::models::BlogPost;
use crate::services::BlogService;
use crate::services::blog::Article;
use crate::state::AppState;

/// Blog index page template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/index.html")]
pub struct BlogIndexTemplate {
    pub ctx: PageContext,
    pub posts: Vec<BlogPost>,
}

/// Blog post detail template.
#[derive(Template, WebTemplate)]
#[template(path = "blog/show.html")]
pub struct BlogShowTemplate {
    pub ctx: PageContext,
    pub article: Article,
}

/// `GET /blog`
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<BlogIndexTemplate> {
    let posts = BlogService::new(state.pool()).list_published().await?;
    Ok(BlogIndexTemplate { ctx, posts })
}

/// `GET /blog/{id}`. Each view bumps the post's view counter.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<BlogShowTemplate> {
    let article = BlogService::new(state.pool())
        .get_published(BlogPostId::new(id))
        .await?;
    Ok(BlogShowTemplate { ctx, article })
}
