//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::context::PageContext;
use super::products::{ProductCard, cards};
use crate::filters;
use crate::models::{BlogPost, Category};
use crate::services::blog::HOME_POSTS;
use crate::services::{BlogService, ProductService};
use crate::state::AppState;

/// Products in the "new arrivals" grid.
const HOME_PRODUCTS: i64 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductCard>,
    pub categories: Vec<Category>,
    pub posts: Vec<BlogPost>,
}

impl HomeTemplate {
    /// Top-level categories for the category tiles.
    fn top_categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(|c| c.parent_id.is_none())
    }
}

/// Display the home page. Sections that fail to load are left empty.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let catalog = ProductService::new(state.pool(), state.imagekit());

    let products = catalog.newest(HOME_PRODUCTS).await.map_or_else(
        |e| {
            tracing::error!("Failed to load home products: {e}");
            Vec::new()
        },
        |products| cards(&products, state.imagekit()),
    );
    let categories = catalog.categories().await.unwrap_or_else(|e| {
        tracing::error!("Failed to load categories: {e}");
        Vec::new()
    });
    let posts = BlogService::new(state.pool())
        .recent(HOME_POSTS)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to load recent posts: {e}");
            Vec::new()
        });

    HomeTemplate {
        ctx,
        products,
        categories,
        posts,
    }
}
