//! Admin newsletter subscriber list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::Redirect,
};

use tennis_shop_core::SubscriberId;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Subscriber;
use crate::routes::context::{FlashKind, PageContext, redirect_flash};
use crate::services::NewsletterService;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "admin/newsletter.html")]
pub struct SubscribersTemplate {
    pub ctx: PageContext,
    pub subscribers: Vec<Subscriber>,
}

/// `GET /admin/newsletter`
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<SubscribersTemplate> {
    let subscribers = NewsletterService::new(state.pool()).list().await?;
    Ok(SubscribersTemplate { ctx, subscribers })
}

/// `POST /admin/newsletter/{id}/delete`
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    if !NewsletterService::new(state.pool())
        .unsubscribe(SubscriberId::new(id))
        .await?
    {
        return Err(AppError::NotFound("Subscriber not found".to_string()));
    }
    Ok(redirect_flash("/admin/newsletter", FlashKind::Success, "subscriber_removed"))
}
