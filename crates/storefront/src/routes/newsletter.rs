//! Newsletter sign-up from the footer form.

use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tracing::instrument;

use super::context::{FlashKind, redirect_flash};
use crate::error::Result;
use crate::middleware::safe_return_to;
use crate::services::newsletter::Subscription;
use crate::services::{NewsletterError, NewsletterService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
    /// Page the form was posted from.
    pub return_to: Option<String>,
}

/// `POST /newsletter/subscribe`. Redirects back to the posting page with a flash.
#[instrument(skip(state, form))]
pub async fn subscribe(
    State(state): State<AppState>,
    Form(form): Form<SubscribeForm>,
) -> Result<Redirect> {
    let back = safe_return_to(form.return_to.as_deref());
    let redirect = match NewsletterService::new(state.pool()).subscribe(&form.email).await {
        Ok(Subscription::Subscribed) => redirect_flash(back, FlashKind::Success, "subscribed"),
        Ok(Subscription::AlreadySubscribed) => {
            redirect_flash(back, FlashKind::Success, "already_subscribed")
        }
        Err(NewsletterError::InvalidEmail(_)) => {
            redirect_flash(back, FlashKind::Error, "invalid_email")
        }
        Err(e) => return Err(e.into()),
    };
    Ok(redirect)
}
