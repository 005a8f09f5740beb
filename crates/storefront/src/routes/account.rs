//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::context::{Flash, FlashKind, PageContext, redirect_flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, Order, User};
use crate::services::{AuthError, AuthService, OrderService};
use crate::state::AppState;

/// Orders shown on the account overview.
const RECENT_ORDERS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub ctx: PageContext,
    pub profile: User,
    pub recent_orders: Vec<Order>,
    pub password_error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/edit.html")]
pub struct AccountEditTemplate {
    pub ctx: PageContext,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub error: Option<String>,
}

async fn overview(
    state: &AppState,
    ctx: PageContext,
    user: &CurrentUser,
    password_error: Option<String>,
) -> Result<AccountIndexTemplate> {
    let profile = AuthService::new(state.pool()).get_user(user.id).await?;
    let mut recent_orders = OrderService::new(state.pool()).list_for_user(user.id).await?;
    recent_orders.truncate(RECENT_ORDERS);
    Ok(AccountIndexTemplate {
        ctx,
        profile,
        recent_orders,
        password_error,
    })
}

/// `GET /account`
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<AccountIndexTemplate> {
    overview(&state, ctx, &user, None).await
}

/// `GET /account/edit`
pub async fn edit_page(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<AccountEditTemplate> {
    let profile = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(AccountEditTemplate {
        ctx,
        full_name: profile.full_name.clone(),
        phone: profile.phone_or_empty().to_string(),
        address: profile.address_or_empty().to_string(),
        error: None,
    })
}

/// `POST /account/edit`. The session copy of the name is refreshed too.
#[instrument(skip(state, ctx, session, user, form), fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let updated = AuthService::new(state.pool())
        .update_profile(
            user.id,
            &form.full_name,
            form.phone.as_deref(),
            form.address.as_deref(),
        )
        .await;

    match updated {
        Ok(profile) => {
            set_current_user(&session, &CurrentUser::from(&profile))
                .await
                .map_err(|e| AppError::Internal(format!("session: {e}")))?;
            Ok(redirect_flash("/account", FlashKind::Success, "profile_updated").into_response())
        }
        Err(e @ AuthError::Required(_)) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            AccountEditTemplate {
                ctx,
                full_name: form.full_name,
                phone: form.phone.unwrap_or_default(),
                address: form.address.unwrap_or_default(),
                error: Some(e.user_message()),
            },
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// `POST /account/password`
#[instrument(skip(state, ctx, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Result<Response> {
    let message = if form.new_password == form.confirm_password {
        match AuthService::new(state.pool())
            .change_password(user.id, &form.current_password, &form.new_password)
            .await
        {
            Ok(()) => {
                return Ok(
                    redirect_flash("/account", FlashKind::Success, "password_changed")
                        .into_response(),
                );
            }
            Err(AuthError::InvalidCredentials) => "Current password is incorrect.".to_string(),
            Err(e @ (AuthError::WeakPassword(_) | AuthError::NoPassword)) => e.user_message(),
            Err(e) => return Err(e.into()),
        }
    } else {
        "New passwords do not match.".to_string()
    };

    let ctx = ctx.with_flash(Flash::error("Password was not changed."));
    let page = overview(&state, ctx, &user, Some(message)).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}
