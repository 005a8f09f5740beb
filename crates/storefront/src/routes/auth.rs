//! Email/password authentication handlers.
//!
//! Login and registration re-render the form with a message on failure.
//! A successful login rotates the session id before storing the user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::context::{FlashKind, PageContext, redirect_flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{clear_current_user, safe_return_to, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub return_to: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub return_to: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub ctx: PageContext,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub return_to: String,
    pub error: Option<String>,
}

/// Store the user in the session and continue to `return_to`.
async fn sign_in(session: &Session, user: &User, return_to: Option<&str>) -> Result<Redirect> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    Ok(Redirect::to(safe_return_to(return_to)))
}

/// `GET /auth/login`
pub async fn login_page(ctx: PageContext, Query(query): Query<ReturnQuery>) -> Response {
    if ctx.user.is_some() {
        return Redirect::to(safe_return_to(query.return_to.as_deref())).into_response();
    }
    LoginTemplate {
        ctx,
        email: String::new(),
        return_to: safe_return_to(query.return_to.as_deref()).to_string(),
        error: None,
    }
    .into_response()
}

/// `POST /auth/login`
#[instrument(skip(state, ctx, session, form))]
pub async fn login(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.pool());
    match auth.authenticate(&form.email, &form.password).await? {
        Some(user) => {
            tracing::info!(user_id = %user.id, "User signed in");
            Ok(sign_in(&session, &user, form.return_to.as_deref())
                .await?
                .into_response())
        }
        None => {
            tracing::info!("Sign-in rejected");
            Ok((
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    ctx,
                    email: form.email,
                    return_to: safe_return_to(form.return_to.as_deref()).to_string(),
                    error: Some(AuthError::InvalidCredentials.user_message()),
                },
            )
                .into_response())
        }
    }
}

/// `GET /auth/register`
pub async fn register_page(ctx: PageContext, Query(query): Query<ReturnQuery>) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        ctx,
        full_name: String::new(),
        email: String::new(),
        phone: String::new(),
        address: String::new(),
        return_to: safe_return_to(query.return_to.as_deref()).to_string(),
        error: None,
    }
    .into_response()
}

fn register_failed(ctx: PageContext, form: RegisterForm, message: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        RegisterTemplate {
            ctx,
            return_to: safe_return_to(form.return_to.as_deref()).to_string(),
            full_name: form.full_name,
            email: form.email,
            phone: form.phone.unwrap_or_default(),
            address: form.address.unwrap_or_default(),
            error: Some(message),
        },
    )
        .into_response()
}

/// `POST /auth/register`. New accounts are signed in straight away.
#[instrument(skip(state, ctx, session, form))]
pub async fn register(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if form.password != form.password_confirm {
        return Ok(register_failed(ctx, form, "Passwords do not match.".to_string()));
    }

    let registered = AuthService::new(state.pool())
        .register(&Registration {
            full_name: form.full_name.clone(),
            email: form.email.clone(),
            password: form.password.clone(),
            phone: form.phone.clone(),
            address: form.address.clone(),
        })
        .await;

    match registered {
        Ok(user) => {
            let target = match safe_return_to(form.return_to.as_deref()) {
                "/" => "/?success=registered".to_string(),
                path => path.to_string(),
            };
            Ok(sign_in(&session, &user, Some(&target)).await?.into_response())
        }
        Err(e @ (AuthError::Repository(_) | AuthError::PasswordHash)) => Err(e.into()),
        Err(e) => {
            let message = e.user_message();
            Ok(register_failed(ctx, form, message))
        }
    }
}

/// `POST /auth/logout`
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    redirect_flash("/", FlashKind::Success, "logged_out")
}
