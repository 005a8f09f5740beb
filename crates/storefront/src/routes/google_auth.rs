//! Google OAuth sign-in handlers.
//!
//! - Login: stores a random `state` (and the page to return to) in the
//!   session, then redirects to Google's consent screen
//! - Callback: checks `state`, exchanges the code and signs the user in,
//!   creating an account on first use

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;

use super::auth::ReturnQuery;
use super::context::{FlashKind, redirect_flash};
use crate::middleware::{safe_return_to, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::AuthService;
use crate::state::AppState;

const CALLBACK_PATH: &str = "/auth/google/callback";
const STATE_LENGTH: usize = 32;

/// Query parameters from the Google callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the user declines consent.
    pub error: Option<String>,
}

/// Random alphanumeric string for the OAuth `state` parameter.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

fn login_error(code: &str) -> Response {
    redirect_flash("/auth/login", FlashKind::Error, code).into_response()
}

/// `GET /auth/google`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ReturnQuery>,
) -> Response {
    let Some(google) = state.google() else {
        return login_error("google_disabled");
    };

    let oauth_state = generate_random_string(STATE_LENGTH);
    if let Err(e) = session
        .insert(session_keys::GOOGLE_OAUTH_STATE, &oauth_state)
        .await
    {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return login_error("google_failed");
    }
    let return_to = safe_return_to(query.return_to.as_deref()).to_string();
    if let Err(e) = session.insert(session_keys::RETURN_TO, &return_to).await {
        tracing::error!(error = %e, "Failed to store return path in session");
        return login_error("google_failed");
    }

    let redirect_uri = state.config().absolute_url(CALLBACK_PATH);
    Redirect::to(&google.authorization_url(&redirect_uri, &oauth_state)).into_response()
}

/// `GET /auth/google/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(google) = state.google() else {
        return login_error("google_disabled");
    };

    if let Some(error) = query.error {
        tracing::info!(error = %error, "Google sign-in declined");
        return login_error("google_failed");
    }

    let stored_state: Option<String> = session
        .remove(session_keys::GOOGLE_OAUTH_STATE)
        .await
        .ok()
        .flatten();
    let return_to: Option<String> = session
        .remove(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten();

    match (&stored_state, &query.state) {
        (Some(stored), Some(returned)) if stored == returned => {}
        _ => {
            tracing::warn!("Google OAuth state mismatch");
            return login_error("invalid_state");
        }
    }

    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return login_error("google_failed");
    };

    let redirect_uri = state.config().absolute_url(CALLBACK_PATH);
    let profile = match google.fetch_profile(&code, &redirect_uri).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "Google token exchange failed");
            return login_error("google_failed");
        }
    };

    let user = match AuthService::new(state.pool()).login_with_google(&profile).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "Google sign-in could not load account");
            return login_error("google_failed");
        }
    };

    if let Err(e) = set_current_user(&session, &CurrentUser::from(&user)).await {
        tracing::error!(error = %e, "Failed to store user in session");
        return login_error("google_failed");
    }

    tracing::info!(user_id = %user.id, "User signed in with Google");
    Redirect::to(safe_return_to(return_to.as_deref())).into_response()
}
