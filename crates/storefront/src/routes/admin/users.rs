//! Admin user management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use tennis_shop_core::UserId;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::routes::context::{FlashKind, PageContext, redirect_flash};
use crate::services::users::UserUpdate;
use crate::services::{AuthError, UserService};
use crate::state::AppState;

const USERS_PATH: &str = "/admin/users";

#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role_id: i32,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users/index.html")]
pub struct UsersIndexTemplate {
    pub ctx: PageContext,
    pub users: Vec<User>,
    pub roles: Vec<(i32, String)>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/users/edit.html")]
pub struct UserEditTemplate {
    pub ctx: PageContext,
    pub user_id: UserId,
    pub form: UserUpdate,
    pub error: Option<String>,
}

/// `GET /admin/users`
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<UsersIndexTemplate> {
    let users = UserService::new(state.pool());
    Ok(UsersIndexTemplate {
        ctx,
        users: users.list_users().await?,
        roles: users.roles().await?,
    })
}

/// `GET /admin/users/{id}/edit`
pub async fn edit_page(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<UserEditTemplate> {
    let user = UserService::new(state.pool()).get_user(UserId::new(id)).await?;
    Ok(UserEditTemplate {
        ctx,
        user_id: user.id,
        form: UserUpdate {
            full_name: user.full_name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone(),
            address: user.address.clone(),
        },
        error: None,
    })
}

/// `POST /admin/users/{id}/edit`
#[instrument(skip(state, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<EditUserForm>,
) -> Result<Response> {
    let user_id = UserId::new(id);
    let update = UserUpdate {
        full_name: form.full_name,
        email: form.email,
        phone: form.phone,
        address: form.address,
    };

    match UserService::new(state.pool()).update_user(user_id, &update).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User updated by admin");
            Ok(redirect_flash(USERS_PATH, FlashKind::Success, "user_updated").into_response())
        }
        Err(
            e @ (AuthError::Required(_) | AuthError::InvalidEmail(_) | AuthError::UserAlreadyExists),
        ) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            UserEditTemplate {
                ctx,
                user_id,
                form: update,
                error: Some(e.user_message()),
            },
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// `POST /admin/users/{id}/delete`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    match UserService::new(state.pool())
        .delete_user(admin.id, UserId::new(id))
        .await
    {
        Ok(()) => Ok(redirect_flash(USERS_PATH, FlashKind::Success, "user_deleted")),
        Err(AuthError::CannotDeleteSelf) => {
            Ok(redirect_flash(USERS_PATH, FlashKind::Error, "cannot_delete_self"))
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /admin/users/{id}/role`
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id, role_id = form.role_id))]
pub async fn change_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect> {
    UserService::new(state.pool())
        .change_role(UserId::new(id), form.role_id)
        .await?;
    Ok(redirect_flash(USERS_PATH, FlashKind::Success, "role_changed"))
}
