//! Admin order management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use tennis_shop_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::routes::context::{FlashKind, PageContext, redirect_flash};
use crate::services::{OrderError, OrderService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<Order>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: Order,
    pub statuses: [OrderStatus; 5],
}

/// `GET /admin/orders`
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<OrdersIndexTemplate> {
    let orders = OrderService::new(state.pool()).list_all().await?;
    Ok(OrdersIndexTemplate { ctx, orders })
}

/// `GET /admin/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<OrderShowTemplate> {
    let order = OrderService::new(state.pool()).get(OrderId::new(id)).await?;
    Ok(OrderShowTemplate {
        ctx,
        order,
        statuses: OrderStatus::ALL,
    })
}

/// `POST /admin/orders/{id}/status`
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id, status = %form.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let order_id = OrderId::new(id);
    let path = format!("/admin/orders/{order_id}");
    match OrderService::new(state.pool())
        .update_status(order_id, &form.status)
        .await
    {
        Ok(_) => Ok(redirect_flash(&path, FlashKind::Success, "status_updated")),
        Err(OrderError::InvalidStatus(_)) => {
            Ok(redirect_flash(&path, FlashKind::Error, "invalid_status"))
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /admin/orders/{id}/delete`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    OrderService::new(state.pool()).delete(OrderId::new(id)).await?;
    Ok(redirect_flash("/admin/orders", FlashKind::Success, "order_deleted"))
}
