//! Customer order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::instrument;

use tennis_shop_core::OrderId;

use super::context::{FlashKind, PageContext, redirect_flash};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::{OrderError, OrderService};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub ctx: PageContext,
    pub orders: Vec<Order>,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub ctx: PageContext,
    pub order: Order,
}

impl OrderShowTemplate {
    fn payment_label(&self) -> &'static str {
        self.order
            .payment
            .as_ref()
            .map_or("Not recorded", |p| p.method.label())
    }

    fn payment_status(&self) -> &'static str {
        self.order
            .payment
            .as_ref()
            .map_or("-", |p| p.status.as_str())
    }
}

/// `GET /orders`
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<OrdersIndexTemplate> {
    let orders = OrderService::new(state.pool()).list_for_user(user.id).await?;
    Ok(OrdersIndexTemplate { ctx, orders })
}

/// `GET /orders/{id}`. Other users' orders are 403.
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<i32>,
) -> Result<OrderShowTemplate> {
    let order = OrderService::new(state.pool())
        .get_for_user(user.id, OrderId::new(order_id))
        .await?;
    Ok(OrderShowTemplate { ctx, order })
}

/// `POST /orders/{id}/cancel`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<i32>,
) -> Result<Redirect> {
    let order_id = OrderId::new(order_id);
    let path = format!("/orders/{order_id}");
    match OrderService::new(state.pool())
        .cancel_for_user(user.id, order_id)
        .await
    {
        Ok(()) => Ok(redirect_flash(&path, FlashKind::Success, "order_cancelled")),
        Err(OrderError::NotCancellable) => {
            Ok(redirect_flash(&path, FlashKind::Error, "not_cancellable"))
        }
        Err(e) => Err(e.into()),
    }
}

