//! Cart route handlers.
//!
//! The cart page is server-rendered. Add, update and remove also answer
//! JSON when called from `cart.js` (`Accept: application/json` or
//! `X-Requested-With: XMLHttpRequest`); plain form posts get a redirect with
//! a flash code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use tennis_shop_core::{CartItemId, ProductId, VariantId};

use super::context::{FlashKind, PageContext, redirect_flash};
use crate::error::Result;
use crate::filters;
use crate::middleware::{RequireAuth, wants_json};
use crate::models::CartSummary;
use crate::services::{CartError, CartService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<i32>,
    /// Empty string when the product page has no variant selector.
    pub variant_id: Option<String>,
}

impl AddToCartForm {
    fn variant_id(&self) -> Option<VariantId> {
        self.variant_id
            .as_deref()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(VariantId::new)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub cart_item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub cart_item_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddResponse {
    success: bool,
    message: String,
    cart_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    success: bool,
    quantity: i32,
    line_total: String,
    cart_total: String,
    cart_count: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: CartSummary,
}

fn error_code(err: &CartError) -> &'static str {
    match err {
        CartError::ProductNotFound => "product_not_found",
        CartError::VariantRequired => "variant_required",
        CartError::VariantNotFound => "variant_not_found",
        CartError::InsufficientStock(_) | CartError::InsufficientVariantStock(_) => "out_of_stock",
        CartError::InvalidInput(_) | CartError::Repository(_) => "invalid_quantity",
    }
}

fn json_failure(err: &CartError) -> Response {
    let status = if matches!(err, CartError::ProductNotFound) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(json!({ "success": false, "message": err.to_string() }))).into_response()
}

/// `GET /cart`
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let cart = CartService::new(state.pool()).summary(user.id).await?;
    Ok(CartShowTemplate { ctx, cart })
}

/// `POST /cart/add`
#[instrument(skip(state, headers, user, form), fields(user_id = %user.id, product_id = form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let json = wants_json(&headers);
    let quantity = form.quantity.unwrap_or(1);
    let result = CartService::new(state.pool())
        .add_item(user.id, ProductId::new(form.product_id), quantity, form.variant_id())
        .await;

    match result {
        Ok(added) => {
            crate::error::add_breadcrumb("cart", "Added to cart", None);
            if json {
                return Ok(Json(AddResponse {
                    success: true,
                    message: format!("{} added to cart", added.line.product_name),
                    cart_count: added.cart_count,
                })
                .into_response());
            }
            Ok(redirect_flash("/cart", FlashKind::Success, "cart_added").into_response())
        }
        Err(CartError::Repository(e)) => Err(e.into()),
        Err(e) if json => Ok(json_failure(&e)),
        Err(e) => Ok(redirect_flash(
            &format!("/products/{}", form.product_id),
            FlashKind::Error,
            error_code(&e),
        )
        .into_response()),
    }
}

/// `POST /cart/update`. A quantity of zero removes the line.
#[instrument(skip(state, headers, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let service = CartService::new(state.pool());
    let result = service
        .update_quantity(user.id, CartItemId::new(form.cart_item_id), form.quantity)
        .await;

    let line = match result {
        Ok(line) => line,
        Err(CartError::Repository(e)) => return Err(e.into()),
        Err(e) if wants_json(&headers) => return Ok(json_failure(&e)),
        Err(e) => {
            return Ok(redirect_flash("/cart", FlashKind::Error, error_code(&e)).into_response());
        }
    };

    if !wants_json(&headers) {
        return Ok(redirect_flash("/cart", FlashKind::Success, "cart_updated").into_response());
    }

    let summary = service.summary(user.id).await?;
    Ok(Json(UpdateResponse {
        success: true,
        quantity: line.as_ref().map_or(0, |l| l.quantity),
        line_total: tennis_shop_core::money::format_vnd(
            line.as_ref().map(|l| l.line_total()).unwrap_or_default(),
        ),
        cart_total: tennis_shop_core::money::format_vnd(summary.total),
        cart_count: summary.item_count,
    })
    .into_response())
}

/// `POST /cart/remove`
#[instrument(skip(state, headers, user, form), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let service = CartService::new(state.pool());
    let removed = service
        .remove_item(user.id, CartItemId::new(form.cart_item_id))
        .await?;

    if wants_json(&headers) {
        let summary = service.summary(user.id).await?;
        return Ok(Json(json!({
            "success": removed,
            "cartTotal": tennis_shop_core::money::format_vnd(summary.total),
            "cartCount": summary.item_count,
        }))
        .into_response());
    }
    Ok(redirect_flash("/cart", FlashKind::Success, "item_removed").into_response())
}

/// `POST /cart/clear`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(redirect_flash("/cart", FlashKind::Success, "cart_cleared").into_response())
}

/// `GET /cart/count`. Signed-out visitors have an empty cart.
#[instrument(skip(ctx))]
pub async fn count(ctx: PageContext) -> impl IntoResponse {
    Json(json!({ "count": ctx.cart_count }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_id_parses_blank_as_none() {
        let form = AddToCartForm {
            product_id: 1,
            quantity: None,
            variant_id: Some(String::new()),
        };
        assert_eq!(form.variant_id(), None);

        let form = AddToCartForm {
            product_id: 1,
            quantity: Some(2),
            variant_id: Some(" 7 ".to_string()),
        };
        assert_eq!(form.variant_id(), Some(VariantId::new(7)));
    }

    #[test]
    fn test_stock_errors_share_a_flash_code() {
        assert_eq!(error_code(&CartError::InsufficientStock(1)), "out_of_stock");
        assert_eq!(error_code(&CartError::InsufficientVariantStock(0)), "out_of_stock");
        assert_eq!(error_code(&CartError::VariantRequired), "variant_required");
    }

    #[test]
    fn test_json_failure_carries_message() {
        let response = json_failure(&CartError::ProductNotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
