//! Checkout and PayOS payment handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use tennis_shop_core::{OrderId, PaymentMethod};

use super::context::{Flash, FlashKind, PageContext, redirect_flash};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CartSummary;
use crate::payos::types::WebhookPayload;
use crate::services::checkout::{CheckoutForm, PlacedOrder, WebhookOutcome};
use crate::services::{AuthService, CheckoutError, CheckoutService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    pub shipping_address: String,
    pub phone: String,
    pub payment_method: String,
    pub promo_code: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartSummary,
    pub shipping_address: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub promo_code: String,
}

/// The submitted payment method. Unknown values are rejected rather than
/// falling back to cash on delivery.
fn payment_method(value: &str) -> Option<PaymentMethod> {
    value.trim().parse().ok()
}

fn order_page(order_id: OrderId) -> String {
    format!("/orders/{order_id}")
}

/// `GET /checkout`. Shipping details are prefilled from the profile.
#[instrument(skip(state, ctx, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let checkout = CheckoutService::new(state.pool(), state.payos());
    let summary = match checkout.summary(user.id).await {
        Ok(summary) => summary,
        Err(CheckoutError::EmptyCart) => {
            return Ok(redirect_flash("/cart", FlashKind::Error, "empty_cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };
    let profile = AuthService::new(state.pool()).get_user(user.id).await?;

    Ok(CheckoutTemplate {
        ctx,
        cart: summary.cart,
        shipping_address: profile.address_or_empty().to_string(),
        phone: profile.phone_or_empty().to_string(),
        payment_method: PaymentMethod::Cod,
        promo_code: String::new(),
    }
    .into_response())
}

/// `POST /checkout`
#[instrument(skip(state, ctx, user, form), fields(user_id = %user.id, method = %form.payment_method))]
pub async fn place(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Response> {
    let checkout = CheckoutService::new(state.pool(), state.payos());
    let chosen = payment_method(&form.payment_method);

    let flash = match chosen {
        None => Flash::error("Please choose a valid payment method."),
        Some(payment_method) => {
            let request = CheckoutForm {
                shipping_address: form.shipping_address.clone(),
                phone: form.phone.clone(),
                payment_method,
                promo_code: form.promo_code.clone(),
            };
            match checkout.place_order(user.id, &request).await {
                Ok(PlacedOrder::Placed(order_id)) => {
                    return Ok(redirect_flash(&order_page(order_id), FlashKind::Success, "order_placed")
                        .into_response());
                }
                Ok(PlacedOrder::Redirect { checkout_url, .. }) => {
                    return Ok(Redirect::to(&checkout_url).into_response());
                }
                Ok(PlacedOrder::PaymentLinkFailed(order_id)) => {
                    return Ok(redirect_flash(&order_page(order_id), FlashKind::Error, "payos_failed")
                        .into_response());
                }
                Err(CheckoutError::EmptyCart) => {
                    return Ok(redirect_flash("/cart", FlashKind::Error, "empty_cart").into_response());
                }
                Err(CheckoutError::MissingShipping) => {
                    Flash::error("Shipping address and phone are required.")
                }
                Err(CheckoutError::InvalidPromoCode) => {
                    Flash::error("Promo code is invalid or has expired.")
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let summary = checkout.summary(user.id).await?;
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutTemplate {
            ctx: ctx.with_flash(flash),
            cart: summary.cart,
            shipping_address: form.shipping_address,
            phone: form.phone,
            payment_method: chosen.unwrap_or(PaymentMethod::Cod),
            promo_code: form.promo_code.unwrap_or_default(),
        },
    )
        .into_response())
}

/// `GET /payment/success/{order_id}`: PayOS return URL.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn payment_success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<i32>,
) -> Result<Response> {
    let order = CheckoutService::new(state.pool(), state.payos())
        .payment_success(user.id, OrderId::new(order_id))
        .await?;
    let redirect = if order.is_paid() {
        redirect_flash(&order_page(order.id), FlashKind::Success, "payment_success")
    } else {
        Redirect::to(&order_page(order.id))
    };
    Ok(redirect.into_response())
}

/// `GET /payment/cancel/{order_id}`: the order stays pending.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn payment_cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<i32>,
) -> Result<Response> {
    let order = CheckoutService::new(state.pool(), state.payos())
        .payment_cancel(user.id, OrderId::new(order_id))
        .await?;
    Ok(redirect_flash(&order_page(order.id), FlashKind::Error, "payment_cancelled").into_response())
}

/// `GET /payment/retry/{order_id}`
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn retry_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<i32>,
) -> Result<Response> {
    let order_id = OrderId::new(order_id);
    match CheckoutService::new(state.pool(), state.payos())
        .retry_payment(user.id, order_id)
        .await
    {
        Ok(checkout_url) => Ok(Redirect::to(&checkout_url).into_response()),
        Err(CheckoutError::NotPending) => {
            Ok(redirect_flash(&order_page(order_id), FlashKind::Error, "not_pending").into_response())
        }
        Err(CheckoutError::PaymentLink(e)) => {
            tracing::error!(order_id = %order_id, error = %e, "PayOS retry failed");
            Ok(redirect_flash(&order_page(order_id), FlashKind::Error, "payos_failed").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /payment/webhook`. Anything with a valid signature is acknowledged.
#[instrument(skip(state, payload), fields(code = %payload.code))]
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Response> {
    let outcome = CheckoutService::new(state.pool(), state.payos())
        .handle_webhook(&payload)
        .await;

    match outcome {
        Ok(outcome) => {
            let order_id = match outcome {
                WebhookOutcome::Paid(id) | WebhookOutcome::AlreadyProcessed(id) => Some(id.as_i32()),
                WebhookOutcome::Ignored | WebhookOutcome::UnknownOrder(_) => None,
            };
            Ok(Json(json!({ "success": true, "orderId": order_id })).into_response())
        }
        Err(CheckoutError::BadSignature) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "invalid signature" })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_accepts_known_values() {
        assert_eq!(payment_method("COD"), Some(PaymentMethod::Cod));
        assert_eq!(payment_method(" PayOS "), Some(PaymentMethod::PayOs));
    }

    #[test]
    fn test_payment_method_rejects_unknown_values() {
        assert_eq!(payment_method("bitcoin"), None);
        assert_eq!(payment_method(""), None);
    }
}
