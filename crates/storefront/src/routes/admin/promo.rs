//! Admin promo codes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use tennis_shop_core::PromoCodeId;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::PromoCode;
use crate::routes::context::{FlashKind, PageContext, redirect_flash};
use crate::services::promo::NewPromoCode;
use crate::services::{PromoCodeService, PromoError};
use crate::state::AppState;

const PROMO_PATH: &str = "/admin/promo-codes";

/// Raw form. Dates come from `<input type="date">` as `YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
pub struct PromoForm {
    pub code: String,
    pub discount_percent: String,
    pub valid_from: String,
    pub valid_to: String,
}

impl PromoForm {
    fn parse(&self) -> Option<NewPromoCode> {
        let date = |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok();
        Some(NewPromoCode {
            code: self.code.clone(),
            discount_percent: self.discount_percent.trim().parse().ok()?,
            valid_from: date(&self.valid_from)?,
            valid_to: date(&self.valid_to)?,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/promo_codes.html")]
pub struct PromoCodesTemplate {
    pub ctx: PageContext,
    pub promos: Vec<PromoCode>,
    pub now: chrono::DateTime<chrono::Utc>,
}

/// `GET /admin/promo-codes`
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<PromoCodesTemplate> {
    let promos = PromoCodeService::new(state.pool()).list().await?;
    Ok(PromoCodesTemplate {
        ctx,
        promos,
        now: chrono::Utc::now(),
    })
}

/// `POST /admin/promo-codes`
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<PromoForm>,
) -> Result<Redirect> {
    let Some(new_code) = form.parse() else {
        return Ok(redirect_flash(PROMO_PATH, FlashKind::Error, "invalid_promo"));
    };
    match PromoCodeService::new(state.pool()).create(&new_code).await {
        Ok(_) => Ok(redirect_flash(PROMO_PATH, FlashKind::Success, "promo_created")),
        Err(PromoError::Invalid(reason)) => {
            tracing::info!(reason, "Promo code rejected");
            Ok(redirect_flash(PROMO_PATH, FlashKind::Error, "invalid_promo"))
        }
        Err(PromoError::Duplicate) => {
            Ok(redirect_flash(PROMO_PATH, FlashKind::Error, "duplicate_promo"))
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /admin/promo-codes/{id}/toggle`
pub async fn toggle(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    PromoCodeService::new(state.pool())
        .toggle(PromoCodeId::new(id))
        .await?;
    Ok(redirect_flash(PROMO_PATH, FlashKind::Success, "promo_toggled"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(percent: &str, from: &str, to: &str) -> PromoForm {
        PromoForm {
            code: "ace10".to_string(),
            discount_percent: percent.to_string(),
            valid_from: from.to_string(),
            valid_to: to.to_string(),
        }
    }

    #[test]
    fn parses_date_inputs() {
        let parsed = form("10", "2025-06-01", " 2025-06-30 ").parse();
        assert!(parsed.is_some_and(|p| p.discount_percent == 10
            && p.valid_to.to_string() == "2025-06-30"));
    }

    #[test]
    fn unparseable_fields_are_rejected() {
        assert!(form("ten", "2025-06-01", "2025-06-30").parse().is_none());
        assert!(form("10", "", "2025-06-30").parse().is_none());
        assert!(form("10", "2025-06-01", "30/06/2025").parse().is_none());
    }
}
