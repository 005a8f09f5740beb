//! Admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use rust_decimal::Decimal;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductSort, User};
use crate::routes::context::PageContext;
use crate::services::{OrderService, ProductService, UserService};
use crate::state::AppState;

/// Rows in each "recent" table.
const RECENT_ROWS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct DashboardMetrics {
    pub users: usize,
    pub products: usize,
    pub orders: i64,
    /// Sum of completed payments.
    pub revenue: Decimal,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub metrics: DashboardMetrics,
    pub recent_users: Vec<User>,
    pub recent_products: Vec<Product>,
}

/// `GET /admin`
#[instrument(skip(state, ctx, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
) -> Result<DashboardTemplate> {
    let mut users = UserService::new(state.pool()).list_users().await?;
    let mut products = ProductService::new(state.pool(), state.imagekit())
        .list_all(ProductSort::Newest)
        .await?;
    let orders = OrderService::new(state.pool());

    let metrics = DashboardMetrics {
        users: users.len(),
        products: products.len(),
        orders: orders.count().await?,
        revenue: orders.revenue().await?,
    };

    users.truncate(RECENT_ROWS);
    products.truncate(RECENT_ROWS);

    Ok(DashboardTemplate {
        ctx,
        metrics,
        recent_users: users,
        recent_products: products,
    })
}
