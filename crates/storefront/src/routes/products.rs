//! Product listing, search and detail pages, plus posting reviews.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use tennis_shop_core::{CategoryId, ProductId};

use super::context::{FlashKind, PageContext, redirect_flash};
use crate::error::{AppError, Result};
use crate::filters;
use crate::imagekit::ImageKitClient;
use crate::middleware::RequireAuth;
use crate::models::{Category, Product, ProductSort, ProductVariant};
use crate::services::reviews::{ProductReviews, ReviewError};
use crate::services::{CatalogError, ProductService, ReviewService};
use crate::state::AppState;

/// Listing thumbnail size in pixels.
const CARD_IMAGE_SIZE: u32 = 400;
const DETAIL_IMAGE_SIZE: u32 = 800;

/// Product card shown in grids.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub image_url: String,
    pub price: Decimal,
    pub list_price: Decimal,
    pub discount_percent: i32,
    pub in_stock: bool,
    /// Variant products are added from the detail page where a size is chosen.
    pub has_variants: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, imagekit: &ImageKitClient) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand_name.clone(),
            image_url: imagekit.image_url(
                product.primary_image_url(),
                Some(CARD_IMAGE_SIZE),
                Some(CARD_IMAGE_SIZE),
            ),
            price: product.effective_price(None),
            list_price: product.list_price(None),
            discount_percent: product.discount_percent,
            in_stock: product.total_stock() > 0,
            has_variants: product.has_variants(),
        }
    }

    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.discount_percent > 0
    }
}

/// Convert a product list to cards.
#[must_use]
pub fn cards(products: &[Product], imagekit: &ImageKitClient) -> Vec<ProductCard> {
    products
        .iter()
        .map(|p| ProductCard::new(p, imagekit))
        .collect()
}

/// A selectable variant on the detail page.
#[derive(Debug, Clone)]
pub struct VariantOption {
    pub id: i32,
    pub label: String,
    pub price: Decimal,
    pub stock: i32,
}

impl VariantOption {
    fn new(product: &Product, variant: &ProductVariant) -> Self {
        Self {
            id: variant.id.as_i32(),
            label: variant.label(),
            price: product.effective_price(Some(variant)),
            stock: variant.stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<i32>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: i32,
    pub comment: String,
}

/// Listing page, also used for search results.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub products: Vec<ProductCard>,
    pub categories: Vec<Category>,
    pub category_id: Option<i32>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub sorts: [ProductSort; 6],
}

impl ProductsIndexTemplate {
    /// Query string for a sort link, keeping the category or search term.
    fn sort_href(&self, sort: &ProductSort) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(id) = self.category_id {
            query.append_pair("category_id", &id.to_string());
        }
        if let Some(q) = &self.search {
            query.append_pair("q", q);
        }
        query.append_pair("sort", sort.key());
        let base = if self.search.is_some() {
            "/products/search"
        } else {
            "/products"
        };
        format!("{base}?{}", query.finish())
    }

    fn is_current_category(&self, id: CategoryId) -> bool {
        self.category_id == Some(id.as_i32())
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub ctx: PageContext,
    pub product: Product,
    pub images: Vec<String>,
    pub variants: Vec<VariantOption>,
    pub price: Decimal,
    pub list_price: Decimal,
    pub reviews: ProductReviews,
    pub can_review: bool,
}

impl ProductShowTemplate {
    fn average_label(&self) -> String {
        self.reviews
            .average_rating
            .map_or_else(|| "No reviews yet".to_string(), |avg| format!("{avg:.1} / 5"))
    }
}

/// `GET /products?category_id&sort`
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse> {
    let service = ProductService::new(state.pool(), state.imagekit());
    let sort = ProductSort::parse(query.sort.as_deref());
    let categories = service.categories().await?;

    let (title, products) = match query.category_id {
        Some(id) => {
            let name = categories
                .iter()
                .find(|c| c.id.as_i32() == id)
                .map_or_else(|| "Products".to_string(), |c| c.name.clone());
            (name, service.by_category(CategoryId::new(id), sort).await?)
        }
        None => ("All products".to_string(), service.list_active(sort).await?),
    };

    Ok(ProductsIndexTemplate {
        ctx,
        title,
        products: cards(&products, state.imagekit()),
        categories,
        category_id: query.category_id,
        search: None,
        sort,
        sorts: ProductSort::ALL,
    })
}

/// `GET /products/search?q&sort`
#[instrument(skip(state, ctx))]
pub async fn search(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let service = ProductService::new(state.pool(), state.imagekit());
    let sort = ProductSort::parse(query.sort.as_deref());
    let term = query.q.unwrap_or_default().trim().to_string();
    let products = service.search(&term, sort).await?;

    Ok(ProductsIndexTemplate {
        ctx,
        title: if term.is_empty() {
            "All products".to_string()
        } else {
            format!("Results for \"{term}\"")
        },
        products: cards(&products, state.imagekit()),
        categories: service.categories().await?,
        category_id: None,
        search: Some(term),
        sort,
        sorts: ProductSort::ALL,
    })
}

/// `GET /products/{id}`. Hidden products are 404.
#[instrument(skip(state, ctx))]
pub async fn show(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let id = ProductId::new(id);
    let product = match ProductService::new(state.pool(), state.imagekit())
        .get_active(id)
        .await
    {
        Ok(product) => product,
        Err(CatalogError::NotFound) => return Err(AppError::NotFound("product".to_string())),
        Err(e) => return Err(e.into()),
    };
    let reviews = ReviewService::new(state.pool()).list_for_product(id).await?;

    let can_review = ctx.user.as_ref().is_some_and(|u| {
        !reviews.reviews.iter().any(|r| r.user_id == u.id)
    });
    let images = product
        .images
        .iter()
        .map(|i| {
            state
                .imagekit()
                .image_url(&i.image_url, Some(DETAIL_IMAGE_SIZE), None)
        })
        .collect();
    let variants = product
        .variants
        .iter()
        .map(|v| VariantOption::new(&product, v))
        .collect();

    Ok(ProductShowTemplate {
        ctx,
        price: product.effective_price(None),
        list_price: product.list_price(None),
        images,
        variants,
        product,
        reviews,
        can_review,
    })
}

/// `POST /products/{id}/reviews`
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let back = format!("/products/{id}");
    let result = ReviewService::new(state.pool())
        .add(&user, ProductId::new(id), form.rating, &form.comment)
        .await;

    let redirect = match result {
        Ok(_) => redirect_flash(&back, FlashKind::Success, "review_added"),
        Err(ReviewError::ProductNotFound) => {
            return Err(AppError::NotFound("product".to_string()));
        }
        Err(ReviewError::AlreadyReviewed) => {
            redirect_flash(&back, FlashKind::Error, "already_reviewed")
        }
        Err(ReviewError::Repository(e)) => return Err(e.into()),
        Err(_) => redirect_flash(&back, FlashKind::Error, "invalid_review"),
    };
    Ok(redirect.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(category_id: Option<i32>, search: Option<&str>) -> ProductsIndexTemplate {
        ProductsIndexTemplate {
            ctx: PageContext::anonymous(),
            title: "All products".to_string(),
            products: Vec::new(),
            categories: Vec::new(),
            category_id,
            search: search.map(str::to_string),
            sort: ProductSort::Newest,
            sorts: ProductSort::ALL,
        }
    }

    #[test]
    fn sort_links_keep_the_category() {
        let page = listing(Some(3), None);
        assert_eq!(
            page.sort_href(&ProductSort::PriceLow),
            "/products?category_id=3&sort=pricelow"
        );
        assert!(page.is_current_category(CategoryId::new(3)));
        assert!(!page.is_current_category(CategoryId::new(4)));
    }

    #[test]
    fn sort_links_keep_the_search_term() {
        let page = listing(None, Some("pure aero"));
        assert_eq!(
            page.sort_href(&ProductSort::NameAz),
            "/products/search?q=pure+aero&sort=nameaz"
        );
    }
}
