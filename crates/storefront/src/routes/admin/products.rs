//! Admin product management with ImageKit uploads.
//!
//! Create and edit forms are `multipart/form-data` so the main image can be
//! uploaded with the rest of the fields. An empty file input keeps the
//! current image.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use tracing::instrument;

use tennis_shop_core::{BrandId, CategoryId, ProductId};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{Brand, Category, Product, ProductInput, ProductSort};
use crate::routes::context::{FlashKind, PageContext, redirect_flash};
use crate::services::catalog::ImageUpload;
use crate::services::{CatalogError, ProductService};
use crate::state::AppState;

const PRODUCTS_PATH: &str = "/admin/products";

/// Largest accepted request body for the product forms.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Form fields as typed, so a rejected form can be shown again unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductFields {
    pub name: String,
    pub description: String,
    pub category_id: String,
    pub brand_id: String,
    pub base_price: String,
    pub discount_percent: String,
    pub stock: String,
    pub is_active: bool,
}

impl ProductFields {
    fn new_product() -> Self {
        Self {
            discount_percent: "0".to_string(),
            stock: "0".to_string(),
            is_active: true,
            ..Self::default()
        }
    }

    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            category_id: product.category_id.map(|id| id.to_string()).unwrap_or_default(),
            brand_id: product.brand_id.map(|id| id.to_string()).unwrap_or_default(),
            base_price: product.base_price.normalize().to_string(),
            discount_percent: product.discount_percent.to_string(),
            stock: product.stock.to_string(),
            is_active: product.is_active,
        }
    }

    fn set(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = value,
            "description" => self.description = value,
            "category_id" => self.category_id = value,
            "brand_id" => self.brand_id = value,
            "base_price" => self.base_price = value,
            "discount_percent" => self.discount_percent = value,
            "stock" => self.stock = value,
            "is_active" => self.is_active = matches!(value.as_str(), "on" | "true" | "1"),
            _ => {}
        }
    }

    /// Parse numeric fields. Blank category, brand, discount and stock mean none or zero.
    fn to_input(&self) -> std::result::Result<ProductInput, &'static str> {
        fn opt_id(value: &str) -> std::result::Result<Option<i32>, &'static str> {
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            value.parse().map(Some).map_err(|_| "Invalid category or brand.")
        }
        fn int_or_zero(value: &str, message: &'static str) -> std::result::Result<i32, &'static str> {
            let value = value.trim();
            if value.is_empty() {
                return Ok(0);
            }
            value.parse().map_err(|_| message)
        }

        let base_price = self
            .base_price
            .trim()
            .parse::<Decimal>()
            .map_err(|_| "Price must be a number.")?;

        Ok(ProductInput {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            category_id: opt_id(&self.category_id)?.map(CategoryId::new),
            brand_id: opt_id(&self.brand_id)?.map(BrandId::new),
            base_price,
            discount_percent: int_or_zero(&self.discount_percent, "Discount must be a whole number.")?,
            stock: int_or_zero(&self.stock, "Stock must be a whole number.")?,
            is_active: self.is_active,
        })
    }
}

/// Read every field of the product form, plus the `image` file if one was chosen.
async fn read_form(
    mut multipart: Multipart,
) -> std::result::Result<(ProductFields, Option<ImageUpload>), AppError> {
    let mut fields = ProductFields::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Image upload interrupted: {e}")))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    file_name,
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Malformed form: {e}")))?;
            fields.set(&name, value);
        }
    }

    Ok((fields, image))
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<Product>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    /// `None` when creating.
    pub product_id: Option<ProductId>,
    pub fields: ProductFields,
    pub current_image: Option<String>,
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn action(&self) -> String {
        self.product_id.map_or_else(
            || format!("{PRODUCTS_PATH}/new"),
            |id| format!("{PRODUCTS_PATH}/{id}/edit"),
        )
    }

    fn is_selected_category(&self, id: CategoryId) -> bool {
        self.fields.category_id.trim() == id.to_string()
    }

    fn is_selected_brand(&self, id: BrandId) -> bool {
        self.fields.brand_id.trim() == id.to_string()
    }
}

async fn form_page(
    state: &AppState,
    ctx: PageContext,
    product_id: Option<ProductId>,
    fields: ProductFields,
    current_image: Option<String>,
    error: Option<String>,
) -> Result<ProductFormTemplate> {
    let catalog = ProductService::new(state.pool(), state.imagekit());
    Ok(ProductFormTemplate {
        ctx,
        product_id,
        fields,
        current_image,
        categories: catalog.categories().await?,
        brands: catalog.brands().await?,
        error,
    })
}

/// Show the form again with a message, or pass on errors that are not the user's.
async fn rejected(
    state: &AppState,
    ctx: PageContext,
    product_id: Option<ProductId>,
    fields: ProductFields,
    error: CatalogError,
) -> Result<Response> {
    let message = match error {
        CatalogError::Invalid(message) => message,
        CatalogError::ImageUpload(e) => {
            tracing::error!(error = %e, "Product image upload failed");
            "Image upload failed. The product was not saved.".to_string()
        }
        other => return Err(other.into()),
    };
    let current_image = match product_id {
        Some(id) => ProductService::new(state.pool(), state.imagekit())
            .get(id)
            .await
            .ok()
            .map(|p| p.primary_image_url().to_string())
            .filter(|url| !url.is_empty()),
        None => None,
    };
    let page = form_page(state, ctx, product_id, fields, current_image, Some(message)).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// `GET /admin/products`, hidden products included.
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ProductsIndexTemplate> {
    let products = ProductService::new(state.pool(), state.imagekit())
        .list_all(ProductSort::Newest)
        .await?;
    Ok(ProductsIndexTemplate { ctx, products })
}

/// `GET /admin/products/new`
pub async fn new_page(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ProductFormTemplate> {
    form_page(&state, ctx, None, ProductFields::new_product(), None, None).await
}

/// `POST /admin/products/new`
#[instrument(skip(state, ctx, admin, multipart), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<Response> {
    let (fields, image) = read_form(multipart).await?;
    let input = match fields.to_input() {
        Ok(input) => input,
        Err(message) => {
            let error = CatalogError::Invalid(message.to_string());
            return rejected(&state, ctx, None, fields, error).await;
        }
    };

    match ProductService::new(state.pool(), state.imagekit())
        .create(input, image)
        .await
    {
        Ok(_) => Ok(redirect_flash(PRODUCTS_PATH, FlashKind::Success, "product_saved").into_response()),
        Err(e) => rejected(&state, ctx, None, fields, e).await,
    }
}

/// `GET /admin/products/{id}/edit`
pub async fn edit_page(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<ProductFormTemplate> {
    let product = ProductService::new(state.pool(), state.imagekit())
        .get(ProductId::new(id))
        .await?;
    let current_image = Some(product.primary_image_url().to_string()).filter(|u| !u.is_empty());
    form_page(
        &state,
        ctx,
        Some(product.id),
        ProductFields::from_product(&product),
        current_image,
        None,
    )
    .await
}

/// `POST /admin/products/{id}/edit`
#[instrument(skip(state, ctx, admin, multipart), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    ctx: PageContext,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response> {
    let product_id = ProductId::new(id);
    let (fields, image) = read_form(multipart).await?;
    let input = match fields.to_input() {
        Ok(input) => input,
        Err(message) => {
            let error = CatalogError::Invalid(message.to_string());
            return rejected(&state, ctx, Some(product_id), fields, error).await;
        }
    };

    match ProductService::new(state.pool(), state.imagekit())
        .update(product_id, input, image)
        .await
    {
        Ok(()) => Ok(redirect_flash(PRODUCTS_PATH, FlashKind::Success, "product_saved").into_response()),
        Err(e) => rejected(&state, ctx, Some(product_id), fields, e).await,
    }
}

/// `POST /admin/products/{id}/delete`. Soft delete: the product is hidden.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    if !ProductService::new(state.pool(), state.imagekit())
        .delete(ProductId::new(id))
        .await?
    {
        return Err(AppError::NotFound("Product not found".to_string()));
    }
    Ok(redirect_flash(PRODUCTS_PATH, FlashKind::Success, "product_deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ProductFields {
        let mut fields = ProductFields::default();
        fields.set("name", "Babolat Pure Aero".to_string());
        fields.set("base_price", " 5200000 ".to_string());
        fields.set("discount_percent", "15".to_string());
        fields.set("stock", "4".to_string());
        fields.set("category_id", "2".to_string());
        fields.set("brand_id", String::new());
        fields.set("is_active", "on".to_string());
        fields
    }

    #[test]
    fn fields_parse_into_product_input() {
        let input = filled().to_input();
        assert!(input.is_ok());
        let Ok(input) = input else { return };
        assert_eq!(input.base_price, Decimal::from(5_200_000));
        assert_eq!(input.discount_percent, 15);
        assert_eq!(input.category_id, Some(CategoryId::new(2)));
        assert_eq!(input.brand_id, None);
        assert!(input.is_active);
    }

    #[test]
    fn unchecked_checkbox_means_inactive() {
        let mut fields = filled();
        fields.is_active = false;
        fields.set("unknown", "ignored".to_string());
        assert!(fields.to_input().is_ok_and(|i| !i.is_active));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let mut fields = filled();
        fields.set("base_price", "cheap".to_string());
        assert_eq!(fields.to_input().err(), Some("Price must be a number."));

        let mut fields = filled();
        fields.set("stock", "a few".to_string());
        assert_eq!(fields.to_input().err(), Some("Stock must be a whole number."));
    }

    #[test]
    fn blank_discount_and_stock_default_to_zero() {
        let mut fields = filled();
        fields.set("discount_percent", " ".to_string());
        fields.set("stock", String::new());
        assert!(fields.to_input().is_ok_and(|i| i.discount_percent == 0 && i.stock == 0));
    }
}
