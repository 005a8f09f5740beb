//! Product catalog service.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::{CategoryId, ProductId};

use crate::db::{NewImage, ProductFilter, ProductRepository, RepositoryError};
use crate::imagekit::{self, ImageKitClient, ImageKitError};
use crate::models::{Brand, Category, Product, ProductImage, ProductInput, ProductSort};

/// ImageKit folder for product photos.
pub const PRODUCT_IMAGE_FOLDER: &str = "products";

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Form input failed validation.
    #[error("{0}")]
    Invalid(String),

    #[error("product not found")]
    NotFound,

    #[error("image upload failed: {0}")]
    ImageUpload(#[from] ImageKitError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// An uploaded image file from the admin form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

/// Catalog queries and admin product management.
pub struct ProductService<'a> {
    products: ProductRepository<'a>,
    imagekit: &'a ImageKitClient,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, imagekit: &'a ImageKitClient) -> Self {
        Self {
            products: ProductRepository::new(pool),
            imagekit,
        }
    }

    /// Every active product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_active(&self, sort: ProductSort) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list(&ProductFilter::Active, sort, None).await?)
    }

    /// The newest `n` active products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn newest(&self, n: i64) -> Result<Vec<Product>, CatalogError> {
        Ok(self
            .products
            .list(&ProductFilter::Active, ProductSort::Newest, Some(n))
            .await?)
    }

    /// Every product, including hidden ones (admin).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_all(&self, sort: ProductSort) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list(&ProductFilter::All, sort, None).await?)
    }

    /// Active products in a category or its direct subcategories. Ids ≤ 0
    /// match nothing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn by_category(
        &self,
        category_id: CategoryId,
        sort: ProductSort,
    ) -> Result<Vec<Product>, CatalogError> {
        if category_id.as_i32() <= 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .products
            .list(&ProductFilter::Category(category_id), sort, None)
            .await?)
    }

    /// Case-insensitive substring search over name and description. A blank
    /// term lists every active product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn search(&self, term: &str, sort: ProductSort) -> Result<Vec<Product>, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return self.list_active(sort).await;
        }
        Ok(self
            .products
            .list(&ProductFilter::Search(term.to_string()), sort, None)
            .await?)
    }

    /// A product, active or not.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products.get(id).await?.ok_or(CatalogError::NotFound)
    }

    /// A product for the public detail page: hidden products are not found.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for missing or inactive products.
    pub async fn get_active(&self, id: ProductId) -> Result<Product, CatalogError> {
        let product = self.get(id).await?;
        if !product.is_active {
            return Err(CatalogError::NotFound);
        }
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.products.categories().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, CatalogError> {
        Ok(self.products.brands().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn count_active(&self) -> Result<i64, CatalogError> {
        Ok(self.products.count_active().await?)
    }

    /// Create a product, uploading its image first if one was given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input and
    /// `CatalogError::ImageUpload` if ImageKit rejects the file.
    pub async fn create(
        &self,
        input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<ProductId, CatalogError> {
        let input = validate(input)?;

        let uploaded = match image {
            Some(image) => Some(self.upload(&input.name, image).await?),
            None => None,
        };

        let id = match self.products.create(&input, uploaded.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                self.delete_files(uploaded.map(|u| u.file_id)).await;
                return Err(e.into());
            }
        };

        tracing::info!(product_id = %id, "Product created");
        Ok(id)
    }

    /// Update a product. A new image is uploaded before anything is written,
    /// then the fields and the main image change together. Replaced files are
    /// deleted from ImageKit on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input, `CatalogError::NotFound`
    /// if the product is missing and `CatalogError::ImageUpload` if the upload
    /// fails. A failed upload leaves the product unchanged.
    pub async fn update(
        &self,
        id: ProductId,
        input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<(), CatalogError> {
        let input = validate(input)?;

        let uploaded = match image {
            Some(image) => Some(self.upload(&input.name, image).await?),
            None => None,
        };

        let removed = match self.products.update(id, &input, uploaded.as_ref()).await {
            Ok(Some(removed)) => removed,
            Ok(None) => {
                self.delete_files(uploaded.map(|u| u.file_id)).await;
                return Err(CatalogError::NotFound);
            }
            Err(e) => {
                self.delete_files(uploaded.map(|u| u.file_id)).await;
                return Err(e.into());
            }
        };

        self.delete_files(stale_file_ids(removed)).await;

        tracing::info!(product_id = %id, "Product updated");
        Ok(())
    }

    /// Hide a product. Returns false if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the update fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, CatalogError> {
        let deleted = self.products.deactivate(id).await?;
        if deleted {
            tracing::info!(product_id = %id, "Product deactivated");
        }
        Ok(deleted)
    }

    async fn upload(&self, product_name: &str, image: ImageUpload) -> Result<NewImage, CatalogError> {
        let file_name = imagekit::file_name_for(product_name, image.file_name.as_deref(), Utc::now());
        let uploaded = self
            .imagekit
            .upload(image.bytes, &file_name, PRODUCT_IMAGE_FOLDER)
            .await?;
        Ok(NewImage {
            url: uploaded.url,
            file_id: uploaded.file_id,
        })
    }

    async fn delete_files(&self, file_ids: impl IntoIterator<Item = String>) {
        for file_id in file_ids {
            match self.imagekit.delete(&file_id).await {
                Ok(true) => tracing::debug!(file_id = %file_id, "Product image deleted"),
                Ok(false) => tracing::warn!(file_id = %file_id, "ImageKit refused image delete"),
                Err(e) => tracing::warn!(file_id = %file_id, error = %e, "Failed to delete product image"),
            }
        }
    }
}

/// ImageKit file ids of replaced images, skipping images that were never
/// uploaded through ImageKit.
fn stale_file_ids(removed: Vec<ProductImage>) -> Vec<String> {
    let mut ids: Vec<String> = removed
        .into_iter()
        .filter_map(|image| image.image_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Trim and check admin product input.
///
/// # Errors
///
/// Returns `CatalogError::Invalid` naming the first failing field.
pub fn validate(mut input: ProductInput) -> Result<ProductInput, CatalogError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(CatalogError::Invalid("Product name is required.".to_string()));
    }
    if input.name.chars().count() > 200 {
        return Err(CatalogError::Invalid(
            "Product name must be at most 200 characters.".to_string(),
        ));
    }
    if input.base_price <= Decimal::ZERO {
        return Err(CatalogError::Invalid("Price must be greater than 0.".to_string()));
    }
    if input.stock < 0 {
        return Err(CatalogError::Invalid("Stock cannot be negative.".to_string()));
    }
    if !(0..=100).contains(&input.discount_percent) {
        return Err(CatalogError::Invalid(
            "Discount must be between 0 and 100 percent.".to_string(),
        ));
    }
    input.description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    Ok(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "  Yonex EZONE 98  ".to_string(),
            description: Some("   ".to_string()),
            base_price: Decimal::from(4_500_000),
            stock: 3,
            is_active: true,
            ..ProductInput::default()
        }
    }

    #[test]
    fn test_validate_trims_fields() {
        let valid = validate(input()).unwrap();
        assert_eq!(valid.name, "Yonex EZONE 98");
        assert_eq!(valid.description, None);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut blank = input();
        blank.name = "   ".to_string();
        assert!(matches!(validate(blank), Err(CatalogError::Invalid(_))));

        let mut free = input();
        free.base_price = Decimal::ZERO;
        assert!(matches!(validate(free), Err(CatalogError::Invalid(_))));

        let mut negative = input();
        negative.stock = -1;
        assert!(matches!(validate(negative), Err(CatalogError::Invalid(_))));

        let mut discount = input();
        discount.discount_percent = 101;
        assert!(matches!(validate(discount), Err(CatalogError::Invalid(_))));
    }

    fn image(id: i32, file_id: Option<&str>) -> ProductImage {
        ProductImage {
            id: tennis_shop_core::ImageId::new(id),
            product_id: ProductId::new(1),
            image_url: format!("https://ik.imagekit.io/tennisshop/products/{id}.jpg"),
            image_id: file_id.map(str::to_string),
            is_main: true,
            is_primary: true,
        }
    }

    #[test]
    fn test_stale_file_ids_keep_imagekit_file_ids_once() {
        let removed = vec![
            image(1, Some("6650f1d0a1b2c3")),
            image(2, None),
            image(3, Some("  ")),
            image(4, Some("6650f1d0a1b2c3")),
            image(5, Some("6650f1d0ffee00")),
        ];
        assert_eq!(stale_file_ids(removed), ["6650f1d0a1b2c3", "6650f1d0ffee00"]);
    }
}
