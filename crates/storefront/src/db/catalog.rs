//! Catalog repository: products with their variants and images, categories and brands.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use tennis_shop_core::{BrandId, CategoryId, ImageId, ProductId, VariantId};

use super::RepositoryError;
use crate::models::catalog::{
    Brand, Category, Product, ProductImage, ProductInput, ProductSort, ProductVariant,
};

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.category_id, \
     c.name AS category_name, p.brand_id, b.name AS brand_name, p.base_price, \
     p.discount_percent, p.stock, p.is_active, p.created_at \
     FROM shop.product p \
     LEFT JOIN shop.product_category c ON c.id = p.category_id \
     LEFT JOIN shop.brand b ON b.id = p.brand_id";

/// Which products a listing query returns.
#[derive(Debug, Clone)]
pub enum ProductFilter {
    /// Every active product.
    Active,
    /// Active products in a category or one of its direct children.
    Category(CategoryId),
    /// Active products whose name or description contains the term.
    Search(String),
    /// Every product including soft-deleted ones (admin).
    All,
}

impl ProductFilter {
    const fn where_clause(&self) -> &'static str {
        match self {
            Self::Active => "WHERE p.is_active",
            Self::Category(_) => "WHERE p.is_active AND (p.category_id = $1 OR c.parent_id = $1)",
            Self::Search(_) => {
                "WHERE p.is_active AND (p.name ILIKE $1 OR COALESCE(p.description, '') ILIKE $1)"
            }
            Self::All => "",
        }
    }
}

/// Escape `LIKE` wildcards and wrap the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    brand_id: Option<BrandId>,
    brand_name: Option<String>,
    base_price: Decimal,
    discount_percent: i32,
    stock: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            category_name: row.category_name,
            brand_id: row.brand_id,
            brand_name: row.brand_name,
            base_price: row.base_price,
            discount_percent: row.discount_percent,
            stock: row.stock,
            is_active: row.is_active,
            created_at: row.created_at,
            variants: Vec::new(),
            images: Vec::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: VariantId,
    product_id: ProductId,
    color: Option<String>,
    size: Option<String>,
    sku: Option<String>,
    stock: i32,
    price: Option<Decimal>,
}

impl From<VariantRow> for ProductVariant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            color: row.color,
            size: row.size,
            sku: row.sku,
            stock: row.stock,
            price: row.price,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: ImageId,
    product_id: ProductId,
    image_url: String,
    image_id: Option<String>,
    is_main: bool,
    is_primary: bool,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image_url: row.image_url,
            image_id: row.image_id,
            is_main: row.is_main,
            is_primary: row.is_primary,
        }
    }
}

/// An uploaded file to store as a product's main and primary image.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub url: String,
    /// ImageKit `fileId`, needed to delete the file later.
    pub file_id: String,
}

async fn insert_main_image(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: ProductId,
    image: &NewImage,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO shop.product_image (product_id, image_url, image_id, is_main, is_primary)
         VALUES ($1, $2, $3, TRUE, TRUE)",
    )
    .bind(product_id)
    .bind(&image.url)
    .bind(&image.file_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products with variants and images attached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        limit: Option<i64>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let limit_param = match filter {
            ProductFilter::Category(_) | ProductFilter::Search(_) => "$2",
            ProductFilter::Active | ProductFilter::All => "$1",
        };
        let sql = format!(
            "{PRODUCT_SELECT} {} ORDER BY {} LIMIT {limit_param}",
            filter.where_clause(),
            sort.order_by()
        );

        let query = sqlx::query_as::<_, ProductRow>(&sql);
        let query = match filter {
            ProductFilter::Category(id) => query.bind(*id),
            ProductFilter::Search(term) => query.bind(like_pattern(term)),
            ProductFilter::Active | ProductFilter::All => query,
        };
        let rows = query.bind(limit).fetch_all(self.pool).await?;

        let mut products: Vec<Product> = rows.into_iter().map(Into::into).collect();
        self.attach_children(&mut products).await?;
        Ok(products)
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut products = vec![Product::from(row)];
        self.attach_children(&mut products).await?;
        Ok(products.pop())
    }

    /// Load variants and images for a batch of products in two queries.
    async fn attach_children(&self, products: &mut [Product]) -> Result<(), RepositoryError> {
        if products.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = products.iter().map(|p| p.id.as_i32()).collect();

        let variants = sqlx::query_as::<_, VariantRow>(
            "SELECT id, product_id, color, size, sku, stock, price
             FROM shop.product_variant
             WHERE product_id = ANY($1)
             ORDER BY product_id, id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, ImageRow>(
            "SELECT id, product_id, image_url, image_id, is_main, is_primary
             FROM shop.product_image
             WHERE product_id = ANY($1)
             ORDER BY product_id, is_primary DESC, is_main DESC, id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut variants_by_product: HashMap<ProductId, Vec<ProductVariant>> = HashMap::new();
        for row in variants {
            variants_by_product
                .entry(row.product_id)
                .or_default()
                .push(row.into());
        }
        let mut images_by_product: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
        for row in images {
            images_by_product
                .entry(row.product_id)
                .or_default()
                .push(row.into());
        }

        for product in products.iter_mut() {
            product.variants = variants_by_product.remove(&product.id).unwrap_or_default();
            product.images = images_by_product.remove(&product.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Get a single variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_variant(
        &self,
        id: VariantId,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            "SELECT id, product_id, color, size, sku, stock, price
             FROM shop.product_variant WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Count active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop.product WHERE is_active")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Insert a product, with its main image when one was uploaded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn create(
        &self,
        input: &ProductInput,
        image: Option<&NewImage>,
    ) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO shop.product
                 (name, description, category_id, brand_id, base_price, discount_percent, stock, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.brand_id)
        .bind(input.base_price)
        .bind(input.discount_percent)
        .bind(input.stock)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(image) = image {
            insert_main_image(&mut tx, id, image).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Update a product's fields and, when `image` is given, swap its main image.
    ///
    /// Returns `None` if the product does not exist, otherwise the images that
    /// were replaced (empty without a new image).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
        image: Option<&NewImage>,
    ) -> Result<Option<Vec<ProductImage>>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE shop.product SET
                 name = $2, description = $3, category_id = $4, brand_id = $5,
                 base_price = $6, discount_percent = $7, stock = $8, is_active = $9
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.brand_id)
        .bind(input.base_price)
        .bind(input.discount_percent)
        .bind(input.stock)
        .bind(input.is_active)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let mut removed = Vec::new();
        if let Some(image) = image {
            removed = sqlx::query_as::<_, ImageRow>(
                "DELETE FROM shop.product_image
                 WHERE product_id = $1 AND (is_main OR is_primary)
                 RETURNING id, product_id, image_url, image_id, is_main, is_primary",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
            insert_main_image(&mut tx, id, image).await?;
        }

        tx.commit().await?;
        Ok(Some(removed.into_iter().map(Into::into).collect()))
    }

    /// Soft delete: hide the product from the shop but keep order history intact.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn deactivate(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE shop.product SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All categories, parents first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CategoryId, String, Option<CategoryId>)>(
            "SELECT id, name, parent_id FROM shop.product_category
             ORDER BY parent_id NULLS FIRST, name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, parent_id)| Category {
                id,
                name,
                parent_id,
            })
            .collect())
    }

    /// All brands by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let rows = sqlx::query_as::<_, (BrandId, String)>(
            "SELECT id, name FROM shop.brand ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id, name)| Brand { id, name }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("pro staff"), "%pro staff%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn filters_bind_their_own_parameter_before_limit() {
        assert!(ProductFilter::All.where_clause().is_empty());
        assert!(ProductFilter::Category(CategoryId::new(1))
            .where_clause()
            .contains("$1"));
        assert!(!ProductFilter::Active.where_clause().contains('$'));
    }
}
