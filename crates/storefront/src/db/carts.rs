//! Cart repository. Each user owns at most one cart.

use rust_decimal::Decimal;
use sqlx::PgPool;

use tennis_shop_core::{CartId, CartItemId, ProductId, UserId, VariantId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::cart::CartLine;

const LINE_SELECT: &str = "SELECT ci.id, ci.cart_id, ci.product_id, ci.variant_id, \
     p.name AS product_name, v.color, v.size, v.sku, ci.quantity, ci.unit_price, \
     (SELECT i.image_url FROM shop.product_image i WHERE i.product_id = p.id \
      ORDER BY i.is_primary DESC, i.is_main DESC, i.id LIMIT 1) AS image_url \
     FROM shop.cart_item ci \
     JOIN shop.product p ON p.id = ci.product_id \
     LEFT JOIN shop.product_variant v ON v.id = ci.variant_id";

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    product_name: String,
    color: Option<String>,
    size: Option<String>,
    sku: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    image_url: Option<String>,
}

impl From<LineRow> for CartLine {
    fn from(row: LineRow) -> Self {
        let variant_label = row.variant_id.map(|_| {
            [row.color.as_deref(), row.size.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" / ")
        });
        let variant_label = variant_label
            .filter(|l| !l.is_empty())
            .or_else(|| row.variant_id.and(row.sku));

        Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            variant_label,
            image_url: row.image_url,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

/// An existing line matched by product and variant.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ExistingLine {
    pub id: CartItemId,
    pub quantity: i32,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_user(&self, user_id: UserId) -> Result<Option<CartId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>("SELECT id FROM shop.cart WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(id)
    }

    /// Return the user's cart, creating an empty one if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            "INSERT INTO shop.cart (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING id",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }

    /// All lines in a cart, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!("{LINE_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id");
        let rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A single line, only if it belongs to `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let sql = format!("{LINE_SELECT} WHERE ci.cart_id = $1 AND ci.id = $2");
        let row = sqlx::query_as::<_, LineRow>(&sql)
            .bind(cart_id)
            .bind(item_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Find the line for `(product, variant)`; a `None` variant only matches lines without one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<ExistingLine>, RepositoryError> {
        let line = sqlx::query_as::<_, ExistingLine>(
            "SELECT id, quantity FROM shop.cart_item
             WHERE cart_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(line)
    }

    /// Insert a new line with a unit price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent request already added the line.
    pub async fn insert_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<CartItemId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartItemId>(
            "INSERT INTO shop.cart_item (cart_id, product_id, variant_id, quantity, unit_price)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .bind(unit_price)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "cart line"))?;
        Ok(id)
    }

    /// Add to an existing line's quantity unless the result would exceed
    /// `max_quantity`. The unit price snapshot is left alone.
    ///
    /// Returns the new quantity, or `None` if the line is missing or the
    /// increment was refused.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_line(
        &self,
        item_id: CartItemId,
        by: i32,
        max_quantity: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i32>(
            "UPDATE shop.cart_item SET quantity = quantity + $2
             WHERE id = $1 AND quantity + $2 <= $3
             RETURNING quantity",
        )
        .bind(item_id)
        .bind(by)
        .bind(max_quantity)
        .fetch_optional(self.pool)
        .await?;
        Ok(quantity)
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.cart_item SET quantity = $3 WHERE cart_id = $1 AND id = $2")
                .bind(cart_id)
                .bind(item_id)
                .bind(quantity)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_line(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE cart_id = $1 AND id = $2")
            .bind(cart_id)
            .bind(item_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every line from a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Total quantity across the user's cart (0 without a cart).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn item_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(ci.quantity), 0)::BIGINT
             FROM shop.cart_item ci JOIN shop.cart c ON c.id = ci.cart_id
             WHERE c.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Sum of quantity times unit price across the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total(&self, user_id: UserId) -> Result<Decimal, RepositoryError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(ci.quantity * ci.unit_price), 0)
             FROM shop.cart_item ci JOIN shop.cart c ON c.id = ci.cart_id
             WHERE c.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }
}
