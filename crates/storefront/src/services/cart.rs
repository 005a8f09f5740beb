//! Shopping cart service.
//!
//! Each signed-in user has one cart. A line is keyed by (product, variant);
//! adding the same pair again increases the quantity and keeps the unit price
//! captured when the line was first added.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use tennis_shop_core::{CartId, CartItemId, ProductId, UserId, VariantId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{CartLine, CartSummary, Product, ProductVariant};

/// Errors from cart operations. Display strings are shown to shoppers.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Please select a product variant")]
    VariantRequired,

    #[error("Selected variant not found")]
    VariantNotFound,

    #[error("Insufficient stock for selected variant. Only {0} available")]
    InsufficientVariantStock(i32),

    #[error("Insufficient stock available. Only {0} available")]
    InsufficientStock(i32),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartError {
    /// Whether the message is meant for the shopper (as opposed to a 500).
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}

/// Result of adding to the cart.
#[derive(Debug, Clone)]
pub struct AddedLine {
    pub line: CartLine,
    pub cart_count: i64,
}

/// Cart operations for signed-in users.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The user's cart id, creating an empty cart if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidInput` for a non-positive user id.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<CartId, CartError> {
        if !user_id.is_valid() {
            return Err(CartError::InvalidInput("Invalid user ID"));
        }
        Ok(self.carts.get_or_create(user_id).await?)
    }

    /// Lines and totals for the cart page.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn summary(&self, user_id: UserId) -> Result<CartSummary, CartError> {
        if !user_id.is_valid() {
            return Ok(CartSummary::from_lines(Vec::new()));
        }
        let lines = match self.carts.find_for_user(user_id).await? {
            Some(cart_id) => self.carts.lines(cart_id).await?,
            None => Vec::new(),
        };
        Ok(CartSummary::from_lines(lines))
    }

    /// Add `quantity` of a product (and variant, if the product has any).
    ///
    /// # Errors
    ///
    /// Returns a user-facing `CartError` when the product, variant or stock
    /// checks fail.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
        variant_id: Option<VariantId>,
    ) -> Result<AddedLine, CartError> {
        if !user_id.is_valid() {
            return Err(CartError::InvalidInput("Invalid user ID"));
        }
        if !product_id.is_valid() {
            return Err(CartError::InvalidInput("Invalid product ID"));
        }
        if quantity <= 0 {
            return Err(CartError::InvalidInput("Quantity must be greater than 0"));
        }

        let product = self
            .products
            .get(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound)?;
        let variant = resolve_variant(&product, variant_id)?;

        let cart_id = self.carts.get_or_create(user_id).await?;
        let variant_key = variant.map(|v| v.id);
        let existing = self.carts.find_line(cart_id, product_id, variant_key).await?;

        let in_cart = existing.map_or(0, |l| l.quantity);
        check_stock(&product, variant, in_cart.saturating_add(quantity))?;

        let item_id = match existing {
            Some(_) => self.merge_into_line(cart_id, &product, variant, quantity).await?,
            None => {
                let unit_price = product.effective_price(variant);
                match self
                    .carts
                    .insert_line(cart_id, product_id, variant_key, quantity, unit_price)
                    .await
                {
                    Ok(id) => id,
                    // A concurrent add created the line first
                    Err(RepositoryError::Conflict(_)) => {
                        self.merge_into_line(cart_id, &product, variant, quantity).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let line = self
            .carts
            .line(cart_id, item_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let cart_count = self.carts.item_count(user_id).await?;

        tracing::info!(
            user_id = %user_id,
            product_id = %product_id,
            quantity,
            "Added to cart"
        );
        Ok(AddedLine { line, cart_count })
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// Returns the updated line, or `None` if the line was removed or is not
    /// in this user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock`/`InsufficientVariantStock` if
    /// the new quantity exceeds stock.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<Option<CartLine>, CartError> {
        let Some(cart_id) = self.user_cart(user_id).await? else {
            return Ok(None);
        };
        let Some(line) = self.carts.line(cart_id, item_id).await? else {
            return Ok(None);
        };

        if quantity <= 0 {
            self.carts.delete_line(cart_id, item_id).await?;
            return Ok(None);
        }

        if let Some(product) = self.products.get(line.product_id).await? {
            let variant = line.variant_id.and_then(|id| product.variant(id));
            check_stock(&product, variant, quantity)?;
        }

        self.carts.set_quantity(cart_id, item_id, quantity).await?;
        Ok(self.carts.line(cart_id, item_id).await?)
    }

    /// Remove a line. Returns false if it is not in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<bool, CartError> {
        let Some(cart_id) = self.user_cart(user_id).await? else {
            return Ok(false);
        };
        Ok(self.carts.delete_line(cart_id, item_id).await?)
    }

    /// Empty the user's cart. Returns false if they have no cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<bool, CartError> {
        let Some(cart_id) = self.user_cart(user_id).await? else {
            return Ok(false);
        };
        self.carts.clear(cart_id).await?;
        Ok(true)
    }

    /// Sum of quantities, 0 without a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn item_count(&self, user_id: UserId) -> Result<i64, CartError> {
        if !user_id.is_valid() {
            return Ok(0);
        }
        Ok(self.carts.item_count(user_id).await?)
    }

    /// Sum of quantity times unit price, 0 without a cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn total(&self, user_id: UserId) -> Result<Decimal, CartError> {
        if !user_id.is_valid() {
            return Ok(Decimal::ZERO);
        }
        Ok(self.carts.total(user_id).await?)
    }

    /// Add `quantity` to the existing line for this product and variant. The
    /// merged quantity is checked against stock in the same statement.
    async fn merge_into_line(
        &self,
        cart_id: CartId,
        product: &Product,
        variant: Option<&ProductVariant>,
        quantity: i32,
    ) -> Result<CartItemId, CartError> {
        let line = self
            .carts
            .find_line(cart_id, product.id, variant.map(|v| v.id))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let available = product.available_stock(variant);
        if self
            .carts
            .increment_line(line.id, quantity, available)
            .await?
            .is_none()
        {
            check_stock(product, variant, line.quantity.saturating_add(quantity))?;
            // Stock looked fine but the line changed underneath us
            return Err(RepositoryError::NotFound.into());
        }
        Ok(line.id)
    }

    async fn user_cart(&self, user_id: UserId) -> Result<Option<CartId>, CartError> {
        if !user_id.is_valid() {
            return Ok(None);
        }
        Ok(self.carts.find_for_user(user_id).await?)
    }
}

/// The variant to add: required when the product has variants, ignored when
/// it has none.
fn resolve_variant(
    product: &Product,
    variant_id: Option<VariantId>,
) -> Result<Option<&ProductVariant>, CartError> {
    if !product.has_variants() {
        return Ok(None);
    }
    let id = variant_id.ok_or(CartError::VariantRequired)?;
    product
        .variant(id)
        .map(Some)
        .ok_or(CartError::VariantNotFound)
}

/// Fail if `wanted` units exceed what is in stock.
fn check_stock(
    product: &Product,
    variant: Option<&ProductVariant>,
    wanted: i32,
) -> Result<(), CartError> {
    let available = product.available_stock(variant);
    if wanted <= available {
        return Ok(());
    }
    Err(if variant.is_some() {
        CartError::InsufficientVariantStock(available)
    } else {
        CartError::InsufficientStock(available)
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(variants: Vec<ProductVariant>) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Head Speed MP".to_string(),
            description: None,
            category_id: None,
            category_name: None,
            brand_id: None,
            brand_name: None,
            base_price: Decimal::from(3_500_000),
            discount_percent: 0,
            stock: 4,
            is_active: true,
            created_at: Utc::now(),
            variants,
            images: Vec::new(),
        }
    }

    fn variant(id: i32, stock: i32) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(1),
            color: Some("Black".to_string()),
            size: Some("G3".to_string()),
            sku: None,
            stock,
            price: None,
        }
    }

    #[test]
    fn test_variant_required_when_product_has_variants() {
        let p = product(vec![variant(10, 2)]);
        assert!(matches!(resolve_variant(&p, None), Err(CartError::VariantRequired)));
        assert!(matches!(
            resolve_variant(&p, Some(VariantId::new(99))),
            Err(CartError::VariantNotFound)
        ));
        assert_eq!(
            resolve_variant(&p, Some(VariantId::new(10)))
                .ok()
                .flatten()
                .map(|v| v.id),
            Some(VariantId::new(10))
        );
    }

    #[test]
    fn test_variant_ignored_without_variants() {
        let p = product(Vec::new());
        assert!(matches!(resolve_variant(&p, Some(VariantId::new(3))), Ok(None)));
    }

    #[test]
    fn test_check_stock_messages() {
        let p = product(vec![variant(10, 2)]);
        let err = check_stock(&p, p.variants.first(), 3).err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("Insufficient stock for selected variant. Only 2 available")
        );

        let plain = product(Vec::new());
        assert!(check_stock(&plain, None, 4).is_ok());
        assert_eq!(
            check_stock(&plain, None, 5).err().map(|e| e.to_string()).as_deref(),
            Some("Insufficient stock available. Only 4 available")
        );
    }

    #[test]
    fn test_repository_errors_are_not_user_facing() {
        assert!(CartError::ProductNotFound.is_user_facing());
        assert!(!CartError::Repository(RepositoryError::NotFound).is_user_facing());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    #[allow(clippy::unwrap_used)]
    async fn test_adding_again_keeps_the_first_unit_price() {
        let pool = crate::test_support::pool().await;
        let user = crate::test_support::customer(&pool).await;
        let product_id = crate::test_support::product(&pool, 1_000_000, 10).await;
        let service = CartService::new(&pool);

        service.add_item(user, product_id, 1, None).await.unwrap();

        let mut repriced = crate::test_support::product_input(1_500_000, 10);
        repriced.name = "Repriced Racket".to_string();
        ProductRepository::new(&pool)
            .update(product_id, &repriced, None)
            .await
            .unwrap()
            .unwrap();

        let added = service.add_item(user, product_id, 2, None).await.unwrap();
        assert_eq!(added.line.quantity, 3);
        assert_eq!(added.line.unit_price, Decimal::from(1_000_000));
        assert_eq!(added.cart_count, 3);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    #[allow(clippy::unwrap_used)]
    async fn test_stock_check_counts_what_is_already_in_the_cart() {
        let pool = crate::test_support::pool().await;
        let user = crate::test_support::customer(&pool).await;
        let product_id = crate::test_support::product(&pool, 900_000, 3).await;
        let service = CartService::new(&pool);

        service.add_item(user, product_id, 2, None).await.unwrap();
        let err = service.add_item(user, product_id, 2, None).await.err();
        assert!(matches!(err, Some(CartError::InsufficientStock(3))));

        let summary = service.summary(user).await.unwrap();
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.lines[0].quantity, 2);
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    #[allow(clippy::unwrap_used)]
    async fn test_merging_into_a_line_refuses_to_pass_stock() {
        let pool = crate::test_support::pool().await;
        let user = crate::test_support::customer(&pool).await;
        let product_id = crate::test_support::product(&pool, 900_000, 3).await;
        let service = CartService::new(&pool);

        service.add_item(user, product_id, 2, None).await.unwrap();
        let cart_id = service.get_or_create(user).await.unwrap();
        let product = ProductRepository::new(&pool)
            .get(product_id)
            .await
            .unwrap()
            .unwrap();

        // The path taken when a concurrent add inserted the line first
        let err = service.merge_into_line(cart_id, &product, None, 2).await.err();
        assert!(matches!(err, Some(CartError::InsufficientStock(3))));

        let id = service.merge_into_line(cart_id, &product, None, 1).await.unwrap();
        let line = CartRepository::new(&pool).line(cart_id, id).await.unwrap().unwrap();
        assert_eq!(line.quantity, 3);
    }
}
