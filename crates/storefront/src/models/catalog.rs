//! Catalog models: products, variants, images, categories and brands.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tennis_shop_core::money;
use tennis_shop_core::{BrandId, CategoryId, ImageId, ProductId, VariantId};

#[derive(Debug, Clone, Serialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

/// A purchasable color/size combination of a product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub color: Option<String>,
    pub size: Option<String>,
    pub sku: Option<String>,
    pub stock: i32,
    /// Overrides the product's base price when set.
    pub price: Option<Decimal>,
}

impl ProductVariant {
    /// Label such as `Black / 4 3/8`.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.color.as_deref(), self.size.as_deref()) {
            (Some(color), Some(size)) => format!("{color} / {size}"),
            (Some(one), None) | (None, Some(one)) => one.to_string(),
            (None, None) => self
                .sku
                .clone()
                .unwrap_or_else(|| format!("Variant #{}", self.id)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub image_url: String,
    /// ImageKit file path, used to delete the file when it is replaced.
    pub image_id: Option<String>,
    pub is_main: bool,
    pub is_primary: bool,
}

/// A product with its category/brand names, variants and images.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub brand_id: Option<BrandId>,
    pub brand_name: Option<String>,
    pub base_price: Decimal,
    pub discount_percent: i32,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub variants: Vec<ProductVariant>,
    pub images: Vec<ProductImage>,
}

impl Product {
    #[must_use]
    pub const fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// The image shown on listings: primary, then main, then the first one.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|i| i.is_primary)
            .or_else(|| self.images.iter().find(|i| i.is_main))
            .or_else(|| self.images.first())
    }

    #[must_use]
    pub fn primary_image_url(&self) -> &str {
        self.primary_image().map_or("", |i| i.image_url.as_str())
    }

    /// Price before the product discount: the variant price if it has one,
    /// else the base price.
    #[must_use]
    pub fn list_price(&self, variant: Option<&ProductVariant>) -> Decimal {
        variant.and_then(|v| v.price).unwrap_or(self.base_price)
    }

    /// Price charged for one unit, after the product discount.
    #[must_use]
    pub fn effective_price(&self, variant: Option<&ProductVariant>) -> Decimal {
        money::apply_discount(self.list_price(variant), self.discount_percent)
    }

    #[must_use]
    pub const fn is_discounted(&self) -> bool {
        self.discount_percent > 0
    }

    /// Units available for the chosen variant, or the product stock when it
    /// has no variants.
    #[must_use]
    pub fn available_stock(&self, variant: Option<&ProductVariant>) -> i32 {
        variant.map_or(self.stock, |v| v.stock)
    }

    /// Total units across variants (or the product stock without variants).
    #[must_use]
    pub fn total_stock(&self) -> i32 {
        if self.has_variants() {
            self.variants.iter().map(|v| v.stock).sum()
        } else {
            self.stock
        }
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    NameAz,
    NameZa,
}

impl ProductSort {
    pub const ALL: [Self; 6] = [
        Self::Newest,
        Self::Oldest,
        Self::PriceLow,
        Self::PriceHigh,
        Self::NameAz,
        Self::NameZa,
    ];

    /// Parse a `sort` query value. Unknown or missing values sort newest first.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("oldest") => Self::Oldest,
            Some("pricelow") => Self::PriceLow,
            Some("pricehigh") => Self::PriceHigh,
            Some("nameaz") => Self::NameAz,
            Some("nameza") => Self::NameZa,
            _ => Self::Newest,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceLow => "pricelow",
            Self::PriceHigh => "pricehigh",
            Self::NameAz => "nameaz",
            Self::NameZa => "nameza",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Oldest => "Oldest",
            Self::PriceLow => "Price: low to high",
            Self::PriceHigh => "Price: high to low",
            Self::NameAz => "Name: A-Z",
            Self::NameZa => "Name: Z-A",
        }
    }

    /// `ORDER BY` clause for product queries. Only ever one of these constants.
    #[must_use]
    pub const fn order_by(&self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::Oldest => "p.created_at ASC, p.id ASC",
            Self::PriceLow => "p.base_price ASC, p.id ASC",
            Self::PriceHigh => "p.base_price DESC, p.id DESC",
            Self::NameAz => "lower(p.name) ASC, p.id ASC",
            Self::NameZa => "lower(p.name) DESC, p.id DESC",
        }
    }

    /// Sort an already-loaded list the same way the query would.
    pub fn sort(self, products: &mut [Product]) {
        match self {
            Self::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Oldest => products.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Self::PriceLow => products.sort_by(|a, b| a.base_price.cmp(&b.base_price)),
            Self::PriceHigh => products.sort_by(|a, b| b.base_price.cmp(&a.base_price)),
            Self::NameAz => products.sort_by_key(|p| p.name.to_lowercase()),
            Self::NameZa => {
                products.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()));
            }
        }
    }
}

/// Admin create/edit payload after form parsing.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub base_price: Decimal,
    pub discount_percent: i32,
    pub stock: i32,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: i64, days_ago: i64) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            description: None,
            category_id: None,
            category_name: None,
            brand_id: None,
            brand_name: None,
            base_price: Decimal::from(price),
            discount_percent: 0,
            stock: 5,
            is_active: true,
            created_at: Utc::now() - chrono::Duration::days(days_ago),
            variants: Vec::new(),
            images: Vec::new(),
        }
    }

    fn variant(id: i32, price: Option<i64>, stock: i32) -> ProductVariant {
        ProductVariant {
            id: VariantId::new(id),
            product_id: ProductId::new(1),
            color: Some("Black".to_string()),
            size: Some("G2".to_string()),
            sku: None,
            stock,
            price: price.map(Decimal::from),
        }
    }

    #[test]
    fn sort_parse_is_case_insensitive_with_newest_default() {
        assert_eq!(ProductSort::parse(Some("PriceHigh")), ProductSort::PriceHigh);
        assert_eq!(ProductSort::parse(Some("nameza")), ProductSort::NameZa);
        assert_eq!(ProductSort::parse(Some("random")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(None), ProductSort::Newest);
    }

    #[test]
    fn sort_keys_parse_back() {
        for sort in ProductSort::ALL {
            assert_eq!(ProductSort::parse(Some(sort.key())), sort);
        }
    }

    #[test]
    fn sort_orders_in_memory_lists() {
        let mut products = vec![
            product("babolat", 300, 3),
            product("Wilson", 100, 1),
            product("Head", 200, 2),
        ];

        ProductSort::PriceLow.sort(&mut products);
        assert_eq!(products.first().map(|p| p.base_price), Some(Decimal::from(100)));

        ProductSort::NameAz.sort(&mut products);
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["babolat", "Head", "Wilson"]);

        ProductSort::Newest.sort(&mut products);
        assert_eq!(products.first().map(|p| p.name.as_str()), Some("Wilson"));
    }

    #[test]
    fn variant_price_overrides_base_price() {
        let mut p = product("Pure Aero", 4_000_000, 0);
        p.variants = vec![variant(1, Some(4_200_000), 2), variant(2, None, 0)];

        assert_eq!(p.effective_price(p.variants.first()), Decimal::from(4_200_000));
        assert_eq!(p.effective_price(p.variants.get(1)), Decimal::from(4_000_000));
        assert_eq!(p.effective_price(None), Decimal::from(4_000_000));
        assert_eq!(p.total_stock(), 2);
    }

    #[test]
    fn product_discount_applies_to_effective_price() {
        let mut p = product("Clash 100", 1_000_000, 0);
        p.discount_percent = 15;
        assert_eq!(p.list_price(None), Decimal::from(1_000_000));
        assert_eq!(p.effective_price(None), Decimal::from(850_000));
    }

    #[test]
    fn variant_label_falls_back_to_sku() {
        let mut v = variant(3, None, 1);
        assert_eq!(v.label(), "Black / G2");
        v.color = None;
        v.size = None;
        v.sku = Some("WR-001".to_string());
        assert_eq!(v.label(), "WR-001");
    }

    #[test]
    fn primary_image_prefers_primary_flag() {
        let mut p = product("Speed MP", 100, 0);
        p.images = vec![
            ProductImage {
                id: ImageId::new(1),
                product_id: p.id,
                image_url: "a.jpg".to_string(),
                image_id: None,
                is_main: true,
                is_primary: false,
            },
            ProductImage {
                id: ImageId::new(2),
                product_id: p.id,
                image_url: "b.jpg".to_string(),
                image_id: None,
                is_main: false,
                is_primary: true,
            },
        ];
        assert_eq!(p.primary_image_url(), "b.jpg");
    }
}
