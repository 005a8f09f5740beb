//! Demo data for local development.
//!
//! Every insert skips rows that already exist (by brand/category name,
//! product name, variant SKU, blog slug and promo code), so the command can
//! be re-run after adding entries here.

use chrono::{Duration, NaiveDate, Utc};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Invalid blog post {file}: {reason}")]
    BlogPost { file: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Rows inserted by one run. Existing rows are not counted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeedReport {
    pub brands: u64,
    pub categories: u64,
    pub products: u64,
    pub variants: u64,
    pub posts: u64,
    pub promo_codes: u64,
}

const BRANDS: &[&str] = &["Babolat", "Wilson", "Head", "Yonex", "Asics", "Luxilon"];

/// `(name, parent)` pairs. Parents come before their children.
const CATEGORIES: &[(&str, Option<&str>)] = &[
    ("Rackets", None),
    ("Adult Rackets", Some("Rackets")),
    ("Junior Rackets", Some("Rackets")),
    ("Strings", None),
    ("Shoes", None),
    ("Bags", None),
    ("Balls", None),
    ("Accessories", None),
];

struct VariantSeed {
    color: Option<&'static str>,
    size: &'static str,
    sku: &'static str,
    stock: i32,
    price: Option<i64>,
}

struct ProductSeed {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    brand: &'static str,
    base_price: i64,
    discount_percent: i32,
    stock: i32,
    image: &'static str,
    variants: &'static [VariantSeed],
}

impl ProductSeed {
    /// Products with variants carry the sum of their variant stock.
    fn total_stock(&self) -> i32 {
        if self.variants.is_empty() {
            self.stock
        } else {
            self.variants.iter().map(|v| v.stock).sum()
        }
    }
}

const IMAGE_BASE: &str = "https://ik.imagekit.io/tennisshop/products";

const PRODUCTS: &[ProductSeed] = &[
    ProductSeed {
        name: "Babolat Pure Aero 2023",
        description: "Spin-friendly 100 sq in frame used on tour. 300 g unstrung.",
        category: "Adult Rackets",
        brand: "Babolat",
        base_price: 4_990_000,
        discount_percent: 10,
        stock: 0,
        image: "pure-aero.jpg",
        variants: &[
            VariantSeed { color: None, size: "G2", sku: "BAB-PA23-G2", stock: 4, price: None },
            VariantSeed { color: None, size: "G3", sku: "BAB-PA23-G3", stock: 6, price: None },
        ],
    },
    ProductSeed {
        name: "Wilson Clash 100 v2",
        description: "Flexible frame for comfort and control. 295 g unstrung.",
        category: "Adult Rackets",
        brand: "Wilson",
        base_price: 5_290_000,
        discount_percent: 0,
        stock: 0,
        image: "clash-100.jpg",
        variants: &[
            VariantSeed { color: None, size: "G2", sku: "WIL-CL100-G2", stock: 3, price: None },
            VariantSeed { color: None, size: "G3", sku: "WIL-CL100-G3", stock: 2, price: None },
        ],
    },
    ProductSeed {
        name: "Head Speed MP",
        description: "A fast all-rounder with a 100 sq in head and 16x19 pattern.",
        category: "Adult Rackets",
        brand: "Head",
        base_price: 4_690_000,
        discount_percent: 0,
        stock: 5,
        image: "speed-mp.jpg",
        variants: &[],
    },
    ProductSeed {
        name: "Wilson Ultra 25 Junior",
        description: "Lightweight 25 inch racket for players aged 9 to 10.",
        category: "Junior Rackets",
        brand: "Wilson",
        base_price: 1_290_000,
        discount_percent: 15,
        stock: 12,
        image: "ultra-25.jpg",
        variants: &[],
    },
    ProductSeed {
        name: "Luxilon ALU Power 125",
        description: "Co-polyester string set, 12.2 m. Crisp feel and tension stability.",
        category: "Strings",
        brand: "Luxilon",
        base_price: 450_000,
        discount_percent: 0,
        stock: 40,
        image: "alu-power.jpg",
        variants: &[],
    },
    ProductSeed {
        name: "Asics Gel-Resolution 9",
        description: "Stable hard-court shoe with a six-month outsole guarantee.",
        category: "Shoes",
        brand: "Asics",
        base_price: 3_590_000,
        discount_percent: 5,
        stock: 0,
        image: "gel-resolution-9.jpg",
        variants: &[
            VariantSeed { color: Some("White"), size: "41", sku: "ASI-GR9-W-41", stock: 2, price: None },
            VariantSeed { color: Some("White"), size: "42", sku: "ASI-GR9-W-42", stock: 3, price: None },
            VariantSeed { color: Some("Black"), size: "42", sku: "ASI-GR9-B-42", stock: 1, price: Some(3_790_000) },
        ],
    },
    ProductSeed {
        name: "Yonex Pro Racquet Bag 6",
        description: "Six-racket bag with a thermal compartment.",
        category: "Bags",
        brand: "Yonex",
        base_price: 1_890_000,
        discount_percent: 0,
        stock: 7,
        image: "pro-bag-6.jpg",
        variants: &[],
    },
    ProductSeed {
        name: "Head Tour Balls (4-ball can)",
        description: "ITF-approved pressurised balls for all surfaces.",
        category: "Balls",
        brand: "Head",
        base_price: 180_000,
        discount_percent: 0,
        stock: 100,
        image: "tour-balls.jpg",
        variants: &[],
    },
    ProductSeed {
        name: "Wilson Pro Overgrip (3 pack)",
        description: "Tacky overgrips in white.",
        category: "Accessories",
        brand: "Wilson",
        base_price: 150_000,
        discount_percent: 0,
        stock: 60,
        image: "pro-overgrip.jpg",
        variants: &[],
    },
];

/// Blog posts as `(file name, markdown with front matter)`.
const BLOG_POSTS: &[(&str, &str)] = &[
    (
        "choosing-your-first-racket.md",
        include_str!("../../content/blog/choosing-your-first-racket.md"),
    ),
    (
        "string-tension-basics.md",
        include_str!("../../content/blog/string-tension-basics.md"),
    ),
    (
        "caring-for-your-shoes.md",
        include_str!("../../content/blog/caring-for-your-shoes.md"),
    ),
];

const WELCOME_CODE: &str = "WELCOME10";
const WELCOME_PERCENT: i32 = 10;

#[derive(Debug, Deserialize)]
struct PostMeta {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    image: Option<String>,
    published_at: NaiveDate,
    #[serde(default)]
    draft: bool,
}

/// A blog post ready to insert.
#[derive(Debug)]
struct BlogSeed {
    slug: String,
    meta: PostMeta,
    content: String,
}

/// Split front matter from a post. The slug defaults to the file stem.
fn parse_post(file: &'static str, source: &str) -> Result<BlogSeed, SeedError> {
    let invalid = |reason: String| SeedError::BlogPost { file, reason };

    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PostMeta> = matter
        .parse(source)
        .map_err(|e| invalid(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| invalid("Missing frontmatter".to_string()))?;

    let slug = meta
        .slug
        .clone()
        .unwrap_or_else(|| file.trim_end_matches(".md").to_string());
    let content = parsed.content.trim().to_string();
    if content.is_empty() {
        return Err(invalid("Post has no body".to_string()));
    }

    Ok(BlogSeed {
        slug,
        meta,
        content,
    })
}

/// Insert all demo data.
///
/// # Errors
///
/// Returns an error if a blog post is malformed or a query fails.
pub async fn run(pool: &PgPool) -> Result<SeedReport, SeedError> {
    let posts = BLOG_POSTS
        .iter()
        .map(|(file, source)| parse_post(file, source))
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = SeedReport::default();
    let mut tx = pool.begin().await?;

    for brand in BRANDS {
        report.brands += sqlx::query("INSERT INTO shop.brand (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(brand)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    for (name, parent) in CATEGORIES {
        report.categories += sqlx::query(
            "INSERT INTO shop.product_category (name, parent_id)
             VALUES ($1, (SELECT id FROM shop.product_category WHERE name = $2))
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(parent)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    for product in PRODUCTS {
        let inserted = sqlx::query_scalar::<_, i32>(
            "INSERT INTO shop.product
                 (name, description, category_id, brand_id, base_price, discount_percent, stock)
             SELECT $1, $2,
                    (SELECT id FROM shop.product_category WHERE name = $3),
                    (SELECT id FROM shop.brand WHERE name = $4),
                    $5, $6, $7
             WHERE NOT EXISTS (SELECT 1 FROM shop.product WHERE name = $1)
             RETURNING id",
        )
        .bind(product.name)
        .bind(product.description)
        .bind(product.category)
        .bind(product.brand)
        .bind(Decimal::from(product.base_price))
        .bind(product.discount_percent)
        .bind(product.total_stock())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(product_id) = inserted else {
            continue;
        };
        report.products += 1;

        sqlx::query(
            "INSERT INTO shop.product_image (product_id, image_url, is_main, is_primary)
             VALUES ($1, $2, TRUE, TRUE)",
        )
        .bind(product_id)
        .bind(format!("{IMAGE_BASE}/{}", product.image))
        .execute(&mut *tx)
        .await?;

        for variant in product.variants {
            report.variants += sqlx::query(
                "INSERT INTO shop.product_variant (product_id, color, size, sku, stock, price)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (sku) WHERE sku IS NOT NULL DO NOTHING",
            )
            .bind(product_id)
            .bind(variant.color)
            .bind(variant.size)
            .bind(variant.sku)
            .bind(variant.stock)
            .bind(variant.price.map(Decimal::from))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
    }

    for post in &posts {
        let created_at = post.meta.published_at.and_time(chrono::NaiveTime::MIN).and_utc();
        report.posts += sqlx::query(
            "INSERT INTO shop.blog_post
                 (slug, title, content, excerpt, author, image_url, category, created_at, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(&post.slug)
        .bind(&post.meta.title)
        .bind(&post.content)
        .bind(&post.meta.excerpt)
        .bind(&post.meta.author)
        .bind(&post.meta.image)
        .bind(&post.meta.category)
        .bind(created_at)
        .bind(!post.meta.draft)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    let now = Utc::now();
    report.promo_codes += sqlx::query(
        "INSERT INTO shop.promo_code (code, discount_percent, valid_from, valid_to)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (code) DO NOTHING",
    )
    .bind(WELCOME_CODE)
    .bind(WELCOME_PERCENT)
    .bind(now)
    .bind(now + Duration::days(365))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bundled_posts_parse() {
        for (file, source) in BLOG_POSTS {
            let post = parse_post(file, source).unwrap();
            assert!(!post.meta.title.is_empty());
            assert!(!post.slug.ends_with(".md"));
        }
    }

    #[test]
    fn slug_defaults_to_file_stem() {
        let source = "---\ntitle: Grip sizes\npublished_at: 2025-01-02\n---\nBody text.";
        let post = parse_post("grip-sizes.md", source).unwrap();
        assert_eq!(post.slug, "grip-sizes");
        assert_eq!(post.content, "Body text.");
        assert!(!post.meta.draft);
    }

    #[test]
    fn explicit_slug_wins() {
        let source = "---\ntitle: T\nslug: custom\npublished_at: 2025-01-02\n---\nBody";
        assert_eq!(parse_post("file.md", source).unwrap().slug, "custom");
    }

    #[test]
    fn missing_front_matter_is_rejected() {
        let err = parse_post("bare.md", "Just text").unwrap_err();
        assert!(matches!(err, SeedError::BlogPost { file: "bare.md", .. }));
    }

    #[test]
    fn categories_list_parents_first() {
        for (i, (_, parent)) in CATEGORIES.iter().enumerate() {
            if let Some(parent) = parent {
                let parent_index = CATEGORIES.iter().position(|(name, _)| name == parent);
                assert!(parent_index.is_some_and(|p| p < i), "{parent} must precede its children");
            }
        }
    }

    #[test]
    fn products_reference_known_brands_and_categories() {
        for product in PRODUCTS {
            assert!(BRANDS.contains(&product.brand), "{}", product.name);
            assert!(CATEGORIES.iter().any(|(c, _)| *c == product.category), "{}", product.name);
            assert!(product.total_stock() > 0, "{}", product.name);
        }
    }
}
