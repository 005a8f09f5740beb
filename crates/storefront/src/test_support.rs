//! Fixtures for tests that need a real database.
//!
//! Those tests are `#[ignore]`d; run them with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use tennis_shop_core::{ProductId, UserId};

use crate::db::ProductRepository;
use crate::models::ProductInput;
use crate::services::{AuthService, Registration};

/// Pool on `DATABASE_URL` with migrations applied.
pub async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    pool
}

/// Short random suffix for unique emails and codes.
pub fn unique() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// A fresh customer account.
pub async fn customer(pool: &PgPool) -> UserId {
    let user = AuthService::new(pool)
        .register(&Registration {
            full_name: "Test Player".to_string(),
            email: format!("player-{}@example.com", unique()),
            password: "Baseline-Rally-42".to_string(),
            phone: Some("0900000000".to_string()),
            address: Some("12 Le Loi".to_string()),
        })
        .await
        .unwrap();
    user.id
}

/// A PayOS `orderCode` unlikely to collide with earlier runs.
pub fn order_code() -> i64 {
    i64::from(rand::random::<u32>()) << 8
}

pub fn product_input(price: i64, stock: i32) -> ProductInput {
    ProductInput {
        name: format!("Test Racket {}", unique()),
        description: None,
        category_id: None,
        brand_id: None,
        base_price: Decimal::from(price),
        discount_percent: 0,
        stock,
        is_active: true,
    }
}

/// An active product without variants or images.
pub async fn product(pool: &PgPool, price: i64, stock: i32) -> ProductId {
    ProductRepository::new(pool)
        .create(&product_input(price, stock), None)
        .await
        .unwrap()
}
