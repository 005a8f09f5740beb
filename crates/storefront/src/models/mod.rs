//! Domain models for the storefront.
//!
//! Repositories in [`crate::db`] load these from `PostgreSQL`; services and
//! templates only ever see these types, never raw rows.

pub mod blog;
pub mod cart;
pub mod catalog;
pub mod newsletter;
pub mod order;
pub mod promo;
pub mod review;
pub mod session;
pub mod user;

pub use blog::BlogPost;
pub use cart::{CartLine, CartSummary};
pub use catalog::{Brand, Category, Product, ProductImage, ProductInput, ProductSort, ProductVariant};
pub use newsletter::Subscriber;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, Payment};
pub use promo::PromoCode;
pub use review::Review;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
