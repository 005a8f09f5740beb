//! Business logic services for the storefront.
//!
//! Services sit between route handlers and the repositories in [`crate::db`].
//! They validate input, enforce ownership and state rules, and talk to the
//! external APIs (PayOS, ImageKit, Gemini, Google).
//!
//! # Services
//!
//! - `auth` / `users` - Registration, login, Google sign-in, admin user management
//! - `catalog` - Product listings and admin product editing
//! - `cart` - Per-user cart with price snapshots
//! - `orders` - Order creation, history and status changes
//! - `checkout` - Cart to order, PayOS payment links and webhooks
//! - `promo` - Admin promo codes
//! - `reviews`, `newsletter`, `blog` - Content features
//! - `chat` - Gemini shopping assistant

pub mod auth;
pub mod blog;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod newsletter;
pub mod orders;
pub mod promo;
pub mod reviews;
pub mod users;

pub use auth::{AuthError, AuthService, Registration};
pub use blog::BlogService;
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, ProductService};
pub use chat::{ChatError, ChatbotService};
pub use checkout::{CheckoutError, CheckoutService};
pub use newsletter::{NewsletterError, NewsletterService};
pub use orders::{OrderError, OrderService};
pub use promo::{PromoCodeService, PromoError};
pub use reviews::{ReviewError, ReviewService};
pub use users::UserService;
