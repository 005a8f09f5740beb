//! Tennis Shop Core - Shared domain types.
//!
//! This crate provides the types shared by the Tennis Shop components:
//! - `storefront` - The web shop, including the `/admin` back-office
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, status enums and money arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
