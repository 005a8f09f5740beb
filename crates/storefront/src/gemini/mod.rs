//! Google Gemini client for the shop assistant.

mod client;
mod error;
pub mod types;

pub use client::GeminiClient;
pub use error::GeminiError;
