//! Shopping assistant backed by Gemini.
//!
//! Every prompt carries a compact JSON list of the catalog so the model can
//! recommend real products and link to them as `[Name](/products/{id})`.
//! The list is cached for five minutes.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use moka::future::Cache;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use tennis_shop_core::ProductId;

use crate::db::{ProductFilter, ProductRepository, RepositoryError};
use crate::gemini::GeminiClient;
use crate::models::{CurrentUser, ProductSort};

/// Products included in the prompt.
pub const PROMPT_PRODUCTS: i64 = 30;

/// Longest message accepted from the chat box.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Shown when the assistant is unavailable.
pub const FALLBACK_REPLY: &str = "Sorry, I can't answer right now. Please try again in a moment \
     or browse our products at /products.";

const CONTEXT_KEY: &str = "products";

/// Cache for the serialized product list.
pub type ProductContextCache = Cache<&'static str, Arc<str>>;

/// Build the product list cache (five minute TTL).
#[must_use]
pub fn product_context_cache() -> ProductContextCache {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(300))
        .build()
}

static PRODUCT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\[([^\]\n]+)\]\(/products/(\d+)\)").expect("valid product link regex")
});

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Please enter a message.")]
    EmptyMessage,

    #[error("Messages are limited to {MAX_MESSAGE_CHARS} characters.")]
    MessageTooLong,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Serialize)]
struct PromptProduct {
    id: ProductId,
    name: String,
    price: Decimal,
    category: String,
    brand: String,
}

pub struct ChatbotService<'a> {
    pool: &'a PgPool,
    gemini: Option<&'a GeminiClient>,
    cache: &'a ProductContextCache,
}

impl<'a> ChatbotService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        gemini: Option<&'a GeminiClient>,
        cache: &'a ProductContextCache,
    ) -> Self {
        Self { pool, gemini, cache }
    }

    /// Answer a shopper's message. Assistant failures are logged and answered
    /// with [`FALLBACK_REPLY`].
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EmptyMessage` or `ChatError::MessageTooLong` for
    /// bad input and `ChatError::Repository` if the catalog cannot be read.
    #[instrument(skip(self, message, user), fields(user_id = user.map(|u| u.id.as_i32())))]
    pub async fn reply(&self, message: &str, user: Option<&CurrentUser>) -> Result<String, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::MessageTooLong);
        }

        let Some(gemini) = self.gemini else {
            tracing::warn!("Chat requested but GEMINI_API_KEY is not configured");
            return Ok(FALLBACK_REPLY.to_string());
        };

        let products = self.product_context().await?;
        let system = system_prompt(&products, user.map(CurrentUser::first_name));
        let question = format!("Customer question: {message}");

        match gemini.generate(&system, &question).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::error!(error = %e, "Gemini request failed");
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }

    async fn product_context(&self) -> Result<Arc<str>, ChatError> {
        if let Some(cached) = self.cache.get(CONTEXT_KEY).await {
            return Ok(cached);
        }

        let products = ProductRepository::new(self.pool)
            .list(&ProductFilter::Active, ProductSort::Newest, Some(PROMPT_PRODUCTS))
            .await?;
        let prompt_products: Vec<PromptProduct> = products
            .into_iter()
            .map(|p| PromptProduct {
                id: p.id,
                name: p.name,
                price: p.base_price,
                category: p.category_name.unwrap_or_else(|| "Unknown".to_string()),
                brand: p.brand_name.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect();

        let json: Arc<str> = serde_json::to_string(&prompt_products)
            .unwrap_or_else(|_| "[]".to_string())
            .into();
        self.cache.insert(CONTEXT_KEY, Arc::clone(&json)).await;
        Ok(json)
    }
}

fn system_prompt(products_json: &str, first_name: Option<&str>) -> String {
    let greeting = first_name.map_or_else(String::new, |name| {
        format!("\nThe customer's name is {name}. Address them by name.")
    });
    format!(
        "You are the product advisor of Tennis Shop, a store for tennis rackets, \
         strings, shoes, apparel and accessories. Help customers find products that fit them.\
         {greeting}\n\n\
         Product list (JSON, prices in VND): {products_json}\n\n\
         Guidelines:\n\
         - Work out the customer's level, playing style and budget\n\
         - Recommend products from the list only\n\
         - Link every product you mention as [Product name](/products/{{id}})\n\
         - Be brief and friendly"
    )
}

/// Render an assistant reply as HTML: product links become anchors,
/// everything else is escaped and newlines become `<br>`.
#[must_use]
pub fn render_links(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + 32);
    let mut last = 0;
    for caps in PRODUCT_LINK_RE.captures_iter(text) {
        let (Some(whole), Some(name), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        push_escaped(&mut html, &text[last..whole.start()]);
        html.push_str("<a href=\"/products/");
        html.push_str(id.as_str());
        html.push_str("\" class=\"chat-product-link\">");
        push_escaped(&mut html, name.as_str());
        html.push_str("</a>");
        last = whole.end();
    }
    push_escaped(&mut html, &text[last..]);
    html
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            '\r' => {}
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_links_makes_anchors() {
        let html = render_links("Try the [Pure Aero](/products/12) racket.");
        assert_eq!(
            html,
            "Try the <a href=\"/products/12\" class=\"chat-product-link\">Pure Aero</a> racket."
        );
    }

    #[test]
    fn test_render_links_escapes_everything_else() {
        let html = render_links("<script>alert(1)</script>\nLine two");
        assert_eq!(html, "&lt;script&gt;alert(1)&lt;/script&gt;<br>Line two");
    }

    #[test]
    fn test_render_links_ignores_foreign_links() {
        let html = render_links("[evil](https://example.com) and [x](/products/abc)");
        assert!(!html.contains("<a"));
        assert!(html.contains("[evil](https://example.com)"));
    }

    #[test]
    fn test_link_names_are_escaped() {
        let html = render_links("[A<b>](/products/3)");
        assert!(html.contains(">A&lt;b&gt;</a>"));
    }

    #[test]
    fn test_system_prompt_mentions_products_and_name() {
        let prompt = system_prompt(r#"[{"id":1,"name":"Blade 98"}]"#, Some("Linh"));
        assert!(prompt.contains("Blade 98"));
        assert!(prompt.contains("Linh"));
        assert!(prompt.contains("/products/{id}"));

        let anonymous = system_prompt("[]", None);
        assert!(!anonymous.contains("Address them by name"));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_before_any_io() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .map_err(|e| e.to_string());
        let Ok(pool) = pool else { return };
        let cache = product_context_cache();
        let service = ChatbotService::new(&pool, None, &cache);
        assert!(matches!(service.reply("   ", None).await, Err(ChatError::EmptyMessage)));
        assert_eq!(service.reply("hello", None).await.ok().as_deref(), Some(FALLBACK_REPLY));
    }
}
