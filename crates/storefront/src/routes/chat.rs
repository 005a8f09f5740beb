//! Shopping assistant chat.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::context::PageContext;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::chat::{FALLBACK_REPLY, MAX_MESSAGE_CHARS, render_links};
use crate::services::{ChatError, ChatbotService};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "chat/index.html")]
pub struct ChatTemplate {
    pub ctx: PageContext,
    pub max_chars: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    /// Reply as HTML: escaped text with product links.
    pub response: String,
}

impl ChatResponse {
    fn reply(text: &str) -> Self {
        Self {
            success: true,
            response: render_links(text),
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            response: render_links(message),
        }
    }
}

/// `GET /chat`
pub async fn page(ctx: PageContext, RequireAuth(_user): RequireAuth) -> ChatTemplate {
    ChatTemplate {
        ctx,
        max_chars: MAX_MESSAGE_CHARS,
    }
}

/// `POST /api/chat`
pub async fn message(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<ChatRequest>,
) -> Response {
    let chat = ChatbotService::new(state.pool(), state.gemini(), state.chat_context());
    match chat.reply(&request.message, Some(&user)).await {
        Ok(text) => Json(ChatResponse::reply(&text)).into_response(),
        Err(e @ (ChatError::EmptyMessage | ChatError::MessageTooLong)) => (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::failure(&e.to_string())),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Chat reply failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse::failure(FALLBACK_REPLY)),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_are_rendered_as_html() {
        let body = ChatResponse::reply("Try [Pure Drive](/products/4) <now>");
        assert!(body.success);
        assert!(body.response.contains(r#"href="/products/4""#));
        assert!(body.response.contains("&lt;now&gt;"));
    }
}
