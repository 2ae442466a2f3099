//! HTTP surface — status, health, and single-turn chat.
//!
//! The router borrows nothing global: every handler reads the
//! [`ChatService`] passed in through axum state.

mod cors;

pub use cors::CorsPolicy;

use crate::llm::{ChatError, ChatRequest, ChatResponse, ChatService};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Build the application router.
pub fn router(service: Arc<ChatService>, policy: CorsPolicy) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .layer(middleware::from_fn_with_state(Arc::new(policy), cors::apply))
        .with_state(service)
}

#[derive(Debug, Serialize)]
struct RootStatus {
    message: &'static str,
    status: &'static str,
    model_loaded: bool,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    model_loaded: bool,
}

async fn root(State(service): State<Arc<ChatService>>) -> Json<RootStatus> {
    Json(RootStatus {
        message: "LLM AI Server",
        status: "running",
        model_loaded: service.is_loaded(),
        model: service.model_name().map(str::to_string),
    })
}

async fn health(State(service): State<Arc<ChatService>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        model_loaded: service.is_loaded(),
    })
}

async fn chat(
    State(service): State<Arc<ChatService>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        detail: e.body_text(),
    })?;

    let response = service.chat(request).await?;
    Ok(Json(response))
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        let status = match e {
            ChatError::ModelNotLoaded => {
                log::warn!("[CHAT] Rejected: no model loaded");
                StatusCode::SERVICE_UNAVAILABLE
            }
            ChatError::Generation(ref inner) => {
                log::error!("[CHAT] Generation failed: {}", inner);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}
