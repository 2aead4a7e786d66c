use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Reports the vector index and whether the chat endpoint answers.
/// An unreachable index is a 502.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.store.stats().await?;
    let chat_reachable = state.chat.health_check().await.unwrap_or(false);
    let config = &state.config;

    Ok(Json(json!({
        "status": "ok",
        "index": {
            "name": config.pinecone.index_name,
            "dimension": stats.dimension,
            "total_vector_count": stats.total_vector_count
        },
        "chat": {
            "provider": state.chat.name(),
            "model": config.chat.model,
            "reachable": chat_reachable
        },
        "embedding_model": config.embedding.model,
        "top_k": config.retrieval.top_k
    })))
}
