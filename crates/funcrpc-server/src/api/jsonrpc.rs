//! Shared JSON-RPC 2.0 endpoint.
//!
//! Exposes `POST /`: a single endpoint for all JSON-RPC method calls.
//! Also exposes `GET /` for method discovery.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use funcrpc_core::CallContext;

use crate::state::AppState;

/// POST /: JSON-RPC 2.0 endpoint.
///
/// Accepts a JSON-RPC request (single or batch). A body made only of
/// notifications is answered with `204 No Content`; a body that is not UTF-8
/// JSON gets a parse error.
pub async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match state.rpc.handle_bytes(&body, CallContext::json_rpc()).await {
        Some(resp) => ([(header::CONTENT_TYPE, "application/json")], resp).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /: list all registered methods with their signatures and options.
pub async fn list_methods(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "methods": state.rpc.method_list() }))
}
