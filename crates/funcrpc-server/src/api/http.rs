//! Per-method HTTP endpoints: `GET|POST /<method>`.
//!
//! Arguments are read from the query string and, for url-encoded POST
//! bodies, from the form body. The response is a single JSON-RPC envelope
//! with id `-1`.

use std::collections::HashMap;

use axum::extract::{FromRequest, MatchedPath, Query, Request, State};
use axum::http::{header, Method, Uri};
use axum::{Form, Json};
use funcrpc_core::types::URI_CALL_ID;
use funcrpc_core::{CallContext, CallError, JsonRpcResponse, RawArgs};

use crate::state::AppState;

/// GET|POST /<method>: invoke one registered method.
pub async fn call_method(
    State(state): State<AppState>,
    path: MatchedPath,
    req: Request,
) -> Result<Json<JsonRpcResponse>, CallError> {
    let method = path.as_str().trim_start_matches('/').to_string();
    let values = form_values(req).await?;

    let result = state
        .rpc
        .call(&method, RawArgs::Text(values), &CallContext::http())
        .await?;
    Ok(Json(JsonRpcResponse::success(
        Some(URI_CALL_ID.into()),
        result,
    )))
}

/// Query values merged with url-encoded body values; the body wins on conflicts.
async fn form_values(req: Request) -> Result<HashMap<String, String>, CallError> {
    let Query(mut values) = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map_err(|e| CallError::Parse(e.body_text()))?;

    let is_form = req.method() == Method::POST
        && req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(body) = Form::<HashMap<String, String>>::from_request(req, &())
            .await
            .map_err(|e| CallError::Parse(e.body_text()))?;
        values.extend(body);
    }

    Ok(values)
}

/// Anything that is not a registered method, `/` or the duplex path.
pub async fn not_found(uri: Uri) -> CallError {
    CallError::MethodNotFound(uri.path().trim_start_matches('/').to_string())
}
