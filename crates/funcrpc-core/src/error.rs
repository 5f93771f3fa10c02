//! Error types for registration and per-call dispatch.
//!
//! `RegistrationError` only ever surfaces while the registry is being built
//! and is meant to abort startup. `CallError` is converted into an error
//! response on whichever transport the call arrived on. When the `axum`
//! feature is enabled, it also implements `IntoResponse` so it can be used
//! directly as an axum handler error type.

use crate::types::{self, JsonRpcResponse};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Invalid method name {0:?}")]
    InvalidName(String),

    #[error("Method {method}: {names} argument name(s) given for {params} parameter(s)")]
    ArgCountMismatch {
        method: String,
        names: usize,
        params: usize,
    },

    #[error("Method {method}: argument name {name:?} is used twice")]
    DuplicateArgument { method: String, name: String },
}

/// A single value could not be converted into its declared type.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Pushing onto a duplex session that has already ended.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("duplex channel closed")]
pub struct ChannelClosed;

/// Failure to push a structured frame onto a duplex session.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error(transparent)]
    Closed(#[from] ChannelClosed),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything that can go wrong between receiving a call and encoding its outcome.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CallError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {name}: {reason}")]
    ArgumentType { name: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),

    /// The invoked callable returned its error value. Rendered verbatim so
    /// callers see the domain message rather than a framework prefix.
    #[error("{0}")]
    Application(String),
}

impl CallError {
    /// Convert to a JSON-RPC error code.
    pub fn code(&self) -> i64 {
        match self {
            CallError::Parse(_) => types::PARSE_ERROR,
            CallError::InvalidRequest(_) => types::INVALID_REQUEST,
            CallError::MethodNotFound(_) => types::METHOD_NOT_FOUND,
            CallError::InvalidParams(_)
            | CallError::MissingArgument(_)
            | CallError::ArgumentType { .. } => types::INVALID_PARAMS,
            CallError::Internal(_) => types::INTERNAL_ERROR,
            CallError::Application(_) => types::APPLICATION_ERROR,
        }
    }

    /// HTTP status used on the per-method path.
    pub fn http_status(&self) -> u16 {
        match self {
            CallError::MethodNotFound(_) => 404,
            CallError::Internal(_) | CallError::Application(_) => 500,
            _ => 400,
        }
    }

    /// True for errors raised by the callable itself rather than by the protocol layer.
    pub fn is_application(&self) -> bool {
        matches!(self, CallError::Application(_))
    }

    /// Convert to a JSON-RPC error response.
    pub fn to_response(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.code(), self.to_string())
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for CallError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.to_response(Some(serde_json::Value::from(types::URI_CALL_ID)));
        (status, axum::Json(body)).into_response()
    }
}
