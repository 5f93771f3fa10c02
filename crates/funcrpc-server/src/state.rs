//! Shared application state for the axum server.

use std::sync::Arc;

use funcrpc_core::RpcRouter;

use crate::WebSocketConfig;

/// Shared state accessible by all API handlers.
pub struct AppStateInner {
    pub rpc: RpcRouter,
    pub websocket: WebSocketConfig,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(rpc: RpcRouter, websocket: WebSocketConfig) -> Self {
        Self { rpc, websocket }
    }
}
