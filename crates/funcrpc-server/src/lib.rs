//! funcrpc Server: axum adapter on top of funcrpc-core.
//!
//! Serves a frozen [`MethodRegistry`](funcrpc_core::MethodRegistry) over:
//! - `GET|POST /<method>`: one endpoint per method, form/query arguments
//! - `POST /`: shared JSON-RPC 2.0 endpoint (single or batch)
//! - `GET /`: method listing
//! - `GET /websocket`: persistent duplex channel for duplex-enabled methods

pub mod api;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use funcrpc_core::{DuplexPolicy, RpcRouter};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use self::state::{AppState, AppStateInner};

/// Duplex channel tuning.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Frames queued for the writer task before senders wait.
    pub write_capacity: usize,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// How often the writer pings an idle peer. `None` disables pings.
    pub ping_interval: Option<Duration>,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            write_capacity: 100,
            max_message_size: 1_000_000,
            ping_interval: Some(Duration::from_secs(27)),
        }
    }
}

/// Configuration for the funcrpc server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub duplex_policy: DuplexPolicy,
    pub websocket: WebSocketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 26657,
            duplex_policy: DuplexPolicy::Shared,
            websocket: WebSocketConfig::default(),
        }
    }
}

/// Install the global fmt subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "funcrpc_server=info,funcrpc_core=info,tower_http=info".into()
            }),
        )
        .try_init();
}

/// Build the axum application for `state`.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::api_router(&state.rpc)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server in a background task.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig, rpc: RpcRouter) -> Result<SocketAddr, String> {
    init_tracing();

    let rpc = rpc.with_policy(config.duplex_policy);
    tracing::info!(
        methods = rpc.registry().len(),
        "Starting funcrpc server on {}:{}",
        config.host,
        config.port
    );

    let state: AppState = Arc::new(AppStateInner::new(rpc, config.websocket.clone()));
    let app = build_app(state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("funcrpc server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}
