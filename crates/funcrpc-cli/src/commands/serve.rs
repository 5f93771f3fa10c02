//! `funcrpc serve`: Serve the demo methods over HTTP and WebSocket.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use funcrpc_core::{DuplexPolicy, RpcRouter};
use funcrpc_server::{ServerConfig, WebSocketConfig};

pub async fn run(host: String, port: u16, channel_only: bool) -> Result<(), String> {
    let registry = funcrpc_cli::demo::demo_registry(Arc::new(AtomicU64::new(0)))
        .map_err(|e| format!("Failed to register demo methods: {}", e))?;

    let config = ServerConfig {
        host: host.clone(),
        port,
        duplex_policy: if channel_only {
            DuplexPolicy::ChannelOnly
        } else {
            DuplexPolicy::Shared
        },
        websocket: WebSocketConfig::default(),
    };

    println!("Starting funcrpc server on {}:{}...", host, port);

    let addr = funcrpc_server::start_server(config, RpcRouter::new(registry)).await?;
    println!("funcrpc server listening on http://{}", addr);
    println!("Duplex channel at ws://{}/websocket", addr);

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
