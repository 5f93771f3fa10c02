pub mod duplex;
pub mod http;
pub mod jsonrpc;

use axum::routing::get;
use axum::Router;
use funcrpc_core::RpcRouter;

use crate::state::AppState;

/// Path of the persistent duplex channel.
pub const WEBSOCKET_PATH: &str = "/websocket";

/// Build the complete API router: one route per registered method, the
/// shared JSON-RPC endpoint and the duplex channel.
pub fn api_router(rpc: &RpcRouter) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(jsonrpc::list_methods).post(jsonrpc::rpc_handler))
        .route(WEBSOCKET_PATH, get(duplex::upgrade));

    for name in rpc.registry().names() {
        router = router.route(
            &format!("/{}", name),
            get(http::call_method).post(http::call_method),
        );
    }

    router.fallback(http::not_found)
}
