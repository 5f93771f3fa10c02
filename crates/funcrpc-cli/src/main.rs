//! funcrpc CLI: serve the demo methods or call a running server.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "funcrpc", version, about = "funcrpc: call plain functions over HTTP, JSON-RPC and WebSocket")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a server exposing the demo methods
    Serve {
        /// Host to bind to
        #[arg(long, env = "FUNCRPC_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "FUNCRPC_PORT", default_value_t = 26657)]
        port: u16,
        /// Serve duplex methods only on the WebSocket channel
        #[arg(long)]
        channel_only: bool,
    },

    /// Send a JSON-RPC request to a running server
    Call {
        /// JSON-RPC method name (e.g. "add")
        method: String,
        /// JSON-RPC params as a JSON string (array or object)
        #[arg(long, default_value = "[]")]
        params: String,
        /// Server URL
        #[arg(long, env = "FUNCRPC_URL", default_value = "http://127.0.0.1:26657/")]
        url: String,
    },

    /// List the methods a running server exposes
    Methods {
        /// Server URL
        #[arg(long, env = "FUNCRPC_URL", default_value = "http://127.0.0.1:26657/")]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "funcrpc_core=info,funcrpc_server=info,funcrpc=info".into()),
        )
        .init();

    let result = match cli.command {
        Commands::Serve {
            host,
            port,
            channel_only,
        } => commands::serve::run(host, port, channel_only).await,
        Commands::Call {
            method,
            params,
            url,
        } => commands::call::call(&url, &method, &params).await,
        Commands::Methods { url } => commands::call::methods(&url).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
