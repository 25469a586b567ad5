// src/main.rs

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use aave_mcp_server::{
    api::create_router,
    blockchain::client::{EvmClient, RpcBackend},
    config::Config,
    mcp::{handler::handle_raw_message, session_store::DEFAULT_SESSION},
    AppState,
};
use anyhow::{Context, Result};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- HTTP Server Logic ---
async fn run_http_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = create_router(state);

    info!("🚀 HTTP Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("http server")
}

// --- MCP Server Logic ---
async fn run_mcp_server(state: AppState) {
    info!("🚀 Starting MCP server on stdin/stdout...");

    let mut stdin = io::BufReader::new(io::stdin());
    let mut stdout = io::stdout();

    loop {
        let mut line = String::new();

        match stdin.read_line(&mut line).await {
            Ok(0) => {
                info!("EOF received, shutting down MCP server");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                debug!("Received: {}", line);

                let Some(response) = handle_raw_message(line, &state, DEFAULT_SESSION).await else {
                    continue;
                };
                match serde_json::to_string(&response) {
                    Ok(response_json) => {
                        debug!("Sending: {}", response_json);
                        let write = async {
                            stdout.write_all(response_json.as_bytes()).await?;
                            stdout.write_all(b"\n").await?;
                            stdout.flush().await
                        };
                        if let Err(e) = write.await {
                            error!("Failed to write response: {}", e);
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize response: {}", e),
                }
            }
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                break;
            }
        }
    }

    info!("MCP server shutting down");
}

async fn run() -> Result<()> {
    let config = Config::from_env().context("load configuration")?;

    let client = EvmClient::new(&config.eth_rpc_url)?;
    let chain_id = client
        .get_chain_id()
        .await
        .context("get chain ID from RPC")?;
    info!("connected to chain {} (RPC: {})", chain_id, config.eth_rpc_url);

    let backend: Arc<dyn RpcBackend> = Arc::new(client);
    let state = AppState::new(config, backend, chain_id)?;

    // stdio unless HTTP is asked for
    let http = env::args().any(|a| a == "--http") || env::var("HTTP_MODE").is_ok();
    if http {
        run_http_server(state).await
    } else {
        run_mcp_server(state).await;
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // stdout is the MCP channel, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aave_mcp_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}
