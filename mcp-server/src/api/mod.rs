//! # API Module
//!
//! HTTP transport for the MCP server.
//!
//! ## Endpoints
//! - `POST /mcp` - JSON-RPC request, session from the `Mcp-Session-Id` header
//! - `DELETE /mcp` - end the session named by `Mcp-Session-Id`
//! - `POST /api/rpc` - same as `POST /mcp`
//! - `GET /api/health` - liveness

pub mod health;
pub mod rpc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/rpc", post(rpc::rpc_handler));

    Router::new()
        .route(
            "/mcp",
            post(rpc::rpc_handler).delete(rpc::delete_session_handler),
        )
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
