// src/api/rpc.rs

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    mcp::{
        handler::handle_mcp_request,
        protocol::{error_codes, Request, Response as RpcResponse},
        session_store::DEFAULT_SESSION,
    },
    AppState,
};

/// Header carrying the MCP session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

fn header_session(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Forward JSON-RPC requests over HTTP to the MCP handler. An `initialize`
/// without a session header starts a new session whose id is returned in the
/// response header.
pub async fn rpc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = match serde_json::from_str::<Request>(&body) {
        Ok(request) => request,
        Err(parse_error) => {
            error!("JSON parse error: {}", parse_error);
            return Json(RpcResponse::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", parse_error),
            ))
            .into_response();
        }
    };

    let existing = header_session(&headers);
    let issued = match (&existing, request.method.as_str()) {
        (None, "initialize") => {
            let id = Uuid::new_v4().to_string();
            info!("[SESSION] registered {}", id);
            Some(id)
        }
        _ => None,
    };
    let session_id = existing
        .or_else(|| issued.clone())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string());

    match handle_mcp_request(request, &state, &session_id).await {
        None => StatusCode::ACCEPTED.into_response(),
        Some(rpc_response) => {
            let mut response = Json(rpc_response).into_response();
            if let Some(id) = issued {
                match HeaderValue::from_str(&id) {
                    Ok(value) => {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static(SESSION_HEADER), value);
                    }
                    Err(e) => error!("invalid session id header {}: {}", id, e),
                }
            }
            response
        }
    }
}

/// Ends a session and drops its account record.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match header_session(&headers) {
        Some(id) => {
            state.sessions.delete(&id);
            info!("[SESSION] unregistered {}", id);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::BAD_REQUEST,
    }
}
