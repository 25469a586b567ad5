//! # MCP Handler Module
//!
//! Dispatches JSON-RPC requests to the MCP methods:
//! - `initialize` - server info and capabilities
//! - `ping` - liveness
//! - `tools/list` - every registered tool, in registration order
//! - `tools/call` - run one tool for the calling session
//!
//! A request whose method is a registered tool name is rewritten into a
//! `tools/call` for that tool with `params` as its arguments.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::{
    mcp::{
        protocol::{error_codes, tool_result, Request, Response, PROTOCOL_VERSION},
        tools::ToolError,
    },
    AppState,
};

const SERVER_NAME: &str = "aave_mcp";
const PREVIEW_LIMIT: usize = 120;

/// Parses one raw JSON-RPC message and handles it.
pub async fn handle_raw_message(raw: &str, state: &AppState, session_id: &str) -> Option<Response> {
    match serde_json::from_str::<Request>(raw) {
        Ok(request) => handle_mcp_request(request, state, session_id).await,
        Err(parse_error) => {
            error!("JSON parse error: {}", parse_error);
            Some(Response::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", parse_error),
            ))
        }
    }
}

/// This is the main dispatcher for all incoming MCP requests. Notifications
/// produce no response.
pub async fn handle_mcp_request(req: Request, state: &AppState, session_id: &str) -> Option<Response> {
    debug!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "ping" => Response::success(req.id.clone(), json!({})),
        "tools/list" => handle_tools_list(&req, state),
        "tools/call" => handle_tool_call(req, state, session_id).await,
        method if state.tools.contains(method) => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": method,
                    "arguments": req.params_or_empty(),
                })),
            };
            handle_tool_call(wrapped, state, session_id).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

fn handle_initialize(req: &Request) -> Response {
    let client = req.params.as_ref().and_then(|p| p.get("clientInfo"));
    let client_name = client
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let client_version = client
        .and_then(|c| c.get("version"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    info!("[INIT] client={} version={}", client_name, client_version);

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "instructions": "Aave V3 lending MCP server. Builds unsigned, fully populated EVM transactions for deposit, withdraw, borrow and repay, and reports account and reserve data. Call set_account_info first to work without explicit addresses.",
        }),
    )
}

/// Handles the 'tools/list' request from the registry.
fn handle_tools_list(req: &Request, state: &AppState) -> Response {
    Response::success(req.id.clone(), json!({ "tools": state.tools.definitions() }))
}

/// Handles a 'tools/call' request by dispatching it to the registered tool.
async fn handle_tool_call(req: Request, state: &AppState, session_id: &str) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let tool = match state.tools.get(tool_name) {
        Some(tool) => tool,
        None => {
            return Response::error(
                req.id.clone(),
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", tool_name),
            )
        }
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args);

    info!("[CALL] tool={} session={} args={}", tool_name, session_id, args);
    let started = Instant::now();

    match tool.call(session_id, args).await {
        Ok(output) => {
            info!(
                "[OK] tool={} duration={:?} result={}",
                tool_name,
                started.elapsed(),
                preview(&output.text)
            );
            Response::success(req.id.clone(), tool_result(&output.text, false))
        }
        Err(ToolError::InvalidParams(message)) => {
            warn!("[FAIL] tool={} duration={:?} error={}", tool_name, started.elapsed(), message);
            Response::error(req.id.clone(), error_codes::INVALID_PARAMS, message)
        }
        Err(ToolError::Failed(message)) => {
            warn!("[FAIL] tool={} duration={:?} error={}", tool_name, started.elapsed(), message);
            Response::success(req.id.clone(), tool_result(&message, true))
        }
    }
}

/// Single-line prefix of a tool result for the call log.
fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_LIMIT {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_LIMIT).collect();
    cut.push_str("...");
    cut
}
