//! JSON-lines tool protocol.
//!
//! One request per line:
//!
//! ```text
//! {"id": 1, "tool": "lookup_charity", "arguments": {"ein": "12-3456789"}}
//! ```
//!
//! and one response per line:
//!
//! ```text
//! {"id": 1, "ok": true, "text": "# Helping Hands\n..."}
//! ```
//!
//! Failures of any kind (bad JSON, unknown tool, invalid arguments, upstream errors) come back as
//! `ok: false` with a readable `text`; the loop keeps serving until its input ends.

use crate::gateway::CharityGateway;
use crate::rate_limit::spawn_sweeper;
use crate::validation::SearchArgs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Tools exposed over the protocol.
pub const TOOLS: &[&str] =
    &["lookup_charity", "check_public_charity", "search_charities", "list_organizations"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: Option<Value>,
    pub ok: bool,
    pub text: String,
}

impl ToolResponse {
    fn ok(id: Option<Value>, text: String) -> Self {
        Self { id, ok: true, text }
    }

    fn failed(id: Option<Value>, text: String) -> Self {
        Self { id, ok: false, text }
    }
}

#[derive(Debug, Deserialize)]
struct EinArgs {
    ein: String,
}

#[derive(Debug, Deserialize)]
struct SinceArgs {
    since: String,
}

fn arguments<T: serde::de::DeserializeOwned>(tool: &str, raw: Value) -> Result<T, String> {
    let raw = if raw.is_null() { Value::Object(Default::default()) } else { raw };
    serde_json::from_value(raw).map_err(|e| format!("Invalid arguments for `{tool}`: {e}"))
}

/// Run one request against the gateway.
pub async fn dispatch(gateway: &CharityGateway, request: ToolRequest) -> ToolResponse {
    let ToolRequest { id, tool, arguments: raw } = request;

    let outcome = match tool.as_str() {
        "lookup_charity" => match arguments::<EinArgs>(&tool, raw) {
            Ok(args) => gateway.lookup_charity(&args.ein).await,
            Err(text) => return ToolResponse::failed(id, text),
        },
        "check_public_charity" => match arguments::<EinArgs>(&tool, raw) {
            Ok(args) => gateway.check_public_charity(&args.ein).await,
            Err(text) => return ToolResponse::failed(id, text),
        },
        "search_charities" => match arguments::<SearchArgs>(&tool, raw) {
            Ok(args) => gateway.search_charities(&args).await,
            Err(text) => return ToolResponse::failed(id, text),
        },
        "list_organizations" => match arguments::<SinceArgs>(&tool, raw) {
            Ok(args) => gateway.list_organizations(&args.since).await,
            Err(text) => return ToolResponse::failed(id, text),
        },
        other => {
            return ToolResponse::failed(
                id,
                format!("Unknown tool `{other}`. Available tools: {}", TOOLS.join(", ")),
            )
        }
    };

    match outcome {
        Ok(text) => ToolResponse::ok(id, text),
        Err(error) => {
            tracing::info!(tool = %tool, error = %error, "tool call failed");
            ToolResponse::failed(id, gateway.describe_error(&error))
        }
    }
}

/// Parse and dispatch one line of input.
pub async fn handle_line(gateway: &CharityGateway, line: &str) -> ToolResponse {
    match serde_json::from_str::<ToolRequest>(line) {
        Ok(request) => dispatch(gateway, request).await,
        Err(e) => ToolResponse::failed(None, format!("Malformed request: {e}")),
    }
}

/// Serve requests from `input` until EOF, writing one response line per non-blank request line.
///
/// The gateway's limiter is swept every `sweep_interval` while the loop runs.
pub async fn serve<R, W>(
    gateway: &CharityGateway,
    input: R,
    output: W,
    sweep_interval: Duration,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let sweeper = spawn_sweeper(gateway.limiter().clone(), sweep_interval);
    let served = serve_lines(gateway, input, output).await;
    sweeper.abort();
    served
}

async fn serve_lines<R, W>(gateway: &CharityGateway, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(gateway, &line).await;
        let mut encoded = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        encoded.push(b'\n');
        output.write_all(&encoded).await?;
        output.flush().await?;
    }
    tracing::info!("input closed; stopping");
    Ok(())
}
