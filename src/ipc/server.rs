//! Local IPC server for `console-worker-ctl` commands.
//!
//! Listens on a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! using the `interprocess` crate. Accepts line-delimited JSON requests and
//! routes them to the command queue or the status line.
//!
//! ## Protocol
//!
//! Request (one JSON object per line):
//! ```json
//! {"command": "tell", "text": "refresh caches"}
//! {"command": "status"}
//! {"command": "quit"}
//! ```
//!
//! Response (one JSON object per line):
//! ```json
//! {"ok": true, "data": { ... } }
//! {"ok": false, "error": "unknown command: foo"}
//! ```

use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::host::console::StatusSnapshot;
use crate::host::queue::QueueHandle;
use crate::{AppError, Result};

/// Shared state the IPC server routes requests to.
#[derive(Debug, Clone)]
pub struct IpcContext {
    /// Producing side of the worker's command queue.
    pub queue: QueueHandle,
    /// Live view of the worker's status line.
    pub status: watch::Receiver<StatusSnapshot>,
}

/// Inbound IPC request from `console-worker-ctl`.
#[derive(Debug, Deserialize)]
struct IpcRequest {
    /// Request verb.
    command: String,
    /// Command text (for `tell`).
    text: Option<String>,
}

/// Outbound IPC response to `console-worker-ctl`.
#[derive(Debug, Serialize)]
struct IpcResponse {
    /// Whether the request succeeded.
    ok: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IpcResponse {
    fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Spawn the IPC server task on the current runtime.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be created.
pub fn spawn_ipc_server(
    name: &str,
    context: IpcContext,
    ct: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let name = name.to_owned();

    let listener_name = name
        .clone()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Ipc(format!("invalid ipc socket name '{name}': {err}")))?;

    let listener = ListenerOptions::new()
        .name(listener_name)
        .create_tokio()
        .map_err(|err| AppError::Ipc(format!("failed to create ipc listener: {err}")))?;

    info!(ipc_name = %name, "IPC server listening");

    let handle = tokio::spawn(async move {
        let span = info_span!("ipc_server", name = %name);
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("IPC server shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok(stream) => {
                                tokio::spawn(handle_connection(stream, context.clone()));
                            }
                            Err(err) => {
                                warn!(%err, "IPC accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    });

    Ok(handle)
}

/// Handle a single IPC client connection.
async fn handle_connection(
    stream: interprocess::local_socket::tokio::Stream,
    context: IpcContext,
) {
    let span = info_span!("ipc_conn");
    async move {
        let (reader, mut writer) = stream.split();
        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match buf_reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let response = match serde_json::from_str::<IpcRequest>(trimmed) {
                        Ok(request) => dispatch_request(&request, &context).await,
                        Err(err) => IpcResponse::error(format!("invalid json: {err}")),
                    };

                    let mut response_line = serde_json::to_string(&response).unwrap_or_else(|_| {
                        r#"{"ok":false,"error":"serialization failed"}"#.to_owned()
                    });
                    response_line.push('\n');

                    if let Err(err) = writer.write_all(response_line.as_bytes()).await {
                        warn!(%err, "failed to write ipc response");
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "ipc read error");
                    break;
                }
            }
        }

        info!("IPC connection closed");
    }
    .instrument(span)
    .await;
}

/// Route an IPC request to the appropriate handler.
async fn dispatch_request(request: &IpcRequest, context: &IpcContext) -> IpcResponse {
    let span = info_span!("ipc_request", command = %request.command);
    async move {
        match request.command.as_str() {
            "tell" => handle_tell(request, context).await,
            "status" => handle_status(context),
            "quit" => handle_quit(context),
            other => IpcResponse::error(format!("unknown command: {other}")),
        }
    }
    .instrument(span)
    .await
}

/// Enqueue command text for the worker, verbatim.
async fn handle_tell(request: &IpcRequest, context: &IpcContext) -> IpcResponse {
    let Some(ref text) = request.text else {
        return IpcResponse::error("missing required 'text' field");
    };
    if text.trim().is_empty() {
        return IpcResponse::error("command text must not be empty");
    }

    match context.queue.tell(text.clone()).await {
        Ok(()) => {
            info!(text = %text, "command queued via IPC");
            IpcResponse::success(serde_json::json!({ "queued": text }))
        }
        Err(err) => IpcResponse::error(format!("failed to queue command: {err}")),
    }
}

/// Report the worker's current status line.
fn handle_status(context: &IpcContext) -> IpcResponse {
    let snapshot = context.status.borrow().clone();
    IpcResponse::success(serde_json::json!({
        "status": snapshot.line,
        "since": snapshot.since.to_rfc3339(),
    }))
}

/// Ask the worker to quit.
fn handle_quit(context: &IpcContext) -> IpcResponse {
    let already = context.queue.is_quit_pending();
    context.queue.request_quit();
    info!(already, "quit requested via IPC");
    IpcResponse::success(serde_json::json!({ "quit_pending": true }))
}
