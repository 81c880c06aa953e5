//! Local IPC layer for `console-worker-ctl` interaction.
//!
//! Provides a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! server that accepts JSON-line commands from the companion CLI and feeds
//! them into the worker's command queue.

pub mod server;

use interprocess::local_socket::{tokio::prelude::*, tokio::Stream, GenericNamespaced};

/// Whether a command queue with this socket name is already being served.
///
/// Used as a single-instance guard at startup.
pub async fn queue_exists(name: &str) -> bool {
    let Ok(socket_name) = name.to_ns_name::<GenericNamespaced>() else {
        return false;
    };
    Stream::connect(socket_name).await.is_ok()
}
