#![forbid(unsafe_code)]

//! Long-running console worker.
//!
//! Operator commands arrive through a local IPC queue and are handled by a
//! cooperative [`worker::CommandLoop`]; everything the worker prints is
//! reassembled into whole lines by a [`sink::LineBufferedSink`] and sent to
//! the console log.

pub mod config;
pub mod errors;
pub mod host;
pub mod ipc;
pub mod sink;
pub mod worker;

pub use config::WorkerConfig;
pub use errors::{AppError, Result};
