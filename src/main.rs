#![forbid(unsafe_code)]

//! `console-worker` — operator-console worker binary.
//!
//! Loads configuration, guards against a second instance, starts the IPC
//! command queue for `console-worker-ctl`, and runs the command loop on its
//! own thread until quit or a shutdown signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use console_worker::host::console::{ConsoleLog, WatchStatusLine};
use console_worker::host::{queue, LogSink};
use console_worker::ipc::{self, server::IpcContext};
use console_worker::sink::escape_percent;
use console_worker::worker::{self, CommandLoop, WorkerStatus};
use console_worker::{AppError, Result, WorkerConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "console-worker", about = "Operator-console worker", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the command queue socket name.
    #[arg(long)]
    queue_name: Option<String>,

    /// Force debug output regardless of the config file.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = WorkerConfig::load_from_path(&args.config)?;
    if let Some(queue_name) = args.queue_name {
        config.queue_name = queue_name;
    }
    config.debug |= args.debug;

    let console = Arc::new(ConsoleLog::current());
    let log = |message: &str| {
        console.log_message(&escape_percent(&format!("{}: {message}", config.name)));
    };

    if ipc::queue_exists(&config.queue_name).await {
        log("Already running");
        return Ok(());
    }

    log(&format!(
        "Loading {} {} on {} {}",
        config.name,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    ));

    if config.debug {
        info!(?config, "resolved configuration");
    }

    let result = run_worker(&config, Arc::clone(&console)).await;
    if let Err(ref err) = result {
        log(&format!("Encountered error running {}: {err}", config.name));
    }

    log("Shutdown");
    result
}

async fn run_worker(config: &WorkerConfig, console: Arc<ConsoleLog>) -> Result<()> {
    let ct = CancellationToken::new();
    let status = Arc::new(WatchStatusLine::new(WorkerStatus::Initializing.as_str()));
    let (queue_handle, message_queue) = queue::channel(ct.clone());

    let ipc_handle = ipc::server::spawn_ipc_server(
        &config.queue_name,
        IpcContext {
            queue: queue_handle,
            status: status.subscribe(),
        },
        ct.clone(),
    )?;

    let wait = config.launch_wait();
    if !wait.is_zero() {
        info!(seconds = wait.as_secs(), "waiting before launch");
        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = shutdown_signal() => ct.cancel(),
        }
    }

    let command_loop = CommandLoop::from_config(config, status, console, Arc::new(message_queue));
    let worker_handle = worker::spawn(command_loop)?;

    // Cancel on a signal or once the worker stops on its own (quit).
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let joiner = tokio::task::spawn_blocking(move || {
        let joined = worker_handle.join();
        let _ = done_tx.send(());
        joined
    });

    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        _ = done_rx => info!("command loop exited"),
    }
    ct.cancel();

    let worker_result = match joiner.await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(AppError::Worker("command loop thread panicked".into())),
        Err(err) => Err(AppError::Worker(format!("failed to join command loop: {err}"))),
    };

    if let Err(err) = ipc_handle.await {
        error!(%err, "IPC server task failed");
    }

    worker_result
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
