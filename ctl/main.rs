#![forbid(unsafe_code)]

//! `console-worker-ctl` — operator CLI companion for `console-worker`.
//!
//! Connects to the worker's command queue socket and sends one JSON request.

use std::io::{BufRead, BufReader, Write};

use clap::{Parser, Subcommand};
use interprocess::local_socket::{traits::Stream as _, GenericNamespaced, Stream, ToNsName};

#[derive(Debug, Parser)]
#[command(
    name = "console-worker-ctl",
    about = "Operator CLI for console-worker",
    version,
    long_about = None
)]
struct Cli {
    /// Command queue socket name (must match the worker's `queue_name`).
    #[arg(long, default_value = "consoleworker")]
    queue_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send command text to the worker.
    Tell {
        /// Command text; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the worker's status line.
    Status,

    /// Ask the worker to quit.
    Quit,
}

fn main() {
    let args = Cli::parse();

    let request_json = match &args.command {
        Command::Tell { text } => {
            serde_json::json!({ "command": "tell", "text": text.join(" ") })
        }
        Command::Status => serde_json::json!({ "command": "status" }),
        Command::Quit => serde_json::json!({ "command": "quit" }),
    };

    match send_ipc_command(&args.queue_name, &request_json) {
        Ok(response) => {
            if let Some(obj) = response.as_object() {
                let ok = obj
                    .get("ok")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                if ok {
                    if let Some(data) = obj.get("data") {
                        println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
                    } else {
                        println!("OK");
                    }
                } else {
                    let err_msg = obj
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error");
                    eprintln!("Error: {err_msg}");
                    std::process::exit(1);
                }
            } else {
                println!("{response}");
            }
        }
        Err(err) => {
            eprintln!("Failed to connect to worker: {err}");
            eprintln!("Is console-worker running with queue_name '{}'?", args.queue_name);
            std::process::exit(1);
        }
    }
}

/// Connect to the queue socket, send a JSON request, and read the response.
fn send_ipc_command(
    queue_name: &str,
    request: &serde_json::Value,
) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error>> {
    let name = queue_name.to_ns_name::<GenericNamespaced>()?;
    let mut stream = Stream::connect(name)?;

    let mut request_line = serde_json::to_string(request)?;
    request_line.push('\n');
    stream.write_all(request_line.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: serde_json::Value = serde_json::from_str(response_line.trim())?;
    Ok(response)
}
