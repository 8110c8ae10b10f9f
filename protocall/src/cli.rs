//! # CLI
//!
//! This module defines the command-line interface of `protocall` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g.,
//! ensuring headers are `key:value` and bodies are valid JSON);
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "protocall", version, about = "Dynamic gRPC calls from proto source text")]
pub struct Cli {
    /// The server address to connect to (e.g. localhost:50051 or a full URL)
    #[arg(long, global = true, default_value = "localhost:50051")]
    pub host: String,

    /// Negotiate TLS using the system trust roots
    #[arg(long, global = true)]
    pub tls: bool,

    /// Metadata attached to every call (key:value, repeatable)
    #[arg(short = 'H', long = "header", global = true, value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Path to a .proto source file (repeatable, resolved together)
    #[arg(long = "proto", global = true)]
    pub protos: Vec<PathBuf>,

    /// Inline proto source; [[== name.proto ==]] marker lines split it into
    /// several files
    #[arg(long, global = true)]
    pub proto_text: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the services the proto sources declare
    ///
    /// The schema is resolved locally; no server connection is made.
    Services,

    /// List the methods of a service
    Methods {
        /// Fully qualified service name (e.g. my.package.Service)
        service: String,
    },

    /// Perform a gRPC call to a server
    ///
    /// This command connects to a gRPC server and executes a method using a JSON body.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// protocall --proto ./relay.proto call relay.Relay/Deliver --body '{"id": "1"}'
    /// ```
    Call {
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),

        /// JSON body of the request
        #[arg(long, value_parser = parse_body, conflicts_with = "batch")]
        body: Option<serde_json::Value>,

        /// JSON array of request bodies, sent one after another over the same
        /// connection
        #[arg(long, value_parser = parse_batch)]
        batch: Option<Batch>,

        /// Per-call deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Render responses structurally, leaving Any payloads opaque
        #[arg(long)]
        raw: bool,
    },
}

/// A parsed `--batch` argument: one request body per row.
#[derive(Clone)]
pub struct Batch(pub Vec<serde_json::Value>);

fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value.split_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'")
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_body(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}

fn parse_batch(value: &str) -> Result<Batch, String> {
    match serde_json::from_str(value) {
        Ok(serde_json::Value::Array(rows)) => Ok(Batch(rows)),
        Ok(_) => Err("Batch must be a JSON array of request bodies".to_string()),
        Err(e) => Err(format!("Invalid JSON: {e}")),
    }
}
