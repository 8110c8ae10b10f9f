//! # Protocall CLI Entry Point
//!
//! The main executable for the Protocall tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`].
//! 2. **Schema**: Loads the proto sources (files and/or inline text) and resolves them locally.
//! 3. **Execution**: Lists the schema, or connects and performs calls through `protocall_core`.
//! 4. **Presentation**: Formats and prints the resulting data or error status to standard output/error.

mod cli;
mod formatter;

use clap::Parser;
use cli::{Cli, Commands};
use formatter::{FormattedString, GenericError, MethodList, RowMarker, ServiceList};
use protocall_core::DecodeMode;
use protocall_core::client::{CallClient, CallOptions, CallOutcome, ConnectionConfig};
use protocall_core::schema::{SchemaGraph, VirtualProtoFile, services, split_proto_text};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays valid JSON output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Cli::parse();
    let proto_files = load_proto_files(&args.protos, args.proto_text.as_deref());

    match args.command {
        Commands::Services => list_services(&proto_files),
        Commands::Methods { service } => list_methods(&proto_files, &service),
        Commands::Call {
            endpoint,
            body,
            batch,
            timeout_ms,
            raw,
        } => {
            let (service, method) = endpoint;
            let config = ConnectionConfig {
                host: args.host,
                use_tls: args.tls,
                metadata: args.headers,
                proto_files,
            };
            let options = CallOptions {
                timeout: timeout_ms.map(Duration::from_millis),
                response_format: if raw { DecodeMode::Raw } else { DecodeMode::Expand },
            };
            let bodies = match batch {
                Some(batch) => batch.0,
                None => vec![body.unwrap_or_else(|| serde_json::json!({}))],
            };
            run_call(&config, &service, &method, bodies, options).await;
        }
    }
}

fn load_proto_files(paths: &[PathBuf], inline: Option<&str>) -> Vec<VirtualProtoFile> {
    let mut files = Vec::new();
    for path in paths {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                eprintln!(
                    "{}",
                    FormattedString::from(GenericError(
                        "Failed to read proto file",
                        format!("{}: {err}", path.display())
                    ))
                );
                process::exit(1);
            }
        };
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("main.proto")
            .to_string();
        files.push(VirtualProtoFile::new(filename, content));
    }

    if let Some(text) = inline {
        files.extend(split_proto_text(text));
    }

    if files.is_empty() {
        eprintln!(
            "{}",
            FormattedString::from(GenericError(
                "No proto sources given",
                "pass --proto <path> and/or --proto-text <text>"
            ))
        );
        process::exit(1);
    }
    files
}

fn resolve_or_exit(proto_files: &[VirtualProtoFile]) -> SchemaGraph {
    match SchemaGraph::from_files(proto_files) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn list_services(proto_files: &[VirtualProtoFile]) {
    let graph = resolve_or_exit(proto_files);
    println!("{}", FormattedString::from(ServiceList(services(&graph))));
}

fn list_methods(proto_files: &[VirtualProtoFile], service: &str) {
    let graph = resolve_or_exit(proto_files);

    match services(&graph).into_iter().find(|s| s.full_name == service) {
        Some(service) => println!("{}", FormattedString::from(MethodList(service))),
        None => {
            eprintln!(
                "{}",
                FormattedString::from(GenericError("Service not found", service))
            );
            process::exit(1);
        }
    }
}

async fn run_call(
    config: &ConnectionConfig,
    service: &str,
    method: &str,
    bodies: Vec<serde_json::Value>,
    options: CallOptions,
) {
    let mut client = match CallClient::connect(config, service).await {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };

    let batch = bodies.len() > 1;
    let mut failed = false;
    for (row, body) in bodies.into_iter().enumerate() {
        if batch {
            println!("{}", FormattedString::from(RowMarker(row)));
        }
        match client.call(method, body, options).await {
            Ok(CallOutcome::Unary(Ok(value))) => println!("{}", FormattedString::from(value)),
            Ok(CallOutcome::Unary(Err(status))) => {
                failed = true;
                println!("{}", FormattedString::from(status));
            }
            Ok(CallOutcome::Streaming(Ok(values))) => print_stream(values),
            Ok(CallOutcome::Streaming(Err(status))) => {
                failed = true;
                println!("{}", FormattedString::from(status));
            }
            Err(err) => {
                failed = true;
                eprintln!("{}", FormattedString::from(err));
            }
        }
    }

    if let Err(err) = client.close() {
        eprintln!(
            "{}",
            FormattedString::from(GenericError("Failed to remove staged proto files", err))
        );
    }
    if failed {
        process::exit(1);
    }
}

fn print_stream(values: Vec<serde_json::Value>) {
    for value in values {
        println!("{}", FormattedString::from(value));
    }
}
