//! # Call Client
//!
//! This module implements the high-level logic for invoking gRPC methods
//! described only by runtime proto text.
//!
//! A [`CallClient`] is built from a [`ConnectionConfig`]: the proto sources
//! are staged on disk, compiled into a [`SchemaGraph`], and the requested
//! service is bound. The client then dispatches JSON-bodied calls over a
//! single transport:
//!
//! * [`CallClient::unary`] for single request/response methods,
//! * [`CallClient::server_streaming`] for methods returning a stream, fully
//!   collected in arrival order,
//! * [`CallClient::call`] to dispatch on the method's declared shape.
//!
//! The staged sources and the transport belong exclusively to one client and
//! are released exactly once, on [`CallClient::close`] or on drop.
pub mod staging;

use crate::BoxError;
use crate::grpc::client::{GrpcClient, GrpcRequestError, sanitize_metadata};
use crate::grpc::transcode::DecodeMode;
use crate::schema::{SchemaError, SchemaGraph, VirtualProtoFile, split_proto_text};
use futures_util::TryStreamExt;
use http_body::Body as HttpBody;
use prost_reflect::{MethodDescriptor, ServiceDescriptor};
use staging::StagedProtos;
use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::debug;

/// Connection-level configuration for a [`CallClient`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address as `host:port`. A value already carrying a scheme is
    /// used verbatim; otherwise [`Self::use_tls`] picks `https` or `http`.
    pub host: String,
    /// Negotiate TLS using the system trust roots.
    pub use_tls: bool,
    /// Metadata attached to every call. Keys are lowercased and trimmed,
    /// values trimmed, and pairs with an empty side dropped before
    /// transmission.
    pub metadata: Vec<(String, String)>,
    /// The proto sources describing the server's schema.
    pub proto_files: Vec<VirtualProtoFile>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost:50051".to_string(),
            use_tls: false,
            metadata: Vec::new(),
            proto_files: Vec::new(),
        }
    }
}

impl ConnectionConfig {
    /// Builds a config whose proto files come from one pasted text blob;
    /// see [`split_proto_text`] for the boundary marker grammar.
    pub fn from_proto_text(text: &str) -> Self {
        Self {
            proto_files: split_proto_text(text),
            ..Self::default()
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOptions {
    /// Deadline for the whole call, stream consumption included. Also sent
    /// to the server as the `grpc-timeout` request header.
    pub timeout: Option<Duration>,
    /// Rendering of decoded responses.
    pub response_format: DecodeMode,
}

/// The streaming shape a method declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodKind {
    pub client_streaming: bool,
    pub server_streaming: bool,
}

/// The result of a shape-dispatched call.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// A single response message.
    Unary(Result<serde_json::Value, tonic::Status>),
    /// Every streamed message in arrival order. A stream that fails midway
    /// rejects the whole call; no partial output is kept.
    Streaming(Result<Vec<serde_json::Value>, tonic::Status>),
}

/// Errors that can occur while building a [`CallClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("Failed to stage proto sources: '{0}'")]
    Staging(#[from] std::io::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    #[error("Invalid host '{0}': {1}")]
    InvalidHost(String, #[source] tonic::transport::Error),
    #[error("Failed to configure TLS for '{0}': {1}")]
    Tls(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// Errors that can occur during a call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error("Method '{0}' takes a request stream, which is not supported")]
    UnsupportedShape(String),
    #[error("Call to '{method}' exceeded its deadline of {after:?}")]
    DeadlineExceeded { method: String, after: Duration },
    #[error("gRPC client request error: '{0}'")]
    Grpc(#[from] GrpcRequestError),
}

/// A connected dynamic gRPC client bound to one service.
///
/// The generic parameter `S` is the underlying transport; tests inject an
/// in-process `tonic` service through [`CallClient::from_service`] while
/// production code connects a [`Channel`] via [`CallClient::connect`].
pub struct CallClient<S = Channel> {
    grpc: GrpcClient<S>,
    graph: SchemaGraph,
    service: ServiceDescriptor,
    metadata: Vec<(String, String)>,
    staging: StagedProtos,
}

/// Staged sources plus the schema and service resolved from them, ready to
/// pair with a transport.
struct ResolvedSchema {
    staging: StagedProtos,
    graph: SchemaGraph,
    service: ServiceDescriptor,
}

fn resolve_schema(config: &ConnectionConfig, service: &str) -> Result<ResolvedSchema, ClientBuildError> {
    let staging = StagedProtos::write(&config.proto_files)?;
    let graph = SchemaGraph::from_dir(staging.root(), staging.filenames())?;
    let service = graph
        .service(service)
        .ok_or_else(|| ClientBuildError::ServiceNotFound(service.to_string()))?;
    Ok(ResolvedSchema {
        staging,
        graph,
        service,
    })
}

impl CallClient<Channel> {
    /// Connects to `config.host` and binds `service` (fully qualified name).
    ///
    /// The proto sources are staged and compiled before anything is dialed,
    /// so schema problems never cost a connection attempt; every failure
    /// path tears the staged files down again.
    pub async fn connect(config: &ConnectionConfig, service: &str) -> Result<Self, ClientBuildError> {
        let schema = resolve_schema(config, service)?;

        let address = endpoint_address(&config.host, config.use_tls);
        let mut endpoint = Endpoint::new(address.clone())
            .map_err(|e| ClientBuildError::InvalidHost(config.host.clone(), e))?;
        if config.use_tls {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| ClientBuildError::Tls(config.host.clone(), e))?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientBuildError::ConnectionFailed(address, e))?;

        debug!(service = %schema.service.full_name(), host = %config.host, "call client connected");
        Ok(Self::assemble(channel, schema, &config.metadata))
    }
}

impl<S> CallClient<S>
where
    S: tonic::client::GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a client from an existing Tonic service/channel.
    pub fn from_service(
        transport: S,
        config: &ConnectionConfig,
        service: &str,
    ) -> Result<Self, ClientBuildError> {
        let schema = resolve_schema(config, service)?;
        debug!(service = %schema.service.full_name(), "call client bound");
        Ok(Self::assemble(transport, schema, &config.metadata))
    }

    fn assemble(transport: S, schema: ResolvedSchema, metadata: &[(String, String)]) -> Self {
        Self {
            grpc: GrpcClient::new(transport),
            graph: schema.graph,
            service: schema.service,
            metadata: sanitize_metadata(metadata),
            staging: schema.staging,
        }
    }

    /// The resolved schema, for discovery on a live client.
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    /// Fully qualified name of the bound service.
    pub fn service_name(&self) -> &str {
        self.service.full_name()
    }

    /// Directory the proto sources were staged into. The directory lives
    /// exactly as long as the client.
    pub fn staging_dir(&self) -> &std::path::Path {
        self.staging.root()
    }

    /// Reports the streaming shape of `method`, or `None` when the bound
    /// service declares no such method.
    pub fn method_kind(&self, method: &str) -> Option<MethodKind> {
        self.find_method(method).map(|m| MethodKind {
            client_streaming: m.is_client_streaming(),
            server_streaming: m.is_server_streaming(),
        })
    }

    /// Invokes a unary method with a JSON body.
    ///
    /// # Returns
    /// * `Ok(Ok(Value))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but the server returned an error.
    /// * `Err(CallError)` - The request never completed.
    pub async fn unary(
        &mut self,
        method: &str,
        body: serde_json::Value,
        options: CallOptions,
    ) -> Result<Result<serde_json::Value, tonic::Status>, CallError> {
        let descriptor = self.resolve_method(method)?;
        let call = async {
            self.grpc
                .unary(
                    descriptor,
                    body,
                    &self.metadata,
                    options.timeout,
                    options.response_format,
                )
                .await
                .map_err(CallError::Grpc)
        };

        match options.timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(result) => result,
                Err(_) => Err(CallError::DeadlineExceeded {
                    method: method.to_string(),
                    after,
                }),
            },
            None => call.await,
        }
    }

    /// Invokes a server-streaming method and collects every response message
    /// in arrival order.
    ///
    /// A status error partway through the stream rejects the whole call and
    /// discards messages already received.
    pub async fn server_streaming(
        &mut self,
        method: &str,
        body: serde_json::Value,
        options: CallOptions,
    ) -> Result<Result<Vec<serde_json::Value>, tonic::Status>, CallError> {
        let descriptor = self.resolve_method(method)?;
        let call = async {
            match self
                .grpc
                .server_streaming(
                    descriptor,
                    body,
                    &self.metadata,
                    options.timeout,
                    options.response_format,
                )
                .await
            {
                Ok(Ok(stream)) => Ok(stream.try_collect::<Vec<_>>().await),
                Ok(Err(status)) => Ok(Err(status)),
                Err(source) => Err(CallError::Grpc(source)),
            }
        };

        match options.timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(result) => result,
                Err(_) => Err(CallError::DeadlineExceeded {
                    method: method.to_string(),
                    after,
                }),
            },
            None => call.await,
        }
    }

    /// Dispatches a call on the method's declared streaming shape.
    ///
    /// Methods taking a request stream are rejected; the transport only
    /// speaks unary and server-streaming shapes.
    pub async fn call(
        &mut self,
        method: &str,
        body: serde_json::Value,
        options: CallOptions,
    ) -> Result<CallOutcome, CallError> {
        let descriptor = self.resolve_method(method)?;
        match (
            descriptor.is_client_streaming(),
            descriptor.is_server_streaming(),
        ) {
            (false, false) => Ok(CallOutcome::Unary(self.unary(method, body, options).await?)),
            (false, true) => Ok(CallOutcome::Streaming(
                self.server_streaming(method, body, options).await?,
            )),
            (true, _) => Err(CallError::UnsupportedShape(method.to_string())),
        }
    }

    /// Tears the client down, removing the staged proto sources eagerly and
    /// reporting deletion errors. Dropping without calling this cleans up
    /// silently; the transport closes when its last handle is dropped.
    ///
    /// Consuming `self` makes a second teardown unrepresentable.
    pub fn close(self) -> std::io::Result<()> {
        self.staging.close()
    }

    fn find_method(&self, method: &str) -> Option<MethodDescriptor> {
        self.service.methods().find(|m| m.name() == method)
    }

    fn resolve_method(&self, method: &str) -> Result<MethodDescriptor, CallError> {
        self.find_method(method)
            .ok_or_else(|| CallError::MethodNotFound(method.to_string()))
    }
}

fn endpoint_address(host: &str, use_tls: bool) -> String {
    if host.contains("://") {
        host.to_string()
    } else if use_tls {
        format!("https://{host}")
    } else {
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme_follows_the_tls_flag() {
        assert_eq!(endpoint_address("localhost:50051", false), "http://localhost:50051");
        assert_eq!(endpoint_address("api.example.com:443", true), "https://api.example.com:443");
    }

    #[test]
    fn explicit_scheme_is_used_verbatim() {
        assert_eq!(
            endpoint_address("https://api.example.com", false),
            "https://api.example.com"
        );
    }
}
