//! # Protocall Core
//!
//! `protocall-core` is the library behind the Protocall CLI. It lets a host
//! application invoke any gRPC service described only by Protobuf *source text*
//! supplied at runtime: no generated bindings, no compile-time schema, no
//! server reflection requirement.
//!
//! ## Key Components
//!
//! * **[`CallClient`]:** The main entry point. It stages the proto sources on
//!   disk, compiles them into a schema graph, binds a service and dispatches
//!   unary or server-streaming calls with JSON bodies.
//! * **[`schema`]:** Proto text splitting ([`schema::split_proto_text`]),
//!   schema resolution ([`schema::SchemaGraph`]) and service/method discovery
//!   ([`schema::services`]). The well-known `google.protobuf` types are always
//!   resolvable, imported or not.
//! * **[`grpc`]:** The schema-agnostic transport: a [`grpc::GrpcClient`] over
//!   any tonic service plus the [`grpc::JsonCodec`] that transcodes JSON to
//!   Protobuf bytes on the fly, including `google.protobuf.Any` expansion.
//!
//! ## JsonCodec
//!
//! An implementation of `tonic::codec::Codec` that transcodes JSON to Protobuf
//! bytes (and vice versa) on the fly.
//!
//! * **Encoder**: Validates `serde_json::Value` against the input `MessageDescriptor` and serializes it.
//! * **Decoder**: Decodes bytes into a `DynamicMessage` and renders it as JSON, expanding `Any` payloads.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that
//! consumers use compatible versions of these underlying dependencies.
//!
//! See the README.md for more details about usage.
pub mod client;
pub mod grpc;
pub mod schema;

pub use client::{CallClient, CallOptions, ConnectionConfig};
pub use grpc::transcode::DecodeMode;
pub use schema::{SchemaGraph, VirtualProtoFile, split_proto_text};

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
