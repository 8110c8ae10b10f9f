//! # Generic gRPC Transport
//!
//! This module contains the low-level building blocks for performing gRPC
//! calls using dynamic message types.
//!
//! Unlike standard `tonic` clients which are strongly typed (e.g.,
//! `HelloRequest`), the components here work with generic `serde_json::Value`
//! structures, transcoding them to Protobuf binary format on the fly against
//! descriptors resolved at runtime. `google.protobuf.Any` fields are expanded
//! and embedded along the way; see [`transcode`] for the exact policies.
pub mod client;
pub mod codec;
pub mod transcode;

pub use client::{GrpcClient, GrpcRequestError};
pub use codec::JsonCodec;
