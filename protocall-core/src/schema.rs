//! # Schema Resolution
//!
//! This module turns user-supplied Protobuf *source text* into a resolved
//! [`SchemaGraph`] that the rest of the crate can look types up in.
//!
//! The pipeline has three stages:
//!
//! 1. **[`split_proto_text`]**: one pasted blob may describe several `.proto`
//!    files separated by `[[== name.proto ==]]` marker lines. The splitter
//!    turns the blob into named [`VirtualProtoFile`]s.
//! 2. **[`SchemaGraph`]**: each file is parsed and cross-referenced into a
//!    `prost_reflect::DescriptorPool`. The `google.protobuf` well-known types
//!    are pre-seeded so user files can mention `google.protobuf.Any`,
//!    `Timestamp` and friends without importing them.
//! 3. **[`services`]**: a flat discovery view (service, methods, streaming
//!    shapes) for pickers and CLIs.
pub mod catalog;
pub mod resolver;
pub mod source;
pub(crate) mod well_known;

pub use catalog::{MethodInfo, ServiceInfo, services};
pub use resolver::{SchemaError, SchemaGraph};
pub use source::{VirtualProtoFile, split_proto_text};
