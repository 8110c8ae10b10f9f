//! # Relay Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide a gRPC server
//! definition for integration testing the `protocall` crates. It is not
//! intended for production use.
//!
//! The `.proto` source is exposed as [`PROTO_SOURCE`] so tests can feed the
//! exact same schema to the runtime resolver that this crate was compiled
//! from.

pub mod pb {
    include!(concat!(env!("OUT_DIR"), "/relay.rs"));
}

pub use pb::relay_server::{Relay, RelayServer};

/// The schema this crate was generated from, as runtime proto text.
pub const PROTO_SOURCE: &str = include_str!("../proto/relay.proto");
