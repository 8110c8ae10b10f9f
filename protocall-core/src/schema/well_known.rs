//! # Well-Known Type Registry
//!
//! The `google.protobuf` well-known types ship with the crate so that user
//! schemas can reference `Any`, `Timestamp`, `Struct` and friends whether or
//! not they import them. The vendored sources are parsed once per process and
//! reused by every schema build.
use prost_types::FileDescriptorProto;
use std::sync::LazyLock;

/// Vendored well-known sources, keyed by canonical import path.
pub(crate) const WELL_KNOWN_SOURCES: &[(&str, &str)] = &[
    (
        "google/protobuf/any.proto",
        include_str!("../../protos/google/protobuf/any.proto"),
    ),
    (
        "google/protobuf/duration.proto",
        include_str!("../../protos/google/protobuf/duration.proto"),
    ),
    (
        "google/protobuf/empty.proto",
        include_str!("../../protos/google/protobuf/empty.proto"),
    ),
    (
        "google/protobuf/struct.proto",
        include_str!("../../protos/google/protobuf/struct.proto"),
    ),
    (
        "google/protobuf/timestamp.proto",
        include_str!("../../protos/google/protobuf/timestamp.proto"),
    ),
    (
        "google/protobuf/wrappers.proto",
        include_str!("../../protos/google/protobuf/wrappers.proto"),
    ),
];

/// The embedded sources parsed once per process. A file that fails to parse
/// is skipped rather than failing every schema build.
pub(crate) static WELL_KNOWN_FILES: LazyLock<Vec<FileDescriptorProto>> = LazyLock::new(|| {
    WELL_KNOWN_SOURCES
        .iter()
        .filter_map(|(name, source)| protox_parse::parse(name, source).ok())
        .collect()
});

/// Whether `filename` is one of the vendored well-known files.
pub(crate) fn is_well_known(filename: &str) -> bool {
    WELL_KNOWN_SOURCES.iter().any(|(name, _)| *name == filename)
}
