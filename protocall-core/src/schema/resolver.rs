//! # Schema Graph Construction
//!
//! Builds a resolved [`SchemaGraph`] out of in-memory proto sources (or files
//! staged on disk). Parsing is per-file via `protox-parse`; cross-referencing
//! happens in a single pass when all files are handed to
//! `prost_reflect::DescriptorPool`, so the order in which users supply their
//! files does not matter.
//!
//! Every build is seeded with the vendored `google.protobuf` well-known
//! files, and each user file implicitly imports all of them. A user file that
//! reuses a well-known filename (or repeats an earlier filename) is skipped:
//! the first definition wins.
use super::{source::VirtualProtoFile, well_known};
use prost_reflect::{DescriptorError, DescriptorPool, MessageDescriptor, MethodDescriptor, ServiceDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, trace};

/// Errors raised while turning proto sources into a [`SchemaGraph`].
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to parse '{filename}': '{source}'")]
    Parse {
        filename: String,
        source: protox_parse::ParseError,
    },
    #[error("Failed to read proto file '{filename}': '{source}'")]
    Read {
        filename: String,
        source: std::io::Error,
    },
    #[error("Failed to resolve schema: '{0}'")]
    Resolve(#[from] DescriptorError),
}

/// A fully resolved Protobuf schema: every type reference checked, every
/// import satisfied, well-known types included.
///
/// Cheap to clone; the underlying descriptor pool is reference counted.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    pool: DescriptorPool,
}

impl SchemaGraph {
    /// Resolves a set of in-memory proto files into a schema graph.
    ///
    /// An empty set is valid and yields a graph containing only the
    /// well-known types.
    pub fn from_files(files: &[VirtualProtoFile]) -> Result<Self, SchemaError> {
        let mut parsed: Vec<FileDescriptorProto> = well_known::WELL_KNOWN_FILES.clone();
        let mut seen: HashSet<&str> = HashSet::new();

        for file in files {
            if well_known::is_well_known(&file.filename) || !seen.insert(&file.filename) {
                trace!(filename = %file.filename, "skipping duplicate proto file");
                continue;
            }
            let descriptor = protox_parse::parse(&file.filename, &file.content).map_err(
                |source| SchemaError::Parse {
                    filename: file.filename.clone(),
                    source,
                },
            )?;
            parsed.push(with_implicit_well_known_imports(descriptor));
        }

        let file = order_by_imports(parsed);
        let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file })?;

        debug!(
            files = pool.files().count(),
            services = pool.services().count(),
            "proto schema resolved"
        );
        Ok(Self { pool })
    }

    /// Resolves proto files from disk, addressed relative to `root`.
    ///
    /// This is the path the call client takes after staging its sources, and
    /// what `--proto` flags go through.
    pub fn from_dir(root: &Path, filenames: &[String]) -> Result<Self, SchemaError> {
        let mut files = Vec::with_capacity(filenames.len());
        for filename in filenames {
            let content =
                std::fs::read_to_string(root.join(filename)).map_err(|source| SchemaError::Read {
                    filename: filename.clone(),
                    source,
                })?;
            files.push(VirtualProtoFile::new(filename.clone(), content));
        }
        Self::from_files(&files)
    }

    /// The underlying descriptor pool.
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Looks up a service by fully qualified name (e.g. `pkg.Tracker`).
    pub fn service(&self, full_name: &str) -> Option<ServiceDescriptor> {
        self.pool.get_service_by_name(full_name)
    }

    /// Looks up a message by fully qualified name.
    pub fn message(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.pool.get_message_by_name(full_name)
    }

    /// Looks up a method by service full name and method name.
    pub fn method(&self, service: &str, method: &str) -> Option<MethodDescriptor> {
        self.service(service)?.methods().find(|m| m.name() == method)
    }
}

/// Makes every well-known file an implicit dependency, so user files can use
/// `google.protobuf.*` types without spelling out the imports.
fn with_implicit_well_known_imports(mut file: FileDescriptorProto) -> FileDescriptorProto {
    for (name, _) in well_known::WELL_KNOWN_SOURCES {
        if !file.dependency.iter().any(|dep| dep == name) {
            file.dependency.push((*name).to_string());
        }
    }
    file
}

/// Orders files so that imports come before importers, keeping the given
/// order among unrelated files. Unknown imports do not block their importer,
/// and an import cycle falls back to the given order; both cases are reported
/// by the resolution pass itself.
fn order_by_imports(files: Vec<FileDescriptorProto>) -> Vec<FileDescriptorProto> {
    let known: HashSet<String> = files.iter().filter_map(|f| f.name.clone()).collect();
    let mut ordered = Vec::with_capacity(files.len());
    let mut placed: HashSet<String> = HashSet::new();
    let mut remaining = files;

    while !remaining.is_empty() {
        let mut deferred = Vec::new();
        let mut progressed = false;

        for file in remaining {
            let blocked = file
                .dependency
                .iter()
                .any(|dep| known.contains(dep) && !placed.contains(dep));
            if blocked {
                deferred.push(file);
            } else {
                if let Some(name) = file.name.clone() {
                    placed.insert(name);
                }
                ordered.push(file);
                progressed = true;
            }
        }

        if !progressed {
            ordered.extend(deferred);
            break;
        }
        remaining = deferred;
    }

    ordered
}
