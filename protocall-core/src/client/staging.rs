//! # Ephemeral Proto Staging
//!
//! The schema compiler works against files on disk, so each client stages its
//! proto sources into a uniquely named temporary directory for the duration
//! of the connection: every vendored well-known file plus every user file,
//! with sub-directories created as needed for path-like filenames.
//!
//! The directory is removed when the stage is closed or dropped, whichever
//! comes first, so no execution path leaks temp state.
use crate::schema::{VirtualProtoFile, well_known};
use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A staged set of proto files, removed from disk on drop.
#[derive(Debug)]
pub struct StagedProtos {
    dir: TempDir,
    filenames: Vec<String>,
}

impl StagedProtos {
    /// Materializes the well-known set plus `files` under a fresh temp
    /// directory. Files reusing a well-known filename or repeating an
    /// earlier filename are skipped, mirroring the schema resolver.
    pub fn write(files: &[VirtualProtoFile]) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("protocall-protos-")
            .tempdir()?;

        for (name, content) in well_known::WELL_KNOWN_SOURCES {
            std::fs::write(staged_path(dir.path(), name)?, content)?;
        }

        let mut filenames = Vec::with_capacity(files.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for file in files {
            if well_known::is_well_known(&file.filename) || !seen.insert(&file.filename) {
                continue;
            }
            std::fs::write(staged_path(dir.path(), &file.filename)?, &file.content)?;
            filenames.push(file.filename.clone());
        }

        debug!(
            path = %dir.path().display(),
            files = filenames.len(),
            "staged proto sources"
        );
        Ok(Self { dir, filenames })
    }

    /// The staging directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The staged user filenames, relative to [`Self::root`]. The well-known
    /// files are on disk too but the resolver seeds them from memory.
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Removes the staging directory eagerly, reporting deletion errors.
    /// Dropping without calling this removes it silently instead.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(path = %path.display(), "removed staged proto sources");
        Ok(())
    }
}

/// Joins `name` onto `root`, creating parent directories. Absolute names and
/// names with `..` components are rejected so a filename can never address
/// anything outside the staging directory.
fn staged_path(root: &Path, name: &str) -> io::Result<PathBuf> {
    let relative = Path::new(name);
    let contained = relative.is_relative()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !contained {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid proto filename: '{name}'"),
        ));
    }

    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, content: &str) -> VirtualProtoFile {
        VirtualProtoFile::new(name, content)
    }

    #[test]
    fn stages_user_files_and_well_known_set() {
        let staged = StagedProtos::write(&[
            file("main.proto", "syntax = \"proto3\";"),
            file("nested/common.proto", "syntax = \"proto3\";"),
        ])
        .unwrap();

        assert!(staged.root().join("main.proto").is_file());
        assert!(staged.root().join("nested/common.proto").is_file());
        assert!(staged.root().join("google/protobuf/any.proto").is_file());
        assert_eq!(
            staged.filenames(),
            &["main.proto".to_string(), "nested/common.proto".to_string()]
        );
    }

    #[test]
    fn close_removes_the_directory() {
        let staged = StagedProtos::write(&[file("main.proto", "")]).unwrap();
        let root = staged.root().to_path_buf();
        assert!(root.is_dir());
        staged.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn drop_removes_the_directory() {
        let root = {
            let staged = StagedProtos::write(&[file("main.proto", "")]).unwrap();
            staged.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn escaping_filenames_are_rejected() {
        for name in ["../evil.proto", "/abs/evil.proto", "a/../../evil.proto"] {
            let result = StagedProtos::write(&[file(name, "")]);
            assert!(result.is_err(), "expected rejection for {name:?}");
        }
    }

    #[test]
    fn duplicate_filenames_keep_the_first_content() {
        let staged = StagedProtos::write(&[
            file("a.proto", "// first"),
            file("a.proto", "// second"),
        ])
        .unwrap();
        let content = std::fs::read_to_string(staged.root().join("a.proto")).unwrap();
        assert_eq!(content, "// first");
    }

    #[test]
    fn user_files_cannot_replace_well_known_sources() {
        let staged =
            StagedProtos::write(&[file("google/protobuf/any.proto", "// bogus")]).unwrap();
        let content =
            std::fs::read_to_string(staged.root().join("google/protobuf/any.proto")).unwrap();
        assert!(content.contains("message Any"));
        assert!(staged.filenames().is_empty());
    }
}
