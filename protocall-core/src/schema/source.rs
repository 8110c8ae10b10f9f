//! # Proto Source Splitting
//!
//! Users paste Protobuf definitions as a single block of text. That block may
//! describe several `.proto` files at once, separated by boundary marker
//! lines, so that schemas with imports can be supplied without touching the
//! filesystem.
use regex::Regex;

/// Regex pattern for a file boundary marker line.
/// Format: `[[== filename.proto ==]]` with one or more `=` on each side.
/// The filename may not contain `]` or `=` and must end in `.proto`.
const BOUNDARY_PATTERN: &str = r"^\[\[=+\s*([^\]=]*\.proto)\s*=+\]\]$";

/// A named Protobuf source file held in memory.
///
/// This is the unit the schema resolver consumes; the filename is the path
/// other files use in their `import` statements (e.g. `common.proto`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualProtoFile {
    pub filename: String,
    pub content: String,
}

impl VirtualProtoFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Splits a pasted Protobuf text blob into named [`VirtualProtoFile`]s.
///
/// Without any boundary marker the whole (trimmed) blob becomes a single file
/// named `main.proto`. With markers, each section is named by the marker that
/// precedes it: text before the first marker is discarded, and sections whose
/// trimmed content is empty are dropped.
///
/// There is no escaping: a content line that happens to match the marker
/// grammar always starts a new section.
pub fn split_proto_text(text: &str) -> Vec<VirtualProtoFile> {
    let boundary = Regex::new(BOUNDARY_PATTERN).unwrap();

    if !text.lines().any(|line| boundary.is_match(line)) {
        return vec![VirtualProtoFile::new("main.proto", text.trim())];
    }

    let mut files = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(captures) = boundary.captures(line) {
            push_section(&mut files, current.take());
            current = Some((captures[1].trim().to_string(), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
        // Lines before the first marker are ignored.
    }
    push_section(&mut files, current);

    files
}

fn push_section(files: &mut Vec<VirtualProtoFile>, section: Option<(String, Vec<&str>)>) {
    if let Some((filename, lines)) = section {
        let content = lines.join("\n");
        let content = content.trim();
        if !content.is_empty() {
            files.push(VirtualProtoFile::new(filename, content));
        }
    }
}
