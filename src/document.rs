//! Source document discovery and loading.
//!
//! A document is a `.md` file anywhere under the content root. It may start
//! with a YAML front-matter block fenced by `---` lines:
//!
//! ```text
//! ---
//! name: A Better Title
//! published: 2024-03-05
//! draft: false
//! ---
//! The body, in markdown.
//! ```
//!
//! Front matter is optional. A file that does not start with `---` is all
//! body and has empty metadata. A file that opens a block but never closes
//! it, or whose block is not a YAML mapping, is a
//! [`DocumentError::Malformed`] document and is skipped.
//!
//! Keys other than `name`, `published` and `draft` are kept and ignored.

use crate::naming;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const FENCE: &str = "---";
const MARKDOWN_EXTENSION: &str = "md";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed document {path}: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("walking content directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Front-matter metadata of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(Mapping);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Explicit display name, if set to a non-empty string.
    pub fn name(&self) -> Option<&str> {
        self.get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Explicit `published` value, if set and not empty.
    pub fn published(&self) -> Option<&Value> {
        self.get("published").filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }

    /// Whether the document is marked as a draft.
    ///
    /// Accepts `true`, and the strings `"true"` / `"yes"` for hand-written
    /// front matter.
    pub fn is_draft(&self) -> bool {
        match self.get("draft") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes")
            }
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A source document, loaded fresh on every run.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identity: slug of the file stem.
    pub id: String,
    /// File stem, used for the output file name and fallback title.
    pub stem: String,
    pub source_path: PathBuf,
    pub metadata: Metadata,
    pub body: String,
    /// SHA-256 of the source file, hex-encoded.
    pub source_hash: String,
}

impl Document {
    /// Path of the source relative to `content_root`, `/`-separated.
    ///
    /// Falls back to the full source path when it is not under the root.
    pub fn content_path(&self, content_root: &Path) -> String {
        let relative = self
            .source_path
            .strip_prefix(content_root)
            .unwrap_or(&self.source_path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn is_draft(&self) -> bool {
        self.metadata.is_draft()
    }
}

/// Load a document from disk.
pub fn load(path: &Path) -> Result<Document, DocumentError> {
    let bytes = fs::read(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes.clone()).map_err(|e| DocumentError::Malformed {
        path: path.to_path_buf(),
        message: format!("not valid UTF-8: {}", e),
    })?;
    let (metadata, body) =
        parse_document(&text).map_err(|message| DocumentError::Malformed {
            path: path.to_path_buf(),
            message,
        })?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Document {
        id: naming::document_identity(&stem),
        stem,
        source_path: path.to_path_buf(),
        metadata,
        body,
        source_hash: hash_bytes(&bytes),
    })
}

/// Split a document into front matter and body.
///
/// Returns a description of the problem when the front matter is present
/// but unusable.
pub fn parse_document(input: &str) -> Result<(Metadata, String), String> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let Some(after_open) = strip_fence_line(input) else {
        return Ok((Metadata::default(), input.to_string()));
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return Ok((parse_front_matter(yaml)?, body.to_string()));
        }
        offset += line.len();
    }
    Err("front matter opened with `---` but never closed".to_string())
}

/// If `input` starts with a `---` line, return what follows it.
fn strip_fence_line(input: &str) -> Option<&str> {
    let rest = input.strip_prefix(FENCE)?;
    let rest = rest.trim_start_matches([' ', '\t']);
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

fn parse_front_matter(yaml: &str) -> Result<Metadata, String> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::default());
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(map)) => Ok(Metadata(map)),
        Ok(Value::Null) => Ok(Metadata::default()),
        Ok(_) => Err("front matter must be a mapping of keys to values".to_string()),
        Err(e) => Err(format!("front matter is not valid YAML: {}", e)),
    }
}

/// Every `.md` file under `root`, in file-name order within each directory.
///
/// Hidden files and directories are skipped.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .map(|e| e.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
                .unwrap_or(false)
        {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// SHA-256 of the given bytes, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
