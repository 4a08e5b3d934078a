//! Shared test utilities for the inkpress test suite.
//!
//! In-memory documents and records for the decision and merge logic, plus
//! on-disk helpers for tests that drive the whole pipeline.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let hello = doc("hello", "---\nname: Hi\n---\nbody");
//! let record = record_for(&hello, "2024 March 01 00:00:00");
//! assert_eq!(record.output_path, "hello.html");
//! ```

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::{Document, hash_bytes, parse_document};
use crate::naming;
use crate::render::{PageInfo, RenderError, Renderer};
use crate::state::PublishRecord;

// =========================================================================
// Documents and records
// =========================================================================

/// Root that in-memory documents pretend to live under.
pub fn content_root() -> &'static Path {
    Path::new("/content")
}

/// A document named `<stem>.md` directly under [`content_root`].
///
/// Panics when `contents` has malformed front matter.
pub fn doc(stem: &str, contents: &str) -> Document {
    let (metadata, body) = parse_document(contents).unwrap();
    Document {
        id: naming::document_identity(stem),
        stem: stem.to_string(),
        source_path: content_root().join(format!("{stem}.md")),
        metadata,
        body,
        source_hash: hash_bytes(contents.as_bytes()),
    }
}

/// The record a first publish of `doc` would have produced.
pub fn record_for(doc: &Document, published: &str) -> PublishRecord {
    PublishRecord {
        name: naming::display_title(&doc.stem),
        published: published.to_string(),
        content_path: format!("{}.md", doc.stem),
        output_path: format!("{}.html", doc.stem),
        republished: None,
        source_hash: Some(doc.source_hash.clone()),
    }
}

// =========================================================================
// Clock
// =========================================================================

/// [`fixed_now`] in the canonical format.
pub const FIXED_NOW_CANONICAL: &str = "2024 March 10 12:00:00";

/// 2024-03-10 12:00:00 at UTC-05:00, the default reference zone.
pub fn fixed_now() -> DateTime<FixedOffset> {
    let zone = FixedOffset::west_opt(5 * 3600).unwrap();
    zone.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

/// [`fixed_now`] as the UTC instant a build is started with.
pub fn fixed_now_utc() -> DateTime<Utc> {
    fixed_now().with_timezone(&Utc)
}

// =========================================================================
// Filesystem
// =========================================================================

/// Write a markdown source under `root`, creating directories as needed.
pub fn write_source(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

// =========================================================================
// Collaborators
// =========================================================================

/// Renderer that echoes the body, so page contents are easy to assert on.
#[derive(Debug, Default)]
pub struct StubRenderer;

impl Renderer for StubRenderer {
    fn render(&self, body: &str) -> Result<String, RenderError> {
        Ok(format!("<p>{}</p>", body.trim()))
    }

    fn wrap(&self, fragment: &str, page: &PageInfo<'_>) -> Result<String, RenderError> {
        Ok(format!("<title>{}</title>{}", page.title, fragment))
    }
}
