//! The durable publish state.
//!
//! `site.toml` at the content root is the single source of truth for "has
//! this document been published". It is loaded once at the start of a run,
//! mutated in memory, and written back as the last step of a successful run.
//!
//! # Format
//!
//! ```toml
//! version = 1
//!
//! [config]
//! title = "Field Notes"
//!
//! [articles.hello]
//! name = "Hello"
//! published = "2024 March 05 09:30:00"
//! content_path = "hello.md"
//! output_path = "hello.html"
//! republished = "2024 March 07 18:02:11"
//! source_hash = "9f86d08..."
//! ```
//!
//! Articles appear in the order they were first published; new records are
//! appended after the last existing one, so diffs of the file stay small and
//! readable. `republished` and `source_hash` are optional, and the older
//! spelling `last_modified` is read as `republished`. A file without
//! `version` is a legacy file and reads as version 1. A file from a newer
//! version is refused.
//!
//! # Saving
//!
//! The file is kept as a [`toml_edit::DocumentMut`] alongside the typed
//! view. A save rewrites only `version` and the `[articles]` tables;
//! `[config]`, comments and anything else the user wrote survive as
//! written. The text goes through [`write_atomic`], so a crash mid-save
//! leaves the previous state intact.
//!
//! # Legacy Content-Path Lookup
//!
//! Older generations keyed records by source path instead of by identity.
//! [`ContentPathIndex`] maps every stored `content_path` back to its record
//! key so such records are still recognised. It is built once per run.

use crate::config::{ConfigError, SiteConfig};
use crate::write::write_atomic;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table, value};

/// Name of the state file within the content root.
pub const STATE_FILENAME: &str = "site.toml";

/// Version of the state format written by this build.
pub const STATE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("corrupt state file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("invalid [config] in {path}: {source}")]
    Config { path: PathBuf, source: ConfigError },
    #[error("reading state file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("writing state file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Durable metadata for one published document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishRecord {
    /// Display title.
    pub name: String,
    /// First publication time, canonical format. Sticky across republishes.
    pub published: String,
    /// Source path relative to the content root.
    pub content_path: String,
    /// Output path relative to the output root.
    pub output_path: String,
    /// Time of the latest republish, canonical format.
    #[serde(default, alias = "last_modified")]
    pub republished: Option<String>,
    /// SHA-256 of the source when it was last rendered.
    #[serde(default)]
    pub source_hash: Option<String>,
}

impl PublishRecord {
    /// The record as an `[articles.<id>]` table.
    fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.insert("name", value(self.name.as_str()));
        table.insert("published", value(self.published.as_str()));
        table.insert("content_path", value(self.content_path.as_str()));
        table.insert("output_path", value(self.output_path.as_str()));
        if let Some(republished) = &self.republished {
            table.insert("republished", value(republished.as_str()));
        }
        if let Some(hash) = &self.source_hash {
            table.insert("source_hash", value(hash.as_str()));
        }
        table.decor_mut().set_prefix("\n");
        table
    }

    /// File name component of the output path, used as the menu URL.
    pub fn url(&self) -> String {
        Path::new(&self.output_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.output_path.clone())
    }
}

/// Identity → record, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Articles {
    entries: Vec<(String, PublishRecord)>,
    positions: HashMap<String, usize>,
}

impl PartialEq for Articles {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Articles {
    pub fn get(&self, id: &str) -> Option<&PublishRecord> {
        self.positions.get(id).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PublishRecord)> {
        self.entries.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Insert or replace a record.
    ///
    /// An existing `id` keeps its position. When `previous_id` names a
    /// different existing entry (a record found through the legacy
    /// content-path lookup), that entry is renamed to `id` in place instead
    /// of appending a duplicate. Otherwise new ids are appended.
    pub fn upsert(&mut self, id: &str, record: PublishRecord, previous_id: Option<&str>) {
        if let Some(&i) = self.positions.get(id) {
            self.entries[i].1 = record;
            return;
        }
        if let Some(old) = previous_id
            && let Some(i) = self.positions.remove(old)
        {
            self.entries[i] = (id.to_string(), record);
            self.positions.insert(id.to_string(), i);
            return;
        }
        self.positions.insert(id.to_string(), self.entries.len());
        self.entries.push((id.to_string(), record));
    }
}

impl Articles {
    /// All records as one implicit `[articles]` table, in order.
    fn to_item(&self) -> Item {
        let mut table = Table::new();
        table.set_implicit(true);
        for (id, record) in &self.entries {
            table.insert(id, Item::Table(record.to_table()));
        }
        Item::Table(table)
    }
}

impl<'de> Deserialize<'de> for Articles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ArticlesVisitor;

        impl<'de> Visitor<'de> for ArticlesVisitor {
            type Value = Articles;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of article records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Articles, A::Error> {
                let mut articles = Articles::default();
                while let Some((id, record)) = access.next_entry::<String, PublishRecord>()? {
                    if articles.contains(&id) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate article {:?}",
                            id
                        )));
                    }
                    articles.upsert(&id, record, None);
                }
                Ok(articles)
            }
        }

        deserializer.deserialize_map(ArticlesVisitor)
    }
}

/// Typed view of `site.toml`.
#[derive(Deserialize)]
struct StateFile {
    #[serde(default = "legacy_version")]
    version: u32,
    #[serde(default)]
    config: toml::Table,
    #[serde(default)]
    articles: Articles,
}

fn legacy_version() -> u32 {
    1
}

/// Site configuration plus every publish record.
#[derive(Debug, Clone)]
pub struct PublishState {
    /// Resolved configuration.
    pub config: SiteConfig,
    /// The file as the user wrote it, comments included.
    document: DocumentMut,
    pub articles: Articles,
}

impl PartialEq for PublishState {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.articles == other.articles
    }
}

impl Default for PublishState {
    fn default() -> Self {
        Self::empty()
    }
}

impl PublishState {
    /// A state with default config and no records (first run).
    pub fn empty() -> Self {
        Self {
            config: SiteConfig::default(),
            document: DocumentMut::new(),
            articles: Articles::default(),
        }
    }

    /// Load the state file. A missing file is an empty state; anything that
    /// exists but cannot be understood is an error.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(source) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&content).map_err(|err| match err {
            ParseFailure::Corrupt(message) => StateError::Corrupt {
                path: path.to_path_buf(),
                message,
            },
            ParseFailure::Config(source) => StateError::Config {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    fn parse(content: &str) -> Result<Self, ParseFailure> {
        let file: StateFile =
            toml::from_str(content).map_err(|e| ParseFailure::Corrupt(e.to_string()))?;
        if file.version > STATE_VERSION {
            return Err(ParseFailure::Corrupt(format!(
                "format version {} is newer than supported version {}",
                file.version, STATE_VERSION
            )));
        }
        let document = content
            .parse::<DocumentMut>()
            .map_err(|e| ParseFailure::Corrupt(e.to_string()))?;
        let config = SiteConfig::from_table(&file.config).map_err(ParseFailure::Config)?;
        Ok(Self {
            config,
            document,
            articles: file.articles,
        })
    }

    /// The `site.toml` text: the loaded file with `version` and
    /// `[articles]` brought up to date.
    pub fn to_toml(&self) -> String {
        let mut document = self.document.clone();
        let current = document.get("version").and_then(Item::as_integer);
        if current != Some(i64::from(STATE_VERSION)) {
            document["version"] = value(i64::from(STATE_VERSION));
        }
        if self.articles.is_empty() {
            document.remove("articles");
        } else {
            document["articles"] = self.articles.to_item();
        }
        document.to_string()
    }

    /// Write the whole state atomically.
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let text = self.to_toml();
        write_atomic(path, text.as_bytes()).map_err(|source| StateError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the content-path index for this run.
    pub fn content_index(&self) -> ContentPathIndex {
        ContentPathIndex::build(&self.articles)
    }

    /// Find a record by its stored `content_path`.
    ///
    /// Linear; inside a run use [`ContentPathIndex`] instead.
    pub fn find_by_content_path(&self, content_path: &str) -> Option<(&str, &PublishRecord)> {
        self.articles
            .iter()
            .find(|(_, record)| record.content_path == content_path)
    }
}

enum ParseFailure {
    Corrupt(String),
    Config(ConfigError),
}

/// Stored `content_path` → record id.
#[derive(Debug, Clone, Default)]
pub struct ContentPathIndex {
    by_path: HashMap<String, String>,
}

impl ContentPathIndex {
    pub fn build(articles: &Articles) -> Self {
        let mut by_path = HashMap::with_capacity(articles.len());
        for (id, record) in articles.iter() {
            // First record wins, matching find_by_content_path.
            by_path
                .entry(record.content_path.clone())
                .or_insert_with(|| id.to_string());
        }
        Self { by_path }
    }

    /// The id of the record whose `content_path` is one of `candidates`.
    pub fn find<'a>(&'a self, candidates: &[&str]) -> Option<&'a str> {
        candidates
            .iter()
            .find_map(|path| self.by_path.get(*path))
            .map(String::as_str)
    }
}
