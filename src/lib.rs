//! # Inkpress
//!
//! An incremental publisher for markdown-driven sites. Point it at a content
//! directory of `.md` files and it renders each one into a standalone HTML
//! page, remembering what it has already published so that running it again
//! is cheap and does nothing unless something new showed up.
//!
//! # Architecture: One Run, Eight Steps
//!
//! ```text
//! discover  content/**/*.md          →  paths         (document)
//! load      path                     →  Document      (document)
//! select    Document × PublishState  →  Selection     (select)
//! merge     Document × old record    →  PublishRecord (merge)
//! render    body                     →  page HTML     (render)
//! write     page HTML                →  output/*.html (write)
//! commit    PublishState             →  site.toml     (state)
//! project   PublishState             →  menu_data.json (menu)
//! ```
//!
//! The only durable state is `site.toml` at the content root. It holds both
//! the site configuration (`[config]`) and one `[articles.<id>]` table per
//! document ever published, in publication order. Everything else (the menu,
//! the scaffold, the HTML pages) is derived from it and from the sources.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`document`] | Discovers and loads source documents (front matter + body) |
//! | [`naming`] | Document identity slugs and display titles from file names |
//! | [`dates`] | Canonical timestamp format, reference timezone, explicit date parsing |
//! | [`render`] | Renderer boundary: markdown → fragment, fragment → page |
//! | [`state`] | The durable publish state: load, atomic save, content-path index |
//! | [`select`] | Decides which discovered documents are (re)published |
//! | [`merge`] | Derives a document's publish record across runs |
//! | [`menu`] | Recency-ordered menu projection written as JSON |
//! | [`write`] | Output writer, scaffold install, site title injection |
//! | [`pipeline`] | Stitches the steps into a single build run |
//! | [`config`] | The `[config]` section: defaults, merging, validation |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## The Publish Date Is Sticky
//!
//! A record's `published` value is set the first time a document goes out
//! and survives every later republish. Only an explicit `published:` value
//! in the document's front matter can move it. Republishing stamps a separate
//! `republished` field instead.
//!
//! ## No Writes When Nothing Is New
//!
//! When the selection is empty the run stops before touching the output
//! directory or the state file. Two consecutive runs over unchanged sources
//! leave the filesystem exactly as the first one left it. A run in which
//! every selected document fails leaves the state file and the menu alone.
//!
//! ## Collaborators Are Passed In
//!
//! Rendering and asset installation sit behind the [`render::Renderer`] and
//! [`write::AssetSource`] traits, bundled into [`pipeline::Collaborators`].
//! Selection and merge logic can be exercised in tests with a stub renderer
//! and no scaffold at all.

pub mod config;
pub mod dates;
pub mod document;
pub mod menu;
pub mod merge;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod select;
pub mod state;
pub mod write;

#[cfg(test)]
pub(crate) mod test_helpers;
