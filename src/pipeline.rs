//! One publish run, start to finish.
//!
//! ```text
//! discover → load → select → [scaffold → title → per document: merge → render → write → record] → save → menu
//! ```
//!
//! [`plan`] covers everything up to the decision and touches nothing on
//! disk; `inkpress status` stops there. [`publish`] carries a plan through
//! the side effects.
//!
//! ## Failure Model
//!
//! Run-fatal errors ([`PipelineError`]) all happen before the first write:
//! a missing content root, an unreadable or corrupt state file, a scaffold
//! that cannot be installed. A fatal error while saving the state or the
//! menu leaves the previous state file in place.
//!
//! Per-document problems (malformed front matter, an identity another
//! document already holds, an unreadable date, a template that fails, a
//! page that cannot be written) are collected as [`Failure`]s. The document
//! gets no record, the rest of the run carries on, and the CLI exits
//! nonzero.
//!
//! ## Identity Collisions
//!
//! Two stems can slug to the same identity (`Hello.md`, `hello!.md`). The
//! document the stored record points at keeps it; without a record, the
//! first in discovery order does. Every other claimant is a failure.
//!
//! ## Ordering Within A Document
//!
//! The record is derived before anything is written, so a bad date costs
//! neither a page nor a record. The record is committed only after the page
//! is on disk. A selected document whose page already exists (and is not
//! being republished) keeps that page and gains a record for it.
//!
//! Nothing is written at all when nothing is selected, or on a dry run.
//! When every selected document fails, the state file and the menu are
//! left untouched.

use crate::config::{ConfigError, SiteConfig};
use crate::dates::DateError;
use crate::document::{self, Document, DocumentError};
use crate::menu::{self, MENU_DATA_PATH, MenuEntry};
use crate::merge::derive_publish_record;
use crate::naming;
use crate::render::{MarkdownRenderer, PageInfo, RenderError, Renderer};
use crate::select::{DocumentStatus, Selection, select_to_publish};
use crate::state::{PublishState, STATE_FILENAME, StateError};
use crate::write::{AssetSource, DirectoryAssets, inject_site_title, write_if_needed};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("content root not found: {0}")]
    MissingContentRoot(PathBuf),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("discovering documents: {0}")]
    Discover(#[source] DocumentError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

/// Why one document was skipped.
#[derive(Error, Debug)]
pub enum FailureKind {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("identity {id:?} already belongs to {}", other.display())]
    DuplicateIdentity { id: String, other: PathBuf },
    #[error(transparent)]
    Date(#[from] DateError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("writing {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct Failure {
    pub source_path: PathBuf,
    pub error: FailureKind,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub content_root: PathBuf,
    pub output_root: PathBuf,
    /// Re-render every non-draft document and overwrite its page.
    pub force_republish: bool,
    /// Decide, report, write nothing.
    pub dry_run: bool,
    pub now: DateTime<Utc>,
}

impl BuildOptions {
    pub fn new(content_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            output_root: output_root.into(),
            force_republish: false,
            dry_run: false,
            now: Utc::now(),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.content_root.join(STATE_FILENAME)
    }
}

/// The replaceable parts of a run.
pub struct Collaborators {
    pub renderer: Box<dyn Renderer>,
    pub assets: Box<dyn AssetSource>,
}

impl Collaborators {
    /// Markdown renderer and scaffold directory as configured.
    pub fn from_config(content_root: &Path, config: &SiteConfig) -> Result<Self, RenderError> {
        Ok(Self {
            renderer: Box::new(MarkdownRenderer::from_config(content_root, config)?),
            assets: Box::new(DirectoryAssets::new(content_root.join(&config.scaffold))),
        })
    }
}

/// The decision for a run, before any side effect.
#[derive(Debug)]
pub struct Plan {
    pub state: PublishState,
    pub selection: Selection,
    /// Documents that could not be loaded.
    pub failures: Vec<Failure>,
}

/// One line of the report per discovered document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub content_path: String,
    pub status: DocumentStatus,
    pub selected: bool,
}

/// A document that got a record this run.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEntry {
    pub id: String,
    pub name: String,
    pub content_path: String,
    pub output_path: String,
    pub status: DocumentStatus,
    /// False when an existing page was kept.
    pub written: bool,
}

#[derive(Debug)]
pub struct BuildReport {
    pub documents: Vec<DocumentSummary>,
    pub published: Vec<PublishedEntry>,
    pub failures: Vec<Failure>,
    /// The menu written this run, if any.
    pub menu: Option<Vec<MenuEntry>>,
    pub dry_run: bool,
}

impl BuildReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Load the state, discover and load documents, decide what to publish.
pub fn plan(options: &BuildOptions) -> Result<Plan, PipelineError> {
    if !options.content_root.is_dir() {
        return Err(PipelineError::MissingContentRoot(
            options.content_root.clone(),
        ));
    }
    let state = PublishState::load(&options.state_path())?;
    tracing::debug!(
        records = state.articles.len(),
        path = %options.state_path().display(),
        "loaded publish state"
    );

    let paths = document::discover(&options.content_root).map_err(PipelineError::Discover)?;
    let mut documents: Vec<Document> = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();
    for path in paths {
        match document::load(&path) {
            Ok(doc) => documents.push(doc),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "skipping document");
                failures.push(Failure {
                    source_path: path,
                    error: error.into(),
                });
            }
        }
    }

    let (documents, duplicates) = claim_identities(documents, &state, &options.content_root);
    failures.extend(duplicates);

    let index = state.content_index();
    let selection = select_to_publish(
        &state,
        &index,
        documents,
        &options.content_root,
        options.force_republish,
    );
    tracing::info!(
        discovered = selection.candidates.len(),
        selected = selection.selected().count(),
        "selection complete"
    );

    Ok(Plan {
        state,
        selection,
        failures,
    })
}

/// Keep one non-draft document per identity; the others become failures.
fn claim_identities(
    documents: Vec<Document>,
    state: &PublishState,
    content_root: &Path,
) -> (Vec<Document>, Vec<Failure>) {
    let mut owners: HashMap<String, PathBuf> = HashMap::new();
    for doc in documents.iter().filter(|d| !d.is_draft()) {
        let recorded = state
            .articles
            .get(&doc.id)
            .is_some_and(|r| r.content_path == doc.content_path(content_root));
        if recorded || !owners.contains_key(&doc.id) {
            owners.insert(doc.id.clone(), doc.source_path.clone());
        }
    }

    let mut kept = Vec::with_capacity(documents.len());
    let mut failures = Vec::new();
    for doc in documents {
        match owners.get(&doc.id) {
            Some(owner) if !doc.is_draft() && *owner != doc.source_path => {
                tracing::warn!(
                    path = %doc.source_path.display(),
                    owner = %owner.display(),
                    id = %doc.id,
                    "identity already taken, skipping document"
                );
                failures.push(Failure {
                    source_path: doc.source_path,
                    error: FailureKind::DuplicateIdentity {
                        id: doc.id,
                        other: owner.clone(),
                    },
                });
            }
            _ => kept.push(doc),
        }
    }
    (kept, failures)
}

/// Carry a plan through rendering, writing and the state commit.
pub fn publish(
    plan: Plan,
    options: &BuildOptions,
    collaborators: &Collaborators,
) -> Result<BuildReport, PipelineError> {
    let Plan {
        mut state,
        selection,
        mut failures,
    } = plan;

    let mut report = BuildReport {
        documents: summarize(&selection),
        published: Vec::new(),
        failures: Vec::new(),
        menu: None,
        dry_run: options.dry_run,
    };

    if options.dry_run || selection.is_empty() {
        if selection.is_empty() {
            tracing::info!("nothing to publish");
        }
        report.failures = failures;
        return Ok(report);
    }

    let output_root = &options.output_root;
    collaborators
        .assets
        .install(output_root)
        .map_err(|source| PipelineError::Io {
            context: "installing scaffold into",
            path: output_root.clone(),
            source,
        })?;
    let index_html = output_root.join("index.html");
    inject_site_title(&index_html, &state.config.title)?;

    let zone = state.config.reference_zone()?;
    let now = options.now.with_timezone(&zone);
    let site_title = state.config.title.clone();
    let extension = state.config.output_extension.clone();

    for candidate in selection.into_selected() {
        let doc = &candidate.document;
        let existing = candidate
            .record_id
            .as_deref()
            .and_then(|id| state.articles.get(id));
        let output_name = naming::output_file_name(&doc.stem, &extension);

        let record = match derive_publish_record(
            doc,
            &candidate.content_path,
            &output_name,
            existing,
            now,
        ) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(document = %doc.id, %error, "skipping document");
                failures.push(Failure {
                    source_path: doc.source_path.clone(),
                    error: error.into(),
                });
                continue;
            }
        };

        let page = collaborators.renderer.render(&doc.body).and_then(|fragment| {
            collaborators.renderer.wrap(
                &fragment,
                &PageInfo {
                    title: &record.name,
                    site_title: &site_title,
                },
            )
        });
        let page = match page {
            Ok(page) => page,
            Err(error) => {
                tracing::warn!(document = %doc.id, %error, "rendering failed");
                failures.push(Failure {
                    source_path: doc.source_path.clone(),
                    error: error.into(),
                });
                continue;
            }
        };
        let target = output_root.join(&output_name);
        let written = match write_if_needed(&page, &target, options.force_republish) {
            Ok(written) => written,
            Err(source) => {
                tracing::warn!(document = %doc.id, path = %target.display(), %source, "write failed");
                failures.push(Failure {
                    source_path: doc.source_path.clone(),
                    error: FailureKind::Write {
                        path: target,
                        source,
                    },
                });
                continue;
            }
        };
        if written {
            tracing::info!(document = %doc.id, path = %target.display(), "published");
        } else {
            tracing::debug!(document = %doc.id, path = %target.display(), "page exists, keeping it");
        }

        report.published.push(PublishedEntry {
            id: doc.id.clone(),
            name: record.name.clone(),
            content_path: record.content_path.clone(),
            output_path: record.output_path.clone(),
            status: candidate.status,
            written,
        });
        let previous = candidate.record_id.as_deref().filter(|id| *id != doc.id);
        if let Some(old) = previous {
            tracing::debug!(from = old, to = %doc.id, "re-keying legacy record");
        }
        state.articles.upsert(&doc.id, record, previous);
    }

    report.failures = failures;
    if report.published.is_empty() {
        tracing::info!("no document published, leaving state and menu alone");
        return Ok(report);
    }

    state.save(&options.state_path())?;

    let entries = menu::project_menu(&state, state.config.menu_limit);
    let menu_path = output_root.join(MENU_DATA_PATH);
    menu::write_menu(&entries, &menu_path).map_err(|source| PipelineError::Io {
        context: "writing menu",
        path: menu_path,
        source,
    })?;
    tracing::debug!(entries = entries.len(), "menu written");

    report.menu = Some(entries);
    Ok(report)
}

/// [`plan`] then [`publish`] with collaborators built from the site config.
pub fn build(options: &BuildOptions) -> Result<BuildReport, PipelineError> {
    let plan = plan(options)?;
    let collaborators = Collaborators::from_config(&options.content_root, &plan.state.config)?;
    publish(plan, options, &collaborators)
}

fn summarize(selection: &Selection) -> Vec<DocumentSummary> {
    selection
        .candidates
        .iter()
        .map(|c| DocumentSummary {
            id: c.document.id.clone(),
            content_path: c.content_path.clone(),
            status: c.status,
            selected: c.selected,
        })
        .collect()
}
