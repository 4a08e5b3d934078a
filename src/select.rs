//! Deciding which documents a run publishes.
//!
//! Every discovered document is classified against the publish state:
//!
//! | Status | Meaning | Selected? |
//! |--------|---------|-----------|
//! | [`DocumentStatus::Draft`] | front matter says `draft: true` | never, not even when republishing |
//! | [`DocumentStatus::New`] | no record under its identity or its content path | yes |
//! | [`DocumentStatus::Changed`] | has a record, source differs from the last render | only when republishing |
//! | [`DocumentStatus::Unchanged`] | has a record, source is as last rendered | only when republishing |
//!
//! A record is the source of truth for "already published": an edited
//! document stays as it was on the site until the next republish. `Changed`
//! exists so the report can point such documents out.
//!
//! Lookup is by identity first, then by stored `content_path` through the
//! [`ContentPathIndex`], which recognises records written under older keying
//! conventions. Records whose documents vanished from the source tree are
//! left alone.
//!
//! Selection preserves discovery order.

use crate::document::Document;
use crate::state::{ContentPathIndex, PublishState};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    New,
    Changed,
    Unchanged,
    Draft,
}

impl DocumentStatus {
    pub fn label(self) -> &'static str {
        match self {
            DocumentStatus::New => "new",
            DocumentStatus::Changed => "changed",
            DocumentStatus::Unchanged => "unchanged",
            DocumentStatus::Draft => "draft",
        }
    }
}

/// A discovered document with its classification.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document: Document,
    pub status: DocumentStatus,
    /// Source path relative to the content root.
    pub content_path: String,
    /// Key of the existing record, which may differ from the document's
    /// identity for legacy records.
    pub record_id: Option<String>,
    pub selected: bool,
}

/// Result of the decision step: every discovered document, in discovery
/// order, with its verdict.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub candidates: Vec<Candidate>,
}

impl Selection {
    /// Documents to render this run.
    pub fn selected(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.selected)
    }

    /// Documents left alone this run.
    pub fn passed_over(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| !c.selected)
    }

    /// True when nothing is to be rendered.
    pub fn is_empty(&self) -> bool {
        self.selected().next().is_none()
    }

    pub fn into_selected(self) -> Vec<Candidate> {
        self.candidates.into_iter().filter(|c| c.selected).collect()
    }
}

/// Classify one document. The result is not yet selected.
pub fn classify(
    state: &PublishState,
    index: &ContentPathIndex,
    document: Document,
    content_root: &Path,
) -> Candidate {
    let content_path = document.content_path(content_root);
    let absolute = document.source_path.to_string_lossy().to_string();

    let record_id = if state.articles.contains(&document.id) {
        Some(document.id.clone())
    } else {
        index
            .find(&[content_path.as_str(), absolute.as_str()])
            .map(str::to_string)
    };

    let status = if document.is_draft() {
        DocumentStatus::Draft
    } else {
        match record_id.as_deref().and_then(|id| state.articles.get(id)) {
            None => DocumentStatus::New,
            Some(record) => match &record.source_hash {
                Some(hash) if *hash != document.source_hash => DocumentStatus::Changed,
                _ => DocumentStatus::Unchanged,
            },
        }
    };

    Candidate {
        document,
        status,
        content_path,
        record_id,
        selected: false,
    }
}

/// Split discovered documents into those to publish and the rest.
pub fn select_to_publish(
    state: &PublishState,
    index: &ContentPathIndex,
    documents: Vec<Document>,
    content_root: &Path,
    force_republish: bool,
) -> Selection {
    let candidates = documents
        .into_iter()
        .map(|document| {
            let mut candidate = classify(state, index, document, content_root);
            candidate.selected = match candidate.status {
                DocumentStatus::Draft => false,
                DocumentStatus::New => true,
                DocumentStatus::Changed | DocumentStatus::Unchanged => force_republish,
            };
            candidate
        })
        .collect();
    Selection { candidates }
}
