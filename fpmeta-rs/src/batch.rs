//! Applying one change set across several documents.
//!
//! Documents are merged strictly in the order given. Once a game has matched
//! a record in some document it is dropped from the working set, so later
//! documents are never searched for it. Whatever is left at the end was not
//! found anywhere.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::changes::ChangeSet;
use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::merge::MergeEngine;
use crate::node::NodeRef;
use crate::xml;

/// What happened to one document.
#[derive(Debug)]
pub struct DocumentReport {
    /// Name the document was merged under, usually its path.
    pub name: String,
    /// Games whose changes were applied.
    pub changed: BTreeSet<String>,
    /// Games that matched a record here but failed.
    pub failures: BTreeMap<String, Error>,
    /// The part of the change set that was applied to this document.
    pub applied: ChangeSet,
    pub elements_updated: usize,
    pub elements_created: usize,
    pub applications_created: usize,
}

impl DocumentReport {
    /// Returns true if the document should be written back.
    pub fn needs_write(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Aggregated outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Reports for every document that was merged, in order.
    pub documents: Vec<DocumentReport>,
    /// Games that matched no record in any document, in change-set order.
    pub not_found: Vec<String>,
}

impl BatchResult {
    /// Returns true if any record failed or any game was not found.
    pub fn has_errors(&self) -> bool {
        !self.not_found.is_empty() || self.documents.iter().any(|d| !d.failures.is_empty())
    }

    /// Per-record failures as `(document, game, error)`.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str, &Error)> {
        self.documents.iter().flat_map(|doc| {
            doc.failures
                .iter()
                .map(move |(game_id, err)| (doc.name.as_str(), game_id.as_str(), err))
        })
    }

    /// A `GameNotFound` error for every unmatched game.
    pub fn not_found_errors(&self) -> Vec<Error> {
        self.not_found
            .iter()
            .map(|id| Error::GameNotFound(id.clone()))
            .collect()
    }

    /// Number of games applied across all documents.
    pub fn changed_count(&self) -> usize {
        self.documents.iter().map(|d| d.changed.len()).sum()
    }
}

/// An in-progress batch.
pub struct Batch<'a> {
    engine: MergeEngine<'a>,
    remaining: ChangeSet,
    documents: Vec<DocumentReport>,
}

impl<'a> Batch<'a> {
    pub fn new(changes: ChangeSet, config: &'a MergeConfig) -> Self {
        Batch {
            engine: MergeEngine::new(config),
            remaining: changes,
            documents: Vec::new(),
        }
    }

    /// Returns true once every game has matched somewhere.
    pub fn is_complete(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Games not yet matched.
    pub fn remaining(&self) -> &ChangeSet {
        &self.remaining
    }

    /// Merges the remaining changes into one document.
    pub fn merge_document(&mut self, name: impl Into<String>, root: &NodeRef) -> &DocumentReport {
        let name = name.into();
        let result = self.engine.merge_into_document(&self.remaining, root);

        let applied = self.remaining.subset(|id| result.changed.contains(id));
        let matched: Vec<String> = result.matched().map(str::to_string).collect();
        for game_id in &matched {
            self.remaining.remove(game_id);
        }

        info!(
            document = %name,
            changed = result.changed.len(),
            failed = result.failed.len(),
            remaining = self.remaining.len(),
            "merged document"
        );

        let report = DocumentReport {
            name,
            elements_updated: result.elements_updated(),
            elements_created: result.elements_created(),
            applications_created: result.applications_created(),
            changed: result.changed,
            failures: result.failed,
            applied,
        };
        self.documents.push(report);
        &self.documents[self.documents.len() - 1]
    }

    pub fn finish(self) -> BatchResult {
        let not_found: Vec<String> = self.remaining.ids().map(str::to_string).collect();
        if !not_found.is_empty() {
            debug!(count = not_found.len(), "games not found in any document");
        }
        BatchResult {
            documents: self.documents,
            not_found,
        }
    }
}

/// Runs a batch over documents that are already parsed.
pub fn run_batch(changes: ChangeSet, documents: &[(String, NodeRef)], config: &MergeConfig) -> BatchResult {
    let mut batch = Batch::new(changes, config);
    for (name, root) in documents {
        if batch.is_complete() {
            break;
        }
        batch.merge_document(name.as_str(), root);
    }
    batch.finish()
}

/// Receives every document that needs to be written after merging.
pub trait DocumentSink {
    fn store(&mut self, path: &Path, root: &NodeRef) -> Result<()>;
}

/// Rewrites documents in place.
#[derive(Debug, Default)]
pub struct InPlaceWriter;

impl DocumentSink for InPlaceWriter {
    fn store(&mut self, path: &Path, root: &NodeRef) -> Result<()> {
        xml::write_file(root, path)?;
        info!(path = %path.display(), "wrote document");
        Ok(())
    }
}

/// Runs a batch over XML files, reading each one only when it is needed.
///
/// Documents with at least one applied game are handed to `sink`. Failing to
/// read or store a document aborts the batch.
pub fn run_batch_files<P: AsRef<Path>>(
    changes: ChangeSet,
    paths: &[P],
    config: &MergeConfig,
    sink: &mut dyn DocumentSink,
) -> Result<BatchResult> {
    let mut batch = Batch::new(changes, config);
    for path in paths {
        if batch.is_complete() {
            break;
        }
        let path = path.as_ref();
        let root = xml::parse_file(path).map_err(|err| match err {
            Error::Parse(message) => Error::Parse(format!("{}: {}", path.display(), message)),
            other => other,
        })?;

        if batch.merge_document(path.display().to_string(), &root).needs_write() {
            sink.store(path, &root)?;
        }
    }
    Ok(batch.finish())
}

/// Lets at most one batch run at a time.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        SingleFlight::default()
    }

    /// Claims the guard, or returns `None` while another batch holds it.
    pub fn try_start(&self) -> Option<FlightToken<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightToken { flight: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped.
#[derive(Debug)]
pub struct FlightToken<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightToken<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}
