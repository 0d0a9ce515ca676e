//! fpmeta - batch metadata edits for game catalog XML files
//!
//! This library applies declarative change files to the `Game` records of
//! LaunchBox-style XML catalogs.
//!
//! # Overview
//!
//! A change file is a series of YAML documents separated by `---` lines.
//! Each document names one game with its `GAME` key and lists the elements
//! to set:
//!
//! ```yaml
//! GAME: 0f2b7c1e-5d43-4e8b-9a49-3c6d2f1e8a77
//! Title: Hello
//! Languages: [English, German]
//! Additional Applications:
//!   Extras: Extras folder
//! ---
//! GAME: 6a9c1d0e-1b2f-4c3d-8e7f-9a0b1c2d3e4f
//! Extreme: true
//! ```
//!
//! Parsing resolves aliases such as `Languages` to their element names and
//! rejects malformed input before any document is touched. The resulting
//! [`ChangeSet`] is applied to one or more documents in order; every game is
//! applied to the first document that contains it.
//!
//! # Key Features
//!
//! - Per-record failure isolation: a game that cannot be fully applied is
//!   rolled back and reported, and the other games still apply
//! - Whitelisted creation of elements missing from a record
//! - Creation and update of additional applications, including the
//!   `Extras` and `Message` shorthands
//! - Stable output formatting, so unchanged content round-trips unchanged

pub mod alias;
pub mod batch;
pub mod changes;
pub mod config;
pub mod constants;
pub mod error;
pub mod explain;
pub mod merge;
pub mod node;
pub mod value;
pub mod xml;

// Re-export commonly used types
pub use alias::AliasTable;
pub use batch::{
    run_batch, run_batch_files, Batch, BatchResult, DocumentReport, DocumentSink, FlightToken,
    InPlaceWriter, SingleFlight,
};
pub use changes::{parse_changes, parse_changes_file, ChangeSet, ChangesParser};
pub use config::{CreatableElements, MergeConfig};
pub use error::{Error, Result, Severity};
pub use explain::explain;
pub use merge::{merge_into_document, EditLog, EditType, MergeEngine, MergeResult};
pub use node::{NodeInner, NodeRef, XmlContent, XmlElement, XmlText};
pub use value::{coerce, ChangeMap, ChangeValue};
pub use xml::{parse_file, parse_str, XmlParser, XmlPrinter};
