//! Edit operation logging for the merge engine.
//!
//! Every change made to a document is recorded together with what is needed
//! to undo it. Checkpoints give each game record transactional semantics:
//! if applying its changes fails part way, the edits made since the
//! checkpoint are undone and the document is left as it was.

use crate::node::{set_text, NodeInner, NodeRef};

/// Types of edit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditType {
    /// An existing element's text was replaced.
    Update,
    /// A new element was created.
    Insert,
}

/// A single edit operation entry.
#[derive(Debug, Clone)]
pub struct EditEntry {
    /// The type of edit operation.
    pub edit_type: EditType,
    /// Game the edit was made for.
    pub game_id: String,
    /// Name of the edited element.
    pub element: String,
    /// The edited or inserted node.
    pub node: NodeRef,
    /// Text before an update. `None` when the element had no text.
    pub previous: Option<String>,
}

/// Log of edit operations performed during a merge.
#[derive(Debug, Default)]
pub struct EditLog {
    /// List of edit operations.
    edits: Vec<EditEntry>,
    /// Stack of checkpoint positions for rollback.
    checkpoints: Vec<usize>,
}

impl EditLog {
    /// Creates a new empty edit log.
    pub fn new() -> Self {
        EditLog {
            edits: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Records an insert operation.
    pub fn insert(&mut self, game_id: &str, element: &str, node: NodeRef) {
        self.edits.push(EditEntry {
            edit_type: EditType::Insert,
            game_id: game_id.to_string(),
            element: element.to_string(),
            node,
            previous: None,
        });
    }

    /// Records an update operation.
    pub fn update(&mut self, game_id: &str, element: &str, node: NodeRef, previous: Option<String>) {
        self.edits.push(EditEntry {
            edit_type: EditType::Update,
            game_id: game_id.to_string(),
            element: element.to_string(),
            node,
            previous,
        });
    }

    /// Creates a checkpoint for potential rollback.
    pub fn checkpoint(&mut self) {
        self.checkpoints.push(self.edits.len());
    }

    /// Undoes every edit since the last checkpoint, newest first.
    pub fn rewind(&mut self) {
        let Some(pos) = self.checkpoints.pop() else {
            return;
        };
        for entry in self.edits.drain(pos..).rev() {
            match entry.edit_type {
                EditType::Update => set_text(&entry.node, entry.previous.as_deref().unwrap_or("")),
                EditType::Insert => {
                    NodeInner::detach(&entry.node);
                }
            }
        }
    }

    /// Commits the operations since the last checkpoint.
    pub fn commit(&mut self) {
        self.checkpoints.pop();
    }

    /// Returns the number of edit operations.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Counts operations by type.
    pub fn count_by_type(&self, edit_type: EditType) -> usize {
        self.edits
            .iter()
            .filter(|e| e.edit_type == edit_type)
            .count()
    }

    /// Counts inserted elements called `element`.
    pub fn count_inserted(&self, element: &str) -> usize {
        self.edits
            .iter()
            .filter(|e| e.edit_type == EditType::Insert && e.element == element)
            .count()
    }
}
