//! Canvas document: pages, shapes, bindings and history.

use crate::bindings::{Binding, BindingId};
use crate::error::{EngineError, EngineResult};
use crate::shapes::{PageId, ShapeId, ShapeRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// A page: the root of a shape hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: String,
}

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentSnapshot {
    shapes: HashMap<ShapeId, ShapeRecord>,
    bindings: Vec<Binding>,
}

/// A named point in history that an interaction can roll back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMark {
    id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
struct MarkEntry {
    mark: HistoryMark,
    snapshot: DocumentSnapshot,
    undo_len: usize,
}

/// A canvas document containing all pages, shapes and bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasDocument {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    pub pages: Vec<Page>,
    /// All shapes in the document, keyed by ID.
    pub shapes: HashMap<ShapeId, ShapeRecord>,
    /// All bindings, oldest first.
    pub bindings: Vec<Binding>,
    /// Undo history stack.
    #[serde(skip)]
    undo_stack: Vec<DocumentSnapshot>,
    /// Redo history stack.
    #[serde(skip)]
    redo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    marks: Vec<MarkEntry>,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    /// Create a new document with a single empty page.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            pages: vec![Page {
                id: Uuid::new_v4(),
                name: "Page 1".to_string(),
            }],
            shapes: HashMap::new(),
            bindings: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            marks: Vec::new(),
        }
    }

    /// Take a snapshot of the current document state for undo.
    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            shapes: self.shapes.clone(),
            bindings: self.bindings.clone(),
        }
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.shapes = snapshot.shapes;
        self.bindings = snapshot.bindings;
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);

        // Clear redo stack when new changes are made
        self.redo_stack.clear();

        // Limit undo history size
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
            for entry in &mut self.marks {
                entry.undo_len = entry.undo_len.saturating_sub(1);
            }
        }
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(snapshot);
        let depth = self.undo_stack.len();
        self.marks.retain(|entry| entry.undo_len < depth);
        true
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Record an undo checkpoint that can later be bailed back to.
    pub fn mark(&mut self, name: &str) -> HistoryMark {
        let undo_len = self.undo_stack.len();
        self.push_undo();
        let mark = HistoryMark {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.marks.push(MarkEntry {
            mark: mark.clone(),
            snapshot: self.snapshot(),
            undo_len,
        });
        mark
    }

    /// Roll back to a mark, discarding every change made since it, including
    /// the mark itself and any later marks. Nothing is left to redo.
    pub fn bail_to_mark(&mut self, mark: &HistoryMark) -> EngineResult<()> {
        let Some(position) = self.marks.iter().position(|entry| entry.mark == *mark) else {
            return Err(EngineError::MarkNotFound(mark.name.clone()));
        };
        let entry = self.marks.remove(position);
        self.marks.truncate(position);
        self.restore(entry.snapshot);
        self.undo_stack.truncate(entry.undo_len);
        self.redo_stack.clear();
        Ok(())
    }

    /// Commit everything since a mark as one undo step and forget the mark,
    /// along with any marks recorded after it. Returns false if the mark is
    /// unknown.
    pub fn squash_to_mark(&mut self, mark: &HistoryMark) -> bool {
        let Some(position) = self.marks.iter().position(|entry| entry.mark == *mark) else {
            return false;
        };
        self.marks.truncate(position);
        true
    }

    /// Number of marks still available to bail to.
    pub fn mark_count(&self) -> usize {
        self.marks.len()
    }

    /// Check whether a page exists.
    pub fn has_page(&self, id: PageId) -> bool {
        self.pages.iter().any(|page| page.id == id)
    }

    /// Add a page and return its ID.
    pub fn add_page(&mut self, name: &str) -> PageId {
        let id = Uuid::new_v4();
        self.pages.push(Page {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Get a shape by ID.
    pub fn get_shape(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.shapes.get(&id)
    }

    /// Get a binding by ID.
    pub fn get_binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.id == id)
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Geo, ParentId, ShapeKind};

    fn add_box(doc: &mut CanvasDocument) -> ShapeId {
        let page = doc.pages[0].id;
        let record = ShapeRecord::new(ParentId::Page(page), ShapeKind::Geo(Geo::rectangle(10.0, 10.0)));
        let id = record.id;
        doc.shapes.insert(id, record);
        id
    }

    #[test]
    fn test_undo_redo() {
        let mut doc = CanvasDocument::new();
        doc.push_undo();
        let id = add_box(&mut doc);

        assert!(doc.undo());
        assert!(doc.get_shape(id).is_none());
        assert!(doc.redo());
        assert!(doc.get_shape(id).is_some());
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_bail_to_mark_discards_changes() {
        let mut doc = CanvasDocument::new();
        let kept = add_box(&mut doc);
        let mark = doc.mark("creating");
        let dropped = add_box(&mut doc);

        doc.bail_to_mark(&mark).unwrap();

        assert!(doc.get_shape(kept).is_some());
        assert!(doc.get_shape(dropped).is_none());
        assert!(!doc.can_undo());
        assert!(!doc.can_redo());
        // A mark can only be bailed to once.
        assert!(matches!(doc.bail_to_mark(&mark), Err(EngineError::MarkNotFound(_))));
    }

    #[test]
    fn test_squash_to_mark_keeps_changes_and_drops_mark() {
        let mut doc = CanvasDocument::new();
        let outer = doc.mark("dragging_handle");
        doc.mark("nested");
        let kept = add_box(&mut doc);

        assert!(doc.squash_to_mark(&outer));

        assert_eq!(doc.mark_count(), 0);
        assert!(doc.get_shape(kept).is_some());
        assert!(matches!(doc.bail_to_mark(&outer), Err(EngineError::MarkNotFound(_))));
        assert!(!doc.squash_to_mark(&outer));
        // Both marks pushed an undo step; the first undo reaches the nested one.
        assert!(doc.undo());
        assert!(doc.get_shape(kept).is_none());
    }

    #[test]
    fn test_bail_to_outer_mark_drops_inner_marks() {
        let mut doc = CanvasDocument::new();
        let outer = doc.mark("outer");
        add_box(&mut doc);
        let inner = doc.mark("inner");
        add_box(&mut doc);

        doc.bail_to_mark(&outer).unwrap();
        assert!(doc.shapes.is_empty());
        assert!(doc.bail_to_mark(&inner).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut doc = CanvasDocument::new();
        let id = add_box(&mut doc);
        let json = doc.to_json().unwrap();
        let restored = CanvasDocument::from_json(&json).unwrap();
        assert_eq!(restored.get_shape(id), doc.get_shape(id));
        assert_eq!(restored.pages, doc.pages);
    }
}
