//! Manipulation handles.

use crate::editor::Editor;
use crate::shapes::{ShapeId, Terminal};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 12.0;

/// Identity of a connector handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleId {
    Start,
    End,
    /// Virtual handle at the body's midpoint controlling the bend.
    Bend,
}

impl HandleId {
    /// The terminal a handle moves, if it moves one.
    pub fn terminal(self) -> Option<Terminal> {
        match self {
            HandleId::Start => Some(Terminal::Start),
            HandleId::End => Some(Terminal::End),
            HandleId::Bend => None,
        }
    }
}

impl From<Terminal> for HandleId {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Start => HandleId::Start,
            Terminal::End => HandleId::End,
        }
    }
}

/// Whether a handle sits on a real vertex or is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleKind {
    Vertex,
    Virtual,
}

/// A handle with its position in the owning shape's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub id: HandleId,
    pub kind: HandleKind,
    pub position: Point,
}

impl Handle {
    /// Create a new handle.
    pub fn new(id: HandleId, kind: HandleKind, position: Point) -> Self {
        Self { id, kind, position }
    }

    /// Check if a point (in the same space) hits this handle.
    /// `tolerance` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// A handle drag in progress, as seen by a shape's handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleDrag {
    pub handle: HandleId,
    /// Where the handle is being dragged to, in page space.
    pub page_point: Point,
    /// Resolve anchors exactly rather than snapping toward edges.
    pub is_precise: bool,
    /// The drag is part of creating the shape.
    pub is_creating: bool,
}

/// The handle of `shape_id` under a page-space point, if any.
pub fn handle_at_point(editor: &Editor, shape_id: ShapeId, page_point: Point) -> Option<HandleId> {
    let shape = editor.shape(shape_id)?;
    let util = editor.shape_util(shape.shape_type())?;
    let local = editor.page_to_local(shape_id, page_point)?;
    let tolerance = HANDLE_HIT_TOLERANCE / editor.inputs.zoom;
    util.handles(editor, shape)
        .into_iter()
        .filter(|handle| handle.hit_test(local, tolerance))
        .min_by(|a, b| a.position.distance(local).total_cmp(&b.position.distance(local)))
        .map(|handle| handle.id)
}
