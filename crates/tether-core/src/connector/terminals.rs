//! Resolving connector terminals to points in the connector's local space.

use crate::bindings::{Binding, ConnectorBindings};
use crate::editor::Editor;
use crate::geometry::rect_contains_rect;
use crate::shapes::{ShapeId, ShapeRecord, Terminal};
use kurbo::Point;

/// How the targets of a connector's two bindings relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundShapesRelationship {
    /// Independent targets, or fewer than two bindings.
    Safe,
    /// Both terminals bound to the same shape.
    DoubleBound,
    /// The start target's page bounds contain the end target's.
    StartContainsEnd,
    /// The end target's page bounds contain the start target's.
    EndContainsStart,
}

impl BoundShapesRelationship {
    /// Whether a terminal must resolve precisely regardless of its binding.
    pub fn forces_precise(self, terminal: Terminal) -> bool {
        match (self, terminal) {
            (BoundShapesRelationship::DoubleBound, _) => true,
            (BoundShapesRelationship::StartContainsEnd, Terminal::Start) => true,
            (BoundShapesRelationship::EndContainsStart, Terminal::End) => true,
            _ => false,
        }
    }
}

pub fn bound_shapes_relationship(
    editor: &Editor,
    start: Option<ShapeId>,
    end: Option<ShapeId>,
) -> BoundShapesRelationship {
    let (Some(start), Some(end)) = (start, end) else {
        return BoundShapesRelationship::Safe;
    };
    if start == end {
        return BoundShapesRelationship::DoubleBound;
    }
    let (Some(start_bounds), Some(end_bounds)) = (editor.page_bounds(start), editor.page_bounds(end)) else {
        return BoundShapesRelationship::Safe;
    };
    if rect_contains_rect(start_bounds, end_bounds) {
        BoundShapesRelationship::StartContainsEnd
    } else if rect_contains_rect(end_bounds, start_bounds) {
        BoundShapesRelationship::EndContainsStart
    } else {
        BoundShapesRelationship::Safe
    }
}

/// Both terminals of a connector in its local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorTerminals {
    pub start: Point,
    pub end: Point,
}

impl ConnectorTerminals {
    pub fn get(&self, terminal: Terminal) -> Point {
        match terminal {
            Terminal::Start => self.start,
            Terminal::End => self.end,
        }
    }
}

/// Resolve both terminals of a connector.
///
/// Unbound terminals use the stored point. Bound terminals project their
/// anchor onto the target's local bounds and map it into connector space; a
/// target that no longer resolves falls back to the local origin.
pub fn terminals_in_connector_space(
    editor: &Editor,
    shape: &ShapeRecord,
    bindings: &ConnectorBindings,
) -> ConnectorTerminals {
    let Some(connector) = shape.as_connector() else {
        return ConnectorTerminals {
            start: Point::ZERO,
            end: Point::ZERO,
        };
    };
    let relationship =
        bound_shapes_relationship(editor, bindings.target(Terminal::Start), bindings.target(Terminal::End));

    let resolve = |terminal: Terminal| match bindings.get(terminal) {
        None => connector.terminal(terminal),
        Some(binding) => {
            let force_precise = relationship.forces_precise(terminal);
            bound_point(editor, shape, binding, force_precise).unwrap_or_else(|| {
                log::warn!(
                    "target {} of connector {} did not resolve, using origin",
                    binding.to_id,
                    shape.id
                );
                Point::ZERO
            })
        }
    };

    ConnectorTerminals {
        start: resolve(Terminal::Start),
        end: resolve(Terminal::End),
    }
}

fn bound_point(editor: &Editor, shape: &ShapeRecord, binding: &Binding, force_precise: bool) -> Option<Point> {
    let props = binding.connector_props()?;
    let bounds = editor.geometry(binding.to_id)?.bounds;
    let anchor = if props.is_precise || force_precise {
        props.normalized_anchor
    } else {
        editor.config.imprecise_anchor
    };
    let target_point = Point::new(
        bounds.x0 + anchor.x * bounds.width(),
        bounds.y0 + anchor.y * bounds.height(),
    );
    let to_connector = editor.parent_page_transform(shape.parent)? * shape.local_transform();
    let page_point = editor.local_to_page(binding.to_id, target_point)?;
    Some(to_connector.inverse() * page_point)
}
