//! Derived connector geometry: where the body starts and ends once terminals
//! are resolved and clipped against their targets.

use super::terminals::{ConnectorTerminals, terminals_in_connector_space};
use crate::bindings::{ConnectorBindings, connector_bindings};
use crate::editor::Editor;
use crate::geometry::{
    APPROX_EPSILON, ArcInfo, bend_middle, bend_to_arc, intersect_circle_outline,
    intersect_segment_outline, midpoint, unit,
};
use crate::shapes::{
    Arrowhead, BOUND_ARROW_OFFSET, Connector, MIN_ARROW_LENGTH, ShapeRecord, Terminal,
    WAY_TOO_BIG_ARROW_BEND_FACTOR,
};
use kurbo::Point;

/// One end of a connector body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalPoint {
    /// The resolved terminal, where the handle is drawn.
    pub handle: Point,
    /// Where the drawn body ends.
    pub point: Point,
    pub arrowhead: Arrowhead,
}

/// Geometry of a connector body in its local space.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorInfo {
    Straight {
        start: TerminalPoint,
        end: TerminalPoint,
        middle: Point,
        length: f64,
        is_valid: bool,
    },
    Curved {
        start: TerminalPoint,
        end: TerminalPoint,
        middle: Point,
        /// Arc through both handles.
        handle_arc: ArcInfo,
        /// The drawn part of `handle_arc`.
        body_arc: ArcInfo,
        is_valid: bool,
    },
}

impl ConnectorInfo {
    pub fn start(&self) -> &TerminalPoint {
        match self {
            ConnectorInfo::Straight { start, .. } | ConnectorInfo::Curved { start, .. } => start,
        }
    }

    pub fn end(&self) -> &TerminalPoint {
        match self {
            ConnectorInfo::Straight { end, .. } | ConnectorInfo::Curved { end, .. } => end,
        }
    }

    pub fn terminal(&self, terminal: Terminal) -> &TerminalPoint {
        match terminal {
            Terminal::Start => self.start(),
            Terminal::End => self.end(),
        }
    }

    /// Position of the bend handle.
    pub fn middle(&self) -> Point {
        match self {
            ConnectorInfo::Straight { middle, .. } | ConnectorInfo::Curved { middle, .. } => *middle,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ConnectorInfo::Straight { is_valid, .. } | ConnectorInfo::Curved { is_valid, .. } => *is_valid,
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, ConnectorInfo::Straight { .. })
    }
}

/// Compute the body geometry of a connector shape.
pub fn connector_info(editor: &Editor, shape: &ShapeRecord) -> Option<ConnectorInfo> {
    let connector = shape.as_connector()?;
    let bindings = connector_bindings(editor, shape.id);
    let terminals = terminals_in_connector_space(editor, shape, &bindings);
    let outlines = TargetOutlines::resolve(editor, shape, &bindings);

    let chord = terminals.start.distance(terminals.end);
    let bent = !connector.is_straight()
        && chord > APPROX_EPSILON
        && connector.bend.abs() <= WAY_TOO_BIG_ARROW_BEND_FACTOR * chord;
    if bent {
        if let Some(handle_arc) = bend_to_arc(terminals.start, terminals.end, connector.bend) {
            return Some(curved_info(connector, terminals, handle_arc, &outlines));
        }
    }
    Some(straight_info(connector, terminals, &outlines))
}

/// Length of the connector between its handles.
pub fn connector_length(info: &ConnectorInfo) -> f64 {
    match info {
        ConnectorInfo::Straight { start, end, .. } => start.handle.distance(end.handle),
        ConnectorInfo::Curved { handle_arc, .. } => handle_arc.length.abs(),
    }
}

/// Target outlines in connector space for the terminals that get clipped.
struct TargetOutlines {
    start: Option<(Vec<Point>, bool)>,
    end: Option<(Vec<Point>, bool)>,
}

impl TargetOutlines {
    fn resolve(editor: &Editor, shape: &ShapeRecord, bindings: &ConnectorBindings) -> Self {
        let outline = |terminal: Terminal| {
            let binding = bindings.get(terminal)?;
            if binding.connector_props()?.is_exact {
                return None;
            }
            let geometry = editor.geometry(binding.to_id)?;
            let connector_transform = editor.page_transform(shape.id)?;
            let to_connector = connector_transform.inverse() * editor.page_transform(binding.to_id)?;
            let vertices = geometry.vertices.iter().map(|v| to_connector * *v).collect();
            Some((vertices, geometry.is_closed))
        };
        Self {
            start: outline(Terminal::Start),
            end: outline(Terminal::End),
        }
    }

    fn get(&self, terminal: Terminal) -> Option<&(Vec<Point>, bool)> {
        match terminal {
            Terminal::Start => self.start.as_ref(),
            Terminal::End => self.end.as_ref(),
        }
    }
}

fn straight_info(connector: &Connector, terminals: ConnectorTerminals, outlines: &TargetOutlines) -> ConnectorInfo {
    let (a, b) = (terminals.start, terminals.end);
    let offset = BOUND_ARROW_OFFSET * connector.scale;

    let clip = |terminal: Terminal, handle: Point, other: Point| -> Point {
        let Some((vertices, closed)) = outlines.get(terminal) else {
            return handle;
        };
        let hit = intersect_segment_outline(handle, other, vertices, *closed)
            .into_iter()
            .min_by(|p, q| p.distance(other).total_cmp(&q.distance(other)));
        let Some(mut point) = hit else {
            return handle;
        };
        if connector.arrowhead(terminal) != Arrowhead::None {
            point += unit(other - point) * offset;
        }
        point
    };

    let mut start_point = clip(Terminal::Start, a, b);
    let mut end_point = clip(Terminal::End, b, a);
    let clipped_len = start_point.distance(end_point);
    let flipped = (end_point - start_point).dot(b - a) < 0.0;
    if clipped_len < MIN_ARROW_LENGTH * connector.scale || flipped {
        start_point = a;
        end_point = b;
    }

    ConnectorInfo::Straight {
        start: TerminalPoint {
            handle: a,
            point: start_point,
            arrowhead: connector.arrowhead_start,
        },
        end: TerminalPoint {
            handle: b,
            point: end_point,
            arrowhead: connector.arrowhead_end,
        },
        middle: midpoint(a, b),
        length: start_point.distance(end_point),
        is_valid: a.distance(b) > APPROX_EPSILON,
    }
}

fn curved_info(
    connector: &Connector,
    terminals: ConnectorTerminals,
    handle_arc: ArcInfo,
    outlines: &TargetOutlines,
) -> ConnectorInfo {
    let (a, b) = (terminals.start, terminals.end);
    let crossings = |terminal: Terminal| -> Vec<f64> {
        let Some((vertices, closed)) = outlines.get(terminal) else {
            return Vec::new();
        };
        intersect_circle_outline(handle_arc.center, handle_arc.radius, vertices, *closed)
            .into_iter()
            .filter_map(|p| handle_arc.fraction_of(p))
            .filter(|t| *t > APPROX_EPSILON && *t < 1.0 - APPROX_EPSILON)
            .collect()
    };

    // The body leaves the start target at its first crossing and enters the
    // end target at its last.
    let mut t0 = crossings(Terminal::Start).into_iter().fold(None, |m: Option<f64>, t| Some(m.map_or(t, |m| m.min(t))));
    let mut t1 = crossings(Terminal::End).into_iter().fold(None, |m: Option<f64>, t| Some(m.map_or(t, |m| m.max(t))));

    if handle_arc.length > APPROX_EPSILON {
        let offset = BOUND_ARROW_OFFSET * connector.scale / handle_arc.length;
        if connector.arrowhead_start != Arrowhead::None {
            t0 = t0.map(|t| t + offset);
        }
        if connector.arrowhead_end != Arrowhead::None {
            t1 = t1.map(|t| t - offset);
        }
    }

    let (mut start_t, mut end_t) = (t0.unwrap_or(0.0), t1.unwrap_or(1.0));
    if (end_t - start_t) * handle_arc.length < MIN_ARROW_LENGTH * connector.scale {
        start_t = 0.0;
        end_t = 1.0;
    }
    let body_arc = handle_arc.sub_arc(start_t, end_t);

    ConnectorInfo::Curved {
        start: TerminalPoint {
            handle: a,
            point: body_arc.start(),
            arrowhead: connector.arrowhead_start,
        },
        end: TerminalPoint {
            handle: b,
            point: body_arc.end(),
            arrowhead: connector.arrowhead_end,
        },
        middle: bend_middle(a, b, connector.bend),
        handle_arc,
        body_arc,
        is_valid: handle_arc.length.is_finite() && handle_arc.length > APPROX_EPSILON,
    }
}
