//! Connector body paths for the renderer.

use super::info::{ConnectorInfo, connector_info};
use crate::bindings::connector_bindings;
use crate::editor::Editor;
use crate::geometry::{APPROX_EPSILON, ArcInfo, approximately, unit};
use crate::shapes::{PathStyle, ShapeRecord, Terminal};
use kurbo::{Affine, BezPath, CubicBez, Point, Shape, Vec2};

/// Tolerance used when flattening curved bodies.
const FLATTEN_TOLERANCE: f64 = 0.5;

/// Edge of the target an anchor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl AnchorSide {
    /// Outward direction in the target's local space.
    pub fn direction(self) -> Vec2 {
        match self {
            AnchorSide::Top => Vec2::new(0.0, -1.0),
            AnchorSide::Bottom => Vec2::new(0.0, 1.0),
            AnchorSide::Left => Vec2::new(-1.0, 0.0),
            AnchorSide::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// Side of the target a normalized anchor lies on, if it lies on an edge.
pub fn anchor_side(anchor: Point) -> Option<AnchorSide> {
    if approximately(anchor.y, 0.0) {
        Some(AnchorSide::Top)
    } else if approximately(anchor.y, 1.0) {
        Some(AnchorSide::Bottom)
    } else if approximately(anchor.x, 0.0) {
        Some(AnchorSide::Left)
    } else if approximately(anchor.x, 1.0) {
        Some(AnchorSide::Right)
    } else {
        None
    }
}

/// A connector body in the connector's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectorPath {
    Straight { start: Point, end: Point },
    Arc { arc: ArcInfo },
    Spline {
        start: Point,
        control1: Point,
        control2: Point,
        end: Point,
    },
}

impl ConnectorPath {
    pub fn start(&self) -> Point {
        match self {
            ConnectorPath::Straight { start, .. } | ConnectorPath::Spline { start, .. } => *start,
            ConnectorPath::Arc { arc } => arc.start(),
        }
    }

    pub fn end(&self) -> Point {
        match self {
            ConnectorPath::Straight { end, .. } | ConnectorPath::Spline { end, .. } => *end,
            ConnectorPath::Arc { arc } => arc.end(),
        }
    }

    pub fn to_bez_path(&self) -> BezPath {
        match self {
            ConnectorPath::Straight { start, end } => {
                let mut path = BezPath::new();
                path.move_to(*start);
                path.line_to(*end);
                path
            }
            ConnectorPath::Arc { arc } => arc.to_kurbo().into_path(0.1),
            ConnectorPath::Spline {
                start,
                control1,
                control2,
                end,
            } => CubicBez::new(*start, *control1, *control2, *end).into_path(0.1),
        }
    }

    /// SVG path data.
    pub fn to_svg(&self) -> String {
        self.to_bez_path().to_svg()
    }

    /// Points along the body, dense enough for hit-testing.
    pub fn points(&self) -> Vec<Point> {
        match self {
            ConnectorPath::Straight { start, end } => vec![*start, *end],
            ConnectorPath::Arc { arc } => {
                let steps = ((arc.length / 8.0).ceil() as usize).clamp(2, 64);
                (0..=steps).map(|i| arc.point_at(i as f64 / steps as f64)).collect()
            }
            ConnectorPath::Spline { .. } => {
                let mut points = Vec::new();
                kurbo::flatten(&self.to_bez_path(), FLATTEN_TOLERANCE, |el| match el {
                    kurbo::PathEl::MoveTo(p) | kurbo::PathEl::LineTo(p) => points.push(p),
                    _ => {}
                });
                points
            }
        }
    }
}

/// Cubic spline leaving `start` and entering `end` perpendicular to the
/// edges they are attached to.
///
/// `start_dir`/`end_dir` are outward directions in the path's space, or
/// `None` for a terminal that is not on an edge; such terminals push
/// horizontally toward the other end.
pub fn spline_path(start: Point, end: Point, start_dir: Option<Vec2>, end_dir: Option<Vec2>, ratio: f64) -> ConnectorPath {
    let chord = end - start;
    let reach = chord.hypot() * ratio;
    let fallback = |from: Point, to: Point| {
        let dx = to.x - from.x;
        if dx.abs() > APPROX_EPSILON {
            Vec2::new(dx.signum(), 0.0)
        } else {
            unit(to - from)
        }
    };
    let d0 = start_dir.map(unit).unwrap_or_else(|| fallback(start, end));
    let d1 = end_dir.map(unit).unwrap_or_else(|| fallback(end, start));
    ConnectorPath::Spline {
        start,
        control1: start + d0 * reach,
        control2: end + d1 * reach,
        end,
    }
}

/// The body path of a connector shape.
///
/// Flowing connectors that are straight and bound at either end render as a
/// side-aware spline; everything else follows the straight or arc body.
pub fn connector_path(editor: &Editor, shape: &ShapeRecord) -> Option<ConnectorPath> {
    let connector = shape.as_connector()?;
    let info = connector_info(editor, shape)?;
    let bindings = connector_bindings(editor, shape.id);

    if connector.path_style == PathStyle::Flowing && info.is_straight() && !bindings.is_empty() {
        let connector_transform = editor.page_transform(shape.id)?;
        let outward = |terminal: Terminal| -> Option<Vec2> {
            let binding = bindings.get(terminal)?;
            let side = anchor_side(binding.connector_props()?.normalized_anchor)?;
            let target_transform = editor.page_transform(binding.to_id)?;
            let to_connector: Affine = connector_transform.inverse() * target_transform;
            Some(to_connector * side.direction().to_point() - to_connector * Point::ZERO)
        };
        return Some(spline_path(
            info.start().point,
            info.end().point,
            outward(Terminal::Start),
            outward(Terminal::End),
            editor.config.spline_offset_ratio,
        ));
    }

    Some(match info {
        ConnectorInfo::Straight { start, end, .. } => ConnectorPath::Straight {
            start: start.point,
            end: end.point,
        },
        ConnectorInfo::Curved { body_arc, .. } => ConnectorPath::Arc { arc: body_arc },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::approximately_point;

    #[test]
    fn test_anchor_side() {
        assert_eq!(anchor_side(Point::new(0.5, 0.0)), Some(AnchorSide::Top));
        assert_eq!(anchor_side(Point::new(0.5, 1.0)), Some(AnchorSide::Bottom));
        assert_eq!(anchor_side(Point::new(0.0, 0.5)), Some(AnchorSide::Left));
        assert_eq!(anchor_side(Point::new(1.0, 0.3)), Some(AnchorSide::Right));
        assert_eq!(anchor_side(Point::new(0.4, 0.6)), None);
    }

    #[test]
    fn test_spline_exits_vertically_from_top_and_bottom() {
        // Two stacked boxes: start on the bottom edge of the upper one, end on
        // the top edge of the lower one.
        let start = Point::new(0.0, 0.0);
        let end = Point::new(100.0, 200.0);
        let path = spline_path(
            start,
            end,
            Some(AnchorSide::Bottom.direction()),
            Some(AnchorSide::Top.direction()),
            0.25,
        );
        let ConnectorPath::Spline { control1, control2, .. } = path else {
            panic!("expected a spline");
        };
        let reach = (end - start).hypot() * 0.25;
        assert!(approximately_point(control1, Point::new(0.0, reach)));
        assert!(approximately_point(control2, Point::new(100.0, 200.0 - reach)));
    }

    #[test]
    fn test_spline_without_sides_pushes_horizontally() {
        let path = spline_path(Point::new(0.0, 0.0), Point::new(100.0, 50.0), None, None, 0.25);
        let ConnectorPath::Spline { control1, control2, .. } = path else {
            panic!("expected a spline");
        };
        assert!(control1.x > 0.0 && approximately(control1.y, 0.0));
        assert!(control2.x < 100.0 && approximately(control2.y, 50.0));
    }

    #[test]
    fn test_straight_path_svg() {
        let path = ConnectorPath::Straight {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
        };
        let svg = path.to_svg();
        assert!(svg.starts_with('M'));
        assert!(svg.contains('L'));
        assert_eq!(path.points().len(), 2);
    }

    #[test]
    fn test_arc_points_follow_arc() {
        let arc = crate::geometry::bend_to_arc(Point::ZERO, Point::new(100.0, 0.0), 30.0).unwrap();
        let path = ConnectorPath::Arc { arc };
        let points = path.points();
        assert!(approximately_point(points[0], Point::ZERO));
        assert!(approximately_point(*points.last().unwrap(), Point::new(100.0, 0.0)));
        assert!(points.iter().all(|p| approximately(p.distance(arc.center), arc.radius)));
    }
}
