//! Line shape: an open polyline that can still be bound to.

use super::{Geometry, ShapeKind, ShapeRecord, ShapeType};
use crate::editor::Editor;
use crate::error::EngineResult;
use crate::registry::ShapeUtil;
use crate::tools::{ResizeInfo, ResizeOutcome};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A line segment or polyline in local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
    /// Intermediate points (for polylines).
    #[serde(default)]
    pub intermediate_points: Vec<Point>,
}

impl Line {
    /// Create a new line.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            intermediate_points: Vec::new(),
        }
    }

    /// Create a polyline from multiple points.
    pub fn from_points(points: Vec<Point>) -> Self {
        let start = points.first().copied().unwrap_or(Point::ZERO);
        let end = points.last().copied().unwrap_or(Point::ZERO);
        let intermediate_points = if points.len() > 2 {
            points[1..points.len() - 1].to_vec()
        } else {
            Vec::new()
        };
        Self {
            start,
            end,
            intermediate_points,
        }
    }

    /// Get all points including start, intermediate, and end.
    pub fn all_points(&self) -> Vec<Point> {
        let mut pts = vec![self.start];
        pts.extend(&self.intermediate_points);
        pts.push(self.end);
        pts
    }
}

/// Handlers for [`Line`] shapes.
pub struct LineUtil;

impl ShapeUtil for LineUtil {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Line
    }

    fn default_kind(&self) -> ShapeKind {
        ShapeKind::Line(Line::new(Point::ZERO, Point::new(100.0, 0.0)))
    }

    fn geometry(&self, _editor: &Editor, shape: &ShapeRecord) -> Geometry {
        match &shape.kind {
            ShapeKind::Line(line) => Geometry::open(line.all_points()),
            _ => Geometry::open(Vec::new()),
        }
    }

    fn on_resize(&self, _editor: &mut Editor, info: &ResizeInfo<'_>) -> EngineResult<Option<ResizeOutcome>> {
        let ShapeKind::Line(line) = &info.initial.kind else {
            return Ok(None);
        };
        let scale = |p: Point| Point::new(p.x * info.scale_x, p.y * info.scale_y);
        Ok(Some(ResizeOutcome {
            kind: ShapeKind::Line(Line {
                start: scale(line.start),
                end: scale(line.end),
                intermediate_points: line.intermediate_points.iter().copied().map(scale).collect(),
            }),
            origin_offset: Vec2::ZERO,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let line = Line::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(100.0, 0.0),
        ]);
        assert_eq!(line.start, Point::new(0.0, 0.0));
        assert_eq!(line.end, Point::new(100.0, 0.0));
        assert_eq!(line.intermediate_points.len(), 1);
        assert_eq!(line.all_points().len(), 3);
    }

    #[test]
    fn test_geometry_is_open() {
        let line = Line::new(Point::ZERO, Point::new(100.0, 0.0));
        let geometry = Geometry::open(line.all_points());
        assert!(!geometry.is_closed);
        assert!(geometry.hit_test(Point::new(50.0, 2.0), 4.0));
    }
}
