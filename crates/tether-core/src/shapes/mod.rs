//! Shape records stored on the canvas.

mod connector;
mod geo;
mod group;
mod line;

pub use connector::{
    Arrowhead, BOUND_ARROW_OFFSET, Connector, MIN_ARROW_BEND, MIN_ARROW_LENGTH, PathStyle,
    StrokeSize, Terminal, WAY_TOO_BIG_ARROW_BEND_FACTOR,
};
pub use geo::{Geo, GeoKind, GeoUtil};
pub use group::{Group, GroupUtil};
pub use line::{Line, LineUtil};

use crate::geometry::{bounds_of, point_in_polygon};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Unique identifier for pages.
pub type PageId = Uuid;

/// Structural parent of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParentId {
    Page(PageId),
    Shape(ShapeId),
}

/// Type tag used to look up a shape's handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Geo,
    Line,
    Group,
    Connector,
}

/// Type-specific payload of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Geo(Geo),
    Line(Line),
    Group(Group),
    Connector(Connector),
}

impl ShapeKind {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            ShapeKind::Geo(_) => ShapeType::Geo,
            ShapeKind::Line(_) => ShapeType::Line,
            ShapeKind::Group(_) => ShapeType::Group,
            ShapeKind::Connector(_) => ShapeType::Connector,
        }
    }
}

/// A shape on the canvas: identity, placement in the hierarchy, and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub id: ShapeId,
    pub parent: ParentId,
    /// Ordering key among siblings; lower renders further back.
    pub index: f64,
    /// Position in parent space.
    pub x: f64,
    pub y: f64,
    /// Rotation in radians around the local origin.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub is_locked: bool,
    pub kind: ShapeKind,
}

impl ShapeRecord {
    /// Create a shape at the parent's origin.
    pub fn new(parent: ParentId, kind: ShapeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent,
            index: 0.0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            is_locked: false,
            kind,
        }
    }

    /// Builder: set the position in parent space.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Builder: set the rotation.
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: lock the shape.
    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    pub fn shape_type(&self) -> ShapeType {
        self.kind.shape_type()
    }

    /// Transform from this shape's local space to its parent's space.
    pub fn local_transform(&self) -> Affine {
        Affine::translate((self.x, self.y)) * Affine::rotate(self.rotation)
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match &self.kind {
            ShapeKind::Connector(connector) => Some(connector),
            _ => None,
        }
    }

    pub fn as_connector_mut(&mut self) -> Option<&mut Connector> {
        match &mut self.kind {
            ShapeKind::Connector(connector) => Some(connector),
            _ => None,
        }
    }
}

/// Outline of a shape in its local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub bounds: Rect,
    pub vertices: Vec<Point>,
    /// Closed outlines bound imprecisely and hit-test by area.
    pub is_closed: bool,
}

impl Geometry {
    /// A closed polygon.
    pub fn closed(vertices: Vec<Point>) -> Self {
        Self {
            bounds: bounds_of(vertices.iter().copied()),
            vertices,
            is_closed: true,
        }
    }

    /// An open polyline.
    pub fn open(vertices: Vec<Point>) -> Self {
        Self {
            bounds: bounds_of(vertices.iter().copied()),
            vertices,
            is_closed: false,
        }
    }

    /// Closed geometry of a rectangle.
    pub fn rect(rect: Rect) -> Self {
        Self::closed(vec![
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ])
    }

    /// Check if a local-space point hits the shape.
    pub fn hit_test(&self, point: Point, margin: f64) -> bool {
        if self.is_closed && point_in_polygon(point, &self.vertices) {
            return true;
        }
        let mut outline = self.vertices.clone();
        if self.is_closed {
            if let Some(first) = self.vertices.first() {
                outline.push(*first);
            }
        }
        match outline.len() {
            0 => false,
            1 => outline[0].distance(point) <= margin,
            _ => point_to_polyline_dist(point, &outline) <= margin,
        }
    }
}

/// Distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}
