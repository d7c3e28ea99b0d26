//! Geometric bind targets: rectangles and ellipses.

use super::{Geometry, ShapeKind, ShapeRecord, ShapeType};
use crate::editor::Editor;
use crate::error::EngineResult;
use crate::registry::ShapeUtil;
use crate::tools::{ResizeInfo, ResizeOutcome};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Number of vertices used to approximate an ellipse outline.
const ELLIPSE_SEGMENTS: usize = 48;

/// Outline flavour of a geo shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoKind {
    #[default]
    Rectangle,
    Ellipse,
}

/// A closed box-like shape occupying `(0, 0)-(w, h)` in local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub geo: GeoKind,
    pub w: f64,
    pub h: f64,
}

impl Default for Geo {
    fn default() -> Self {
        Self::rectangle(100.0, 100.0)
    }
}

impl Geo {
    /// Create a rectangle.
    pub fn rectangle(w: f64, h: f64) -> Self {
        Self {
            geo: GeoKind::Rectangle,
            w,
            h,
        }
    }

    /// Create an ellipse inscribed in `w` x `h`.
    pub fn ellipse(w: f64, h: f64) -> Self {
        Self {
            geo: GeoKind::Ellipse,
            w,
            h,
        }
    }

    /// Local bounding box.
    pub fn as_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.w, self.h)
    }

    /// Closed outline in local space.
    pub fn geometry(&self) -> Geometry {
        match self.geo {
            GeoKind::Rectangle => Geometry::rect(self.as_rect()),
            GeoKind::Ellipse => {
                let center = self.as_rect().center();
                let (rx, ry) = (self.w / 2.0, self.h / 2.0);
                let vertices = (0..ELLIPSE_SEGMENTS)
                    .map(|i| {
                        let angle = TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
                        Point::new(center.x + rx * angle.cos(), center.y + ry * angle.sin())
                    })
                    .collect();
                Geometry {
                    bounds: self.as_rect(),
                    vertices,
                    is_closed: true,
                }
            }
        }
    }
}

/// Handlers for [`Geo`] shapes.
pub struct GeoUtil;

impl ShapeUtil for GeoUtil {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Geo
    }

    fn default_kind(&self) -> ShapeKind {
        ShapeKind::Geo(Geo::default())
    }

    fn geometry(&self, _editor: &Editor, shape: &ShapeRecord) -> Geometry {
        match &shape.kind {
            ShapeKind::Geo(geo) => geo.geometry(),
            _ => Geometry::rect(Rect::ZERO),
        }
    }

    fn on_resize(&self, _editor: &mut Editor, info: &ResizeInfo<'_>) -> EngineResult<Option<ResizeOutcome>> {
        let ShapeKind::Geo(geo) = &info.initial.kind else {
            return Ok(None);
        };
        let w = geo.w * info.scale_x;
        let h = geo.h * info.scale_y;
        Ok(Some(ResizeOutcome {
            kind: ShapeKind::Geo(Geo {
                geo: geo.geo,
                w: w.abs(),
                h: h.abs(),
            }),
            // A negative scale flips the box, so its origin moves to the far corner.
            origin_offset: Vec2::new(w.min(0.0), h.min(0.0)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_geometry() {
        let geometry = Geo::rectangle(100.0, 50.0).geometry();
        assert!(geometry.is_closed);
        assert_eq!(geometry.vertices.len(), 4);
        assert!((geometry.bounds.width() - 100.0).abs() < f64::EPSILON);
        assert!((geometry.bounds.height() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ellipse_geometry_stays_in_bounds() {
        let geometry = Geo::ellipse(80.0, 40.0).geometry();
        assert!(geometry.is_closed);
        assert_eq!(geometry.vertices.len(), ELLIPSE_SEGMENTS);
        for v in &geometry.vertices {
            assert!(v.x >= -1e-9 && v.x <= 80.0 + 1e-9);
            assert!(v.y >= -1e-9 && v.y <= 40.0 + 1e-9);
        }
        assert!(geometry.hit_test(Point::new(40.0, 20.0), 0.0));
        assert!(!geometry.hit_test(Point::new(2.0, 2.0), 0.0));
    }
}
