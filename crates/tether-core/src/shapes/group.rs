//! Group shape: a container whose bounds follow its children.

use super::{Geometry, ShapeKind, ShapeRecord, ShapeType};
use crate::editor::Editor;
use crate::geometry::bounds_of;
use crate::registry::ShapeUtil;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A group of shapes that can be manipulated as a single unit.
/// Groups can contain other groups, enabling nested hierarchies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group;

/// Handlers for [`Group`] shapes.
pub struct GroupUtil;

impl ShapeUtil for GroupUtil {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Group
    }

    fn default_kind(&self) -> ShapeKind {
        ShapeKind::Group(Group)
    }

    /// Union of the children's outlines, in group space.
    fn geometry(&self, editor: &Editor, shape: &ShapeRecord) -> Geometry {
        let points: Vec<Point> = editor
            .children_of(shape.id)
            .into_iter()
            .filter_map(|child_id| {
                let child = editor.shape(child_id)?;
                let geometry = editor.geometry(child_id)?;
                let transform = child.local_transform();
                Some(
                    geometry
                        .vertices
                        .into_iter()
                        .map(move |v| transform * v)
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect();
        Geometry::rect(bounds_of(points))
    }

    fn can_bind(&self, _from: ShapeType, _to: ShapeType) -> bool {
        false
    }
}
