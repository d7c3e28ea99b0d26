//! Type registry: maps shape and binding type tags to their handlers.
//!
//! Every capability has a no-op default, so a handler only overrides what its
//! type actually reacts to.

use crate::bindings::{Binding, BindingProps, BindingType};
use crate::connector::{ConnectorBindingUtil, ConnectorUtil};
use crate::editor::Editor;
use crate::error::EngineResult;
use crate::selection::{Handle, HandleDrag, HandleId};
use crate::shapes::{
    Geometry, GeoUtil, GroupUtil, LineUtil, ShapeId, ShapeKind, ShapeRecord, ShapeType,
};
use crate::tools::{ResizeInfo, ResizeOutcome, TranslateStart};
use kurbo::BezPath;
use std::collections::HashMap;
use std::rc::Rc;

/// Handlers for one shape type.
pub trait ShapeUtil {
    fn shape_type(&self) -> ShapeType;

    /// Payload for a freshly created shape of this type.
    fn default_kind(&self) -> ShapeKind;

    /// Outline in the shape's local space.
    fn geometry(&self, editor: &Editor, shape: &ShapeRecord) -> Geometry;

    /// Handles in the shape's local space.
    fn handles(&self, _editor: &Editor, _shape: &ShapeRecord) -> Vec<Handle> {
        Vec::new()
    }

    /// Whether a binding from a `from` shape to a `to` shape is allowed.
    /// Both ends' handlers are asked.
    fn can_bind(&self, _from: ShapeType, _to: ShapeType) -> bool {
        true
    }

    /// Whether pressing on the body starts a translation.
    fn can_translate_by_body(&self) -> bool {
        true
    }

    /// A handle was dragged; returns the updated record to commit, if any.
    fn on_handle_drag(
        &self,
        _editor: &mut Editor,
        _shape: &ShapeRecord,
        _drag: &HandleDrag,
    ) -> EngineResult<Option<ShapeRecord>> {
        Ok(None)
    }

    fn on_resize(&self, _editor: &mut Editor, _info: &ResizeInfo<'_>) -> EngineResult<Option<ResizeOutcome>> {
        Ok(None)
    }

    fn on_translate_start(&self, _editor: &mut Editor, _shape: &ShapeRecord) -> EngineResult<TranslateStart> {
        Ok(TranslateStart::default())
    }

    fn on_translate(
        &self,
        _editor: &mut Editor,
        _start: &TranslateStart,
        _shape_id: ShapeId,
        _moving: &[ShapeId],
    ) -> EngineResult<()> {
        Ok(())
    }

    fn on_double_click_handle(&self, _shape: &ShapeRecord, _handle: HandleId) -> Option<ShapeRecord> {
        None
    }

    /// Text editing finished.
    fn on_edit_end(&self, _shape: &ShapeRecord) -> Option<ShapeRecord> {
        None
    }

    /// SVG path data for the shape's body in local space.
    fn to_svg_path(&self, editor: &Editor, shape: &ShapeRecord) -> String {
        let geometry = self.geometry(editor, shape);
        let mut path = BezPath::new();
        let mut vertices = geometry.vertices.iter();
        if let Some(first) = vertices.next() {
            path.move_to(*first);
            for v in vertices {
                path.line_to(*v);
            }
            if geometry.is_closed {
                path.close_path();
            }
        }
        path.to_svg()
    }
}

/// Handlers for one binding type. Callbacks run after the triggering
/// mutation has been committed.
pub trait BindingUtil {
    fn binding_type(&self) -> BindingType;

    fn default_props(&self) -> BindingProps;

    fn on_after_create(&self, _editor: &mut Editor, _binding: &Binding) -> EngineResult<()> {
        Ok(())
    }

    fn on_after_change(&self, _editor: &mut Editor, _prev: &Binding, _next: &Binding) -> EngineResult<()> {
        Ok(())
    }

    /// The binding's `from` shape changed.
    fn on_after_change_from_shape(&self, _editor: &mut Editor, _binding: &Binding) -> EngineResult<()> {
        Ok(())
    }

    /// The binding's `to` shape, or one of its ancestors, changed.
    fn on_after_change_to_shape(&self, _editor: &mut Editor, _binding: &Binding) -> EngineResult<()> {
        Ok(())
    }

    /// The binding is about to be dropped because its shapes are being separated.
    fn on_before_isolate_from_shape(&self, _editor: &mut Editor, _binding: &Binding) -> EngineResult<()> {
        Ok(())
    }

    fn on_before_isolate_to_shape(&self, _editor: &mut Editor, _binding: &Binding) -> EngineResult<()> {
        Ok(())
    }

    /// The binding's `to` shape is about to be deleted.
    fn on_before_delete_to_shape(&self, _editor: &mut Editor, _binding: &Binding) -> EngineResult<()> {
        Ok(())
    }
}

/// Generic binding: dropped along with either of its shapes, nothing more.
pub struct LinkBindingUtil;

impl BindingUtil for LinkBindingUtil {
    fn binding_type(&self) -> BindingType {
        BindingType::Link
    }

    fn default_props(&self) -> BindingProps {
        BindingProps::Link
    }
}

/// Lookup table from type tags to handlers.
#[derive(Clone)]
pub struct Registry {
    shapes: HashMap<ShapeType, Rc<dyn ShapeUtil>>,
    bindings: HashMap<BindingType, Rc<dyn BindingUtil>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_shape(Rc::new(GeoUtil));
        registry.register_shape(Rc::new(LineUtil));
        registry.register_shape(Rc::new(GroupUtil));
        registry.register_shape(Rc::new(ConnectorUtil));
        registry.register_binding(Rc::new(ConnectorBindingUtil));
        registry.register_binding(Rc::new(LinkBindingUtil));
        registry
    }
}

impl Registry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self {
            shapes: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    /// Register (or replace) the handlers for a shape type.
    pub fn register_shape(&mut self, util: Rc<dyn ShapeUtil>) {
        self.shapes.insert(util.shape_type(), util);
    }

    /// Register (or replace) the handlers for a binding type.
    pub fn register_binding(&mut self, util: Rc<dyn BindingUtil>) {
        self.bindings.insert(util.binding_type(), util);
    }

    pub fn shape_util(&self, shape_type: ShapeType) -> Option<Rc<dyn ShapeUtil>> {
        self.shapes.get(&shape_type).cloned()
    }

    pub fn binding_util(&self, binding_type: BindingType) -> Option<Rc<dyn BindingUtil>> {
        self.bindings.get(&binding_type).cloned()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("shapes", &self.shapes.keys().collect::<Vec<_>>())
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}
