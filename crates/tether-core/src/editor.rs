//! Editor: owns the document and routes every mutation through the binding
//! reactions registered for the affected shapes.

use crate::bindings::{Binding, BindingId, BindingType};
use crate::canvas::{CanvasDocument, HistoryMark};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, invariant};
use crate::geometry::bounds_of;
use crate::input::InputState;
use crate::registry::{BindingUtil, Registry, ShapeUtil};
use crate::selection::HandleId;
use crate::shapes::{Connector, Geometry, PageId, ParentId, ShapeId, ShapeRecord, ShapeType};
use kurbo::{Affine, Point, Rect};
use std::rc::Rc;

/// Cursor the host should display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorKind {
    #[default]
    Default,
    Cross,
}

/// The scene store plus the interaction state the connector engine reads.
#[derive(Debug)]
pub struct Editor {
    pub document: CanvasDocument,
    pub inputs: InputState,
    pub config: EngineConfig,
    registry: Registry,
    current_page: PageId,
    selected_ids: Vec<ShapeId>,
    hinting_ids: Vec<ShapeId>,
    cursor: CursorKind,
    reaction_depth: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Create an editor with an empty one-page document and default handlers.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_document(CanvasDocument::new(), config)
    }

    /// Open an existing document. The first page becomes current.
    pub fn with_document(document: CanvasDocument, config: EngineConfig) -> Self {
        let current_page = document
            .pages
            .first()
            .map(|page| page.id)
            .unwrap_or_else(uuid::Uuid::new_v4);
        let mut editor = Self {
            document,
            inputs: InputState::new(),
            config,
            registry: Registry::default(),
            current_page,
            selected_ids: Vec::new(),
            hinting_ids: Vec::new(),
            cursor: CursorKind::Default,
            reaction_depth: 0,
        };
        if !editor.document.has_page(current_page) {
            editor.current_page = editor.document.add_page("Page 1");
        }
        editor
    }

    /// Replace the handler registry.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn current_page_id(&self) -> PageId {
        self.current_page
    }

    pub fn set_current_page(&mut self, page: PageId) -> EngineResult<()> {
        if !self.document.has_page(page) {
            return Err(EngineError::PageNotFound(page));
        }
        self.current_page = page;
        self.select_none();
        self.set_hinting(Vec::new());
        Ok(())
    }

    pub fn create_page(&mut self, name: &str) -> PageId {
        self.document.add_page(name)
    }

    pub fn shape_util(&self, shape_type: ShapeType) -> Option<Rc<dyn ShapeUtil>> {
        self.registry.shape_util(shape_type)
    }

    pub fn binding_util(&self, binding_type: BindingType) -> Option<Rc<dyn BindingUtil>> {
        self.registry.binding_util(binding_type)
    }

    fn require_shape_util(&self, shape_type: ShapeType) -> EngineResult<Rc<dyn ShapeUtil>> {
        self.shape_util(shape_type)
            .ok_or_else(|| EngineError::UnknownType(format!("{shape_type:?}")))
    }

    /// Whether a shape of `from_type` may bind to `to_id`. Both handlers must agree.
    pub fn can_bind_shapes(&self, from_type: ShapeType, to_id: ShapeId) -> bool {
        let Some(to) = self.shape(to_id) else {
            return false;
        };
        let to_type = to.shape_type();
        let allowed = |shape_type| {
            self.shape_util(shape_type)
                .is_some_and(|util| util.can_bind(from_type, to_type))
        };
        allowed(from_type) && allowed(to_type)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.document.get_shape(id)
    }

    /// Children of a parent, back to front.
    pub fn sorted_child_ids(&self, parent: ParentId) -> Vec<ShapeId> {
        let mut children: Vec<&ShapeRecord> = self
            .document
            .shapes
            .values()
            .filter(|shape| shape.parent == parent)
            .collect();
        children.sort_by(|a, b| a.index.total_cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        children.into_iter().map(|shape| shape.id).collect()
    }

    pub fn children_of(&self, id: ShapeId) -> Vec<ShapeId> {
        self.sorted_child_ids(ParentId::Shape(id))
    }

    /// All shapes below `id` in the hierarchy.
    pub fn descendants(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.children_of(current) {
                out.push(child);
                stack.push(child);
            }
        }
        out
    }

    /// Ancestor shapes of `id`, nearest first.
    pub fn ancestors(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut out = Vec::new();
        let mut current = self.shape(id);
        while let Some(shape) = current {
            let ParentId::Shape(parent) = shape.parent else {
                break;
            };
            if out.contains(&parent) {
                break;
            }
            out.push(parent);
            current = self.shape(parent);
        }
        out
    }

    /// The page a shape ultimately belongs to.
    pub fn page_id_of(&self, id: ShapeId) -> Option<PageId> {
        let root = match self.ancestors(id).last() {
            Some(&top) => self.shape(top)?,
            None => self.shape(id)?,
        };
        match root.parent {
            ParentId::Page(page) if self.document.has_page(page) => Some(page),
            _ => None,
        }
    }

    /// Transform from a parent's space to page space.
    pub fn parent_page_transform(&self, parent: ParentId) -> Option<Affine> {
        match parent {
            ParentId::Page(_) => Some(Affine::IDENTITY),
            ParentId::Shape(id) => self.page_transform(id),
        }
    }

    /// Transform from a shape's local space to page space.
    pub fn page_transform(&self, id: ShapeId) -> Option<Affine> {
        let shape = self.shape(id)?;
        Some(self.parent_page_transform(shape.parent)? * shape.local_transform())
    }

    pub fn page_to_local(&self, id: ShapeId, page_point: Point) -> Option<Point> {
        Some(self.page_transform(id)?.inverse() * page_point)
    }

    pub fn local_to_page(&self, id: ShapeId, local_point: Point) -> Option<Point> {
        Some(self.page_transform(id)? * local_point)
    }

    /// Outline of a shape in its local space.
    pub fn geometry(&self, id: ShapeId) -> Option<Geometry> {
        let shape = self.shape(id)?;
        let util = self.shape_util(shape.shape_type())?;
        Some(util.geometry(self, shape))
    }

    /// Axis-aligned bounds of a shape's outline in page space.
    pub fn page_bounds(&self, id: ShapeId) -> Option<Rect> {
        let geometry = self.geometry(id)?;
        let transform = self.page_transform(id)?;
        if geometry.vertices.is_empty() {
            let b = geometry.bounds;
            return Some(bounds_of(
                [
                    Point::new(b.x0, b.y0),
                    Point::new(b.x1, b.y0),
                    Point::new(b.x1, b.y1),
                    Point::new(b.x0, b.y1),
                ]
                .map(|p| transform * p),
            ));
        }
        Some(bounds_of(geometry.vertices.iter().map(|v| transform * *v)))
    }

    /// Nearest shape that is an ancestor of every shape in `ids`.
    pub fn find_common_ancestor(&self, ids: &[ShapeId]) -> Option<ShapeId> {
        let (first, rest) = ids.split_first()?;
        let others: Vec<Vec<ShapeId>> = rest.iter().map(|id| self.ancestors(*id)).collect();
        self.ancestors(*first)
            .into_iter()
            .find(|candidate| others.iter().all(|chain| chain.contains(candidate)))
    }

    /// The ancestor-or-self of `shape_id` that is a direct child of `parent`.
    pub fn nearest_sibling(&self, parent: ParentId, shape_id: ShapeId) -> Option<ShapeId> {
        let mut current = self.shape(shape_id)?;
        for _ in 0..=self.document.shapes.len() {
            if current.parent == parent {
                return Some(current.id);
            }
            match current.parent {
                ParentId::Shape(id) => current = self.shape(id)?,
                ParentId::Page(_) => return None,
            }
        }
        None
    }

    /// Every shape on a page, back to front, children after their parent.
    pub fn shapes_in_render_order(&self, page: PageId) -> Vec<ShapeId> {
        let mut out = Vec::new();
        let mut stack: Vec<ShapeId> = self.sorted_child_ids(ParentId::Page(page));
        stack.reverse();
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = self.children_of(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Topmost shape on the current page under a page-space point. Groups are
    /// never returned; their children are tested instead.
    pub fn shape_at_point(&self, page_point: Point, filter: impl Fn(&ShapeRecord) -> bool) -> Option<ShapeId> {
        self.hit_shape(page_point, false, filter)
    }

    /// Topmost unlocked shape under a point that a `from_type` shape may bind
    /// to. Closed shapes must contain the point; open ones keep the hit margin.
    pub fn bindable_shape_at(&self, page_point: Point, from_type: ShapeType) -> Option<ShapeId> {
        self.hit_shape(page_point, true, |shape| {
            !shape.is_locked && self.can_bind_shapes(from_type, shape.id)
        })
    }

    fn hit_shape(&self, page_point: Point, inside_only: bool, filter: impl Fn(&ShapeRecord) -> bool) -> Option<ShapeId> {
        let margin = self.config.hit_margin / self.inputs.zoom.max(f64::EPSILON);
        self.shapes_in_render_order(self.current_page)
            .into_iter()
            .rev()
            .find(|&id| {
                let Some(shape) = self.shape(id) else {
                    return false;
                };
                if shape.shape_type() == ShapeType::Group || !filter(shape) {
                    return false;
                }
                match (self.geometry(id), self.page_to_local(id, page_point)) {
                    (Some(geometry), Some(local)) => {
                        let margin = if inside_only && geometry.is_closed { 0.0 } else { margin };
                        geometry.hit_test(local, margin)
                    }
                    _ => false,
                }
            })
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.document.get_binding(id)
    }

    /// Bindings of a type whose `from` side is `id`, oldest first.
    pub fn bindings_from_shape(&self, id: ShapeId, binding_type: BindingType) -> Vec<Binding> {
        self.document
            .bindings
            .iter()
            .filter(|binding| binding.from_id == id && binding.binding_type() == binding_type)
            .cloned()
            .collect()
    }

    /// Bindings of a type whose `to` side is `id`, oldest first.
    pub fn bindings_to_shape(&self, id: ShapeId, binding_type: BindingType) -> Vec<Binding> {
        self.document
            .bindings
            .iter()
            .filter(|binding| binding.to_id == id && binding.binding_type() == binding_type)
            .cloned()
            .collect()
    }

    pub fn selected_ids(&self) -> &[ShapeId] {
        &self.selected_ids
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selected_ids.contains(&id)
    }

    pub fn select(&mut self, ids: Vec<ShapeId>) {
        self.selected_ids = ids;
    }

    pub fn select_none(&mut self) {
        self.selected_ids.clear();
    }

    /// Shapes highlighted as prospective bind targets.
    pub fn hinting_ids(&self) -> &[ShapeId] {
        &self.hinting_ids
    }

    pub fn set_hinting(&mut self, ids: Vec<ShapeId>) {
        self.hinting_ids = ids;
    }

    pub fn cursor(&self) -> CursorKind {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: CursorKind) {
        self.cursor = cursor;
    }

    /// Record a checkpoint to roll back to with [`Editor::bail_to_mark`].
    pub fn mark(&mut self, name: &str) -> HistoryMark {
        self.document.mark(name)
    }

    /// Keep what happened since `mark` and release its snapshot.
    pub fn squash_to_mark(&mut self, mark: &HistoryMark) {
        if self.document.squash_to_mark(mark) {
            log::debug!("squashed to mark {}", mark.name);
        }
    }

    pub fn bail_to_mark(&mut self, mark: &HistoryMark) -> EngineResult<()> {
        self.document.bail_to_mark(mark)?;
        log::debug!("bailed to mark {}", mark.name);
        self.prune_stale_ids();
        Ok(())
    }

    pub fn push_undo(&mut self) {
        self.document.push_undo();
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.document.undo();
        self.prune_stale_ids();
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.document.redo();
        self.prune_stale_ids();
        redone
    }

    fn prune_stale_ids(&mut self) {
        let shapes = &self.document.shapes;
        self.selected_ids.retain(|id| shapes.contains_key(id));
        self.hinting_ids.retain(|id| shapes.contains_key(id));
    }

    fn validate_parent(&self, id: ShapeId, parent: ParentId) -> EngineResult<()> {
        match parent {
            ParentId::Page(page) if !self.document.has_page(page) => Err(EngineError::PageNotFound(page)),
            ParentId::Page(_) => Ok(()),
            ParentId::Shape(parent_id) => {
                if parent_id == id || self.ancestors(parent_id).contains(&id) {
                    return Err(EngineError::InvalidParent(id));
                }
                if self.shape(parent_id).is_none() {
                    return Err(EngineError::ShapeNotFound(parent_id));
                }
                Ok(())
            }
        }
    }

    /// Ordering key that places a new child on top of its siblings.
    fn next_index(&self, parent: ParentId) -> f64 {
        self.document
            .shapes
            .values()
            .filter(|shape| shape.parent == parent)
            .map(|shape| shape.index)
            .fold(None, |top: Option<f64>, index| Some(top.map_or(index, |t| t.max(index))))
            .map_or(0.0, |top| top + 1.0)
    }

    /// Insert a shape on top of its parent's children.
    pub fn create_shape(&mut self, mut record: ShapeRecord) -> EngineResult<ShapeId> {
        self.validate_parent(record.id, record.parent)?;
        record.index = self.next_index(record.parent);
        let id = record.id;
        self.document.shapes.insert(id, record);
        log::debug!("created shape {id}");
        Ok(id)
    }

    /// Replace a shape record and run the reactions of every binding touching
    /// it or its descendants. Unchanged records are ignored.
    pub fn update_shape(&mut self, record: ShapeRecord) -> EngineResult<()> {
        let current = self
            .document
            .shapes
            .get(&record.id)
            .ok_or(EngineError::ShapeNotFound(record.id))?;
        if *current == record {
            return Ok(());
        }
        let parent_changed = current.parent != record.parent;
        if parent_changed {
            self.validate_parent(record.id, record.parent)?;
        }
        let id = record.id;
        self.document.shapes.insert(id, record);
        self.dispatch_shape_change(id)
    }

    /// Edit a connector's props in place.
    pub fn update_connector(&mut self, id: ShapeId, edit: impl FnOnce(&mut Connector)) -> EngineResult<()> {
        let mut record = self.shape(id).cloned().ok_or(EngineError::ShapeNotFound(id))?;
        let Some(connector) = record.as_connector_mut() else {
            return Err(invariant(format!("shape {id} is not a connector")));
        };
        edit(connector);
        self.update_shape(record)
    }

    pub fn set_index(&mut self, id: ShapeId, index: f64) -> EngineResult<()> {
        let mut record = self.shape(id).cloned().ok_or(EngineError::ShapeNotFound(id))?;
        record.index = index;
        self.update_shape(record)
    }

    /// Move shapes under a new parent, keeping their page-space placement and
    /// putting them on top of the new siblings.
    pub fn reparent_shapes(&mut self, ids: &[ShapeId], parent: ParentId) -> EngineResult<()> {
        let parent_transform = match parent {
            ParentId::Page(page) if !self.document.has_page(page) => {
                return Err(EngineError::PageNotFound(page));
            }
            ParentId::Page(_) => Affine::IDENTITY,
            ParentId::Shape(id) => self.page_transform(id).ok_or(EngineError::ShapeNotFound(id))?,
        };
        let inverse = parent_transform.inverse();
        for &id in ids {
            self.validate_parent(id, parent)?;
            let mut record = self.shape(id).cloned().ok_or(EngineError::ShapeNotFound(id))?;
            let page_transform = self.page_transform(id).ok_or(EngineError::ShapeNotFound(id))?;
            let [a, b, _, _, e, f] = (inverse * page_transform).as_coeffs();
            record.parent = parent;
            record.x = e;
            record.y = f;
            record.rotation = b.atan2(a);
            record.index = self.next_index(parent);
            log::debug!("reparenting {id} to {parent:?}");
            self.update_shape(record)?;
        }
        Ok(())
    }

    /// Delete shapes and their descendants.
    ///
    /// Binding handlers for every binding pointing into the deleted set from
    /// outside it run first, and may delete further shapes.
    pub fn delete_shapes(&mut self, ids: &[ShapeId]) -> EngineResult<()> {
        let mut doomed: Vec<ShapeId> = Vec::new();
        for &id in ids {
            if self.shape(id).is_none() || doomed.contains(&id) {
                continue;
            }
            doomed.push(id);
            for descendant in self.descendants(id) {
                if !doomed.contains(&descendant) {
                    doomed.push(descendant);
                }
            }
        }
        if doomed.is_empty() {
            return Ok(());
        }

        let incoming: Vec<BindingId> = self
            .document
            .bindings
            .iter()
            .filter(|b| doomed.contains(&b.to_id) && !doomed.contains(&b.from_id))
            .map(|b| b.id)
            .collect();
        for id in incoming {
            self.react(id, |util, editor, binding| util.on_before_delete_to_shape(editor, binding))?;
        }

        for id in &doomed {
            self.document.shapes.remove(id);
        }
        self.document
            .bindings
            .retain(|b| !doomed.contains(&b.from_id) && !doomed.contains(&b.to_id));
        self.prune_stale_ids();
        log::debug!("deleted {} shape(s)", doomed.len());
        Ok(())
    }

    /// Move shapes to another page. Bindings between a moving and a staying
    /// shape are isolated first and then removed.
    pub fn move_shapes_to_page(&mut self, ids: &[ShapeId], page: PageId) -> EngineResult<()> {
        if !self.document.has_page(page) {
            return Err(EngineError::PageNotFound(page));
        }
        let mut moving: Vec<ShapeId> = ids.to_vec();
        for &id in ids {
            moving.extend(self.descendants(id));
        }
        let crossing: Vec<BindingId> = self
            .document
            .bindings
            .iter()
            .filter(|b| moving.contains(&b.from_id) != moving.contains(&b.to_id))
            .map(|b| b.id)
            .collect();
        for id in crossing {
            self.react(id, |util, editor, binding| util.on_before_isolate_from_shape(editor, binding))?;
            self.react(id, |util, editor, binding| util.on_before_isolate_to_shape(editor, binding))?;
            self.delete_binding(id);
        }

        let roots: Vec<ShapeId> = ids
            .iter()
            .copied()
            .filter(|id| !self.ancestors(*id).iter().any(|a| ids.contains(a)))
            .collect();
        self.reparent_shapes(&roots, ParentId::Page(page))
    }

    pub fn double_click_handle(&mut self, id: ShapeId, handle: HandleId) -> EngineResult<()> {
        let shape = self.shape(id).cloned().ok_or(EngineError::ShapeNotFound(id))?;
        let util = self.require_shape_util(shape.shape_type())?;
        match util.on_double_click_handle(&shape, handle) {
            Some(next) => self.update_shape(next),
            None => Ok(()),
        }
    }

    /// Text editing on a shape finished.
    pub fn end_editing(&mut self, id: ShapeId) -> EngineResult<()> {
        let shape = self.shape(id).cloned().ok_or(EngineError::ShapeNotFound(id))?;
        let util = self.require_shape_util(shape.shape_type())?;
        match util.on_edit_end(&shape) {
            Some(next) => self.update_shape(next),
            None => Ok(()),
        }
    }

    /// SVG path data for a shape's body, in its local space.
    pub fn svg_path(&self, id: ShapeId) -> Option<String> {
        let shape = self.shape(id)?;
        let util = self.shape_util(shape.shape_type())?;
        Some(util.to_svg_path(self, shape))
    }

    /// Insert a binding and run its creation reaction.
    pub fn create_binding(&mut self, binding: Binding) -> EngineResult<BindingId> {
        for id in [binding.from_id, binding.to_id] {
            if self.shape(id).is_none() {
                return Err(EngineError::ShapeNotFound(id));
            }
        }
        let id = binding.id;
        self.document.bindings.push(binding);
        self.react(id, |util, editor, binding| util.on_after_create(editor, binding))?;
        Ok(id)
    }

    /// Replace a binding and run its change reaction. Unchanged bindings are ignored.
    pub fn update_binding(&mut self, binding: Binding) -> EngineResult<()> {
        let position = self
            .document
            .bindings
            .iter()
            .position(|b| b.id == binding.id)
            .ok_or(EngineError::BindingNotFound(binding.id))?;
        let prev = self.document.bindings[position].clone();
        if prev == binding {
            return Ok(());
        }
        let id = binding.id;
        self.document.bindings[position] = binding;
        self.react(id, move |util, editor, next| util.on_after_change(editor, &prev, next))
    }

    /// Remove a binding. Returns false if it was already gone.
    pub fn delete_binding(&mut self, id: BindingId) -> bool {
        let before = self.document.bindings.len();
        self.document.bindings.retain(|b| b.id != id);
        self.document.bindings.len() != before
    }

    fn dispatch_shape_change(&mut self, shape_id: ShapeId) -> EngineResult<()> {
        let outgoing: Vec<BindingId> = self
            .document
            .bindings
            .iter()
            .filter(|b| b.from_id == shape_id)
            .map(|b| b.id)
            .collect();
        for id in outgoing {
            self.react(id, |util, editor, binding| util.on_after_change_from_shape(editor, binding))?;
        }

        let mut affected = self.descendants(shape_id);
        affected.push(shape_id);
        let incoming: Vec<BindingId> = self
            .document
            .bindings
            .iter()
            .filter(|b| affected.contains(&b.to_id) && b.from_id != shape_id)
            .map(|b| b.id)
            .collect();
        for id in incoming {
            self.react(id, |util, editor, binding| util.on_after_change_to_shape(editor, binding))?;
        }
        Ok(())
    }

    /// Run one binding reaction against the binding's current record.
    /// Bindings deleted by an earlier reaction are skipped.
    fn react<F>(&mut self, binding_id: BindingId, reaction: F) -> EngineResult<()>
    where
        F: FnOnce(&dyn BindingUtil, &mut Editor, &Binding) -> EngineResult<()>,
    {
        let Some(binding) = self.binding(binding_id).cloned() else {
            return Ok(());
        };
        let Some(util) = self.binding_util(binding.binding_type()) else {
            return Ok(());
        };
        if self.reaction_depth >= self.config.max_reaction_depth {
            log::warn!("reaction depth limit reached at binding {binding_id}, dropping reaction");
            return Ok(());
        }
        self.reaction_depth += 1;
        let result = reaction(util.as_ref(), self, &binding);
        self.reaction_depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::BindingProps;
    use crate::shapes::{Geo, Group, ShapeKind};

    fn rect(editor: &mut Editor, parent: ParentId, x: f64, y: f64, w: f64, h: f64) -> ShapeId {
        editor
            .create_shape(ShapeRecord::new(parent, ShapeKind::Geo(Geo::rectangle(w, h))).at(x, y))
            .unwrap()
    }

    #[test]
    fn test_create_shape_stacks_on_top() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let a = rect(&mut editor, page, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut editor, page, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(editor.sorted_child_ids(page), vec![a, b]);
        assert_eq!(editor.shape_at_point(Point::new(5.0, 5.0), |_| true), Some(b));
    }

    #[test]
    fn test_create_shape_rejects_missing_page() {
        let mut editor = Editor::new();
        let record = ShapeRecord::new(ParentId::Page(uuid::Uuid::new_v4()), ShapeKind::Group(Group));
        assert!(matches!(editor.create_shape(record), Err(EngineError::PageNotFound(_))));
    }

    #[test]
    fn test_page_transform_through_group() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let group = editor
            .create_shape(ShapeRecord::new(page, ShapeKind::Group(Group)).at(100.0, 50.0))
            .unwrap();
        let child = rect(&mut editor, ParentId::Shape(group), 10.0, 10.0, 20.0, 20.0);

        let bounds = editor.page_bounds(child).unwrap();
        assert!((bounds.x0 - 110.0).abs() < 1e-9);
        assert!((bounds.y0 - 60.0).abs() < 1e-9);
        assert_eq!(editor.page_id_of(child), Some(editor.current_page_id()));
        assert_eq!(editor.ancestors(child), vec![group]);

        let group_bounds = editor.page_bounds(group).unwrap();
        assert!((group_bounds.width() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_reparent_preserves_page_position() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let group = editor
            .create_shape(ShapeRecord::new(page, ShapeKind::Group(Group)).at(100.0, 100.0))
            .unwrap();
        let shape = rect(&mut editor, page, 150.0, 120.0, 10.0, 10.0);

        editor.reparent_shapes(&[shape], ParentId::Shape(group)).unwrap();

        let record = editor.shape(shape).unwrap();
        assert_eq!(record.parent, ParentId::Shape(group));
        assert!((record.x - 50.0).abs() < 1e-9);
        assert!((record.y - 20.0).abs() < 1e-9);
        let bounds = editor.page_bounds(shape).unwrap();
        assert!((bounds.x0 - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_reparent_into_descendant_is_rejected() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let outer = editor.create_shape(ShapeRecord::new(page, ShapeKind::Group(Group))).unwrap();
        let inner = editor
            .create_shape(ShapeRecord::new(ParentId::Shape(outer), ShapeKind::Group(Group)))
            .unwrap();
        let result = editor.reparent_shapes(&[outer], ParentId::Shape(inner));
        assert!(matches!(result, Err(EngineError::InvalidParent(_))));
    }

    #[test]
    fn test_common_ancestor_and_nearest_sibling() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let group = editor.create_shape(ShapeRecord::new(page, ShapeKind::Group(Group))).unwrap();
        let inner = editor
            .create_shape(ShapeRecord::new(ParentId::Shape(group), ShapeKind::Group(Group)))
            .unwrap();
        let a = rect(&mut editor, ParentId::Shape(inner), 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut editor, ParentId::Shape(group), 0.0, 0.0, 10.0, 10.0);
        let c = rect(&mut editor, page, 0.0, 0.0, 10.0, 10.0);

        assert_eq!(editor.find_common_ancestor(&[a, b]), Some(group));
        assert_eq!(editor.find_common_ancestor(&[a, c]), None);
        assert_eq!(editor.nearest_sibling(page, a), Some(group));
        assert_eq!(editor.nearest_sibling(ParentId::Shape(group), a), Some(inner));
        assert_eq!(editor.nearest_sibling(ParentId::Shape(inner), c), None);
    }

    #[test]
    fn test_hit_test_skips_groups_and_filters() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let group = editor.create_shape(ShapeRecord::new(page, ShapeKind::Group(Group))).unwrap();
        let child = rect(&mut editor, ParentId::Shape(group), 0.0, 0.0, 50.0, 50.0);

        assert_eq!(editor.shape_at_point(Point::new(25.0, 25.0), |_| true), Some(child));
        assert_eq!(editor.shape_at_point(Point::new(25.0, 25.0), |s| s.id != child), None);
        assert_eq!(editor.shape_at_point(Point::new(500.0, 500.0), |_| true), None);
    }

    #[test]
    fn test_generic_binding_removed_with_target() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let a = rect(&mut editor, page, 0.0, 0.0, 10.0, 10.0);
        let b = rect(&mut editor, page, 50.0, 0.0, 10.0, 10.0);
        let link = editor.create_binding(Binding::new(a, b, BindingProps::Link)).unwrap();

        editor.delete_shapes(&[b]).unwrap();

        assert!(editor.binding(link).is_none());
        assert!(editor.shape(a).is_some());
        assert!(editor.shape(b).is_none());
    }

    #[test]
    fn test_delete_group_removes_descendants() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let group = editor.create_shape(ShapeRecord::new(page, ShapeKind::Group(Group))).unwrap();
        let child = rect(&mut editor, ParentId::Shape(group), 0.0, 0.0, 10.0, 10.0);
        editor.select(vec![child]);

        editor.delete_shapes(&[group]).unwrap();

        assert!(editor.shape(child).is_none());
        assert!(editor.selected_ids().is_empty());
    }

    #[test]
    fn test_update_shape_missing_is_error() {
        let mut editor = Editor::new();
        let record = ShapeRecord::new(ParentId::Page(editor.current_page_id()), ShapeKind::Group(Group));
        assert!(matches!(editor.update_shape(record), Err(EngineError::ShapeNotFound(_))));
    }

    #[test]
    fn test_bail_to_mark_clears_selection_of_removed_shapes() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let mark = editor.mark("creating");
        let shape = rect(&mut editor, page, 0.0, 0.0, 10.0, 10.0);
        editor.select(vec![shape]);

        editor.bail_to_mark(&mark).unwrap();

        assert!(editor.shape(shape).is_none());
        assert!(editor.selected_ids().is_empty());
    }

    #[test]
    fn test_bind_hit_test_needs_point_inside_closed_shape() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let shape = rect(&mut editor, page, 0.0, 0.0, 100.0, 50.0);

        let just_outside = Point::new(104.0, 25.0);
        assert_eq!(editor.shape_at_point(just_outside, |_| true), Some(shape));
        assert_eq!(editor.bindable_shape_at(just_outside, ShapeType::Connector), None);
        assert_eq!(editor.bindable_shape_at(Point::new(96.0, 25.0), ShapeType::Connector), Some(shape));
    }

    #[test]
    fn test_end_editing_trims_connector_label() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let mut connector = Connector::default();
        connector.text = "done \t".to_string();
        let id = editor
            .create_shape(ShapeRecord::new(page, ShapeKind::Connector(connector)))
            .unwrap();

        editor.end_editing(id).unwrap();

        assert_eq!(editor.shape(id).unwrap().as_connector().unwrap().text, "done");
        assert!(matches!(editor.end_editing(uuid::Uuid::new_v4()), Err(EngineError::ShapeNotFound(_))));
    }
}
