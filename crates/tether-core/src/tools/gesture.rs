//! Per-gesture contexts. Each gesture snapshots what it needs when it begins
//! and drops it when it ends.

use crate::bindings::{ConnectorBindings, connector_bindings};
use crate::canvas::HistoryMark;
use crate::editor::Editor;
use crate::error::{EngineError, EngineResult};
use crate::selection::{HandleDrag, HandleId};
use crate::shapes::{ShapeId, ShapeKind, ShapeRecord, Terminal};
use kurbo::{Point, Vec2};
use std::time::Duration;

/// What a shape handler sees while being resized.
#[derive(Debug, Clone, Copy)]
pub struct ResizeInfo<'a> {
    pub scale_x: f64,
    pub scale_y: f64,
    /// The record as it was when the resize began.
    pub initial: &'a ShapeRecord,
    pub initial_bindings: &'a ConnectorBindings,
}

/// A shape handler's answer to a resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeOutcome {
    pub kind: ShapeKind,
    /// Added to the scaled origin, in parent space.
    pub origin_offset: Vec2,
}

/// A bound terminal recorded when a translation began.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundTerminal {
    pub terminal: Terminal,
    pub target: ShapeId,
    /// The terminal's page position at the start of the translation.
    pub page_point: Point,
}

/// State a shape handler keeps for the duration of a translation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslateStart {
    pub initial_page_origin: Point,
    pub bound_terminals: Vec<BoundTerminal>,
}

/// Dragging one handle of a shape.
#[derive(Debug, Clone)]
pub struct HandleDragGesture {
    pub shape_id: ShapeId,
    pub handle: HandleId,
    pub is_creating: bool,
    mark: HistoryMark,
    /// When the current precision timer started.
    timer_start: Duration,
    current_target: Option<ShapeId>,
    is_precise: bool,
    /// The press was held past the precise timeout before the drag began.
    held: bool,
}

impl HandleDragGesture {
    /// Start dragging an existing shape's handle. A terminal that is already
    /// bound keeps its target and precision until the pointer enters another
    /// shape.
    pub fn begin(editor: &mut Editor, shape_id: ShapeId, handle: HandleId) -> Self {
        let mark = editor.mark("dragging_handle");
        let mut gesture = Self::with_mark(editor, shape_id, handle, mark, false);
        if let Some(binding) = handle
            .terminal()
            .and_then(|terminal| connector_bindings(editor, shape_id).get(terminal).cloned())
        {
            gesture.current_target = Some(binding.to_id);
            gesture.is_precise = binding.connector_props().is_some_and(|props| props.is_precise);
        }
        gesture
    }

    /// Continue a creation gesture whose history mark is already recorded.
    /// `pressed_at` is when the press began; holding it past the precise
    /// timeout makes every binding the drag produces precise.
    pub fn creating(editor: &Editor, shape_id: ShapeId, handle: HandleId, mark: HistoryMark, pressed_at: Duration) -> Self {
        let mut gesture = Self::with_mark(editor, shape_id, handle, mark, true);
        gesture.held = editor.inputs.time.saturating_sub(pressed_at) >= editor.config.precise_timeout();
        if gesture.held {
            log::debug!("press held past the precise timeout");
        }
        gesture
    }

    fn with_mark(editor: &Editor, shape_id: ShapeId, handle: HandleId, mark: HistoryMark, is_creating: bool) -> Self {
        log::debug!("dragging {handle:?} of {shape_id}");
        Self {
            shape_id,
            handle,
            is_creating,
            mark,
            timer_start: editor.inputs.time,
            current_target: None,
            is_precise: false,
            held: false,
        }
    }

    pub fn is_precise(&self) -> bool {
        self.is_precise
    }

    /// Apply the current pointer position.
    pub fn update(&mut self, editor: &mut Editor) -> EngineResult<()> {
        let Some(shape) = editor.shape(self.shape_id).cloned() else {
            return Ok(());
        };
        let page_point = editor.inputs.current_page_point;
        if self.handle.terminal().is_some() {
            self.update_precision(editor, page_point, &shape);
        }

        let util = editor
            .shape_util(shape.shape_type())
            .ok_or_else(|| EngineError::UnknownType(format!("{:?}", shape.shape_type())))?;
        let drag = HandleDrag {
            handle: self.handle,
            page_point,
            is_precise: self.is_precise,
            is_creating: self.is_creating,
        };
        match util.on_handle_drag(editor, &shape, &drag)? {
            Some(next) => editor.update_shape(next),
            None => Ok(()),
        }
    }

    /// Entering a new target decides precision from the pointer speed and
    /// restarts the timer; holding over a target past the timeout makes the
    /// binding precise.
    fn update_precision(&mut self, editor: &Editor, page_point: Point, shape: &ShapeRecord) {
        let target = editor.bindable_shape_at(page_point, shape.shape_type());
        if target != self.current_target {
            self.current_target = target;
            self.timer_start = editor.inputs.time;
            self.is_precise = target.is_some()
                && (self.held || editor.inputs.pointer_velocity.hypot() < editor.config.slow_drag_velocity);
        }
        if target.is_some()
            && !self.is_precise
            && editor.inputs.time.saturating_sub(self.timer_start) >= editor.config.precise_timeout()
        {
            log::debug!("precise timer elapsed over {target:?}");
            self.is_precise = true;
        }
    }

    /// Commit the drag.
    pub fn complete(self, editor: &mut Editor) {
        editor.set_hinting(Vec::new());
        editor.squash_to_mark(&self.mark);
        if self.is_creating {
            editor.select(vec![self.shape_id]);
        }
        log::debug!("committed {:?} drag of {}", self.handle, self.shape_id);
    }

    /// Roll back everything the drag did.
    pub fn cancel(self, editor: &mut Editor) -> EngineResult<()> {
        editor.set_hinting(Vec::new());
        editor.bail_to_mark(&self.mark)
    }
}

#[derive(Debug, Clone)]
struct ResizeEntry {
    initial: ShapeRecord,
    initial_bindings: ConnectorBindings,
    initial_page_origin: Point,
}

/// Scaling a set of shapes about a fixed page point.
#[derive(Debug, Clone)]
pub struct ResizeGesture {
    origin: Point,
    entries: Vec<ResizeEntry>,
}

impl ResizeGesture {
    pub fn begin(editor: &Editor, ids: &[ShapeId], origin: Point) -> Self {
        let entries = ids
            .iter()
            .filter_map(|&id| {
                let initial = editor.shape(id)?.clone();
                Some(ResizeEntry {
                    initial_bindings: connector_bindings(editor, id),
                    initial_page_origin: editor.local_to_page(id, Point::ZERO)?,
                    initial,
                })
            })
            .collect();
        Self { origin, entries }
    }

    /// Apply scale factors relative to the shapes' initial state.
    pub fn update(&self, editor: &mut Editor, scale_x: f64, scale_y: f64) -> EngineResult<()> {
        for entry in &self.entries {
            let Some(util) = editor.shape_util(entry.initial.shape_type()) else {
                continue;
            };
            let info = ResizeInfo {
                scale_x,
                scale_y,
                initial: &entry.initial,
                initial_bindings: &entry.initial_bindings,
            };
            let Some(outcome) = util.on_resize(editor, &info)? else {
                continue;
            };
            let Some(mut next) = editor.shape(entry.initial.id).cloned() else {
                continue;
            };
            let offset = entry.initial_page_origin - self.origin;
            let page_origin = self.origin + Vec2::new(offset.x * scale_x, offset.y * scale_y);
            let Some(parent_transform) = editor.parent_page_transform(next.parent) else {
                continue;
            };
            let position = parent_transform.inverse() * page_origin + outcome.origin_offset;
            next.x = position.x;
            next.y = position.y;
            next.kind = outcome.kind;
            editor.update_shape(next)?;
        }
        Ok(())
    }
}

/// Moving a set of shapes by a page-space delta.
#[derive(Debug, Clone)]
pub struct TranslateGesture {
    moving: Vec<ShapeId>,
    initial_origins: Vec<(ShapeId, Point)>,
    starts: Vec<(ShapeId, TranslateStart)>,
}

impl TranslateGesture {
    pub fn begin(editor: &mut Editor, ids: &[ShapeId]) -> EngineResult<Self> {
        let roots: Vec<ShapeId> = ids
            .iter()
            .copied()
            .filter(|id| !editor.ancestors(*id).iter().any(|a| ids.contains(a)))
            .collect();
        let mut moving = roots.clone();
        for id in &roots {
            moving.extend(editor.descendants(*id));
        }

        let mut initial_origins = Vec::new();
        let mut starts = Vec::new();
        for &id in &roots {
            let Some(shape) = editor.shape(id).cloned() else {
                continue;
            };
            if let Some(util) = editor.shape_util(shape.shape_type()) {
                starts.push((id, util.on_translate_start(editor, &shape)?));
            }
            if let Some(origin) = editor.local_to_page(id, Point::ZERO) {
                initial_origins.push((id, origin));
            }
        }
        Ok(Self {
            moving,
            initial_origins,
            starts,
        })
    }

    /// Start a translation from a press on a shape's body. Pressing a selected
    /// shape moves the whole selection. Returns `None` when nothing is under
    /// the point or the shape cannot be dragged by its body.
    pub fn begin_at(editor: &mut Editor, page_point: Point) -> EngineResult<Option<Self>> {
        let Some(hit) = editor.shape_at_point(page_point, |_| true) else {
            return Ok(None);
        };
        let by_body = editor
            .shape(hit)
            .and_then(|shape| editor.shape_util(shape.shape_type()))
            .is_some_and(|util| util.can_translate_by_body());
        if !by_body {
            log::debug!("{hit} cannot be dragged by its body");
            return Ok(None);
        }
        let ids = if editor.is_selected(hit) {
            editor.selected_ids().to_vec()
        } else {
            vec![hit]
        };
        Self::begin(editor, &ids).map(Some)
    }

    /// Move every shape to its initial position plus `delta`.
    pub fn update(&self, editor: &mut Editor, delta: Vec2) -> EngineResult<()> {
        for &(id, origin) in &self.initial_origins {
            let Some(mut next) = editor.shape(id).cloned() else {
                continue;
            };
            let Some(parent_transform) = editor.parent_page_transform(next.parent) else {
                continue;
            };
            let position = parent_transform.inverse() * (origin + delta);
            next.x = position.x;
            next.y = position.y;
            editor.update_shape(next)?;
        }
        for (id, start) in &self.starts {
            let Some(shape_type) = editor.shape(*id).map(ShapeRecord::shape_type) else {
                continue;
            };
            if let Some(util) = editor.shape_util(shape_type) {
                util.on_translate(editor, start, *id, &self.moving)?;
            }
        }
        Ok(())
    }
}
