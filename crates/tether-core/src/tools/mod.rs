//! Interactive tools.

mod gesture;

pub use gesture::{
    BoundTerminal, HandleDragGesture, ResizeGesture, ResizeInfo, ResizeOutcome, TranslateGesture, TranslateStart,
};

use crate::canvas::HistoryMark;
use crate::editor::{CursorKind, Editor};
use crate::error::{EngineError, EngineResult};
use crate::input::PointerEvent;
use crate::selection::{HandleDrag, HandleId, handle_at_point};
use crate::shapes::{Connector, ParentId, ShapeId, ShapeKind, ShapeRecord, ShapeType};
use kurbo::Point;
use std::time::Duration;

/// Events a tool reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolEvent {
    PointerDown,
    PointerMove,
    PointerUp,
    /// Escape: abandon the current interaction.
    Cancel,
    /// The host finished the interaction on the tool's behalf.
    Complete,
    /// Something else took over input.
    Interrupt,
}

/// The press that may turn into a new connector.
#[derive(Debug, Clone)]
pub struct PointingContext {
    /// When the press started.
    pub entered_at: Duration,
    pub origin: Point,
    /// The connector, once created.
    pub shape_id: Option<ShapeId>,
    mark: HistoryMark,
    /// Bindable shape under the press, if any.
    pub target: Option<ShapeId>,
}

/// State of the connector tool.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Pointing(PointingContext),
    DraggingHandle(HandleDragGesture),
}

/// Draws connectors by pressing and dragging, and drags the handles of a
/// selected connector.
#[derive(Debug, Clone, Default)]
pub struct ConnectorTool {
    state: ToolState,
}

impl ConnectorTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    /// Whether an interaction is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// The tool became current.
    pub fn enter(&mut self, editor: &mut Editor) {
        self.state = ToolState::Idle;
        editor.set_cursor(CursorKind::Cross);
    }

    /// Another tool became current.
    pub fn exit(&mut self, editor: &mut Editor) -> EngineResult<()> {
        self.handle_event(editor, ToolEvent::Interrupt)?;
        editor.set_cursor(CursorKind::Default);
        Ok(())
    }

    /// Feed a raw pointer event through the editor's input state.
    pub fn handle_pointer_event(&mut self, editor: &mut Editor, event: PointerEvent) -> EngineResult<()> {
        editor.inputs.handle_pointer_event(event);
        let tool_event = match event {
            PointerEvent::Down { .. } => ToolEvent::PointerDown,
            PointerEvent::Move { .. } => ToolEvent::PointerMove,
            PointerEvent::Up { .. } => ToolEvent::PointerUp,
        };
        self.handle_event(editor, tool_event)
    }

    pub fn handle_event(&mut self, editor: &mut Editor, event: ToolEvent) -> EngineResult<()> {
        let state = std::mem::take(&mut self.state);
        self.state = match (state, event) {
            (ToolState::Idle, ToolEvent::PointerDown) => pointer_down(editor)?,
            (ToolState::Idle, _) => ToolState::Idle,

            (ToolState::Pointing(ctx), ToolEvent::PointerMove) => {
                if editor.inputs.is_dragging {
                    start_dragging_end(editor, ctx)?
                } else {
                    ToolState::Pointing(ctx)
                }
            }
            (ToolState::Pointing(ctx), ToolEvent::PointerUp)
            | (ToolState::Pointing(ctx), ToolEvent::Cancel)
            | (ToolState::Pointing(ctx), ToolEvent::Interrupt) => {
                log::debug!("abandoning connector creation");
                editor.set_hinting(Vec::new());
                editor.bail_to_mark(&ctx.mark)?;
                ToolState::Idle
            }
            (ToolState::Pointing(ctx), _) => ToolState::Pointing(ctx),

            (ToolState::DraggingHandle(mut gesture), ToolEvent::PointerMove) => {
                gesture.update(editor)?;
                ToolState::DraggingHandle(gesture)
            }
            (ToolState::DraggingHandle(gesture), ToolEvent::PointerUp)
            | (ToolState::DraggingHandle(gesture), ToolEvent::Complete) => {
                gesture.complete(editor);
                ToolState::Idle
            }
            (ToolState::DraggingHandle(gesture), ToolEvent::Cancel)
            | (ToolState::DraggingHandle(gesture), ToolEvent::Interrupt) => {
                gesture.cancel(editor)?;
                ToolState::Idle
            }
            (ToolState::DraggingHandle(gesture), ToolEvent::PointerDown) => ToolState::DraggingHandle(gesture),
        };
        Ok(())
    }
}

/// Press in the idle state: grab a handle of a selected connector, or start
/// a new connector.
fn pointer_down(editor: &mut Editor) -> EngineResult<ToolState> {
    let origin = editor.inputs.origin_page_point;

    // A handle of a selected connector takes priority over drawing.
    let selected: Vec<ShapeId> = editor.selected_ids().to_vec();
    for id in selected {
        let is_connector = editor.shape(id).is_some_and(|s| s.shape_type() == ShapeType::Connector);
        if !is_connector {
            continue;
        }
        if let Some(handle) = handle_at_point(editor, id, origin) {
            return Ok(ToolState::DraggingHandle(HandleDragGesture::begin(editor, id, handle)));
        }
    }

    let mark = editor.mark("creating_connector");
    let target = editor.bindable_shape_at(origin, ShapeType::Connector);
    let shape_id = match target {
        Some(target) => {
            editor.set_hinting(vec![target]);
            None
        }
        None => Some(create_connector(editor, origin)?),
    };
    Ok(ToolState::Pointing(PointingContext {
        entered_at: editor.inputs.time,
        origin,
        shape_id,
        mark,
        target,
    }))
}

/// Create a zero-length connector at `origin` with its start resolved there.
fn create_connector(editor: &mut Editor, origin: Point) -> EngineResult<ShapeId> {
    let page = ParentId::Page(editor.current_page_id());
    let record = ShapeRecord::new(page, ShapeKind::Connector(Connector::new(Point::ZERO, Point::ZERO)))
        .at(origin.x, origin.y);
    let id = editor.create_shape(record)?;
    log::debug!("created connector {id} at {origin:?}");

    let shape = editor.shape(id).cloned().ok_or(EngineError::ShapeNotFound(id))?;
    let util = editor
        .shape_util(ShapeType::Connector)
        .ok_or_else(|| EngineError::UnknownType(format!("{:?}", ShapeType::Connector)))?;
    let drag = HandleDrag {
        handle: HandleId::Start,
        page_point: origin,
        is_precise: true,
        is_creating: true,
    };
    if let Some(next) = util.on_handle_drag(editor, &shape, &drag)? {
        editor.update_shape(next)?;
    }
    editor.select(vec![id]);
    Ok(id)
}

fn start_dragging_end(editor: &mut Editor, ctx: PointingContext) -> EngineResult<ToolState> {
    let id = match ctx.shape_id {
        Some(id) => id,
        None => create_connector(editor, ctx.origin)?,
    };
    if let Some(local) = editor.page_to_local(id, editor.inputs.current_page_point) {
        editor.update_connector(id, |c| c.end = local)?;
    }
    let mut gesture = HandleDragGesture::creating(editor, id, HandleId::End, ctx.mark, ctx.entered_at);
    gesture.update(editor)?;
    Ok(ToolState::DraggingHandle(gesture))
}
