//! Reactions that keep connector bindings consistent with the scene.

use super::info::{ConnectorInfo, connector_info};
use super::reparent::reparent_connector;
use super::terminals::terminals_in_connector_space;
use crate::bindings::{
    Binding, BindingProps, BindingType, ConnectorBindingProps, connector_bindings,
    prune_duplicate_bindings, remove_connector_binding,
};
use crate::editor::Editor;
use crate::error::{EngineResult, invariant};
use crate::geometry::{APPROX_EPSILON, approximately, approximately_point, arc_to_bend};
use crate::registry::BindingUtil;
use crate::shapes::{ShapeId, Terminal};

/// Binding handlers for connector terminals.
pub struct ConnectorBindingUtil;

impl BindingUtil for ConnectorBindingUtil {
    fn binding_type(&self) -> BindingType {
        BindingType::Connector
    }

    fn default_props(&self) -> BindingProps {
        BindingProps::Connector(ConnectorBindingProps::default())
    }

    fn on_after_create(&self, editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
        connector_did_update(editor, binding.from_id)
    }

    fn on_after_change(&self, editor: &mut Editor, _prev: &Binding, next: &Binding) -> EngineResult<()> {
        connector_did_update(editor, next.from_id)
    }

    fn on_after_change_from_shape(&self, editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
        connector_did_update(editor, binding.from_id)
    }

    fn on_after_change_to_shape(&self, editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
        sync_bound_terminal(editor, binding)?;
        connector_did_update(editor, binding.from_id)
    }

    fn on_before_isolate_from_shape(&self, editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
        freeze_terminal(editor, binding)
    }

    fn on_before_isolate_to_shape(&self, editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
        freeze_terminal(editor, binding)
    }

    fn on_before_delete_to_shape(&self, editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
        log::debug!("target {} deleted, deleting connector {}", binding.to_id, binding.from_id);
        editor.delete_shapes(&[binding.from_id])
    }
}

/// Re-derive everything that depends on a connector's bindings: duplicate
/// pruning, unbinding targets that left the page, and reparenting.
fn connector_did_update(editor: &mut Editor, connector_id: ShapeId) -> EngineResult<()> {
    if editor.shape(connector_id).and_then(|s| s.as_connector()).is_none() {
        return Ok(());
    }
    prune_duplicate_bindings(editor, connector_id);

    let page = editor.page_id_of(connector_id);
    let bindings = connector_bindings(editor, connector_id);
    for terminal in Terminal::BOTH {
        let Some(target) = bindings.target(terminal) else {
            continue;
        };
        if editor.shape(target).is_none() {
            log::warn!("connector {connector_id} bound to missing shape {target}, unbinding {terminal:?}");
            remove_connector_binding(editor, connector_id, terminal)?;
        } else if editor.page_id_of(target) != page {
            log::debug!("target {target} left the page of connector {connector_id}, unbinding {terminal:?}");
            update_connector_terminal(editor, connector_id, terminal, true, false)?;
        }
    }

    reparent_connector(editor, connector_id)
}

/// Rewrite a bound terminal's stored point after its target changed. Skipped
/// while the connector is selected.
fn sync_bound_terminal(editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
    let connector_id = binding.from_id;
    if editor.is_selected(connector_id) {
        return Ok(());
    }
    let Some(terminal) = binding.terminal() else {
        return Ok(());
    };
    let Some(shape) = editor.shape(connector_id).cloned() else {
        return Ok(());
    };
    let Some(connector) = shape.as_connector() else {
        return Ok(());
    };
    let terminals = terminals_in_connector_space(editor, &shape, &connector_bindings(editor, connector_id));
    let point = terminals.get(terminal);
    if approximately_point(point, connector.terminal(terminal)) {
        return Ok(());
    }
    editor.update_connector(connector_id, |c| c.set_terminal(terminal, point))
}

/// Keep a terminal where it is drawn before its binding goes away.
fn freeze_terminal(editor: &mut Editor, binding: &Binding) -> EngineResult<()> {
    match binding.terminal() {
        Some(terminal) => update_connector_terminal(editor, binding.from_id, terminal, true, false),
        None => Ok(()),
    }
}

/// Write a terminal's current position into the connector's stored point,
/// re-deriving the bend so a curved body keeps its arc.
///
/// `use_handle` writes the resolved handle rather than the clipped body end.
/// With `unbind` the terminal's binding is removed as well.
pub fn update_connector_terminal(
    editor: &mut Editor,
    connector_id: ShapeId,
    terminal: Terminal,
    unbind: bool,
    use_handle: bool,
) -> EngineResult<()> {
    let Some(shape) = editor.shape(connector_id).cloned() else {
        return Ok(());
    };
    let Some(connector) = shape.as_connector() else {
        return Ok(());
    };
    let info = connector_info(editor, &shape)
        .ok_or_else(|| invariant(format!("no connector info for {connector_id}")))?;

    let mut next = connector.clone();
    if info.is_valid() {
        let end = info.terminal(terminal);
        let point = if use_handle { end.handle } else { end.point };
        next.set_terminal(terminal, point);
        next.set_terminal(terminal.other(), info.terminal(terminal.other()).handle);

        if let ConnectorInfo::Curved { handle_arc, .. } = &info {
            let other = info.terminal(terminal.other()).handle;
            let (new_start, new_end) = match terminal {
                Terminal::Start => (point, other),
                Terminal::End => (other, point),
            };
            if new_start.distance(new_end) > APPROX_EPSILON {
                let bend = arc_to_bend(handle_arc, new_start, new_end, connector.bend)?;
                if !approximately(bend, connector.bend) {
                    next.bend = bend;
                }
            }
        }
    }

    if unbind {
        remove_connector_binding(editor, connector_id, terminal)?;
    }
    editor.update_connector(connector_id, |c| *c = next)
}
