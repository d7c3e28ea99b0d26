//! Keeping a connector's parent and z-order consistent with its targets.

use crate::bindings::connector_bindings;
use crate::editor::Editor;
use crate::error::EngineResult;
use crate::shapes::{ParentId, ShapeId, Terminal};

/// Move a connector under the nearest parent its bound shapes share, then
/// place it behind every sibling.
///
/// Unbound connectors are left alone. A connector detached from any page is a
/// silent no-op.
pub fn reparent_connector(editor: &mut Editor, connector_id: ShapeId) -> EngineResult<()> {
    let Some(shape) = editor.shape(connector_id).cloned() else {
        return Ok(());
    };
    let bindings = connector_bindings(editor, connector_id);
    let live = |terminal: Terminal| bindings.target(terminal).filter(|id| editor.shape(*id).is_some());
    let (start_target, end_target) = (live(Terminal::Start), live(Terminal::End));
    if start_target.is_none() && end_target.is_none() {
        return Ok(());
    }
    let Some(page) = editor.page_id_of(connector_id) else {
        log::debug!("connector {connector_id} is not on a page, skipping reparent");
        return Ok(());
    };

    let next_parent = match (start_target, end_target) {
        (Some(a), Some(b)) => editor
            .find_common_ancestor(&[a, b])
            .map_or(ParentId::Page(page), ParentId::Shape),
        (Some(only), None) | (None, Some(only)) => {
            let shares_parent = editor.shape(only).is_some_and(|target| target.parent == shape.parent);
            if shares_parent { shape.parent } else { ParentId::Page(page) }
        }
        (None, None) => return Ok(()),
    };

    if next_parent != shape.parent {
        log::debug!("reparenting connector {connector_id} to {next_parent:?}");
        editor.reparent_shapes(&[connector_id], next_parent)?;
    }

    let targets: Vec<ShapeId> = [start_target, end_target].into_iter().flatten().collect();
    let target_siblings: Vec<ShapeId> = targets
        .iter()
        .filter_map(|target| editor.nearest_sibling(next_parent, *target))
        .filter(|sibling| *sibling != connector_id)
        .collect();
    if target_siblings.is_empty() {
        return Ok(());
    }

    let lowest_sibling = editor
        .sorted_child_ids(next_parent)
        .into_iter()
        .filter(|id| *id != connector_id)
        .filter_map(|id| editor.shape(id).map(|s| s.index))
        .fold(f64::INFINITY, f64::min);
    let current_index = editor.shape(connector_id).map_or(f64::INFINITY, |s| s.index);
    if current_index < lowest_sibling {
        return Ok(());
    }
    log::debug!("moving connector {connector_id} behind its siblings");
    editor.set_index(connector_id, lowest_sibling - 1.0)
}
