//! Binding records and the connector-binding queries built on top of them.

use crate::connector::reparent_connector;
use crate::editor::Editor;
use crate::error::EngineResult;
use crate::shapes::{ShapeId, Terminal};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for bindings.
pub type BindingId = Uuid;

/// Type tag used to look up a binding's handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingType {
    /// Attaches a connector terminal to a target shape.
    Connector,
    /// A plain link between two shapes with no geometric meaning.
    Link,
}

/// Props of a connector binding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectorBindingProps {
    pub terminal: Terminal,
    /// Anchor as fractions of the target's local bounds.
    pub normalized_anchor: Point,
    /// Resolve at `normalized_anchor` rather than the imprecise fallback.
    pub is_precise: bool,
    /// Let the arrowhead reach the anchor instead of stopping at the outline.
    pub is_exact: bool,
}

impl Default for ConnectorBindingProps {
    fn default() -> Self {
        Self {
            terminal: Terminal::Start,
            normalized_anchor: Point::new(0.5, 0.5),
            is_precise: false,
            is_exact: false,
        }
    }
}

impl ConnectorBindingProps {
    /// Props for `terminal` anchored at `normalized_anchor`.
    pub fn new(terminal: Terminal, normalized_anchor: Point) -> Self {
        Self {
            terminal,
            normalized_anchor,
            ..Self::default()
        }
    }

    /// Builder: mark the binding precise.
    pub fn precise(mut self) -> Self {
        self.is_precise = true;
        self
    }
}

/// Type-specific payload of a binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingProps {
    Connector(ConnectorBindingProps),
    Link,
}

/// A directed edge from one shape to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub id: BindingId,
    pub from_id: ShapeId,
    pub to_id: ShapeId,
    pub props: BindingProps,
}

impl Binding {
    /// Create a new binding.
    pub fn new(from_id: ShapeId, to_id: ShapeId, props: BindingProps) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_id,
            to_id,
            props,
        }
    }

    /// Create a connector binding.
    pub fn connector(from_id: ShapeId, to_id: ShapeId, props: ConnectorBindingProps) -> Self {
        Self::new(from_id, to_id, BindingProps::Connector(props))
    }

    pub fn binding_type(&self) -> BindingType {
        match self.props {
            BindingProps::Connector(_) => BindingType::Connector,
            BindingProps::Link => BindingType::Link,
        }
    }

    pub fn connector_props(&self) -> Option<&ConnectorBindingProps> {
        match &self.props {
            BindingProps::Connector(props) => Some(props),
            BindingProps::Link => None,
        }
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.connector_props().map(|props| props.terminal)
    }
}

/// The bindings currently controlling a connector's two terminals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectorBindings {
    pub start: Option<Binding>,
    pub end: Option<Binding>,
}

impl ConnectorBindings {
    pub fn get(&self, terminal: Terminal) -> Option<&Binding> {
        match terminal {
            Terminal::Start => self.start.as_ref(),
            Terminal::End => self.end.as_ref(),
        }
    }

    fn slot_mut(&mut self, terminal: Terminal) -> &mut Option<Binding> {
        match terminal {
            Terminal::Start => &mut self.start,
            Terminal::End => &mut self.end,
        }
    }

    /// Target shape of a terminal's binding.
    pub fn target(&self, terminal: Terminal) -> Option<ShapeId> {
        self.get(terminal).map(|binding| binding.to_id)
    }

    pub fn props(&self, terminal: Terminal) -> Option<&ConnectorBindingProps> {
        self.get(terminal).and_then(Binding::connector_props)
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// The bindings of a connector, keyed by terminal. When a terminal has more
/// than one binding the oldest wins.
pub fn connector_bindings(editor: &Editor, connector_id: ShapeId) -> ConnectorBindings {
    let mut result = ConnectorBindings::default();
    for binding in editor.bindings_from_shape(connector_id, BindingType::Connector) {
        let Some(terminal) = binding.terminal() else {
            continue;
        };
        let slot = result.slot_mut(terminal);
        if slot.is_none() {
            *slot = Some(binding);
        }
    }
    result
}

/// Connectors with at least one terminal bound to `shape_id`.
pub fn connectors_bound_to(editor: &Editor, shape_id: ShapeId) -> Vec<ShapeId> {
    let mut ids: Vec<ShapeId> = Vec::new();
    for binding in editor.bindings_to_shape(shape_id, BindingType::Connector) {
        if !ids.contains(&binding.from_id) {
            ids.push(binding.from_id);
        }
    }
    ids
}

/// Delete every binding but the first for each terminal of a connector.
/// Returns how many were removed.
pub fn prune_duplicate_bindings(editor: &mut Editor, connector_id: ShapeId) -> usize {
    let mut seen: Vec<Terminal> = Vec::new();
    let mut removed = 0;
    for binding in editor.bindings_from_shape(connector_id, BindingType::Connector) {
        let Some(terminal) = binding.terminal() else {
            continue;
        };
        if seen.contains(&terminal) {
            log::warn!("pruning duplicate {terminal:?} binding {} on connector {connector_id}", binding.id);
            if editor.delete_binding(binding.id) {
                removed += 1;
            }
        } else {
            seen.push(terminal);
        }
    }
    removed
}

/// Bind a connector terminal to `target_id`, reusing the terminal's existing
/// binding when there is one.
pub fn create_or_update_connector_binding(
    editor: &mut Editor,
    connector_id: ShapeId,
    target_id: ShapeId,
    props: ConnectorBindingProps,
) -> EngineResult<BindingId> {
    let existing: Vec<Binding> = editor
        .bindings_from_shape(connector_id, BindingType::Connector)
        .into_iter()
        .filter(|binding| binding.terminal() == Some(props.terminal))
        .collect();

    let Some(first) = existing.first() else {
        log::debug!("binding {:?} of {connector_id} to {target_id}", props.terminal);
        return editor.create_binding(Binding::connector(connector_id, target_id, props));
    };

    for duplicate in &existing[1..] {
        log::warn!("pruning duplicate {:?} binding {}", props.terminal, duplicate.id);
        editor.delete_binding(duplicate.id);
    }

    let mut updated = first.clone();
    updated.to_id = target_id;
    updated.props = BindingProps::Connector(props);
    if updated != *first {
        editor.update_binding(updated)?;
    }
    Ok(first.id)
}

/// Unbind a connector terminal, removing every binding it has, then settle
/// the connector's parent against whatever is still bound.
pub fn remove_connector_binding(editor: &mut Editor, connector_id: ShapeId, terminal: Terminal) -> EngineResult<()> {
    let mut removed = false;
    for binding in editor.bindings_from_shape(connector_id, BindingType::Connector) {
        if binding.terminal() == Some(terminal) {
            log::debug!("unbinding {terminal:?} of {connector_id}");
            removed |= editor.delete_binding(binding.id);
        }
    }
    if removed {
        reparent_connector(editor, connector_id)?;
    }
    Ok(())
}
