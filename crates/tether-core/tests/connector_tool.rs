//! Drawing connectors through the tool, driven by raw pointer events.

use std::time::Duration;

use kurbo::Point;
use tether_core::bindings::connector_bindings;
use tether_core::geometry::approximately_point;
use tether_core::input::{Modifiers, PointerEvent};
use tether_core::shapes::{Geo, ParentId, ShapeId, ShapeKind, ShapeRecord, ShapeType, Terminal};
use tether_core::tools::{ConnectorTool, ToolState};
use tether_core::{EngineConfig, Editor};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Session {
    editor: Editor,
    tool: ConnectorTool,
    target: ShapeId,
}

impl Session {
    /// A page with one 100x50 target at (100, 100).
    fn new() -> Self {
        init();
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let target = editor
            .create_shape(ShapeRecord::new(page, ShapeKind::Geo(Geo::rectangle(100.0, 50.0))).at(100.0, 100.0))
            .unwrap();
        let mut tool = ConnectorTool::new();
        tool.enter(&mut editor);
        Self { editor, tool, target }
    }

    fn down(&mut self, x: f64, y: f64, ms: u64) {
        let event = PointerEvent::Down {
            position: Point::new(x, y),
            time: Duration::from_millis(ms),
        };
        self.tool.handle_pointer_event(&mut self.editor, event).unwrap();
    }

    fn move_to(&mut self, x: f64, y: f64, ms: u64) {
        let event = PointerEvent::Move {
            position: Point::new(x, y),
            time: Duration::from_millis(ms),
        };
        self.tool.handle_pointer_event(&mut self.editor, event).unwrap();
    }

    fn up(&mut self, x: f64, y: f64, ms: u64) {
        let event = PointerEvent::Up {
            position: Point::new(x, y),
            time: Duration::from_millis(ms),
        };
        self.tool.handle_pointer_event(&mut self.editor, event).unwrap();
    }

    fn connectors(&self) -> Vec<ShapeId> {
        self.editor
            .document
            .shapes
            .values()
            .filter(|shape| shape.shape_type() == ShapeType::Connector)
            .map(|shape| shape.id)
            .collect()
    }

    fn only_connector(&self) -> ShapeId {
        let ids = self.connectors();
        assert_eq!(ids.len(), 1, "expected exactly one connector");
        ids[0]
    }
}

#[test]
fn test_fast_drag_to_top_edge_binds_imprecisely() {
    let mut s = Session::new();

    s.down(0.0, 0.0, 0);
    s.move_to(150.0, 104.0, 16);
    s.up(150.0, 104.0, 24);

    let id = s.only_connector();
    let bindings = connector_bindings(&s.editor, id);
    assert!(bindings.start.is_none());
    let end = bindings.get(Terminal::End).expect("end binding");
    assert_eq!(end.to_id, s.target);
    let props = end.connector_props().unwrap();
    assert_eq!(props.terminal, Terminal::End);
    assert!(approximately_point(props.normalized_anchor, Point::new(0.5, 0.0)));
    assert!(!props.is_precise);
    assert!(matches!(s.tool.state(), ToolState::Idle));
}

#[test]
fn test_holding_over_target_makes_binding_precise() {
    let mut s = Session::new();

    s.down(0.0, 0.0, 0);
    s.move_to(120.0, 110.0, 16);
    s.move_to(121.0, 110.0, 400);
    s.up(121.0, 110.0, 410);

    let id = s.only_connector();
    let props = *connector_bindings(&s.editor, id).props(Terminal::End).unwrap();
    assert!(props.is_precise);
    assert!(approximately_point(props.normalized_anchor, Point::new(0.21, 0.2)));
}

#[test]
fn test_slow_entry_is_precise_immediately() {
    let mut s = Session::new();

    s.down(0.0, 0.0, 0);
    s.move_to(60.0, 110.0, 16);
    s.move_to(90.0, 110.0, 1000);
    s.move_to(110.0, 110.0, 1100);
    s.up(110.0, 110.0, 1110);

    let props = *connector_bindings(&s.editor, s.only_connector()).props(Terminal::End).unwrap();
    assert!(props.is_precise);
    assert!(approximately_point(props.normalized_anchor, Point::new(0.1, 0.2)));
}

#[test]
fn test_press_held_before_dragging_binds_precisely() {
    let mut s = Session::new();

    s.down(0.0, 0.0, 0);
    // Too short to count as a drag.
    s.move_to(2.0, 0.0, 395);
    s.move_to(120.0, 110.0, 400);
    s.up(120.0, 110.0, 405);

    let props = *connector_bindings(&s.editor, s.only_connector()).props(Terminal::End).unwrap();
    assert!(props.is_precise);
    assert!(approximately_point(props.normalized_anchor, Point::new(0.2, 0.2)));
}

#[test]
fn test_grabbing_bound_handle_keeps_binding() {
    let mut s = Session::new();
    s.down(0.0, 0.0, 0);
    s.move_to(150.0, 104.0, 16);
    s.up(150.0, 104.0, 24);
    let id = s.only_connector();
    assert_eq!(s.editor.selected_ids(), &[id]);
    let before = *connector_bindings(&s.editor, id).props(Terminal::End).unwrap();

    // The imprecise end resolves to (150, 110); press beside it and let go.
    s.down(156.0, 110.0, 100);
    assert!(matches!(s.tool.state(), ToolState::DraggingHandle(_)));
    s.up(156.0, 110.0, 150);
    assert_eq!(*connector_bindings(&s.editor, id).props(Terminal::End).unwrap(), before);

    // A quick drag within the same target stays imprecise.
    s.down(156.0, 110.0, 200);
    s.move_to(170.0, 112.0, 205);
    s.up(170.0, 112.0, 210);
    let after = *connector_bindings(&s.editor, id).props(Terminal::End).unwrap();
    assert!(!after.is_precise);
    assert_eq!(after.normalized_anchor, Point::new(0.5, 0.0));
}

#[test]
fn test_committed_gestures_release_their_marks() {
    let mut s = Session::new();
    for i in 0..20u64 {
        let t = i * 1000;
        let y = 400.0 + i as f64 * 30.0;
        s.down(0.0, y, t);
        s.move_to(80.0, y, t + 16);
        s.up(80.0, y, t + 24);
        s.editor.select_none();
    }

    assert_eq!(s.connectors().len(), 20);
    assert_eq!(s.editor.document.mark_count(), 0);
    assert!(s.editor.document.can_undo());
}

#[test]
fn test_click_without_drag_leaves_nothing() {
    let mut s = Session::new();
    s.editor.push_undo();

    s.down(20.0, 20.0, 0);
    s.up(20.0, 20.0, 50);

    assert!(s.connectors().is_empty());
    assert!(s.editor.selected_ids().is_empty());
    assert!(s.editor.document.bindings.is_empty());
}

#[test]
fn test_ctrl_drag_leaves_end_free() {
    let mut s = Session::new();
    s.editor.inputs.set_modifiers(Modifiers {
        ctrl: true,
        ..Modifiers::default()
    });

    s.down(0.0, 0.0, 0);
    s.move_to(150.0, 104.0, 16);
    s.up(150.0, 104.0, 24);

    let id = s.only_connector();
    assert!(connector_bindings(&s.editor, id).is_empty());
    let connector = s.editor.shape(id).unwrap().as_connector().unwrap();
    assert!(approximately_point(connector.end, Point::new(150.0, 104.0)));
}

#[test]
fn test_connector_between_two_shapes_goes_behind_them() {
    let mut s = Session::new();
    let page = ParentId::Page(s.editor.current_page_id());
    let other = s
        .editor
        .create_shape(ShapeRecord::new(page, ShapeKind::Geo(Geo::rectangle(100.0, 50.0))).at(400.0, 100.0))
        .unwrap();

    s.down(150.0, 125.0, 0);
    s.move_to(450.0, 125.0, 16);
    s.up(450.0, 125.0, 24);

    let id = s.only_connector();
    let bindings = connector_bindings(&s.editor, id);
    assert_eq!(bindings.target(Terminal::Start), Some(s.target));
    assert_eq!(bindings.target(Terminal::End), Some(other));
    assert_eq!(s.editor.sorted_child_ids(page).first(), Some(&id));
}

#[test]
fn test_moving_target_after_drawing_keeps_connector_attached() {
    let mut s = Session::new();
    s.down(0.0, 0.0, 0);
    s.move_to(150.0, 104.0, 16);
    s.up(150.0, 104.0, 24);
    let id = s.only_connector();
    s.editor.select_none();

    let mut moved = s.editor.shape(s.target).unwrap().clone();
    moved.y += 100.0;
    s.editor.update_shape(moved).unwrap();

    // Imprecise top binding resolves toward the upper middle of the target.
    let connector = s.editor.shape(id).unwrap().as_connector().unwrap();
    assert!(approximately_point(connector.end, Point::new(150.0, 210.0)));
}

#[test]
fn test_custom_timeout_from_config() {
    init();
    let config = EngineConfig::from_json(r#"{ "precise_timeout_ms": 50 }"#).unwrap();
    let mut editor = Editor::with_config(config);
    let page = ParentId::Page(editor.current_page_id());
    let target = editor
        .create_shape(ShapeRecord::new(page, ShapeKind::Geo(Geo::rectangle(100.0, 50.0))).at(100.0, 100.0))
        .unwrap();
    let mut tool = ConnectorTool::new();
    let at = |x: f64, y: f64, ms: u64| (Point::new(x, y), Duration::from_millis(ms));

    let (position, time) = at(0.0, 0.0, 0);
    tool.handle_pointer_event(&mut editor, PointerEvent::Down { position, time }).unwrap();
    let (position, time) = at(120.0, 110.0, 16);
    tool.handle_pointer_event(&mut editor, PointerEvent::Move { position, time }).unwrap();
    let (position, time) = at(121.0, 110.0, 80);
    tool.handle_pointer_event(&mut editor, PointerEvent::Move { position, time }).unwrap();
    tool.handle_pointer_event(&mut editor, PointerEvent::Up { position, time }).unwrap();

    let id = editor
        .document
        .shapes
        .values()
        .find(|shape| shape.shape_type() == ShapeType::Connector)
        .map(|shape| shape.id)
        .unwrap();
    let bindings = connector_bindings(&editor, id);
    assert_eq!(bindings.target(Terminal::End), Some(target));
    assert!(bindings.props(Terminal::End).unwrap().is_precise);
}
