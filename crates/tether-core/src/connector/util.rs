//! Shape handlers for connectors.

use super::info::connector_info;
use super::path::connector_path;
use super::terminals::terminals_in_connector_space;
use crate::bindings::{
    BindingProps, ConnectorBindingProps, connector_bindings, create_or_update_connector_binding,
    remove_connector_binding,
};
use crate::editor::Editor;
use crate::error::{EngineError, EngineResult, invariant};
use crate::geometry::{approximately_point, is_clockwise, midpoint, nearest_point_on_line, perpendicular};
use crate::registry::ShapeUtil;
use crate::selection::{Handle, HandleDrag, HandleId, HandleKind};
use crate::shapes::{
    Arrowhead, Connector, Geometry, ShapeId, ShapeKind, ShapeRecord, ShapeType, Terminal,
};
use crate::snap::{GRID_SIZE, snap_point};
use crate::tools::{BoundTerminal, ResizeInfo, ResizeOutcome, TranslateStart};
use kurbo::{Point, Rect, Vec2};

/// Anchor of a point within bounds, clamped to `[0, 1]` on both axes.
/// Degenerate axes resolve to the middle.
pub fn normalize_in_bounds(point: Point, bounds: Rect) -> Point {
    let axis = |value: f64, min: f64, size: f64| {
        if size.abs() < f64::EPSILON {
            0.5
        } else {
            ((value - min) / size).clamp(0.0, 1.0)
        }
    };
    Point::new(
        axis(point.x, bounds.x0, bounds.width()),
        axis(point.y, bounds.y0, bounds.height()),
    )
}

/// The edge midpoint of `bounds` nearest to `point`, as a normalized anchor.
pub fn cardinal_anchor(point: Point, bounds: Rect) -> Point {
    const CARDINALS: [Point; 4] = [
        Point::new(0.5, 0.0),
        Point::new(1.0, 0.5),
        Point::new(0.5, 1.0),
        Point::new(0.0, 0.5),
    ];
    let at = |anchor: Point| {
        Point::new(
            bounds.x0 + anchor.x * bounds.width(),
            bounds.y0 + anchor.y * bounds.height(),
        )
    };
    CARDINALS
        .into_iter()
        .min_by(|a, b| at(*a).distance(point).total_cmp(&at(*b).distance(point)))
        .unwrap_or(Point::new(0.5, 0.5))
}

/// Handlers for connector shapes.
pub struct ConnectorUtil;

impl ConnectorUtil {
    fn drag_bend(&self, editor: &Editor, shape: &ShapeRecord, drag: &HandleDrag) -> EngineResult<Option<ShapeRecord>> {
        let info = connector_info(editor, shape)
            .ok_or_else(|| invariant(format!("no connector info for {}", shape.id)))?;
        let point = editor
            .page_to_local(shape.id, drag.page_point)
            .ok_or(EngineError::ShapeNotFound(shape.id))?;
        let (a, b) = (info.start().handle, info.end().handle);
        let med = midpoint(a, b);
        let on_bisector = nearest_point_on_line(med, med + perpendicular(b - a), point);
        let mut bend = on_bisector.distance(med);
        if is_clockwise(point, b, med) {
            bend = -bend;
        }

        let mut next = shape.clone();
        if let Some(connector) = next.as_connector_mut() {
            connector.bend = bend;
        }
        Ok(Some(next))
    }

    fn drag_terminal(
        &self,
        editor: &mut Editor,
        shape: &ShapeRecord,
        terminal: Terminal,
        drag: &HandleDrag,
    ) -> EngineResult<Option<ShapeRecord>> {
        let connector_id = shape.id;
        let target = if editor.inputs.modifiers.ctrl {
            None
        } else {
            editor.bindable_shape_at(drag.page_point, ShapeType::Connector)
        };

        let Some(target) = target else {
            remove_connector_binding(editor, connector_id, terminal)?;
            editor.set_hinting(Vec::new());
            let page_point = snap_point(drag.page_point, editor.config.snap_mode, GRID_SIZE).point;
            let Some(mut next) = editor.shape(connector_id).cloned() else {
                return Ok(None);
            };
            let local = editor
                .page_to_local(connector_id, page_point)
                .ok_or(EngineError::ShapeNotFound(connector_id))?;
            if let Some(connector) = next.as_connector_mut() {
                connector.set_terminal(terminal, local);
            }
            return Ok(Some(next));
        };

        let props = self.binding_props_at(editor, connector_id, terminal, target, drag)?;
        create_or_update_connector_binding(editor, connector_id, target, props)?;
        editor.set_hinting(vec![target]);

        // Binding reactions may have reparented the connector.
        let Some(mut next) = editor.shape(connector_id).cloned() else {
            return Ok(None);
        };
        let terminals = terminals_in_connector_space(editor, &next, &connector_bindings(editor, connector_id));
        if let Some(connector) = next.as_connector_mut() {
            connector.set_terminal(terminal, terminals.get(terminal));
        }
        Ok(Some(next))
    }

    /// Binding props for a terminal dragged over `target`.
    fn binding_props_at(
        &self,
        editor: &Editor,
        connector_id: ShapeId,
        terminal: Terminal,
        target: ShapeId,
        drag: &HandleDrag,
    ) -> EngineResult<ConnectorBindingProps> {
        let geometry = editor.geometry(target).ok_or(EngineError::ShapeNotFound(target))?;
        let point = editor
            .page_to_local(target, drag.page_point)
            .ok_or(EngineError::ShapeNotFound(target))?;
        let bounds = geometry.bounds;

        let other = connector_bindings(editor, connector_id)
            .get(terminal.other())
            .filter(|binding| binding.to_id == target)
            .and_then(|binding| binding.connector_props().copied());
        let is_precise = drag.is_precise || !geometry.is_closed || other.is_some_and(|props| props.is_precise);

        let mut normalized_anchor = if !is_precise {
            cardinal_anchor(point, bounds)
        } else {
            let snap_radius = editor
                .config
                .center_snap_radius(bounds.width(), bounds.height(), editor.inputs.zoom);
            if point.distance(bounds.center()) <= snap_radius {
                Point::new(0.5, 0.5)
            } else {
                normalize_in_bounds(point, bounds)
            }
        };

        if let Some(other) = other {
            if approximately_point(other.normalized_anchor, normalized_anchor) {
                let nudge = editor.config.anchor_nudge;
                normalized_anchor.x += nudge;
                if normalized_anchor.x > 1.0 {
                    normalized_anchor.x -= 2.0 * nudge;
                }
            }
        }

        Ok(ConnectorBindingProps {
            terminal,
            normalized_anchor,
            is_precise,
            is_exact: editor.inputs.modifiers.alt,
        })
    }
}

impl ShapeUtil for ConnectorUtil {
    fn shape_type(&self) -> ShapeType {
        ShapeType::Connector
    }

    fn default_kind(&self) -> ShapeKind {
        ShapeKind::Connector(Connector::default())
    }

    fn geometry(&self, editor: &Editor, shape: &ShapeRecord) -> Geometry {
        match connector_path(editor, shape) {
            Some(path) => Geometry::open(path.points()),
            None => Geometry::open(Vec::new()),
        }
    }

    fn handles(&self, editor: &Editor, shape: &ShapeRecord) -> Vec<Handle> {
        let Some(info) = connector_info(editor, shape) else {
            return Vec::new();
        };
        vec![
            Handle::new(HandleId::Start, HandleKind::Vertex, info.start().handle),
            Handle::new(HandleId::End, HandleKind::Vertex, info.end().handle),
            Handle::new(HandleId::Bend, HandleKind::Virtual, info.middle()),
        ]
    }

    fn can_bind(&self, _from: ShapeType, to: ShapeType) -> bool {
        to != ShapeType::Connector
    }

    fn can_translate_by_body(&self) -> bool {
        false
    }

    fn on_handle_drag(
        &self,
        editor: &mut Editor,
        shape: &ShapeRecord,
        drag: &HandleDrag,
    ) -> EngineResult<Option<ShapeRecord>> {
        if shape.as_connector().is_none() {
            return Ok(None);
        }
        match drag.handle.terminal() {
            Some(terminal) => self.drag_terminal(editor, shape, terminal, drag),
            None => self.drag_bend(editor, shape, drag),
        }
    }

    fn on_resize(&self, editor: &mut Editor, info: &ResizeInfo<'_>) -> EngineResult<Option<ResizeOutcome>> {
        let Some(connector) = info.initial.as_connector() else {
            return Ok(None);
        };
        let (sx, sy) = (info.scale_x, info.scale_y);
        let mut next = connector.clone();

        for terminal in Terminal::BOTH {
            let Some(binding) = info.initial_bindings.get(terminal) else {
                let p = connector.terminal(terminal);
                next.set_terminal(terminal, Point::new(p.x * sx, p.y * sy));
                continue;
            };
            let Some(props) = binding.connector_props() else {
                continue;
            };
            let mut anchor = props.normalized_anchor;
            if sx < 0.0 {
                anchor.x = 1.0 - anchor.x;
            }
            if sy < 0.0 {
                anchor.y = 1.0 - anchor.y;
            }
            if anchor != props.normalized_anchor && editor.binding(binding.id).is_some() {
                let mut updated = binding.clone();
                updated.props = BindingProps::Connector(ConnectorBindingProps {
                    normalized_anchor: anchor,
                    ..*props
                });
                editor.update_binding(updated)?;
            }
        }

        if (sx < 0.0) != (sy < 0.0) {
            next.bend = -next.bend;
        }
        next.bend *= sx.abs().max(sy.abs());

        Ok(Some(ResizeOutcome {
            kind: ShapeKind::Connector(next),
            origin_offset: Vec2::ZERO,
        }))
    }

    fn on_translate_start(&self, editor: &mut Editor, shape: &ShapeRecord) -> EngineResult<TranslateStart> {
        let bindings = connector_bindings(editor, shape.id);
        let terminals = terminals_in_connector_space(editor, shape, &bindings);

        // Write the resolved handles so that unbinding mid-drag keeps the body in place.
        let mut next = shape.clone();
        if let Some(connector) = next.as_connector_mut() {
            connector.start = terminals.start;
            connector.end = terminals.end;
        }
        editor.update_shape(next)?;

        let mut bound_terminals = Vec::new();
        for terminal in Terminal::BOTH {
            let Some(target) = bindings.target(terminal) else {
                continue;
            };
            if let Some(page_point) = editor.local_to_page(shape.id, terminals.get(terminal)) {
                bound_terminals.push(BoundTerminal {
                    terminal,
                    target,
                    page_point,
                });
            }
        }
        Ok(TranslateStart {
            initial_page_origin: editor.local_to_page(shape.id, Point::ZERO).unwrap_or(Point::ZERO),
            bound_terminals,
        })
    }

    fn on_translate(
        &self,
        editor: &mut Editor,
        start: &TranslateStart,
        shape_id: ShapeId,
        moving: &[ShapeId],
    ) -> EngineResult<()> {
        let moves_with_target = start.bound_terminals.iter().any(|bound| {
            moving.contains(&bound.target) || editor.ancestors(bound.target).iter().any(|a| moving.contains(a))
        });
        if moves_with_target {
            return Ok(());
        }
        let Some(origin) = editor.local_to_page(shape_id, Point::ZERO) else {
            return Ok(());
        };
        let delta = origin - start.initial_page_origin;

        for bound in &start.bound_terminals {
            let probe = bound.page_point + delta * 0.5;
            let hit = editor.bindable_shape_at(probe, ShapeType::Connector);
            if hit != Some(bound.target) {
                log::debug!("{:?} of connector {shape_id} slid off {}, unbinding", bound.terminal, bound.target);
                remove_connector_binding(editor, shape_id, bound.terminal)?;
                continue;
            }
            let (Some(geometry), Some(point)) = (editor.geometry(bound.target), editor.page_to_local(bound.target, probe))
            else {
                continue;
            };
            let Some(mut props) = connector_bindings(editor, shape_id).props(bound.terminal).copied() else {
                continue;
            };
            props.normalized_anchor = normalize_in_bounds(point, geometry.bounds);
            create_or_update_connector_binding(editor, shape_id, bound.target, props)?;
        }
        Ok(())
    }

    fn on_double_click_handle(&self, shape: &ShapeRecord, handle: HandleId) -> Option<ShapeRecord> {
        let terminal = handle.terminal()?;
        let mut next = shape.clone();
        let connector = next.as_connector_mut()?;
        let toggled = match connector.arrowhead(terminal) {
            Arrowhead::None => Arrowhead::Arrow,
            _ => Arrowhead::None,
        };
        connector.set_arrowhead(terminal, toggled);
        Some(next)
    }

    fn on_edit_end(&self, shape: &ShapeRecord) -> Option<ShapeRecord> {
        let connector = shape.as_connector()?;
        let trimmed = connector.text.trim_end();
        if trimmed.len() == connector.text.len() {
            return None;
        }
        let mut next = shape.clone();
        if let Some(connector) = next.as_connector_mut() {
            connector.text = trimmed.to_string();
        }
        Some(next)
    }

    fn to_svg_path(&self, editor: &Editor, shape: &ShapeRecord) -> String {
        connector_path(editor, shape)
            .map(|path| path.to_svg())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::approximately;
    use crate::input::Modifiers;
    use crate::shapes::{Geo, ParentId};

    fn setup() -> (Editor, ShapeId, ShapeId) {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let target = editor
            .create_shape(ShapeRecord::new(page, ShapeKind::Geo(Geo::rectangle(100.0, 50.0))).at(100.0, 100.0))
            .unwrap();
        let connector = editor
            .create_shape(ShapeRecord::new(page, ShapeKind::Connector(Connector::new(Point::ZERO, Point::ZERO))))
            .unwrap();
        (editor, connector, target)
    }

    fn drag(editor: &mut Editor, id: ShapeId, handle: HandleId, page_point: Point, is_precise: bool) {
        let shape = editor.shape(id).unwrap().clone();
        let drag = HandleDrag {
            handle,
            page_point,
            is_precise,
            is_creating: false,
        };
        if let Some(next) = ConnectorUtil.on_handle_drag(editor, &shape, &drag).unwrap() {
            editor.update_shape(next).unwrap();
        }
    }

    #[test]
    fn test_cardinal_anchor() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(cardinal_anchor(Point::new(45.0, 5.0), bounds), Point::new(0.5, 0.0));
        assert_eq!(cardinal_anchor(Point::new(95.0, 30.0), bounds), Point::new(1.0, 0.5));
        assert_eq!(cardinal_anchor(Point::new(50.0, 48.0), bounds), Point::new(0.5, 1.0));
    }

    #[test]
    fn test_normalize_in_bounds_clamps() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(normalize_in_bounds(Point::new(25.0, 25.0), bounds), Point::new(0.25, 0.5));
        assert_eq!(normalize_in_bounds(Point::new(-5.0, 60.0), bounds), Point::new(0.0, 1.0));
        assert_eq!(normalize_in_bounds(Point::new(3.0, 3.0), Rect::ZERO), Point::new(0.5, 0.5));
    }

    #[test]
    fn test_imprecise_drag_snaps_to_edge_midpoint() {
        let (mut editor, id, target) = setup();
        drag(&mut editor, id, HandleId::End, Point::new(140.0, 104.0), false);

        let props = *connector_bindings(&editor, id).props(Terminal::End).unwrap();
        assert_eq!(connector_bindings(&editor, id).target(Terminal::End), Some(target));
        assert_eq!(props.normalized_anchor, Point::new(0.5, 0.0));
        assert!(!props.is_precise);
        assert_eq!(editor.hinting_ids(), &[target]);
    }

    #[test]
    fn test_precise_drag_keeps_exact_point() {
        let (mut editor, id, _) = setup();
        drag(&mut editor, id, HandleId::End, Point::new(120.0, 110.0), true);

        let props = *connector_bindings(&editor, id).props(Terminal::End).unwrap();
        assert!(props.is_precise);
        assert!(approximately_point(props.normalized_anchor, Point::new(0.2, 0.2)));
    }

    #[test]
    fn test_precise_drag_near_center_snaps_to_center() {
        let (mut editor, id, _) = setup();
        drag(&mut editor, id, HandleId::End, Point::new(152.0, 126.0), true);

        let props = *connector_bindings(&editor, id).props(Terminal::End).unwrap();
        assert_eq!(props.normalized_anchor, Point::new(0.5, 0.5));
    }

    #[test]
    fn test_ctrl_drag_unbinds() {
        let (mut editor, id, _) = setup();
        drag(&mut editor, id, HandleId::End, Point::new(140.0, 104.0), false);
        editor.inputs.set_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::default()
        });
        drag(&mut editor, id, HandleId::End, Point::new(140.0, 104.0), false);

        assert!(connector_bindings(&editor, id).is_empty());
        let connector = editor.shape(id).unwrap().as_connector().unwrap();
        assert_eq!(connector.end, Point::new(140.0, 104.0));
        assert!(editor.hinting_ids().is_empty());
    }

    #[test]
    fn test_alt_drag_binds_exactly() {
        let (mut editor, id, _) = setup();
        editor.inputs.set_modifiers(Modifiers {
            alt: true,
            ..Modifiers::default()
        });
        drag(&mut editor, id, HandleId::End, Point::new(120.0, 110.0), true);
        assert!(connector_bindings(&editor, id).props(Terminal::End).unwrap().is_exact);
    }

    #[test]
    fn test_coincident_anchor_is_nudged() {
        let (mut editor, id, _) = setup();
        drag(&mut editor, id, HandleId::Start, Point::new(120.0, 110.0), true);
        drag(&mut editor, id, HandleId::End, Point::new(120.0, 110.0), true);

        let bindings = connector_bindings(&editor, id);
        let start = bindings.props(Terminal::Start).unwrap().normalized_anchor;
        let end = bindings.props(Terminal::End).unwrap().normalized_anchor;
        assert!(approximately(end.x - start.x, 0.05));
        assert!(approximately(end.y, start.y));
    }

    #[test]
    fn test_bend_handle_drag() {
        let mut editor = Editor::new();
        let page = ParentId::Page(editor.current_page_id());
        let id = editor
            .create_shape(ShapeRecord::new(
                page,
                ShapeKind::Connector(Connector::new(Point::ZERO, Point::new(100.0, 0.0))),
            ))
            .unwrap();

        drag(&mut editor, id, HandleId::Bend, Point::new(60.0, 25.0), false);
        assert!(approximately(editor.shape(id).unwrap().as_connector().unwrap().bend, 25.0));

        drag(&mut editor, id, HandleId::Bend, Point::new(40.0, -30.0), false);
        assert!(approximately(editor.shape(id).unwrap().as_connector().unwrap().bend, -30.0));
    }

    #[test]
    fn test_double_click_toggles_arrowhead() {
        let record = ShapeRecord::new(
            ParentId::Page(uuid::Uuid::new_v4()),
            ShapeKind::Connector(Connector::default()),
        );
        let toggled = ConnectorUtil.on_double_click_handle(&record, HandleId::End).unwrap();
        assert_eq!(toggled.as_connector().unwrap().arrowhead_end, Arrowhead::None);
        let toggled = ConnectorUtil.on_double_click_handle(&toggled, HandleId::End).unwrap();
        assert_eq!(toggled.as_connector().unwrap().arrowhead_end, Arrowhead::Arrow);
        assert!(ConnectorUtil.on_double_click_handle(&record, HandleId::Bend).is_none());
    }

    #[test]
    fn test_edit_end_trims_label() {
        let mut connector = Connector::default();
        connector.text = "label  \n".to_string();
        let record = ShapeRecord::new(ParentId::Page(uuid::Uuid::new_v4()), ShapeKind::Connector(connector));
        let trimmed = ConnectorUtil.on_edit_end(&record).unwrap();
        assert_eq!(trimmed.as_connector().unwrap().text, "label");
        assert!(ConnectorUtil.on_edit_end(&trimmed).is_none());
    }

    #[test]
    fn test_connectors_are_not_bind_targets() {
        assert!(!ConnectorUtil.can_bind(ShapeType::Connector, ShapeType::Connector));
        assert!(ConnectorUtil.can_bind(ShapeType::Connector, ShapeType::Geo));
        assert!(!ConnectorUtil.can_translate_by_body());
    }
}
