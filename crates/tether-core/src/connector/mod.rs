//! Connector engine: terminal resolution, body geometry, reparenting and the
//! binding reactions that keep connectors attached to their targets.

mod binding_util;
mod info;
mod path;
mod reparent;
mod terminals;
mod util;

pub use binding_util::{ConnectorBindingUtil, update_connector_terminal};
pub use info::{ConnectorInfo, TerminalPoint, connector_info, connector_length};
pub use path::{AnchorSide, ConnectorPath, anchor_side, connector_path, spline_path};
pub use reparent::reparent_connector;
pub use terminals::{
    BoundShapesRelationship, ConnectorTerminals, bound_shapes_relationship,
    terminals_in_connector_space,
};
pub use util::{ConnectorUtil, cardinal_anchor, normalize_in_bounds};
