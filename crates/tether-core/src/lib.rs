//! Tether Core Library
//!
//! Connectors for an infinite-canvas editor: shapes joined by connectors whose
//! terminals are bound to other shapes and follow them as they move, resize,
//! reparent, change page or get deleted.

pub mod bindings;
pub mod canvas;
pub mod config;
pub mod connector;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod input;
pub mod registry;
pub mod selection;
pub mod shapes;
pub mod snap;
pub mod tools;

pub use bindings::{Binding, BindingId, BindingProps, BindingType, ConnectorBindingProps, ConnectorBindings};
pub use canvas::{CanvasDocument, HistoryMark, Page};
pub use config::EngineConfig;
pub use connector::{ConnectorInfo, ConnectorPath, connector_info, connector_path};
pub use editor::{CursorKind, Editor};
pub use error::{EngineError, EngineResult};
pub use input::{InputState, Modifiers, PointerEvent};
pub use registry::{BindingUtil, Registry, ShapeUtil};
pub use selection::{Handle, HandleId, HandleKind};
pub use shapes::{Connector, Geo, ParentId, ShapeId, ShapeKind, ShapeRecord, ShapeType, Terminal};
pub use snap::{GRID_SIZE, SnapMode, SnapResult, snap_point, snap_to_grid};
pub use tools::{ConnectorTool, ToolEvent, ToolState};
