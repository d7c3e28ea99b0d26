//! Connector shape: an arrow with two terminals that may be bound to other shapes.

use crate::geometry::lerp;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Bends smaller than this (times scale) render as a straight chord.
pub const MIN_ARROW_BEND: f64 = 8.0;
/// Bodies shorter than this (times scale) are not clipped at their targets.
pub const MIN_ARROW_LENGTH: f64 = 10.0;
/// Gap left between an arrowhead and the outline it points at.
pub const BOUND_ARROW_OFFSET: f64 = 10.0;
/// Bends beyond this multiple of the chord length are treated as straight.
pub const WAY_TOO_BIG_ARROW_BEND_FACTOR: f64 = 10.0;

/// One end of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    Start,
    End,
}

impl Terminal {
    pub const BOTH: [Terminal; 2] = [Terminal::Start, Terminal::End];

    pub fn other(self) -> Terminal {
        match self {
            Terminal::Start => Terminal::End,
            Terminal::End => Terminal::Start,
        }
    }
}

/// Decoration drawn at a terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arrowhead {
    #[default]
    None,
    Arrow,
    Triangle,
    Dot,
}

/// Stroke size preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeSize {
    S,
    M,
    #[default]
    L,
    Xl,
}

impl StrokeSize {
    /// Stroke width in page units at scale 1.
    pub fn width(self) -> f64 {
        match self {
            StrokeSize::S => 2.0,
            StrokeSize::M => 3.5,
            StrokeSize::L => 5.0,
            StrokeSize::Xl => 10.0,
        }
    }
}

/// How the connector body is routed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStyle {
    /// Straight chord, or an arc when bent.
    Direct,
    /// Side-aware cubic spline leaving and entering perpendicular to the bound edges.
    #[default]
    Flowing,
}

/// Connector props. `start` and `end` are local-space points used while the
/// terminal is unbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub start: Point,
    pub end: Point,
    /// Signed offset of the body's midpoint from the chord.
    pub bend: f64,
    pub arrowhead_start: Arrowhead,
    pub arrowhead_end: Arrowhead,
    #[serde(default)]
    pub text: String,
    /// Label position along the body, 0 at start and 1 at end.
    pub label_position: f64,
    pub scale: f64,
    #[serde(default)]
    pub size: StrokeSize,
    #[serde(default)]
    pub path_style: PathStyle,
}

impl Default for Connector {
    fn default() -> Self {
        Self {
            start: Point::ZERO,
            end: Point::new(2.0, 0.0),
            bend: 0.0,
            arrowhead_start: Arrowhead::None,
            arrowhead_end: Arrowhead::Arrow,
            text: String::new(),
            label_position: 0.5,
            scale: 1.0,
            size: StrokeSize::default(),
            path_style: PathStyle::default(),
        }
    }
}

impl Connector {
    /// Create a straight connector between two local points.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    /// Builder: set the bend.
    pub fn with_bend(mut self, bend: f64) -> Self {
        self.bend = bend;
        self
    }

    /// Builder: set the path style.
    pub fn with_path_style(mut self, path_style: PathStyle) -> Self {
        self.path_style = path_style;
        self
    }

    pub fn terminal(&self, terminal: Terminal) -> Point {
        match terminal {
            Terminal::Start => self.start,
            Terminal::End => self.end,
        }
    }

    pub fn set_terminal(&mut self, terminal: Terminal, point: Point) {
        match terminal {
            Terminal::Start => self.start = point,
            Terminal::End => self.end = point,
        }
    }

    pub fn arrowhead(&self, terminal: Terminal) -> Arrowhead {
        match terminal {
            Terminal::Start => self.arrowhead_start,
            Terminal::End => self.arrowhead_end,
        }
    }

    pub fn set_arrowhead(&mut self, terminal: Terminal, arrowhead: Arrowhead) {
        match terminal {
            Terminal::Start => self.arrowhead_start = arrowhead,
            Terminal::End => self.arrowhead_end = arrowhead,
        }
    }

    /// Whether the bend is too small to draw as an arc.
    pub fn is_straight(&self) -> bool {
        self.bend.abs() < MIN_ARROW_BEND * self.scale
    }

    /// Stroke width after scaling.
    pub fn stroke_width(&self) -> f64 {
        self.size.width() * self.scale
    }

    /// Props part-way between `self` and `to`, used for animated transitions.
    /// Continuous props are interpolated; everything else is taken from `to`.
    pub fn interpolate(&self, to: &Connector, t: f64) -> Connector {
        Connector {
            start: self.start.lerp(to.start, t),
            end: self.end.lerp(to.end, t),
            bend: lerp(self.bend, to.bend, t),
            label_position: lerp(self.label_position, to.label_position, t),
            scale: lerp(self.scale, to.scale, t),
            ..to.clone()
        }
    }
}
