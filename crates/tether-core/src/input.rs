//! Input state: pointer position, velocity, modifiers and zoom.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Distance in screen pixels the pointer must travel before a press turns into a drag.
pub const DRAG_DISTANCE: f64 = 4.0;

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event in page coordinates, stamped with the host clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, time: Duration },
    Move { position: Point, time: Duration },
    Up { position: Point, time: Duration },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position, .. }
            | PointerEvent::Up { position, .. } => position,
        }
    }

    pub fn time(&self) -> Duration {
        match *self {
            PointerEvent::Down { time, .. }
            | PointerEvent::Move { time, .. }
            | PointerEvent::Up { time, .. } => time,
        }
    }
}

/// Tracks the pointer between events.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Current pointer position in page coordinates.
    pub current_page_point: Point,
    /// Pointer position at the previous event.
    pub previous_page_point: Point,
    /// Where the current press started.
    pub origin_page_point: Point,
    /// Pointer velocity in page units per millisecond.
    pub pointer_velocity: Vec2,
    /// Current modifier keys state.
    pub modifiers: Modifiers,
    /// Camera zoom; page distances are divided by this to get screen distances.
    pub zoom: f64,
    /// Host clock at the last event.
    pub time: Duration,
    pub is_pointer_down: bool,
    /// Whether the current press has moved far enough to count as a drag.
    pub is_dragging: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            current_page_point: Point::ZERO,
            previous_page_point: Point::ZERO,
            origin_page_point: Point::ZERO,
            pointer_velocity: Vec2::ZERO,
            modifiers: Modifiers::default(),
            zoom: 1.0,
            time: Duration::ZERO,
            is_pointer_down: false,
            is_dragging: false,
        }
    }
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position, time } => {
                self.current_page_point = position;
                self.previous_page_point = position;
                self.origin_page_point = position;
                self.pointer_velocity = Vec2::ZERO;
                self.is_pointer_down = true;
                self.is_dragging = false;
                self.time = time;
            }
            PointerEvent::Move { position, time } => {
                self.previous_page_point = self.current_page_point;
                self.current_page_point = position;
                let elapsed_ms = time.saturating_sub(self.time).as_secs_f64() * 1000.0;
                if elapsed_ms > 0.0 {
                    self.pointer_velocity = (position - self.previous_page_point) / elapsed_ms;
                }
                self.time = time;
                if self.is_pointer_down
                    && !self.is_dragging
                    && self.origin_page_point.distance(position) * self.zoom > DRAG_DISTANCE
                {
                    self.is_dragging = true;
                }
            }
            PointerEvent::Up { position, time } => {
                self.previous_page_point = self.current_page_point;
                self.current_page_point = position;
                self.time = time;
                self.is_pointer_down = false;
                self.is_dragging = false;
            }
        }
    }

    /// Update modifier keys state.
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    /// Get the drag delta from the press origin, if the pointer is down.
    pub fn drag_delta(&self) -> Option<Vec2> {
        self.is_pointer_down
            .then(|| self.current_page_point - self.origin_page_point)
    }
}
