//! Input model: pointer points, tools, and the gesture state machine.
//!
//! `InputState` is the active gesture being tracked between pointer-down and
//! pointer-up, carrying the origin snapshot needed to compute deltas and emit
//! final document mutations on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::object::ObjectId;

/// A point on the board surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which object kind the add-object action creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Text,
    Image,
    Rectangle,
    Circle,
    Line,
}

/// Internal state for the interaction state machine.
///
/// Only one object may be in an active gesture per client at a time; a
/// pointer-down while a gesture is active is ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    Idle,
    /// Moving an object across the canvas.
    Moving {
        id: ObjectId,
        /// Pointer position at pointer-down; deltas are relative to this.
        start: Point,
        /// Object x at the start of the drag.
        origin_x: f64,
        /// Object y at the start of the drag.
        origin_y: f64,
    },
    /// Resizing an object from its corner handle.
    Resizing {
        id: ObjectId,
        start: Point,
        /// Object width at the start of the resize; also fixes the aspect
        /// ratio for image objects.
        origin_w: f64,
        /// Object height at the start of the resize.
        origin_h: f64,
    },
    /// Rotating an object around the center captured at pointer-down.
    Rotating {
        id: ObjectId,
        /// The rotation pivot.
        center: Point,
        /// Rotation in degrees at the start of the gesture.
        origin_rotation: f64,
    },
}

impl InputState {
    /// Whether no gesture is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The object under an active gesture, if any.
    #[must_use]
    pub fn dragged_object(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Moving { id, .. } | Self::Resizing { id, .. } | Self::Rotating { id, .. } => Some(id),
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::Idle
    }
}
