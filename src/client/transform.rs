//! Pure geometry for drag gestures.
//!
//! Every function here takes the gesture's origin snapshot plus the current
//! pointer delta and returns clamped geometry. Keeping these free of engine
//! state makes the canvas-bounds invariants directly testable.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use crate::client::input::Point;
use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH, MIN_OBJECT_SIZE};

/// New top-left for a move gesture: the drag origin plus the pointer delta,
/// clamped so the object stays fully inside the canvas.
#[must_use]
pub fn move_position(
    origin_x: f64,
    origin_y: f64,
    dx: f64,
    dy: f64,
    width: f64,
    height: f64,
) -> (f64, f64) {
    (
        clamp(0.0, CANVAS_WIDTH - width, origin_x + dx),
        clamp(0.0, CANVAS_HEIGHT - height, origin_y + dy),
    )
}

/// New size for a resize gesture. Each axis grows by the pointer delta and is
/// floored at the minimum size; when `keep_aspect` is set the height is
/// recomputed from the width using the origin aspect ratio; both axes are then
/// capped so the object does not exceed the canvas from its current top-left.
#[must_use]
pub fn resize_dimensions(
    origin_w: f64,
    origin_h: f64,
    dx: f64,
    dy: f64,
    x: f64,
    y: f64,
    keep_aspect: bool,
) -> (f64, f64) {
    let mut width = (origin_w + dx).max(MIN_OBJECT_SIZE);
    let mut height = (origin_h + dy).max(MIN_OBJECT_SIZE);

    if keep_aspect {
        height = width / (origin_w / origin_h);
    }

    width = width.min(CANVAS_WIDTH - x);
    height = height.min(CANVAS_HEIGHT - y);
    (width, height)
}

/// New rotation for a rotate gesture: the pointer's bearing from the pivot in
/// degrees, minus the origin rotation, reduced into `[0, 360)`.
#[must_use]
pub fn rotate_angle(pointer: Point, center: Point, origin_rotation: f64) -> f64 {
    let bearing = (pointer.y - center.y).atan2(pointer.x - center.x).to_degrees();
    (bearing - origin_rotation).rem_euclid(360.0)
}

/// Clamp with the lower bound winning when the range is inverted, so an
/// object wider than the canvas pins to the left edge rather than a negative
/// coordinate.
fn clamp(min: f64, max: f64, value: f64) -> f64 {
    value.min(max).max(min)
}
