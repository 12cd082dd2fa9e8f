//! Canvas bounds and interaction constants.

/// Width of the logical canvas surface.
pub const CANVAS_WIDTH: f64 = 1600.0;

/// Height of the logical canvas surface.
pub const CANVAS_HEIGHT: f64 = 900.0;

/// Minimum width/height an object can be resized to.
pub const MIN_OBJECT_SIZE: f64 = 20.0;

/// Hit slop around the resize and rotate handles.
pub const HANDLE_RADIUS: f64 = 8.0;

/// Distance from the top edge of the bounding box to the rotate handle.
pub const ROTATE_HANDLE_OFFSET: f64 = 16.0;
