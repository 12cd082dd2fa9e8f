//! Board object model: the polymorphic visual entities on a board.
//!
//! This module defines the tagged-variant object type shared by the server
//! replica, the client engine, and the wire protocol. An object is a common
//! bounding box (position, size, rotation) plus a kind-specific payload, and
//! serializes to the flat JSON shape peers exchange:
//! `{"id":"…","type":"rectangle","x":…,"y":…,…,"color":"#3b82f6"}`.
//!
//! The advisory lock lives on the object itself as `lockedBy`; it is set on
//! focus-start and cleared on focus-end by the same user only.

#[cfg(test)]
#[path = "object_test.rs"]
mod object_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH};

/// Unique identifier for a board object. Client-generated; any string unique
/// within the board is accepted on the wire.
pub type ObjectId = String;

/// Kind discriminator plus kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectKind {
    /// Editable text label.
    Text { content: String },
    /// Bitmap referenced by source URL. Keeps its aspect ratio under resize.
    Image { url: String },
    /// Filled axis-aligned rectangle.
    Rectangle { color: String },
    /// Ellipse inscribed within the bounding box.
    Circle { color: String },
    /// Horizontal bar rendered as a line.
    Line { color: String },
}

impl ObjectKind {
    /// Wire name of this kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Rectangle { .. } => "rectangle",
            Self::Circle { .. } => "circle",
            Self::Line { .. } => "line",
        }
    }

    /// Whether resize gestures must preserve the origin aspect ratio.
    #[must_use]
    pub fn keeps_aspect(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// A board object as stored, manipulated, and sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardObject {
    /// Unique identifier within the board.
    pub id: ObjectId,
    /// Kind discriminator and payload, flattened into the object on the wire.
    #[serde(flatten)]
    pub kind: ObjectKind,
    /// Left edge of the bounding box.
    pub x: f64,
    /// Top edge of the bounding box.
    pub y: f64,
    /// Width of the bounding box.
    pub width: f64,
    /// Height of the bounding box.
    pub height: f64,
    /// Clockwise rotation in degrees around the bounding-box center.
    pub rotation: f64,
    /// User currently manipulating this object, if any.
    #[serde(rename = "lockedBy", default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
}

impl BoardObject {
    fn with_defaults(kind: ObjectKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            locked_by: None,
        }
    }

    /// New text object with default geometry and placeholder content.
    #[must_use]
    pub fn text() -> Self {
        Self::with_defaults(ObjectKind::Text { content: "Text".into() }, 100.0, 100.0, 120.0, 30.0)
    }

    /// New image object pointing at a placeholder source.
    #[must_use]
    pub fn image() -> Self {
        Self::with_defaults(
            ObjectKind::Image { url: "https://via.placeholder.com/200x150".into() },
            200.0,
            200.0,
            200.0,
            150.0,
        )
    }

    /// New rectangle with default geometry and fill.
    #[must_use]
    pub fn rectangle() -> Self {
        Self::with_defaults(ObjectKind::Rectangle { color: "#3b82f6".into() }, 300.0, 100.0, 100.0, 80.0)
    }

    /// New circle with default geometry and fill.
    #[must_use]
    pub fn circle() -> Self {
        Self::with_defaults(ObjectKind::Circle { color: "#ef4444".into() }, 400.0, 200.0, 80.0, 80.0)
    }

    /// New line with default geometry and stroke.
    #[must_use]
    pub fn line() -> Self {
        Self::with_defaults(ObjectKind::Line { color: "#10b981".into() }, 500.0, 100.0, 150.0, 2.0)
    }

    /// Center of the bounding box; the rotation pivot.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether `(px, py)` falls inside the bounding box. Rotation is ignored;
    /// bodies hit-test as axis-aligned boxes.
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// Whether the bounding box lies fully inside the canvas.
    #[must_use]
    pub fn within_canvas(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= CANVAS_WIDTH
            && self.y + self.height <= CANVAS_HEIGHT
    }

    /// True when the object is locked by someone other than `user_id`.
    #[must_use]
    pub fn locked_by_other(&self, user_id: &str) -> bool {
        self.locked_by.as_deref().is_some_and(|holder| holder != user_id)
    }
}
