//! Hit-testing pointer positions against board objects.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::client::input::Point;
use crate::consts::{HANDLE_RADIUS, ROTATE_HANDLE_OFFSET};
use crate::object::{BoardObject, ObjectId};

/// Which part of an object was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle,
    RotateHandle,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub object_id: ObjectId,
    pub part: HitPart,
}

/// Test what lies under `point`. The handles of the selected object are
/// checked first (they extend outside its bounding box), then object bodies
/// in top-down display order. Handles only exist while the selected object is
/// unlocked, matching what the user sees.
#[must_use]
pub fn hit_test(point: Point, objects: &[BoardObject], selected: Option<&str>) -> Option<Hit> {
    if let Some(selected_id) = selected {
        if let Some(obj) = objects.iter().find(|o| o.id == selected_id) {
            if obj.locked_by.is_none() {
                if let Some(part) = handle_at(point, obj) {
                    return Some(Hit { object_id: obj.id.clone(), part });
                }
            }
        }
    }

    // Later objects draw on top, so scan in reverse insertion order.
    objects
        .iter()
        .rev()
        .find(|obj| obj.contains(point.x, point.y))
        .map(|obj| Hit { object_id: obj.id.clone(), part: HitPart::Body })
}

/// Which handle of `obj`, if any, is under `point`. The resize handle sits on
/// the bottom-right corner; the rotate handle floats above the top edge.
fn handle_at(point: Point, obj: &BoardObject) -> Option<HitPart> {
    let (center_x, _) = obj.center();
    let rotate = Point::new(center_x, obj.y - ROTATE_HANDLE_OFFSET);
    if distance(point, rotate) <= HANDLE_RADIUS {
        return Some(HitPart::RotateHandle);
    }

    let resize = Point::new(obj.x + obj.width, obj.y + obj.height);
    if distance(point, resize) <= HANDLE_RADIUS {
        return Some(HitPart::ResizeHandle);
    }

    None
}

fn distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}
