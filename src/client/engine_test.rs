#![allow(clippy::float_cmp)]

use super::*;
use crate::state::test_helpers::dummy_rectangle;

/// Engine for "alice" holding one default rectangle, id `obj-1`,
/// spanning (300,100)..(400,180).
fn engine_with_rect() -> EngineCore {
    let mut engine = EngineCore::new("alice");
    engine.load_snapshot(vec![dummy_rectangle("obj-1")]);
    engine
}

fn broadcast_kinds(actions: &[Action]) -> Vec<&'static str> {
    actions
        .iter()
        .filter_map(|action| match action {
            Action::Broadcast(body) => Some(body.kind()),
            _ => None,
        })
        .collect()
}

fn last_board_update(actions: &[Action]) -> Vec<crate::object::BoardObject> {
    actions
        .iter()
        .rev()
        .find_map(|action| match action {
            Action::Broadcast(Body::BoardUpdate { objects, .. }) => Some(objects.clone()),
            _ => None,
        })
        .expect("expected a boardUpdate broadcast")
}

// =============================================================
// Pointer-down
// =============================================================

#[test]
fn pointer_down_on_body_begins_move_and_takes_focus() {
    let mut engine = engine_with_rect();
    let actions = engine.on_pointer_down(Point::new(350.0, 140.0));

    assert_eq!(broadcast_kinds(&actions), ["objectFocus"]);
    assert_eq!(engine.selection(), Some("obj-1"));
    assert_eq!(engine.object("obj-1").unwrap().locked_by.as_deref(), Some("alice"));
    assert!(matches!(engine.input(), InputState::Moving { origin_x, origin_y, .. }
        if *origin_x == 300.0 && *origin_y == 100.0));
}

#[test]
fn pointer_down_on_foreign_locked_object_starts_nothing() {
    let mut engine = engine_with_rect();
    engine.apply_focus("obj-1", "bob");

    let actions = engine.on_pointer_down(Point::new(350.0, 140.0));
    assert!(actions.is_empty());
    assert!(engine.selection().is_none());
    assert!(engine.input().is_idle());
    // Still bob's lock.
    assert_eq!(engine.object("obj-1").unwrap().locked_by.as_deref(), Some("bob"));
}

#[test]
fn pointer_down_on_empty_canvas_clears_selection() {
    let mut engine = engine_with_rect();
    engine.on_pointer_down(Point::new(350.0, 140.0));
    engine.on_pointer_up(Point::new(350.0, 140.0));
    assert_eq!(engine.selection(), Some("obj-1"));

    let actions = engine.on_pointer_down(Point::new(10.0, 10.0));
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(engine.selection().is_none());
}

#[test]
fn only_one_gesture_at_a_time() {
    let mut engine = engine_with_rect();
    engine.on_pointer_down(Point::new(350.0, 140.0));

    let actions = engine.on_pointer_down(Point::new(350.0, 140.0));
    assert!(actions.is_empty());
}

// =============================================================
// Move gesture
// =============================================================

#[test]
fn move_applies_pointer_delta_to_origin() {
    let mut engine = engine_with_rect();
    engine.on_pointer_down(Point::new(350.0, 140.0));
    let actions = engine.on_pointer_move(Point::new(400.0, 120.0));

    let obj = engine.object("obj-1").unwrap();
    assert_eq!((obj.x, obj.y), (350.0, 80.0));

    // Every recomputation broadcasts the full set, not a diff.
    let objects = last_board_update(&actions);
    assert_eq!(objects.len(), 1);
    assert_eq!((objects[0].x, objects[0].y), (350.0, 80.0));
}

#[test]
fn move_is_clamped_to_canvas() {
    let mut engine = engine_with_rect();
    engine.on_pointer_down(Point::new(350.0, 140.0));
    engine.on_pointer_move(Point::new(-5000.0, 9000.0));

    let obj = engine.object("obj-1").unwrap();
    assert_eq!(obj.x, 0.0);
    assert_eq!(obj.y, 900.0 - 80.0);
    assert!(obj.within_canvas());
}

#[test]
fn drag_commit_produces_final_update_persist_and_blur() {
    let mut engine = engine_with_rect();
    engine.on_pointer_down(Point::new(350.0, 140.0));
    engine.on_pointer_move(Point::new(400.0, 120.0));
    let actions = engine.on_pointer_up(Point::new(400.0, 120.0));

    assert_eq!(broadcast_kinds(&actions), ["boardUpdate", "objectBlur"]);
    assert!(actions.contains(&Action::Persist));

    // Final geometry per the end-to-end scenario: (350, 80, 100, 80, 0°).
    let objects = last_board_update(&actions);
    assert_eq!(
        (objects[0].x, objects[0].y, objects[0].width, objects[0].height, objects[0].rotation),
        (350.0, 80.0, 100.0, 80.0, 0.0)
    );
    // The final update still carries the lock; locally it is cleared.
    assert_eq!(objects[0].locked_by.as_deref(), Some("alice"));
    assert!(engine.object("obj-1").unwrap().locked_by.is_none());
    assert!(engine.input().is_idle());
}

#[test]
fn pointer_up_without_gesture_is_a_no_op() {
    let mut engine = engine_with_rect();
    assert!(engine.on_pointer_up(Point::new(0.0, 0.0)).is_empty());
}

// =============================================================
// Resize gesture
// =============================================================

fn select_rect(engine: &mut EngineCore) {
    engine.on_pointer_down(Point::new(350.0, 140.0));
    engine.on_pointer_up(Point::new(350.0, 140.0));
}

#[test]
fn resize_from_corner_handle() {
    let mut engine = engine_with_rect();
    select_rect(&mut engine);

    let actions = engine.on_pointer_down(Point::new(400.0, 180.0));
    assert_eq!(broadcast_kinds(&actions), ["objectFocus"]);
    assert!(matches!(engine.input(), InputState::Resizing { origin_w, origin_h, .. }
        if *origin_w == 100.0 && *origin_h == 80.0));

    engine.on_pointer_move(Point::new(430.0, 190.0));
    let obj = engine.object("obj-1").unwrap();
    assert_eq!((obj.width, obj.height), (130.0, 90.0));
    // Position is untouched by resize.
    assert_eq!((obj.x, obj.y), (300.0, 100.0));
}

#[test]
fn resize_never_shrinks_below_minimum() {
    let mut engine = engine_with_rect();
    select_rect(&mut engine);
    engine.on_pointer_down(Point::new(400.0, 180.0));
    engine.on_pointer_move(Point::new(-2000.0, -2000.0));

    let obj = engine.object("obj-1").unwrap();
    assert_eq!((obj.width, obj.height), (20.0, 20.0));
}

#[test]
fn image_resize_preserves_aspect_ratio_across_gesture() {
    let mut engine = EngineCore::new("alice");
    let mut image = crate::object::BoardObject::image();
    image.id = "img-1".into();
    engine.load_snapshot(vec![image]);

    // Select, then grab the corner handle at (400, 350).
    engine.on_pointer_down(Point::new(300.0, 275.0));
    engine.on_pointer_up(Point::new(300.0, 275.0));
    engine.on_pointer_down(Point::new(400.0, 350.0));

    let aspect = 200.0 / 150.0;
    for step in 1..=10 {
        let dx = f64::from(step) * 17.0;
        engine.on_pointer_move(Point::new(400.0 + dx, 350.0));
        let obj = engine.object("img-1").unwrap();
        assert!(
            (obj.width / obj.height - aspect).abs() < 1e-9,
            "aspect broken at step {step}"
        );
        assert!(obj.within_canvas());
    }
}

// =============================================================
// Rotate gesture
// =============================================================

#[test]
fn rotate_from_handle_follows_pointer_bearing() {
    let mut engine = engine_with_rect();
    select_rect(&mut engine);

    // Rotate handle floats 16 units above the top edge at center x.
    let actions = engine.on_pointer_down(Point::new(350.0, 84.0));
    assert_eq!(broadcast_kinds(&actions), ["objectFocus"]);
    assert!(matches!(engine.input(), InputState::Rotating { origin_rotation, .. }
        if *origin_rotation == 0.0));

    // Pointer straight below the center: atan2 yields 90° from a 0° origin.
    engine.on_pointer_move(Point::new(350.0, 240.0));
    assert_eq!(engine.object("obj-1").unwrap().rotation, 90.0);

    let actions = engine.on_pointer_up(Point::new(350.0, 240.0));
    assert_eq!(broadcast_kinds(&actions), ["boardUpdate", "objectBlur"]);
    assert_eq!(engine.object("obj-1").unwrap().rotation, 90.0);
}

#[test]
fn rotation_stays_in_range_for_any_pointer_path() {
    let mut engine = engine_with_rect();
    select_rect(&mut engine);
    engine.on_pointer_down(Point::new(350.0, 84.0));

    let mut angle: f64 = 0.0;
    while angle < 360.0 {
        let (dx, dy) = angle.to_radians().sin_cos();
        engine.on_pointer_move(Point::new(350.0 + 200.0 * dx, 140.0 + 200.0 * dy));
        let rotation = engine.object("obj-1").unwrap().rotation;
        assert!((0.0..360.0).contains(&rotation));
        angle += 37.0;
    }
}

// =============================================================
// Add object / text edit
// =============================================================

#[test]
fn add_object_appends_defaults_and_persists() {
    let mut engine = engine_with_rect();
    let actions = engine.add_object(Tool::Circle);

    assert_eq!(engine.objects().len(), 2);
    let added = engine.objects().last().unwrap();
    assert_eq!(added.kind.name(), "circle");
    assert_eq!((added.x, added.y, added.width, added.height), (400.0, 200.0, 80.0, 80.0));

    assert_eq!(broadcast_kinds(&actions), ["boardUpdate"]);
    assert!(actions.contains(&Action::Persist));
}

#[test]
fn added_objects_keep_insertion_order() {
    let mut engine = EngineCore::new("alice");
    engine.add_object(Tool::Text);
    engine.add_object(Tool::Line);
    engine.add_object(Tool::Rectangle);

    let kinds: Vec<&str> = engine.objects().iter().map(|o| o.kind.name()).collect();
    assert_eq!(kinds, ["text", "line", "rectangle"]);
}

#[test]
fn edit_text_replaces_content_and_persists() {
    let mut engine = EngineCore::new("alice");
    let mut text = crate::object::BoardObject::text();
    text.id = "txt-1".into();
    engine.load_snapshot(vec![text]);

    let actions = engine.edit_text("txt-1", "hello board");
    assert_eq!(broadcast_kinds(&actions), ["boardUpdate"]);
    assert!(actions.contains(&Action::Persist));
    assert_eq!(
        engine.object("txt-1").unwrap().kind,
        ObjectKind::Text { content: "hello board".into() }
    );
}

#[test]
fn edit_text_refuses_locked_and_non_text_objects() {
    let mut engine = EngineCore::new("alice");
    let mut text = crate::object::BoardObject::text();
    text.id = "txt-1".into();
    text.locked_by = Some("bob".into());
    engine.load_snapshot(vec![text, dummy_rectangle("obj-1")]);

    assert!(engine.edit_text("txt-1", "nope").is_empty());
    assert!(engine.edit_text("obj-1", "nope").is_empty());
    assert!(engine.edit_text("ghost", "nope").is_empty());
}

#[test]
fn editable_text_at_finds_only_unlocked_text() {
    let mut engine = EngineCore::new("alice");
    let mut text = crate::object::BoardObject::text();
    text.id = "txt-1".into();
    engine.load_snapshot(vec![text, dummy_rectangle("obj-1")]);

    // Text defaults span (100,100)..(220,130).
    assert_eq!(engine.editable_text_at(Point::new(110.0, 110.0)).unwrap().id, "txt-1");
    assert!(engine.editable_text_at(Point::new(350.0, 140.0)).is_none());

    engine.apply_focus("txt-1", "bob");
    assert!(engine.editable_text_at(Point::new(110.0, 110.0)).is_none());
}

// =============================================================
// Remote application
// =============================================================

#[test]
fn remote_update_replaces_replica() {
    let mut engine = engine_with_rect();
    let mut moved = dummy_rectangle("obj-1");
    moved.x = 700.0;
    engine.apply_board_update(vec![moved]);
    assert_eq!(engine.object("obj-1").unwrap().x, 700.0);
}

#[test]
fn remote_update_drops_selection_of_vanished_object() {
    let mut engine = engine_with_rect();
    select_rect(&mut engine);
    assert_eq!(engine.selection(), Some("obj-1"));

    engine.apply_board_update(vec![dummy_rectangle("other")]);
    assert!(engine.selection().is_none());
}

#[test]
fn remote_focus_and_blur_toggle_lock() {
    let mut engine = engine_with_rect();
    engine.apply_focus("obj-1", "bob");
    assert_eq!(engine.object("obj-1").unwrap().locked_by.as_deref(), Some("bob"));

    engine.apply_blur("obj-1");
    assert!(engine.object("obj-1").unwrap().locked_by.is_none());
}

#[test]
fn focus_then_blur_restores_unlocked_state() {
    let mut engine = engine_with_rect();
    let before = engine.object("obj-1").unwrap().locked_by.clone();
    engine.apply_focus("obj-1", "bob");
    engine.apply_blur("obj-1");
    assert_eq!(engine.object("obj-1").unwrap().locked_by, before);
}

// =============================================================
// Invariants
// =============================================================

#[test]
fn bounds_invariant_holds_across_mixed_gestures() {
    let mut engine = engine_with_rect();

    let pointer_path = [
        (350.0, 140.0),
        (1800.0, -300.0),
        (-200.0, 1000.0),
        (900.0, 450.0),
    ];
    for (px, py) in pointer_path {
        engine.on_pointer_down(Point::new(350.0, 140.0));
        engine.on_pointer_move(Point::new(px, py));
        engine.on_pointer_up(Point::new(px, py));
        for obj in engine.objects() {
            assert!(obj.within_canvas(), "object escaped canvas after move to ({px},{py})");
        }
        // Drag the object back to a known spot for the next round.
        let (ox, oy, ow, oh) = {
            let obj = engine.object("obj-1").unwrap();
            (obj.x, obj.y, obj.width, obj.height)
        };
        let (cx, cy) = (ox + ow / 2.0, oy + oh / 2.0);
        engine.on_pointer_down(Point::new(cx, cy));
        engine.on_pointer_move(Point::new(cx + (300.0 - ox), cy + (100.0 - oy)));
        engine.on_pointer_up(Point::new(0.0, 0.0));
    }
}
