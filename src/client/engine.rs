//! Interaction engine: the client-side replica and gesture lifecycle.
//!
//! DESIGN
//! ======
//! `EngineCore` owns the local Board State replica and the interaction state
//! machine. Pointer handlers mutate the replica optimistically and return
//! [`Action`]s; the session layer owns all outbound concerns — the live
//! channel and the durable store. The engine is headless and runs the same
//! way under tests as under a real host.
//!
//! Locking is cooperative here: a pointer-down on an object locked by another
//! user starts nothing and emits nothing. The server additionally arbitrates
//! every focus before relaying it, so a stale local view cannot steal a lock.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use crate::client::hit::{HitPart, hit_test};
use crate::client::input::{InputState, Point, Tool};
use crate::client::transform;
use crate::message::Body;
use crate::object::{BoardObject, ObjectId, ObjectKind};

/// Outbound work returned from engine handlers for the session to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a message to board peers over the live channel.
    Broadcast(Body),
    /// Persist the full object set to the durable store.
    Persist,
    /// The scene changed; the host should repaint.
    RenderNeeded,
}

/// The client-side core: local replica, selection, and the gesture machine.
pub struct EngineCore {
    user_id: String,
    objects: Vec<BoardObject>,
    selected: Option<ObjectId>,
    input: InputState,
}

impl EngineCore {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            objects: Vec::new(),
            selected: None,
            input: InputState::Idle,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The local replica in display order.
    #[must_use]
    pub fn objects(&self) -> &[BoardObject] {
        &self.objects
    }

    /// The currently selected object, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The active gesture state.
    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Look up an object by id.
    #[must_use]
    pub fn object(&self, id: &str) -> Option<&BoardObject> {
        self.objects.iter().find(|obj| obj.id == id)
    }

    /// The unlocked text object under `point`, if any — the target of a
    /// double-click content edit.
    #[must_use]
    pub fn editable_text_at(&self, point: Point) -> Option<&BoardObject> {
        let hit = hit_test(point, &self.objects, self.selected.as_deref())?;
        if hit.part != HitPart::Body {
            return None;
        }
        let obj = self.object(&hit.object_id)?;
        if obj.locked_by.is_some() || !matches!(obj.kind, ObjectKind::Text { .. }) {
            return None;
        }
        Some(obj)
    }

    // --- Data inputs ---

    /// Hydrate the replica from an at-rest snapshot.
    pub fn load_snapshot(&mut self, objects: Vec<BoardObject>) {
        self.objects = objects;
        self.selected = None;
        self.input = InputState::Idle;
    }

    /// Apply a peer's full-set update. Last write wins, no merge; a remote
    /// update may clobber an in-flight local gesture, in which case the next
    /// pointer-move re-emits from the local origin snapshot.
    pub fn apply_board_update(&mut self, objects: Vec<BoardObject>) {
        self.objects = objects;
        if let Some(selected) = &self.selected {
            if !self.objects.iter().any(|obj| &obj.id == selected) {
                self.selected = None;
            }
        }
    }

    /// Apply a peer's focus: mark the object locked by that user.
    pub fn apply_focus(&mut self, object_id: &str, user_id: &str) {
        if let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == object_id) {
            obj.locked_by = Some(user_id.to_owned());
        }
    }

    /// Apply a peer's blur: clear the object's lock.
    pub fn apply_blur(&mut self, object_id: &str) {
        if let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == object_id) {
            obj.locked_by = None;
        }
    }

    // --- Pointer gestures ---

    /// Pointer-down: begin a gesture, or change/clear the selection.
    pub fn on_pointer_down(&mut self, point: Point) -> Vec<Action> {
        if !self.input.is_idle() {
            return Vec::new();
        }

        let Some(hit) = hit_test(point, &self.objects, self.selected.as_deref()) else {
            if self.selected.take().is_some() {
                return vec![Action::RenderNeeded];
            }
            return Vec::new();
        };

        match hit.part {
            HitPart::Body => self.begin_move(hit.object_id, point),
            HitPart::ResizeHandle => self.begin_resize(hit.object_id, point),
            HitPart::RotateHandle => self.begin_rotate(hit.object_id),
        }
    }

    /// Pointer-move: recompute the dragged object's geometry from the origin
    /// snapshot and broadcast the full object set.
    pub fn on_pointer_move(&mut self, point: Point) -> Vec<Action> {
        match self.input.clone() {
            InputState::Idle => Vec::new(),
            InputState::Moving { id, start, origin_x, origin_y } => {
                let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == id) else {
                    return Vec::new();
                };
                let (x, y) = transform::move_position(
                    origin_x,
                    origin_y,
                    point.x - start.x,
                    point.y - start.y,
                    obj.width,
                    obj.height,
                );
                obj.x = x;
                obj.y = y;
                self.emit_update()
            }
            InputState::Resizing { id, start, origin_w, origin_h } => {
                let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == id) else {
                    return Vec::new();
                };
                let keep_aspect = obj.kind.keeps_aspect();
                let (width, height) = transform::resize_dimensions(
                    origin_w,
                    origin_h,
                    point.x - start.x,
                    point.y - start.y,
                    obj.x,
                    obj.y,
                    keep_aspect,
                );
                obj.width = width;
                obj.height = height;
                self.emit_update()
            }
            InputState::Rotating { id, center, origin_rotation } => {
                let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == id) else {
                    return Vec::new();
                };
                obj.rotation = transform::rotate_angle(point, center, origin_rotation);
                self.emit_update()
            }
        }
    }

    /// Pointer-up: commit the gesture. Broadcast the final geometry, persist
    /// the full set, release the lock, and return to idle. Releasing the
    /// pointer always commits; there is no mid-drag cancel.
    pub fn on_pointer_up(&mut self, _point: Point) -> Vec<Action> {
        let state = std::mem::take(&mut self.input);
        let Some(id) = state.dragged_object().map(str::to_owned) else {
            return Vec::new();
        };

        // The final update still carries this user's lock; the blur that
        // follows it clears the lock at every peer. Locally the lock comes
        // off before the persist snapshot so at-rest state never records it.
        let final_update = self.full_update();
        if let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == id) {
            if obj.locked_by.as_deref() == Some(self.user_id.as_str()) {
                obj.locked_by = None;
            }
        }

        vec![
            Action::Broadcast(final_update),
            Action::Persist,
            Action::Broadcast(Body::ObjectBlur { object_id: id }),
            Action::RenderNeeded,
        ]
    }

    // --- Direct mutations ---

    /// Append a new object with kind-specific defaults.
    pub fn add_object(&mut self, tool: Tool) -> Vec<Action> {
        let obj = match tool {
            Tool::Text => BoardObject::text(),
            Tool::Image => BoardObject::image(),
            Tool::Rectangle => BoardObject::rectangle(),
            Tool::Circle => BoardObject::circle(),
            Tool::Line => BoardObject::line(),
        };
        self.objects.push(obj);
        vec![Action::Broadcast(self.full_update()), Action::Persist, Action::RenderNeeded]
    }

    /// Replace a text object's content. No-op on locked or non-text objects.
    pub fn edit_text(&mut self, id: &str, content: impl Into<String>) -> Vec<Action> {
        let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == id) else {
            return Vec::new();
        };
        if obj.locked_by.is_some() {
            return Vec::new();
        }
        let ObjectKind::Text { content: current } = &mut obj.kind else {
            return Vec::new();
        };
        *current = content.into();

        vec![Action::Broadcast(self.full_update()), Action::Persist, Action::RenderNeeded]
    }

    // --- Gesture starts ---

    fn begin_move(&mut self, id: ObjectId, point: Point) -> Vec<Action> {
        let Some((origin_x, origin_y)) = self
            .object(&id)
            // Locked by another user: the interaction is simply not started.
            .filter(|obj| obj.locked_by.is_none())
            .map(|obj| (obj.x, obj.y))
        else {
            return Vec::new();
        };
        self.input = InputState::Moving { id: id.clone(), start: point, origin_x, origin_y };
        self.take_focus(id)
    }

    fn begin_resize(&mut self, id: ObjectId, point: Point) -> Vec<Action> {
        let Some((origin_w, origin_h)) = self
            .object(&id)
            .filter(|obj| obj.locked_by.is_none())
            .map(|obj| (obj.width, obj.height))
        else {
            return Vec::new();
        };
        self.input = InputState::Resizing { id: id.clone(), start: point, origin_w, origin_h };
        self.take_focus(id)
    }

    fn begin_rotate(&mut self, id: ObjectId) -> Vec<Action> {
        let Some((center, origin_rotation)) = self
            .object(&id)
            .filter(|obj| obj.locked_by.is_none())
            .map(|obj| {
                let (center_x, center_y) = obj.center();
                (Point::new(center_x, center_y), obj.rotation)
            })
        else {
            return Vec::new();
        };
        self.input = InputState::Rotating { id: id.clone(), center, origin_rotation };
        self.take_focus(id)
    }

    /// Select the object, lock it locally, and announce the focus.
    fn take_focus(&mut self, id: ObjectId) -> Vec<Action> {
        self.selected = Some(id.clone());
        let user_id = self.user_id.clone();
        if let Some(obj) = self.objects.iter_mut().find(|obj| obj.id == id) {
            obj.locked_by = Some(user_id);
        }
        vec![Action::Broadcast(Body::ObjectFocus { object_id: id }), Action::RenderNeeded]
    }

    fn full_update(&self) -> Body {
        Body::BoardUpdate { objects: self.objects.clone(), revision: None }
    }

    fn emit_update(&self) -> Vec<Action> {
        vec![Action::Broadcast(self.full_update()), Action::RenderNeeded]
    }
}
