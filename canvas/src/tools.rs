//! Tool handlers: one strategy per [`Tool`], looked up through [`handler_for`].
//!
//! DESIGN
//! ======
//! Each handler exposes the three pointer entry points and works on a
//! [`ToolCx`]: mutable borrows of the engine state plus the list of
//! [`Action`]s the host must carry out. Handlers never talk to the stores
//! directly; every durable or ephemeral write leaves as an action.
//!
//! The gesture plumbing shared by the editing tools (begin, drive, finish,
//! cancel, lock results) lives on `ToolCx`, so a handler only decides *what*
//! to start on pointer-down. Middle-button drags pan under any tool; the
//! engine routes those to [`PanTool`].
//!
//! Lock protocol
//! -------------
//! Pointer-down requests a lock for every target that is editable by this
//! client; targets locked by someone else are excluded. The overlay follows
//! the pointer straight away, but frames are only streamed for targets whose
//! lock is granted. A target still pending at pointer-up has its commit
//! parked in `deferred` and sent (or dropped) when the answer arrives.

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;

use std::collections::HashMap;

use uuid::Uuid;

use crate::camera::{Point, Viewport};
use crate::config::EngineConfig;
use crate::consts::{DEFAULT_FONT_SIZE, DEFAULT_TEXT, STAR_INNER_RATIO, STAR_POINTS};
use crate::doc::{
    CanvasId, ClientId, DocStore, Geometry, Shape, ShapeDraft, ShapeId, ShapeKind, ShapePatch, Style, TransientPosition,
};
use crate::engine::{Action, Deferred, PendingUpdate};
use crate::geometry::{Handle, Rect, clip_rect, nearest_handle};
use crate::hit::{Hit, HitPart, hit_test, shapes_in_rect};
use crate::input::{InputState, PointerEvent, Tool, UiState};
use crate::lock::{LockState, is_editable, lock_state};
use crate::session::{GestureKind, GesturePhase, InteractionSession, SessionTarget, TargetLock, union_bounds};

/// Pointer entry points for one tool.
///
/// The default `move` / `up` handlers only drive an edit gesture; tools with
/// their own input states override them.
pub trait ToolHandler: Sync {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>);

    fn on_pointer_move(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        cx.drive_gesture(world);
    }

    fn on_pointer_up(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        cx.finish_gesture(world);
    }
}

pub struct PanTool;
pub struct SelectTool;
pub struct MoveTool;
pub struct ResizeTool;
pub struct RotateTool;
pub struct CreateTool(pub ShapeKind);
pub struct DeleteTool;

static PAN: PanTool = PanTool;
static SELECT: SelectTool = SelectTool;
static MOVE: MoveTool = MoveTool;
static RESIZE: ResizeTool = ResizeTool;
static ROTATE: RotateTool = RotateTool;
static CREATE_RECTANGLE: CreateTool = CreateTool(ShapeKind::Rectangle);
static CREATE_CIRCLE: CreateTool = CreateTool(ShapeKind::Circle);
static CREATE_STAR: CreateTool = CreateTool(ShapeKind::Star);
static CREATE_TEXT: CreateTool = CreateTool(ShapeKind::Text);
static DELETE: DeleteTool = DeleteTool;

/// The handler implementing `tool`.
#[must_use]
pub fn handler_for(tool: Tool) -> &'static dyn ToolHandler {
    match tool {
        Tool::Pan => &PAN,
        Tool::Select => &SELECT,
        Tool::Move => &MOVE,
        Tool::Resize => &RESIZE,
        Tool::Rotate => &ROTATE,
        Tool::CreateRectangle => &CREATE_RECTANGLE,
        Tool::CreateCircle => &CREATE_CIRCLE,
        Tool::CreateStar => &CREATE_STAR,
        Tool::CreateText => &CREATE_TEXT,
        Tool::Delete => &DELETE,
    }
}

// =============================================================
// Context
// =============================================================

/// The slice of engine state a handler may touch, plus collected actions.
pub struct ToolCx<'a> {
    pub client_id: ClientId,
    pub canvas_id: CanvasId,
    pub now_ms: u64,
    pub config: &'a EngineConfig,
    pub doc: &'a mut DocStore,
    pub viewport: &'a mut Viewport,
    pub ui: &'a mut UiState,
    pub input: &'a mut InputState,
    pub overlay: &'a mut HashMap<ShapeId, Shape>,
    pub deferred: &'a mut HashMap<ShapeId, Deferred>,
    pub pending_creates: &'a mut HashMap<ShapeId, Shape>,
    pub pending_updates: &'a mut HashMap<ShapeId, PendingUpdate>,
    pub actions: Vec<Action>,
}

impl ToolCx<'_> {
    #[must_use]
    pub fn world(&self, event: &PointerEvent) -> Point {
        self.viewport.screen_to_world(event.screen)
    }

    #[must_use]
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn emit(&mut self, action: Action) {
        self.actions.push(action);
    }

    fn hit(&self, world: Point) -> Option<Hit> {
        hit_test(world, self.doc, self.viewport, self.ui.single_selection())
    }

    fn editable(&self, shape: &Shape) -> bool {
        is_editable(shape.owner_lock.as_ref(), self.client_id, self.now_ms, self.config.stale_lock_ms)
    }

    // --- Selection ---

    /// Replace the selection and give up locks that no longer cover it.
    pub fn set_selection(&mut self, ids: Vec<ShapeId>) {
        self.ui.selection = ids;
        self.release_unselected();
        self.emit(Action::RenderNeeded);
    }

    /// Select `id` alone unless it is already part of the selection.
    fn select_for_edit(&mut self, id: ShapeId) {
        if !self.ui.is_selected(&id) {
            self.set_selection(vec![id]);
        }
    }

    /// Release held locks on shapes that are neither selected, in the
    /// current gesture, nor waiting on a deferred commit.
    pub fn release_unselected(&mut self) {
        let in_gesture = self.input.session().map(InteractionSession::ids).unwrap_or_default();
        let released: Vec<ShapeId> = self
            .ui
            .held_locks
            .iter()
            .copied()
            .filter(|id| !self.ui.is_selected(id) && !in_gesture.contains(id) && !self.deferred.contains_key(id))
            .collect();
        for id in released {
            self.release(id);
        }
    }

    fn release(&mut self, id: ShapeId) {
        self.ui.held_locks.remove(&id);
        if self.ui.retained_lock == Some(id) {
            self.ui.retained_lock = None;
        }
        self.emit(Action::ReleaseLock { id });
    }

    /// Release now if held; otherwise release once the pending acquire answers.
    fn release_or_defer(&mut self, id: ShapeId) {
        if self.ui.held_locks.contains(&id) {
            self.release(id);
        } else {
            self.deferred.insert(id, Deferred::Release);
        }
    }

    // --- Gestures ---

    /// Open an edit gesture over `ids`. Returns false (and leaves the input
    /// idle) when every target is locked by someone else.
    pub fn begin_gesture(&mut self, kind: GestureKind, ids: &[ShapeId], origin: Point) -> bool {
        let mut targets = Vec::with_capacity(ids.len());
        let mut excluded = Vec::new();
        for id in ids {
            let Some(shape) = self.doc.get(id) else {
                continue;
            };
            if !self.editable(shape) {
                excluded.push(*id);
                continue;
            }
            let lock = if self.ui.held_locks.contains(id) { TargetLock::Granted } else { TargetLock::Pending };
            targets.push(SessionTarget::new(shape.clone(), lock));
        }

        if !excluded.is_empty() {
            tracing::debug!(count = excluded.len(), "skipping shapes locked by another client");
            self.ui.locked_by_other.extend(excluded.iter().copied());
            for id in &excluded {
                self.ui.deselect(id);
            }
        }
        if targets.is_empty() {
            self.emit(Action::RenderNeeded);
            return false;
        }

        for target in &targets {
            self.actions.push(Action::AcquireLock { id: target.id });
        }
        *self.input = InputState::Gesture(InteractionSession::new(kind, origin, targets, excluded, self.config));
        self.release_unselected();
        self.emit(Action::RenderNeeded);
        true
    }

    fn take_session(&mut self) -> Option<InteractionSession> {
        match std::mem::take(self.input) {
            InputState::Gesture(session) => Some(session),
            other => {
                *self.input = other;
                None
            }
        }
    }

    /// Recompute the gesture for a pointer at `pointer`: overlay every
    /// target, queue granted ones for broadcast, flush if allowed.
    pub fn drive_gesture(&mut self, pointer: Point) {
        let Some(mut session) = self.take_session() else {
            return;
        };
        if session.advance(pointer, self.config.drag_threshold) {
            let streams_size = session.streams_size();
            for shape in session.frame(pointer, self.config) {
                if session.target(&shape.id).is_some_and(SessionTarget::is_granted) {
                    session.throttle.enqueue(TransientPosition::of(&shape, self.client_id, streams_size));
                }
                self.overlay.insert(shape.id, shape);
            }
            self.flush_session(&mut session);
            self.emit(Action::RenderNeeded);
        }
        *self.input = InputState::Gesture(session);
    }

    /// Send whatever the throttle lets through right now.
    pub fn flush_transients(&mut self) {
        if let Some(mut session) = self.take_session() {
            self.flush_session(&mut session);
            *self.input = InputState::Gesture(session);
        }
    }

    fn flush_session(&mut self, session: &mut InteractionSession) {
        let flush = session.throttle.poll(self.now_ms);
        if !flush.sent.is_empty() {
            tracing::trace!(
                count = flush.sent.len(),
                queued = session.throttle.pending_len(),
                mode = ?session.throttle.mode(),
                "flushing transient positions"
            );
        }
        for position in flush.sent {
            session.published.insert(position.shape_id);
            self.actions.push(Action::PublishTransient(position));
        }
        if let Some(at_ms) = flush.schedule {
            self.actions.push(Action::ScheduleFlush { at_ms });
        }
    }

    /// Pointer-up: commit the final frame if the gesture became active,
    /// otherwise treat it as a click that keeps selection and locks.
    pub fn finish_gesture(&mut self, pointer: Point) {
        let Some(mut session) = self.take_session() else {
            return;
        };
        self.ui.locked_by_other.clear();

        if !session.advance(pointer, self.config.drag_threshold) {
            self.emit(Action::RenderNeeded);
            return;
        }

        let frame = session.frame(pointer, self.config);
        session.phase = GesturePhase::Committing;
        session.throttle.clear();
        let is_final = !session.retain_lock;

        for shape in frame {
            let id = shape.id;
            let patch = session.patch_for(&shape);
            if session.target(&id).is_some_and(SessionTarget::is_granted) {
                self.commit(id, patch, is_final);
            } else {
                self.overlay.insert(id, shape.clone());
                self.deferred.insert(id, Deferred::Update { shape, patch, is_final });
            }
            if session.published.contains(&id) {
                self.emit(Action::ClearTransient { id });
            }
        }
        tracing::debug!(count = session.targets.len(), kind = ?session.kind, "gesture committed");
        self.emit(Action::RenderNeeded);
    }

    /// Write a final geometry through the durable path and update the cache
    /// optimistically. The pre-commit shape is kept until the feed confirms
    /// the write so a failure can roll it back.
    fn commit(&mut self, id: ShapeId, patch: ShapePatch, is_final: bool) {
        if let Some(pending) = self.pending_updates.get_mut(&id) {
            pending.patch.merge(&patch);
        } else if let Some(original) = self.doc.get(&id).cloned() {
            self.pending_updates.insert(id, PendingUpdate { original, patch: patch.clone() });
        }
        self.doc.apply_patch(&id, &patch);
        self.overlay.remove(&id);
        if is_final {
            self.doc.set_lock(&id, None);
            self.ui.held_locks.remove(&id);
            if self.ui.retained_lock == Some(id) {
                self.ui.retained_lock = None;
            }
        } else {
            self.ui.held_locks.insert(id);
            self.ui.retained_lock = Some(id);
        }
        self.emit(Action::UpdateGeometry { id, patch, is_final });
    }

    /// Abort whatever the pointer is doing without committing. Gestures
    /// release their locks and clear any published transient entries.
    pub fn cancel_input(&mut self) {
        match std::mem::take(self.input) {
            InputState::Idle => return,
            InputState::Panning { .. } | InputState::Drawing { .. } => {}
            InputState::Marquee { .. } => self.ui.marquee = None,
            InputState::Deleting { id } => {
                if !self.ui.is_selected(&id) {
                    self.release_or_defer(id);
                }
            }
            InputState::Gesture(session) => {
                for target in &session.targets {
                    self.overlay.remove(&target.id);
                    if session.published.contains(&target.id) {
                        self.actions.push(Action::ClearTransient { id: target.id });
                    }
                    self.release_or_defer(target.id);
                }
                self.ui.locked_by_other.clear();
                tracing::debug!(count = session.targets.len(), "gesture cancelled");
            }
        }
        self.emit(Action::RenderNeeded);
    }

    // --- Lock results ---

    /// Route an acquire answer to whatever is waiting for it.
    pub fn lock_result(&mut self, id: ShapeId, granted: bool) {
        if let Some(mut session) = self.take_session() {
            let waiting = session.target(&id).is_some();
            if waiting {
                self.gesture_lock_result(&mut session, id, granted);
            }
            if session.is_empty() {
                self.ui.locked_by_other.clear();
                tracing::debug!("gesture aborted, no editable shapes left");
            } else {
                *self.input = InputState::Gesture(session);
            }
            if waiting {
                self.emit(Action::RenderNeeded);
                return;
            }
        }

        if let Some(deferred) = self.deferred.remove(&id) {
            match (deferred, granted) {
                (Deferred::Update { patch, is_final, .. }, true) => self.commit(id, patch, is_final),
                (Deferred::Update { .. }, false) => {
                    tracing::debug!(shape_id = %id, "lock denied after release, dropping edit");
                    self.overlay.remove(&id);
                    self.ui.deselect(&id);
                }
                (Deferred::Delete, true) => self.delete_now(id),
                (Deferred::Release, true) => self.release(id),
                (Deferred::Delete | Deferred::Release, false) => {}
            }
            self.emit(Action::RenderNeeded);
            return;
        }

        if matches!(self.input, InputState::Deleting { id: pending } if *pending == id) {
            if granted {
                self.ui.held_locks.insert(id);
            } else {
                *self.input = InputState::Idle;
            }
            return;
        }

        if granted {
            if self.ui.is_selected(&id) {
                self.ui.held_locks.insert(id);
            } else {
                self.release(id);
            }
        } else {
            self.ui.held_locks.remove(&id);
            self.ui.deselect(&id);
            self.emit(Action::RenderNeeded);
        }
    }

    fn gesture_lock_result(&mut self, session: &mut InteractionSession, id: ShapeId, granted: bool) {
        if !granted {
            tracing::debug!(shape_id = %id, "lock denied");
            self.drop_target(session, id, true);
            return;
        }
        if let Some(target) = session.target_mut(&id) {
            target.lock = TargetLock::Granted;
        }
        self.ui.held_locks.insert(id);
        if session.is_active() {
            let streams_size = session.streams_size();
            if let Some(shape) = self.overlay.get(&id) {
                session.throttle.enqueue(TransientPosition::of(shape, self.client_id, streams_size));
            }
            self.flush_session(session);
        }
    }

    /// Take a shape out of a gesture and discard its local state. With
    /// `locked` the shape is flagged as held by another client.
    pub fn drop_target(&mut self, session: &mut InteractionSession, id: ShapeId, locked: bool) {
        if session.remove_target(&id).is_none() {
            return;
        }
        self.overlay.remove(&id);
        if session.published.remove(&id) {
            self.emit(Action::ClearTransient { id });
        }
        self.ui.held_locks.remove(&id);
        if self.ui.retained_lock == Some(id) {
            self.ui.retained_lock = None;
        }
        if locked {
            self.ui.locked_by_other.insert(id);
        }
        self.ui.deselect(&id);
    }

    /// Drop shapes from the active gesture that vanished from the document
    /// or were taken over by another client.
    pub fn reconcile_gesture(&mut self) {
        let Some(mut session) = self.take_session() else {
            return;
        };
        for id in session.ids() {
            let state = self
                .doc
                .get(&id)
                .map(|shape| lock_state(shape.owner_lock.as_ref(), self.client_id, self.now_ms, self.config.stale_lock_ms));
            match state {
                None => self.drop_target(&mut session, id, false),
                Some(LockState::HeldByOther { holder_id }) => {
                    tracing::warn!(shape_id = %id, %holder_id, "lost ownership mid-gesture");
                    self.drop_target(&mut session, id, true);
                }
                Some(_) => {}
            }
        }
        if session.is_empty() {
            self.ui.locked_by_other.clear();
            self.emit(Action::RenderNeeded);
        } else {
            *self.input = InputState::Gesture(session);
        }
    }

    /// Drop every piece of local state about `id`: gesture target, parked
    /// work, overlay, held lock, an unconfirmed create, and an unconfirmed
    /// geometry commit (the shape goes back to its pre-commit state).
    pub fn forget(&mut self, id: ShapeId) {
        if let Some(mut session) = self.take_session() {
            self.drop_target(&mut session, id, false);
            if session.is_empty() {
                self.ui.locked_by_other.clear();
            } else {
                *self.input = InputState::Gesture(session);
            }
        }
        if matches!(self.input, InputState::Deleting { id: pending } if *pending == id) {
            *self.input = InputState::Idle;
        }
        self.deferred.remove(&id);
        self.overlay.remove(&id);
        self.ui.held_locks.remove(&id);
        if self.ui.retained_lock == Some(id) {
            self.ui.retained_lock = None;
        }
        if let Some(pending) = self.pending_updates.remove(&id) {
            tracing::debug!(shape_id = %id, "rolling back unconfirmed commit");
            self.doc.insert(pending.original);
        }
        if self.pending_creates.remove(&id).is_some() {
            self.doc.remove(&id);
            self.ui.deselect(&id);
        }
    }

    fn delete_now(&mut self, id: ShapeId) {
        self.doc.remove(&id);
        self.overlay.remove(&id);
        self.pending_creates.remove(&id);
        self.pending_updates.remove(&id);
        self.ui.held_locks.remove(&id);
        if self.ui.retained_lock == Some(id) {
            self.ui.retained_lock = None;
        }
        self.ui.deselect(&id);
        tracing::info!(shape_id = %id, "shape deleted");
        self.emit(Action::DeleteShape { id });
    }
}

// =============================================================
// Handlers
// =============================================================

impl ToolHandler for PanTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        *cx.input = InputState::Panning { last_screen: event.screen };
    }

    fn on_pointer_move(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        if let InputState::Panning { last_screen } = cx.input {
            cx.viewport.pan_by(event.screen.x - last_screen.x, event.screen.y - last_screen.y);
            *last_screen = event.screen;
            cx.emit(Action::RenderNeeded);
        }
    }

    fn on_pointer_up(&self, _event: &PointerEvent, cx: &mut ToolCx<'_>) {
        if matches!(cx.input, InputState::Panning { .. }) {
            *cx.input = InputState::Idle;
        }
    }
}

impl ToolHandler for SelectTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        let additive = event.modifiers.shift;
        match cx.hit(world) {
            Some(Hit { shape_id, part: HitPart::RotateHandle }) => start_rotate(cx, shape_id, world),
            Some(Hit { shape_id, part: HitPart::ResizeHandle(handle) }) => start_resize(cx, shape_id, handle, world),
            Some(Hit { shape_id, part: HitPart::Body }) if additive => {
                let mut selection = cx.ui.selection.clone();
                if cx.ui.is_selected(&shape_id) {
                    selection.retain(|id| *id != shape_id);
                } else {
                    selection.push(shape_id);
                }
                cx.set_selection(selection);
            }
            Some(Hit { shape_id, part: HitPart::Body }) => start_move(cx, shape_id, world),
            None => {
                if !additive {
                    cx.set_selection(Vec::new());
                }
                *cx.input = InputState::Marquee { origin: world, additive };
                cx.ui.marquee = Some(Rect::from_corners(world, world));
            }
        }
    }

    fn on_pointer_move(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        if let InputState::Marquee { origin, .. } = cx.input {
            cx.ui.marquee = Some(Rect::from_corners(*origin, world));
            cx.emit(Action::RenderNeeded);
        } else {
            cx.drive_gesture(world);
        }
    }

    fn on_pointer_up(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        let InputState::Marquee { origin, additive } = *cx.input else {
            cx.finish_gesture(world);
            return;
        };
        *cx.input = InputState::Idle;
        cx.ui.marquee = None;
        let picked = shapes_in_rect(cx.doc, &Rect::from_corners(origin, world));
        let mut selection = if additive { cx.ui.selection.clone() } else { Vec::new() };
        for id in picked {
            if !selection.contains(&id) {
                selection.push(id);
            }
        }
        cx.set_selection(selection);
    }
}

impl ToolHandler for MoveTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        match cx.hit(world) {
            Some(hit) => start_move(cx, hit.shape_id, world),
            None => cx.set_selection(Vec::new()),
        }
    }
}

impl ToolHandler for ResizeTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        match cx.hit(world) {
            Some(Hit { shape_id, part: HitPart::ResizeHandle(handle) }) => start_resize(cx, shape_id, handle, world),
            Some(Hit { shape_id, .. }) => {
                let Some(bounds) = cx.doc.get(&shape_id).map(Shape::bounds) else {
                    return;
                };
                start_resize(cx, shape_id, nearest_handle(&bounds, world), world);
            }
            None => cx.set_selection(Vec::new()),
        }
    }
}

impl ToolHandler for RotateTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        match cx.hit(world) {
            Some(hit) => start_rotate(cx, hit.shape_id, world),
            None => cx.set_selection(Vec::new()),
        }
    }
}

impl ToolHandler for CreateTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        *cx.input = InputState::Drawing { kind: self.0, anchor: world, current: world };
    }

    fn on_pointer_move(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        if let InputState::Drawing { current, .. } = cx.input {
            *current = world;
            cx.emit(Action::RenderNeeded);
        }
    }

    fn on_pointer_up(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        let InputState::Drawing { kind, anchor, .. } = *cx.input else {
            return;
        };
        *cx.input = InputState::Idle;

        let rect = clip_rect(Rect::from_corners(anchor, world), cx.config.canvas_width, cx.config.canvas_height);
        if rect.width < cx.config.min_create_width || rect.height < cx.config.min_create_height {
            tracing::debug!(width = rect.width, height = rect.height, "discarding undersized draft");
            cx.emit(Action::RenderNeeded);
            return;
        }

        let draft = new_draft(kind, rect, cx.canvas_id, cx.doc.next_z_index(), Uuid::new_v4());
        let shape = draft.clone().into_shape();
        let id = shape.id;
        cx.doc.insert(shape.clone());
        cx.pending_creates.insert(id, shape);
        tracing::info!(shape_id = %id, ?kind, "shape created");
        cx.emit(Action::CreateShape(draft));
        cx.set_selection(vec![id]);
        cx.ui.tool = Tool::Select;
        cx.emit(Action::ToolChanged(Tool::Select));
    }
}

impl ToolHandler for DeleteTool {
    fn on_pointer_down(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let world = cx.world(event);
        let Some(hit) = cx.hit(world) else {
            return;
        };
        let Some(shape) = cx.doc.get(&hit.shape_id) else {
            return;
        };
        if !cx.editable(shape) {
            tracing::debug!(shape_id = %hit.shape_id, "delete refused, shape locked by another client");
            return;
        }
        cx.emit(Action::AcquireLock { id: hit.shape_id });
        *cx.input = InputState::Deleting { id: hit.shape_id };
    }

    fn on_pointer_move(&self, _event: &PointerEvent, _cx: &mut ToolCx<'_>) {}

    fn on_pointer_up(&self, event: &PointerEvent, cx: &mut ToolCx<'_>) {
        let InputState::Deleting { id } = *cx.input else {
            return;
        };
        let world = cx.world(event);
        let still_over = cx.hit(world).is_some_and(|hit| hit.shape_id == id);
        if !still_over {
            cx.cancel_input();
            return;
        }
        *cx.input = InputState::Idle;
        if cx.ui.held_locks.contains(&id) {
            cx.delete_now(id);
        } else {
            cx.deferred.insert(id, Deferred::Delete);
        }
        cx.emit(Action::RenderNeeded);
    }
}

// =============================================================
// Gesture starters
// =============================================================

fn start_move(cx: &mut ToolCx<'_>, id: ShapeId, world: Point) {
    cx.select_for_edit(id);
    let ids = cx.ui.selection.clone();
    cx.begin_gesture(GestureKind::Move, &ids, world);
}

fn start_resize(cx: &mut ToolCx<'_>, id: ShapeId, handle: Handle, world: Point) {
    let Some(bounds) = cx.doc.get(&id).map(Shape::bounds) else {
        return;
    };
    cx.set_selection(vec![id]);
    cx.begin_gesture(GestureKind::resize(bounds, handle), &[id], world);
}

fn start_rotate(cx: &mut ToolCx<'_>, id: ShapeId, world: Point) {
    cx.select_for_edit(id);
    let ids = cx.ui.selection.clone();
    let Some(union) = union_bounds(ids.iter().filter_map(|id| cx.doc.get(id))) else {
        return;
    };
    cx.begin_gesture(GestureKind::rotate(union.center(), world), &ids, world);
}

// =============================================================
// Drafts
// =============================================================

/// Build the draft a creation tool commits for a dragged box.
///
/// Rectangles and text fill the box; circles and stars sit centered in it
/// with half the shorter side as their (outer) radius.
#[must_use]
pub fn new_draft(kind: ShapeKind, rect: Rect, canvas_id: CanvasId, z_index: i64, id: ShapeId) -> ShapeDraft {
    let center = rect.center();
    let radius = rect.width.min(rect.height) / 2.0;
    let (x, y, geometry) = match kind {
        ShapeKind::Rectangle => (rect.x, rect.y, Geometry::Rectangle { width: rect.width, height: rect.height }),
        ShapeKind::Circle => (center.x, center.y, Geometry::Circle { radius }),
        ShapeKind::Star => (
            center.x,
            center.y,
            Geometry::Star { inner_radius: radius * STAR_INNER_RATIO, outer_radius: radius, num_points: STAR_POINTS },
        ),
        ShapeKind::Text => (
            rect.x,
            rect.y,
            Geometry::Text {
                text: DEFAULT_TEXT.to_string(),
                font_size: DEFAULT_FONT_SIZE,
                width: rect.width,
                height: rect.height,
            },
        ),
    };
    ShapeDraft { id, canvas_id, x, y, geometry, style: Style::default(), z_index }
}
