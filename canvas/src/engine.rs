//! Engine: the single entry point the host drives.
//!
//! `EngineCore` owns the shape cache, the viewport, UI and input state, the
//! local overlay and the latest remote transient map. Every input (pointer
//! events, timer ticks, lock answers, feed snapshots) returns a list of
//! [`Action`]s for the host to carry out against the sync facade. Nothing in
//! here blocks, reads a clock, or performs I/O; callers pass `now_ms`.
//!
//! Merge rule for [`EngineCore::visible_shapes`]: local overlay beats a
//! remote transient, which beats the durable value. A remote transient only
//! counts when its sender currently holds a live lock on the shape.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::camera::{Point, Viewport};
use crate::config::EngineConfig;
use crate::consts::WHEEL_ZOOM_STEP;
use crate::doc::{CanvasId, ClientId, DocStore, Shape, ShapeDraft, ShapeId, ShapePatch, TransientPosition};
use crate::geometry::{Rect, clip_rect};
use crate::input::{Button, InputState, Modifiers, PointerEvent, Tool, UiState, WheelDelta};
use crate::lock::{LockState, is_editable, is_stale, lock_state};
use crate::session::InteractionSession;
use crate::tools::{ToolCx, ToolHandler, handler_for, new_draft};

/// Side-effect intents returned from engine inputs for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Action {
    /// Durable create.
    CreateShape(ShapeDraft),
    /// Durable update. `is_final` also clears the lock.
    UpdateGeometry { id: ShapeId, patch: ShapePatch, is_final: bool },
    /// Durable delete.
    DeleteShape { id: ShapeId },
    AcquireLock { id: ShapeId },
    ReleaseLock { id: ShapeId },
    /// Ephemeral in-progress frame.
    PublishTransient(TransientPosition),
    ClearTransient { id: ShapeId },
    /// Call [`EngineCore::on_flush_timer`] at this time.
    ScheduleFlush { at_ms: u64 },
    /// The engine switched tools on its own (after a shape is created).
    ToolChanged(Tool),
    RenderNeeded,
}

/// Work parked until a pending lock acquire answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Deferred {
    /// Final geometry of a gesture that ended before its lock was granted.
    Update { shape: Shape, patch: ShapePatch, is_final: bool },
    /// Delete confirmed by pointer-up before the lock was granted.
    Delete,
    /// The gesture was cancelled; give the lock back once it arrives.
    Release,
}

/// A committed geometry write the durable feed has not shown yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingUpdate {
    /// The shape as it was before the first unconfirmed commit.
    pub original: Shape,
    /// Every unconfirmed commit folded together.
    pub patch: ShapePatch,
}

/// Where a visible shape's geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShapeSource {
    Durable,
    Transient,
    Overlay,
    /// A shape being drawn, not yet created.
    Provisional,
}

/// One entry of the merged scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleShape {
    pub shape: Shape,
    pub source: ShapeSource,
    /// Render with the "locked by other" style.
    pub locked_by_other: bool,
}

/// Core engine state. Pure and synchronous so it can be tested without a host.
pub struct EngineCore {
    pub client_id: ClientId,
    pub canvas_id: CanvasId,
    pub config: EngineConfig,
    pub doc: DocStore,
    pub viewport: Viewport,
    pub ui: UiState,
    pub input: InputState,
    /// Local in-progress geometry, keyed by shape.
    pub overlay: HashMap<ShapeId, Shape>,
    /// Latest transient frames from other clients.
    pub transients: HashMap<ShapeId, TransientPosition>,
    pub deferred: HashMap<ShapeId, Deferred>,
    /// Optimistic creates not yet seen on the durable feed.
    pub pending_creates: HashMap<ShapeId, Shape>,
    /// Optimistic geometry commits not yet seen on the durable feed.
    pub pending_updates: HashMap<ShapeId, PendingUpdate>,
}

impl EngineCore {
    #[must_use]
    pub fn new(client_id: ClientId, canvas_id: CanvasId, config: EngineConfig) -> Self {
        Self {
            client_id,
            canvas_id,
            config,
            doc: DocStore::new(),
            viewport: Viewport::default(),
            ui: UiState::default(),
            input: InputState::default(),
            overlay: HashMap::new(),
            transients: HashMap::new(),
            deferred: HashMap::new(),
            pending_creates: HashMap::new(),
            pending_updates: HashMap::new(),
        }
    }

    fn cx(&mut self, now_ms: u64) -> ToolCx<'_> {
        ToolCx {
            client_id: self.client_id,
            canvas_id: self.canvas_id,
            now_ms,
            config: &self.config,
            doc: &mut self.doc,
            viewport: &mut self.viewport,
            ui: &mut self.ui,
            input: &mut self.input,
            overlay: &mut self.overlay,
            deferred: &mut self.deferred,
            pending_creates: &mut self.pending_creates,
            pending_updates: &mut self.pending_updates,
            actions: Vec::new(),
        }
    }

    fn active_handler(&self) -> &'static dyn ToolHandler {
        if matches!(self.input, InputState::Panning { .. }) {
            handler_for(Tool::Pan)
        } else {
            handler_for(self.ui.tool)
        }
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, event: PointerEvent) -> Vec<Action> {
        let handler = match event.button {
            Button::Secondary => return Vec::new(),
            Button::Middle => handler_for(Tool::Pan),
            Button::Primary if !self.ui.online && self.ui.tool.edits() => {
                tracing::debug!(tool = ?self.ui.tool, "editing disabled while offline");
                return Vec::new();
            }
            Button::Primary => handler_for(self.ui.tool),
        };
        let mut cx = self.cx(event.time_ms);
        // A pointer-up we never saw: drop the stale gesture first.
        cx.cancel_input();
        handler.on_pointer_down(&event, &mut cx);
        cx.into_actions()
    }

    pub fn on_pointer_move(&mut self, event: PointerEvent) -> Vec<Action> {
        if self.input.is_idle() {
            return Vec::new();
        }
        let handler = self.active_handler();
        let mut cx = self.cx(event.time_ms);
        handler.on_pointer_move(&event, &mut cx);
        cx.into_actions()
    }

    pub fn on_pointer_up(&mut self, event: PointerEvent) -> Vec<Action> {
        if self.input.is_idle() {
            return Vec::new();
        }
        let handler = self.active_handler();
        let mut cx = self.cx(event.time_ms);
        handler.on_pointer_up(&event, &mut cx);
        cx.into_actions()
    }

    /// The pointer left the canvas: cancel without committing.
    pub fn on_pointer_leave(&mut self, now_ms: u64) -> Vec<Action> {
        let mut cx = self.cx(now_ms);
        cx.cancel_input();
        cx.into_actions()
    }

    /// Ctrl/Cmd + wheel zooms around the pointer; a plain wheel pans.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.ctrl || modifiers.meta {
            if delta.dy.abs() < f64::EPSILON {
                return Vec::new();
            }
            let factor = if delta.dy < 0.0 { WHEEL_ZOOM_STEP } else { WHEEL_ZOOM_STEP.recip() };
            self.viewport.zoom_at(screen, factor);
        } else {
            self.viewport.pan_by(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    // --- Timers and sync results ---

    /// A deadline requested through [`Action::ScheduleFlush`] fired.
    ///
    /// A timer that fires before the throttle window closes flushes nothing;
    /// the throttle's own deadline is re-requested so the queued remainder
    /// still drains without further pointer movement.
    pub fn on_flush_timer(&mut self, now_ms: u64) -> Vec<Action> {
        let mut cx = self.cx(now_ms);
        cx.flush_transients();
        let mut actions = cx.into_actions();
        if !actions.iter().any(|a| matches!(a, Action::ScheduleFlush { .. })) {
            let pending = self
                .input
                .session()
                .filter(|s| s.throttle.pending_len() > 0)
                .and_then(|s| s.throttle.deadline());
            if let Some(at_ms) = pending {
                tracing::trace!(now_ms, at_ms, "early flush timer, re-arming");
                actions.push(Action::ScheduleFlush { at_ms });
            }
        }
        actions
    }

    /// Answer to an [`Action::AcquireLock`].
    pub fn on_lock_result(&mut self, id: ShapeId, granted: bool, now_ms: u64) -> Vec<Action> {
        let mut cx = self.cx(now_ms);
        cx.lock_result(id, granted);
        cx.into_actions()
    }

    /// A durable or ephemeral write for `id` failed.
    ///
    /// Local state for the shape is dropped, an unconfirmed geometry commit is
    /// rolled back to the shape's pre-commit state, and a best-effort lock
    /// release and transient clear are requested so the shape is not left
    /// stuck.
    pub fn on_sync_failed(&mut self, id: ShapeId, now_ms: u64) -> Vec<Action> {
        tracing::debug!(shape_id = %id, "dropping local state after failed write");
        let mut cx = self.cx(now_ms);
        cx.forget(id);
        cx.emit(Action::ReleaseLock { id });
        cx.emit(Action::ClearTransient { id });
        cx.emit(Action::RenderNeeded);
        cx.into_actions()
    }

    // --- UI state ---

    /// Switch tools. Any open gesture is aborted; a retained resize lock is
    /// released unless the new tool is resize.
    pub fn set_tool(&mut self, tool: Tool, now_ms: u64) -> Vec<Action> {
        if tool == self.ui.tool {
            return Vec::new();
        }
        let mut cx = self.cx(now_ms);
        cx.cancel_input();
        if tool != Tool::Resize {
            if let Some(id) = cx.ui.retained_lock.take() {
                if cx.ui.held_locks.remove(&id) {
                    cx.emit(Action::ReleaseLock { id });
                }
            }
        }
        cx.ui.tool = tool;
        cx.emit(Action::RenderNeeded);
        cx.into_actions()
    }

    pub fn clear_selection(&mut self, now_ms: u64) -> Vec<Action> {
        self.select_shapes(&[], now_ms)
    }

    /// Replace the selection. Unknown ids are ignored.
    pub fn select_shapes(&mut self, ids: &[ShapeId], now_ms: u64) -> Vec<Action> {
        let mut cx = self.cx(now_ms);
        cx.cancel_input();
        let ids: Vec<ShapeId> = ids.iter().copied().filter(|id| cx.doc.contains(id)).collect();
        cx.set_selection(ids);
        cx.into_actions()
    }

    /// Connectivity changed. Going offline aborts the current gesture and
    /// disables every tool but pan.
    pub fn set_online(&mut self, online: bool, now_ms: u64) -> Vec<Action> {
        if online == self.ui.online {
            return Vec::new();
        }
        let mut cx = self.cx(now_ms);
        if !online {
            cx.cancel_input();
        }
        cx.ui.online = online;
        tracing::info!(online, "connectivity changed");
        cx.emit(Action::RenderNeeded);
        cx.into_actions()
    }

    // --- Inbound feeds ---

    /// Durable feed: the full current shape list.
    ///
    /// Optimistic creates and geometry commits the feed has not caught up
    /// with are kept on top of the snapshot. A commit is settled once the
    /// feed shows it, the shape is gone, or another client holds a live lock
    /// on it. Shapes that disappeared leave the selection. Shapes taken over
    /// by another client leave the current gesture and the held-lock set.
    pub fn apply_shapes(&mut self, shapes: Vec<Shape>, now_ms: u64) -> Vec<Action> {
        let arrived: HashSet<ShapeId> = shapes.iter().map(|s| s.id).collect();
        self.pending_creates.retain(|id, _| !arrived.contains(id));
        self.doc.load_snapshot(shapes);
        self.settle_pending_updates(now_ms);
        for shape in self.pending_creates.values() {
            self.doc.insert(shape.clone());
        }
        for (id, pending) in &self.pending_updates {
            self.doc.apply_patch(id, &pending.patch);
        }

        let doc = &self.doc;
        self.ui.selection.retain(|id| doc.contains(id));
        self.overlay.retain(|id, _| doc.contains(id));
        self.deferred
            .retain(|id, deferred| matches!(deferred, Deferred::Release) || doc.contains(id));

        let stale_ms = self.config.stale_lock_ms;
        let client_id = self.client_id;
        let lost: Vec<ShapeId> = self
            .ui
            .held_locks
            .iter()
            .copied()
            .filter(|id| match doc.get(id) {
                None => true,
                Some(shape) => matches!(
                    lock_state(shape.owner_lock.as_ref(), client_id, now_ms, stale_ms),
                    LockState::HeldByOther { .. }
                ),
            })
            .collect();

        let mut cx = self.cx(now_ms);
        cx.reconcile_gesture();
        for id in lost {
            tracing::info!(shape_id = %id, "held lock lost");
            cx.ui.held_locks.remove(&id);
            if cx.ui.retained_lock == Some(id) {
                cx.ui.retained_lock = None;
            }
        }
        cx.emit(Action::RenderNeeded);
        cx.into_actions()
    }

    /// Drop pending commits the fresh snapshot has settled.
    fn settle_pending_updates(&mut self, now_ms: u64) {
        let (client_id, stale_ms) = (self.client_id, self.config.stale_lock_ms);
        let doc = &self.doc;
        let creates = &self.pending_creates;
        self.pending_updates.retain(|id, pending| {
            if creates.contains_key(id) {
                return true;
            }
            let Some(shape) = doc.get(id) else {
                return false;
            };
            if pending.patch.is_reflected_in(shape) {
                tracing::trace!(shape_id = %id, "commit confirmed by feed");
                return false;
            }
            let taken = matches!(
                lock_state(shape.owner_lock.as_ref(), client_id, now_ms, stale_ms),
                LockState::HeldByOther { .. }
            );
            if taken {
                tracing::debug!(shape_id = %id, "unconfirmed commit superseded by another client");
            }
            !taken
        });
    }

    /// Ephemeral feed: the full current map of transient frames. Our own
    /// frames are ignored.
    pub fn apply_transients(&mut self, transients: HashMap<ShapeId, TransientPosition>) -> Vec<Action> {
        let client_id = self.client_id;
        self.transients = transients.into_iter().filter(|(_, t)| t.client_id != client_id).collect();
        vec![Action::RenderNeeded]
    }

    // --- Queries ---

    /// The merged scene in draw order, plus the shape being drawn, if any.
    #[must_use]
    pub fn visible_shapes(&self, now_ms: u64) -> Vec<VisibleShape> {
        let mut out = Vec::with_capacity(self.doc.len() + 1);
        for shape in self.doc.sorted_shapes() {
            let locked_by_other = self.ui.locked_by_other.contains(&shape.id)
                || matches!(
                    lock_state(shape.owner_lock.as_ref(), self.client_id, now_ms, self.config.stale_lock_ms),
                    LockState::HeldByOther { .. }
                );
            let (shape, source) = if let Some(local) = self.overlay.get(&shape.id) {
                (local.clone(), ShapeSource::Overlay)
            } else if let Some(remote) = self.remote_transient(shape, now_ms) {
                (remote.apply_to(shape), ShapeSource::Transient)
            } else {
                (shape.clone(), ShapeSource::Durable)
            };
            out.push(VisibleShape { shape, source, locked_by_other });
        }
        if let Some(shape) = self.provisional_shape() {
            out.push(VisibleShape { shape, source: ShapeSource::Provisional, locked_by_other: false });
        }
        out
    }

    /// A remote frame for `shape`, if its sender holds a live lock on it.
    fn remote_transient(&self, shape: &Shape, now_ms: u64) -> Option<&TransientPosition> {
        let transient = self.transients.get(&shape.id)?;
        let lock = shape.owner_lock.as_ref()?;
        let live_holder = lock.holder_id == Some(transient.client_id)
            && !is_stale(lock.acquired_at, now_ms, self.config.stale_lock_ms);
        live_holder.then_some(transient)
    }

    fn provisional_shape(&self) -> Option<Shape> {
        let InputState::Drawing { kind, anchor, current } = self.input else {
            return None;
        };
        let rect = clip_rect(Rect::from_corners(anchor, current), self.config.canvas_width, self.config.canvas_height);
        Some(new_draft(kind, rect, self.canvas_id, self.doc.next_z_index(), Uuid::nil()).into_shape())
    }

    /// Whether this client may edit `id` right now. Unknown shapes are not editable.
    #[must_use]
    pub fn is_shape_editable_by_me(&self, id: &ShapeId, now_ms: u64) -> bool {
        self.doc
            .get(id)
            .is_some_and(|shape| is_editable(shape.owner_lock.as_ref(), self.client_id, now_ms, self.config.stale_lock_ms))
    }

    #[must_use]
    pub fn active_selection(&self) -> &[ShapeId] {
        &self.ui.selection
    }

    #[must_use]
    pub fn session(&self) -> Option<&InteractionSession> {
        self.input.session()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.doc.get(id)
    }

    /// JSON dump of the engine state for debugging.
    #[must_use]
    pub fn debug_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "client_id": self.client_id,
            "canvas_id": self.canvas_id,
            "ui": self.ui,
            "input": self.input,
            "viewport": self.viewport,
            "shape_count": self.doc.len(),
            "overlay": self.overlay.keys().collect::<Vec<_>>(),
            "transients": self.transients.len(),
            "deferred": self.deferred,
            "pending_creates": self.pending_creates.keys().collect::<Vec<_>>(),
            "pending_updates": self.pending_updates.keys().collect::<Vec<_>>(),
        })
    }
}
