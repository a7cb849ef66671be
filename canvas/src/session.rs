//! Interaction session: the explicit value object for one gesture.
//!
//! DESIGN
//! ======
//! A session lives from pointer-down to pointer-up (or cancellation) and is
//! owned by [`crate::input::InputState::Gesture`]. It snapshots every target
//! shape at gesture start and recomputes each frame from
//! `snapshot + (pointer - origin)`, never from the previous frame, so rounding
//! never accumulates and cancelling is a matter of dropping the session.
//!
//! Phases: `Armed` on pointer-down; a move gesture then sits in
//! `ThresholdPending` until the pointer travels past the drag threshold;
//! resize and rotate go straight to `Active` on the first move. `Committing`
//! marks the final frame on pointer-up.
//!
//! Every target carries its own lock state. Shapes the store refused (or
//! that were locked by someone else at pointer-down) are listed in
//! `excluded` and take no part in the gesture.
//!
//! TRADE-OFFS
//! ==========
//! Resize works on the axis-aligned bounding box and ignores rotation.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::camera::Point;
use crate::config::EngineConfig;
use crate::doc::{Shape, ShapeId, ShapePatch};
use crate::geometry::{
    Handle, Rect, angle_deg, clamp_delta, clamp_shape, clip_rect, distance, normalize_degrees,
    resize_with_crossover,
};
use crate::throttle::ThrottleController;

/// Where a gesture is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GesturePhase {
    /// Pointer is down; nothing has moved yet.
    Armed,
    /// Pointer moved, but not past the drag threshold.
    ThresholdPending,
    /// Frames are being computed, shown and streamed.
    Active,
    /// Pointer released; the final frame is being committed.
    Committing,
}

/// What a gesture does to its targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GestureKind {
    Move,
    Resize {
        /// Corner the pointer currently occupies (flips on crossover).
        handle: Handle,
        /// Corner grabbed at pointer-down.
        start_handle: Handle,
        /// Bounding box at pointer-down.
        original: Rect,
    },
    Rotate {
        /// Pivot in canvas units.
        center: Point,
        /// Pointer angle around `center` at pointer-down, in degrees.
        start_angle: f64,
    },
}

impl GestureKind {
    /// Resize gesture grabbing `handle` of `original`.
    #[must_use]
    pub fn resize(original: Rect, handle: Handle) -> Self {
        Self::Resize { handle, start_handle: handle, original }
    }

    /// Rotate gesture around `center`, started with the pointer at `pointer`.
    #[must_use]
    pub fn rotate(center: Point, pointer: Point) -> Self {
        Self::Rotate { center, start_angle: angle_deg(center, pointer) }
    }
}

/// Per-target lock progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetLock {
    /// Acquire requested, no answer yet. Shown locally, not streamed.
    Pending,
    /// Held. Frames are streamed and the final frame is committed.
    Granted,
}

/// One shape taking part in a gesture.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTarget {
    pub id: ShapeId,
    /// The shape as it was at pointer-down.
    pub snapshot: Shape,
    pub lock: TargetLock,
}

impl SessionTarget {
    #[must_use]
    pub fn new(snapshot: Shape, lock: TargetLock) -> Self {
        Self { id: snapshot.id, snapshot, lock }
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.lock == TargetLock::Granted
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionSession {
    pub kind: GestureKind,
    pub phase: GesturePhase,
    /// Pointer position at pointer-down, canvas units.
    pub origin: Point,
    /// Most recent pointer position, canvas units.
    pub last: Point,
    pub targets: Vec<SessionTarget>,
    /// Shapes that were selected but locked by another client.
    pub excluded: Vec<ShapeId>,
    /// Shapes with a transient entry on the ephemeral channel.
    pub published: BTreeSet<ShapeId>,
    pub throttle: ThrottleController,
    /// Keep the lock after committing (resize gestures).
    pub retain_lock: bool,
}

impl InteractionSession {
    #[must_use]
    pub fn new(
        kind: GestureKind,
        origin: Point,
        targets: Vec<SessionTarget>,
        excluded: Vec<ShapeId>,
        config: &EngineConfig,
    ) -> Self {
        let throttle = ThrottleController::new(targets.len(), config);
        Self {
            kind,
            phase: GesturePhase::Armed,
            origin,
            last: origin,
            targets,
            excluded,
            published: BTreeSet::new(),
            throttle,
            retain_lock: matches!(kind, GestureKind::Resize { .. }),
        }
    }

    #[must_use]
    pub fn target(&self, id: &ShapeId) -> Option<&SessionTarget> {
        self.targets.iter().find(|t| t.id == *id)
    }

    pub fn target_mut(&mut self, id: &ShapeId) -> Option<&mut SessionTarget> {
        self.targets.iter_mut().find(|t| t.id == *id)
    }

    /// Take a shape out of the gesture, dropping anything it had queued.
    pub fn remove_target(&mut self, id: &ShapeId) -> Option<SessionTarget> {
        let index = self.targets.iter().position(|t| t.id == *id)?;
        self.throttle.discard(id);
        Some(self.targets.remove(index))
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ShapeId> {
        self.targets.iter().map(|t| t.id).collect()
    }

    #[must_use]
    pub fn granted_ids(&self) -> Vec<ShapeId> {
        self.targets.iter().filter(|t| t.is_granted()).map(|t| t.id).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == GesturePhase::Active
    }

    /// Transient frames carry a size only when the size can change.
    #[must_use]
    pub fn streams_size(&self) -> bool {
        matches!(self.kind, GestureKind::Resize { .. })
    }

    /// Advance the phase for a pointer at `pointer`. Returns true once the
    /// gesture is active.
    pub fn advance(&mut self, pointer: Point, drag_threshold: f64) -> bool {
        match self.phase {
            GesturePhase::Active => true,
            GesturePhase::Committing => false,
            GesturePhase::Armed | GesturePhase::ThresholdPending => {
                let past = match self.kind {
                    GestureKind::Move => distance(self.origin, pointer) > drag_threshold,
                    GestureKind::Resize { .. } | GestureKind::Rotate { .. } => true,
                };
                self.phase = if past { GesturePhase::Active } else { GesturePhase::ThresholdPending };
                past
            }
        }
    }

    /// Compute every target's geometry for a pointer at `pointer`.
    ///
    /// Results are inside the canvas and in target order. Updates the active
    /// resize handle and `last`.
    pub fn frame(&mut self, pointer: Point, config: &EngineConfig) -> Vec<Shape> {
        self.last = pointer;
        let (w, h) = (config.canvas_width, config.canvas_height);
        match &mut self.kind {
            GestureKind::Move => {
                let Some(union) = union_bounds(self.targets.iter().map(|t| &t.snapshot)) else {
                    return Vec::new();
                };
                let (dx, dy) = clamp_delta(union, pointer.x - self.origin.x, pointer.y - self.origin.y, w, h);
                self.targets
                    .iter()
                    .map(|t| clamp_shape(&t.snapshot.translated(dx, dy), w, h))
                    .collect()
            }
            GestureKind::Resize { handle, start_handle, original } => {
                let (next, rect) = resize_with_crossover(*original, *start_handle, pointer, config.min_resize_size);
                *handle = next;
                let rect = clip_rect(rect, w, h);
                self.targets.iter().map(|t| t.snapshot.with_bounds(rect)).collect()
            }
            GestureKind::Rotate { center, start_angle } => {
                let delta = angle_deg(*center, pointer) - *start_angle;
                self.targets
                    .iter()
                    .map(|t| {
                        let mut shape = t.snapshot.clone();
                        shape.rotation = normalize_degrees(shape.rotation + delta);
                        shape
                    })
                    .collect()
            }
        }
    }

    /// The durable update describing `shape`'s final geometry.
    #[must_use]
    pub fn patch_for(&self, shape: &Shape) -> ShapePatch {
        match self.kind {
            GestureKind::Move | GestureKind::Resize { .. } => ShapePatch::placement(shape),
            GestureKind::Rotate { .. } => ShapePatch::rotation(shape.rotation),
        }
    }
}

/// Smallest box containing every shape's bounds.
#[must_use]
pub fn union_bounds<'a>(shapes: impl IntoIterator<Item = &'a Shape>) -> Option<Rect> {
    let mut iter = shapes.into_iter();
    let first = iter.next()?.bounds();
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.right(), first.bottom());
    for shape in iter {
        let b = shape.bounds();
        x0 = x0.min(b.x);
        y0 = y0.min(b.y);
        x1 = x1.max(b.right());
        y1 = y1.max(b.bottom());
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}
