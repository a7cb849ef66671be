//! Document model: shapes, their geometry, owner locks, and the in-memory cache.
//!
//! This module defines the data that describes what is on the canvas
//! (`Shape`, `Geometry`, `Style`), the advisory lock record (`OwnerLock`),
//! a sparse-update type for incremental edits (`ShapePatch`), the ephemeral
//! drag frame broadcast to peers (`TransientPosition`), and the read-through
//! cache of durable state (`DocStore`).
//!
//! The durable store owns shapes. Data flows into `DocStore` from the durable
//! change feed and from the engine's own optimistic commits; nothing else
//! mutates it.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{DEFAULT_FILL, DEFAULT_STROKE, DEFAULT_STROKE_WIDTH, STAR_INNER_RATIO};
use crate::geometry::{Rect, normalize_degrees};

/// Unique identifier for a shape.
pub type ShapeId = Uuid;

/// Identifier of a connected client (one per editing session).
pub type ClientId = Uuid;

/// Identifier of a canvas.
pub type CanvasId = Uuid;

/// The kind of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Star,
    Text,
}

/// Kind-specific geometry.
///
/// Rectangles and text boxes anchor the owning shape's `x, y` at their
/// top-left corner; circles and stars anchor it at their center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    Rectangle { width: f64, height: f64 },
    Circle { radius: f64 },
    Star { inner_radius: f64, outer_radius: f64, num_points: u32 },
    Text { text: String, font_size: f64, width: f64, height: f64 },
}

impl Geometry {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Star { .. } => ShapeKind::Star,
            Self::Text { .. } => ShapeKind::Text,
        }
    }
}

/// Paint attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: DEFAULT_FILL.to_string(),
            stroke: DEFAULT_STROKE.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Advisory edit claim on a shape. A lock with no holder is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerLock {
    pub shape_id: ShapeId,
    pub holder_id: Option<ClientId>,
    /// Milliseconds since the Unix epoch.
    pub acquired_at: u64,
}

/// A shape as stored in the durable store and the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub canvas_id: CanvasId,
    pub x: f64,
    pub y: f64,
    pub geometry: Geometry,
    /// Clockwise degrees in `[0, 360)` around the bounding-box center.
    pub rotation: f64,
    pub style: Style,
    /// Stacking order; lower values are drawn beneath higher values.
    pub z_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_lock: Option<OwnerLock>,
}

impl Shape {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// Axis-aligned bounding box, ignoring rotation.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match &self.geometry {
            Geometry::Rectangle { width, height } | Geometry::Text { width, height, .. } => {
                Rect::new(self.x, self.y, *width, *height)
            }
            Geometry::Circle { radius } => Rect::new(self.x - radius, self.y - radius, radius * 2.0, radius * 2.0),
            Geometry::Star { outer_radius, .. } => Rect::new(
                self.x - outer_radius,
                self.y - outer_radius,
                outer_radius * 2.0,
                outer_radius * 2.0,
            ),
        }
    }

    /// Refit the geometry into `rect`.
    ///
    /// Round shapes take half the shorter side as their (outer) radius and sit
    /// centered in the box. Stars keep their inner/outer ratio. Text scales
    /// its font with the height change.
    #[must_use]
    pub fn with_bounds(&self, rect: Rect) -> Self {
        let mut out = self.clone();
        match &mut out.geometry {
            Geometry::Rectangle { width, height } => {
                out.x = rect.x;
                out.y = rect.y;
                *width = rect.width;
                *height = rect.height;
            }
            Geometry::Text { font_size, width, height, .. } => {
                if *height > 0.0 {
                    *font_size *= rect.height / *height;
                }
                out.x = rect.x;
                out.y = rect.y;
                *width = rect.width;
                *height = rect.height;
            }
            Geometry::Circle { radius } => {
                let c = rect.center();
                out.x = c.x;
                out.y = c.y;
                *radius = rect.width.min(rect.height) / 2.0;
            }
            Geometry::Star { inner_radius, outer_radius, .. } => {
                let ratio = if *outer_radius > 0.0 { *inner_radius / *outer_radius } else { STAR_INNER_RATIO };
                let c = rect.center();
                out.x = c.x;
                out.y = c.y;
                *outer_radius = rect.width.min(rect.height) / 2.0;
                *inner_radius = *outer_radius * ratio;
            }
        }
        out
    }

    /// Copy moved by a delta.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self.clone() }
    }

    /// Current lock holder, if the lock record names one.
    #[must_use]
    pub fn lock_holder(&self) -> Option<ClientId> {
        self.owner_lock.and_then(|l| l.holder_id)
    }

    /// Overwrite fields present in `patch`.
    pub fn apply_patch(&mut self, patch: &ShapePatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(ref geometry) = patch.geometry {
            self.geometry = geometry.clone();
        }
        if let Some(r) = patch.rotation {
            self.rotation = normalize_degrees(r);
        }
    }
}

/// Sparse geometry update. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl ShapePatch {
    /// Position and geometry of `shape`, without rotation.
    #[must_use]
    pub fn placement(shape: &Shape) -> Self {
        Self {
            x: Some(shape.x),
            y: Some(shape.y),
            geometry: Some(shape.geometry.clone()),
            rotation: None,
        }
    }

    /// Rotation only.
    #[must_use]
    pub fn rotation(deg: f64) -> Self {
        Self { rotation: Some(normalize_degrees(deg)), ..Default::default() }
    }

    /// Fold a later patch into this one; fields present in `later` win.
    pub fn merge(&mut self, later: &ShapePatch) {
        if later.x.is_some() {
            self.x = later.x;
        }
        if later.y.is_some() {
            self.y = later.y;
        }
        if later.geometry.is_some() {
            self.geometry.clone_from(&later.geometry);
        }
        if later.rotation.is_some() {
            self.rotation = later.rotation;
        }
    }

    /// True if every present field already holds in `shape`. Exact
    /// comparison: the store writes patch values through unchanged.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_reflected_in(&self, shape: &Shape) -> bool {
        self.x.is_none_or(|x| x == shape.x)
            && self.y.is_none_or(|y| y == shape.y)
            && self.geometry.as_ref().is_none_or(|g| *g == shape.geometry)
            && self.rotation.is_none_or(|r| normalize_degrees(r) == shape.rotation)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.geometry.is_none() && self.rotation.is_none()
    }
}

/// In-progress geometry broadcast on the ephemeral channel.
///
/// `x, y, width, height` describe the bounding box (see [`Shape::bounds`]),
/// so one message format serves every shape kind. Size is omitted for pure
/// moves; position and size are omitted for pure rotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientPosition {
    pub shape_id: ShapeId,
    /// The client that produced this frame.
    pub client_id: ClientId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl TransientPosition {
    /// Frame carrying the bounding box of `shape`, with or without size.
    #[must_use]
    pub fn of(shape: &Shape, client_id: ClientId, with_size: bool) -> Self {
        let b = shape.bounds();
        Self {
            shape_id: shape.id,
            client_id,
            x: b.x,
            y: b.y,
            width: with_size.then_some(b.width),
            height: with_size.then_some(b.height),
            rotation: Some(shape.rotation),
        }
    }

    /// Overlay this frame on a durable shape.
    #[must_use]
    pub fn apply_to(&self, shape: &Shape) -> Shape {
        let b = shape.bounds();
        let mut out = match (self.width, self.height) {
            (Some(w), Some(h)) => shape.with_bounds(Rect::new(self.x, self.y, w, h)),
            _ => shape.translated(self.x - b.x, self.y - b.y),
        };
        if let Some(r) = self.rotation {
            out.rotation = normalize_degrees(r);
        }
        out
    }
}

/// Everything the durable store needs to create a shape.
///
/// The id is generated client-side so the optimistic local copy and the
/// durable record share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDraft {
    pub id: ShapeId,
    pub canvas_id: CanvasId,
    pub x: f64,
    pub y: f64,
    pub geometry: Geometry,
    pub style: Style,
    pub z_index: i64,
}

impl ShapeDraft {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// The unlocked, unrotated shape this draft describes.
    #[must_use]
    pub fn into_shape(self) -> Shape {
        Shape {
            id: self.id,
            canvas_id: self.canvas_id,
            x: self.x,
            y: self.y,
            geometry: self.geometry,
            rotation: 0.0,
            style: self.style,
            z_index: self.z_index,
            owner_lock: None,
        }
    }
}

/// Read-through cache of durable shapes.
pub struct DocStore {
    shapes: HashMap<ShapeId, Shape>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { shapes: HashMap::new() }
    }

    /// Insert or replace a shape.
    pub fn insert(&mut self, shape: Shape) {
        self.shapes.insert(shape.id, shape);
    }

    /// Remove a shape by id, returning it if it was present.
    pub fn remove(&mut self, id: &ShapeId) -> Option<Shape> {
        self.shapes.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ShapeId) -> bool {
        self.shapes.contains_key(id)
    }

    /// Apply a partial update. Returns false if the shape doesn't exist.
    pub fn apply_patch(&mut self, id: &ShapeId, patch: &ShapePatch) -> bool {
        let Some(shape) = self.shapes.get_mut(id) else {
            return false;
        };
        shape.apply_patch(patch);
        true
    }

    /// Replace the lock record of a cached shape.
    pub fn set_lock(&mut self, id: &ShapeId, lock: Option<OwnerLock>) -> bool {
        let Some(shape) = self.shapes.get_mut(id) else {
            return false;
        };
        shape.owner_lock = lock;
        true
    }

    /// Replace all shapes with a full snapshot.
    pub fn load_snapshot(&mut self, shapes: Vec<Shape>) {
        self.shapes.clear();
        for shape in shapes {
            self.shapes.insert(shape.id, shape);
        }
    }

    /// All shapes sorted by `(z_index, id)` for draw order.
    #[must_use]
    pub fn sorted_shapes(&self) -> Vec<&Shape> {
        let mut shapes: Vec<&Shape> = self.shapes.values().collect();
        shapes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        shapes
    }

    /// One above the current top-most z-index.
    #[must_use]
    pub fn next_z_index(&self) -> i64 {
        self.shapes.values().map(|s| s.z_index + 1).max().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}
