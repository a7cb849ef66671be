//! Geometry utilities: rectangles, boundary enforcement, resize handles and
//! crossover detection, angles.
//!
//! Everything here is a pure function of its arguments. The engine calls
//! these on every frame of a gesture, before a geometry is shown locally or
//! sent anywhere, so remote observers never see an out-of-bounds frame.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::Shape;

/// Axis-aligned rectangle in canvas units. `x, y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rectangle spanning two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// Position of one corner.
    #[must_use]
    pub fn corner(&self, handle: Handle) -> Point {
        match handle {
            Handle::Nw => Point::new(self.x, self.y),
            Handle::Ne => Point::new(self.right(), self.y),
            Handle::Sw => Point::new(self.x, self.bottom()),
            Handle::Se => Point::new(self.right(), self.bottom()),
        }
    }

    /// Copy translated by a delta.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }
}

// =============================================================
// Boundary enforcement
// =============================================================

/// Move a rectangle inside `[0, canvas_w] x [0, canvas_h]`.
///
/// The rectangle is translated; its size only shrinks when it is larger than
/// the canvas itself. Idempotent.
#[must_use]
pub fn clamp_rect(rect: Rect, canvas_w: f64, canvas_h: f64) -> Rect {
    let width = rect.width.clamp(0.0, canvas_w);
    let height = rect.height.clamp(0.0, canvas_h);
    Rect {
        x: rect.x.clamp(0.0, canvas_w - width),
        y: rect.y.clamp(0.0, canvas_h - height),
        width,
        height,
    }
}

/// Intersect a rectangle with the canvas.
///
/// Used where one side of the rectangle is pinned (resize anchors, the start
/// point of a drawn shape) and translating would move the pinned side.
/// Idempotent.
#[must_use]
pub fn clip_rect(rect: Rect, canvas_w: f64, canvas_h: f64) -> Rect {
    let x0 = rect.x.clamp(0.0, canvas_w);
    let y0 = rect.y.clamp(0.0, canvas_h);
    let x1 = rect.right().clamp(0.0, canvas_w);
    let y1 = rect.bottom().clamp(0.0, canvas_h);
    Rect { x: x0, y: y0, width: (x1 - x0).max(0.0), height: (y1 - y0).max(0.0) }
}

/// Limit a translation so `bounds` stays inside the canvas.
///
/// When `bounds` is wider (taller) than the canvas the left (top) edge is
/// pinned at zero.
#[must_use]
pub fn clamp_delta(bounds: Rect, dx: f64, dy: f64, canvas_w: f64, canvas_h: f64) -> (f64, f64) {
    let limit = |d: f64, lo: f64, hi: f64| if lo > hi { lo } else { d.clamp(lo, hi) };
    (
        limit(dx, -bounds.x, canvas_w - bounds.right()),
        limit(dy, -bounds.y, canvas_h - bounds.bottom()),
    )
}

/// [`clamp_rect`] applied to a shape's bounding box.
#[must_use]
pub fn clamp_shape(shape: &Shape, canvas_w: f64, canvas_h: f64) -> Shape {
    let b = shape.bounds();
    let c = clamp_rect(b, canvas_w, canvas_h);
    if c == b { shape.clone() } else { shape.with_bounds(c) }
}

/// [`clip_rect`] applied to a shape's bounding box.
#[must_use]
pub fn clip_shape(shape: &Shape, canvas_w: f64, canvas_h: f64) -> Shape {
    let b = shape.bounds();
    let c = clip_rect(b, canvas_w, canvas_h);
    if c == b { shape.clone() } else { shape.with_bounds(c) }
}

// =============================================================
// Resize handles
// =============================================================

/// Corner resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Handle {
    pub const ALL: [Handle; 4] = [Handle::Nw, Handle::Ne, Handle::Sw, Handle::Se];

    /// Build a handle from the sides it sits on.
    #[must_use]
    pub fn from_sides(east: bool, south: bool) -> Self {
        match (east, south) {
            (false, false) => Self::Nw,
            (true, false) => Self::Ne,
            (false, true) => Self::Sw,
            (true, true) => Self::Se,
        }
    }

    /// The diagonally opposite corner.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Nw => Self::Se,
            Self::Ne => Self::Sw,
            Self::Sw => Self::Ne,
            Self::Se => Self::Nw,
        }
    }

    #[must_use]
    pub fn is_east(self) -> bool {
        matches!(self, Self::Ne | Self::Se)
    }

    #[must_use]
    pub fn is_south(self) -> bool {
        matches!(self, Self::Sw | Self::Se)
    }
}

/// Distance from `p` to one corner handle of `rect`.
#[must_use]
pub fn handle_distance(rect: &Rect, handle: Handle, p: Point) -> f64 {
    distance(rect.corner(handle), p)
}

/// The corner handle closest to `p`.
#[must_use]
pub fn nearest_handle(rect: &Rect, p: Point) -> Handle {
    let mut best = Handle::Nw;
    let mut best_dist = f64::INFINITY;
    for handle in Handle::ALL {
        let d = handle_distance(rect, handle, p);
        if d < best_dist {
            best = handle;
            best_dist = d;
        }
    }
    best
}

/// Rebuild a rectangle for a corner drag, flipping the handle when the
/// pointer crosses the opposite edge(s).
///
/// The anchor is the corner of `original` opposite `start_handle`; it never
/// moves. The returned handle names the corner the pointer now occupies, so
/// dragging `Nw` past both the right and bottom edges yields `Se` with a
/// rectangle running from the old bottom-right corner to the pointer.
/// Width and height are at least `min_size`, grown away from the anchor.
#[must_use]
pub fn resize_with_crossover(original: Rect, start_handle: Handle, pointer: Point, min_size: f64) -> (Handle, Rect) {
    let anchor = original.corner(start_handle.opposite());

    #[allow(clippy::float_cmp)]
    let east = if pointer.x == anchor.x { start_handle.is_east() } else { pointer.x > anchor.x };
    #[allow(clippy::float_cmp)]
    let south = if pointer.y == anchor.y { start_handle.is_south() } else { pointer.y > anchor.y };

    let width = (pointer.x - anchor.x).abs().max(min_size);
    let height = (pointer.y - anchor.y).abs().max(min_size);
    let x = if east { anchor.x } else { anchor.x - width };
    let y = if south { anchor.y } else { anchor.y - height };

    (Handle::from_sides(east, south), Rect { x, y, width, height })
}

// =============================================================
// Points and angles
// =============================================================

#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Angle of `p` around `center` in degrees, clockwise from +x in screen axes.
#[must_use]
pub fn angle_deg(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

/// Wrap an angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let wrapped = deg.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Rotate `p` around `center` by `deg` degrees.
#[must_use]
pub fn rotate_point(p: Point, center: Point, deg: f64) -> Point {
    let (sin, cos) = deg.to_radians().sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(center.x + dx * cos - dy * sin, center.y + dx * sin + dy * cos)
}
