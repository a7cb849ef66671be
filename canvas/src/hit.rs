//! Hit testing against shapes, their corner handles and rotate handle.
//!
//! Handles have a fixed size on screen, so their slop is a pixel radius
//! converted through the viewport. Handles are only offered for a single
//! selected shape and are checked before any body.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Point, Viewport};
use crate::consts::{HANDLE_RADIUS_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::doc::{DocStore, Geometry, Shape, ShapeId};
use crate::geometry::{Handle, Rect, distance, rotate_point};

/// Which part of a shape was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(Handle),
    RotateHandle,
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub shape_id: ShapeId,
    pub part: HitPart,
}

/// Whether `p` (canvas units) falls inside the shape's outline.
#[must_use]
pub fn contains_point(shape: &Shape, p: Point) -> bool {
    let bounds = shape.bounds();
    match &shape.geometry {
        Geometry::Rectangle { .. } | Geometry::Text { .. } => {
            let local = rotate_point(p, bounds.center(), -shape.rotation);
            bounds.contains(local)
        }
        Geometry::Circle { radius } => distance(bounds.center(), p) <= *radius,
        Geometry::Star { outer_radius, .. } => distance(bounds.center(), p) <= *outer_radius,
    }
}

/// Position of a corner handle, following the shape's rotation.
#[must_use]
pub fn handle_position(shape: &Shape, handle: Handle) -> Point {
    let bounds = shape.bounds();
    rotate_point(bounds.corner(handle), bounds.center(), shape.rotation)
}

/// Position of the rotate handle: above the top edge by a fixed screen offset.
#[must_use]
pub fn rotate_handle_position(shape: &Shape, viewport: &Viewport) -> Point {
    let bounds = shape.bounds();
    let above = Point::new(bounds.center().x, bounds.y - viewport.screen_dist_to_world(ROTATE_HANDLE_OFFSET_PX));
    rotate_point(above, bounds.center(), shape.rotation)
}

/// Test what is under `world_pt`, checking the selected shape's handles first.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore, viewport: &Viewport, selected: Option<ShapeId>) -> Option<Hit> {
    let slop = viewport.screen_dist_to_world(HANDLE_RADIUS_PX);

    if let Some(shape) = selected.and_then(|id| doc.get(&id)) {
        if distance(rotate_handle_position(shape, viewport), world_pt) <= slop {
            return Some(Hit { shape_id: shape.id, part: HitPart::RotateHandle });
        }
        for handle in Handle::ALL {
            if distance(handle_position(shape, handle), world_pt) <= slop {
                return Some(Hit { shape_id: shape.id, part: HitPart::ResizeHandle(handle) });
            }
        }
    }

    doc.sorted_shapes()
        .into_iter()
        .rev()
        .find(|shape| contains_point(shape, world_pt))
        .map(|shape| Hit { shape_id: shape.id, part: HitPart::Body })
}

/// Shapes whose bounds lie entirely inside `rect`, in draw order.
#[must_use]
pub fn shapes_in_rect(doc: &DocStore, rect: &Rect) -> Vec<ShapeId> {
    doc.sorted_shapes()
        .into_iter()
        .filter(|shape| rect.contains_rect(&shape.bounds()))
        .map(|shape| shape.id)
        .collect()
}
