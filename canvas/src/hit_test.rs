use uuid::Uuid;

use super::*;
use crate::doc::Style;

// =============================================================
// Helpers
// =============================================================

fn shape(geometry: Geometry, x: f64, y: f64, z: i64) -> Shape {
    Shape {
        id: Uuid::new_v4(),
        canvas_id: Uuid::nil(),
        x,
        y,
        geometry,
        rotation: 0.0,
        style: Style::default(),
        z_index: z,
        owner_lock: None,
    }
}

fn rect_at(x: f64, y: f64, w: f64, h: f64, z: i64) -> Shape {
    shape(Geometry::Rectangle { width: w, height: h }, x, y, z)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn doc_with(shapes: &[Shape]) -> DocStore {
    let mut doc = DocStore::new();
    for s in shapes {
        doc.insert(s.clone());
    }
    doc
}

// =============================================================
// contains_point
// =============================================================

#[test]
fn rectangle_contains_interior_and_edges() {
    let r = rect_at(10.0, 10.0, 100.0, 50.0, 0);
    assert!(contains_point(&r, pt(50.0, 30.0)));
    assert!(contains_point(&r, pt(10.0, 10.0)));
    assert!(!contains_point(&r, pt(111.0, 30.0)));
}

#[test]
fn rotated_rectangle_uses_local_frame() {
    let mut r = rect_at(0.0, 40.0, 100.0, 20.0, 0);
    r.rotation = 90.0;
    // Rotated a quarter turn about (50, 50) it spans x 40..60, y 0..100.
    assert!(contains_point(&r, pt(50.0, 5.0)));
    assert!(!contains_point(&r, pt(5.0, 50.0)));
}

#[test]
fn circle_uses_radius() {
    let c = shape(Geometry::Circle { radius: 10.0 }, 50.0, 50.0, 0);
    assert!(contains_point(&c, pt(57.0, 57.0)));
    // Inside the bounding box corner but outside the circle.
    assert!(!contains_point(&c, pt(41.0, 41.0)));
}

#[test]
fn star_uses_outer_radius() {
    let s = shape(Geometry::Star { inner_radius: 5.0, outer_radius: 10.0, num_points: 5 }, 0.0, 0.0, 0);
    assert!(contains_point(&s, pt(0.0, 9.0)));
    assert!(!contains_point(&s, pt(0.0, 11.0)));
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn empty_space_is_none() {
    let doc = doc_with(&[rect_at(0.0, 0.0, 10.0, 10.0, 0)]);
    assert!(hit_test(pt(500.0, 500.0), &doc, &Viewport::default(), None).is_none());
}

#[test]
fn topmost_body_wins() {
    let low = rect_at(0.0, 0.0, 100.0, 100.0, 0);
    let high = rect_at(50.0, 50.0, 100.0, 100.0, 5);
    let doc = doc_with(&[low.clone(), high.clone()]);
    let hit = hit_test(pt(75.0, 75.0), &doc, &Viewport::default(), None);
    assert_eq!(hit, Some(Hit { shape_id: high.id, part: HitPart::Body }));
    let hit = hit_test(pt(10.0, 10.0), &doc, &Viewport::default(), None);
    assert_eq!(hit.map(|h| h.shape_id), Some(low.id));
}

#[test]
fn corner_handle_only_for_selected_shape() {
    let r = rect_at(100.0, 100.0, 100.0, 100.0, 0);
    let doc = doc_with(&[r.clone()]);
    let vp = Viewport::default();
    let hit = hit_test(pt(203.0, 198.0), &doc, &vp, Some(r.id));
    assert_eq!(hit, Some(Hit { shape_id: r.id, part: HitPart::ResizeHandle(Handle::Se) }));
    // Not selected: the same point is just outside the body.
    assert!(hit_test(pt(203.0, 198.0), &doc, &vp, None).is_none());
}

#[test]
fn rotate_handle_sits_above_top_edge() {
    let r = rect_at(100.0, 100.0, 100.0, 100.0, 0);
    let doc = doc_with(&[r.clone()]);
    let vp = Viewport::default();
    let hit = hit_test(pt(150.0, 100.0 - ROTATE_HANDLE_OFFSET_PX), &doc, &vp, Some(r.id));
    assert_eq!(hit.map(|h| h.part), Some(HitPart::RotateHandle));
}

#[test]
fn handle_slop_scales_with_zoom() {
    let r = rect_at(100.0, 100.0, 100.0, 100.0, 0);
    let doc = doc_with(&[r.clone()]);
    let zoomed = Viewport { scale: 4.0, ..Viewport::default() };
    // 6 units away is 24 pixels at 4x zoom: outside the 8 px handle radius.
    let hit = hit_test(pt(206.0, 200.0), &doc, &zoomed, Some(r.id));
    assert!(hit.is_none());
    let hit = hit_test(pt(201.0, 200.0), &doc, &zoomed, Some(r.id));
    assert_eq!(hit.map(|h| h.part), Some(HitPart::ResizeHandle(Handle::Se)));
}

// =============================================================
// shapes_in_rect
// =============================================================

#[test]
fn marquee_selects_fully_enclosed_shapes() {
    let inside = rect_at(10.0, 10.0, 20.0, 20.0, 0);
    let straddling = rect_at(90.0, 10.0, 20.0, 20.0, 1);
    let circle = shape(Geometry::Circle { radius: 5.0 }, 50.0, 50.0, 2);
    let doc = doc_with(&[inside.clone(), straddling, circle.clone()]);
    let ids = shapes_in_rect(&doc, &Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(ids, vec![inside.id, circle.id]);
}
