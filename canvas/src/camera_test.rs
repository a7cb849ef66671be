#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

// --- Viewport defaults ---

#[test]
fn viewport_default_is_identity() {
    let vp = Viewport::default();
    assert_eq!(vp.pan_x, 0.0);
    assert_eq!(vp.pan_y, 0.0);
    assert_eq!(vp.scale, 1.0);
}

// --- screen_to_world ---

#[test]
fn screen_to_world_identity() {
    let vp = Viewport::default();
    let world = vp.screen_to_world(Point::new(50.0, 75.0));
    assert!(point_approx_eq(world, Point::new(50.0, 75.0)));
}

#[test]
fn screen_to_world_with_pan_and_scale() {
    let vp = Viewport { pan_x: 20.0, pan_y: 10.0, scale: 2.0 };
    // (20-20)/2 = 0, (10-10)/2 = 0
    let world = vp.screen_to_world(Point::new(20.0, 10.0));
    assert!(point_approx_eq(world, Point::new(0.0, 0.0)));
}

#[test]
fn screen_to_world_origin() {
    let vp = Viewport { pan_x: 50.0, pan_y: 30.0, scale: 2.0 };
    let world = vp.screen_to_world(Point::new(0.0, 0.0));
    assert!(approx_eq(world.x, -25.0));
    assert!(approx_eq(world.y, -15.0));
}

// --- world_to_screen ---

#[test]
fn world_to_screen_with_pan_and_scale() {
    let vp = Viewport { pan_x: 20.0, pan_y: 10.0, scale: 3.0 };
    let screen = vp.world_to_screen(Point::new(5.0, 5.0));
    assert!(approx_eq(screen.x, 35.0));
    assert!(approx_eq(screen.y, 25.0));
}

#[test]
fn round_trip_fractional_scale() {
    let vp = Viewport { pan_x: 13.7, pan_y: -42.3, scale: 0.75 };
    let world = Point::new(333.3, -999.9);
    let back = vp.screen_to_world(vp.world_to_screen(world));
    assert!(point_approx_eq(world, back));
}

// --- screen_dist_to_world ---

#[test]
fn screen_dist_to_world_with_scale() {
    let vp = Viewport { pan_x: 0.0, pan_y: 0.0, scale: 2.0 };
    assert!(approx_eq(vp.screen_dist_to_world(10.0), 5.0));
}

#[test]
fn screen_dist_to_world_ignores_pan() {
    let vp = Viewport { pan_x: 999.0, pan_y: -999.0, scale: 4.0 };
    assert!(approx_eq(vp.screen_dist_to_world(8.0), 2.0));
}

// --- pan_by ---

#[test]
fn pan_by_accumulates() {
    let mut vp = Viewport::default();
    vp.pan_by(10.0, -5.0);
    vp.pan_by(2.5, 1.0);
    assert!(approx_eq(vp.pan_x, 12.5));
    assert!(approx_eq(vp.pan_y, -4.0));
}

// --- zoom_at ---

#[test]
fn zoom_at_keeps_anchor_fixed() {
    let mut vp = Viewport { pan_x: 30.0, pan_y: -10.0, scale: 1.5 };
    let screen = Point::new(200.0, 120.0);
    let before = vp.screen_to_world(screen);
    vp.zoom_at(screen, 2.0);
    let after = vp.screen_to_world(screen);
    assert!(approx_eq(vp.scale, 3.0));
    assert!(point_approx_eq(before, after));
}

#[test]
fn zoom_at_clamps_to_limits() {
    let mut vp = Viewport::default();
    vp.zoom_at(Point::new(0.0, 0.0), 1000.0);
    assert_eq!(vp.scale, MAX_SCALE);
    vp.zoom_at(Point::new(0.0, 0.0), 1e-9);
    assert_eq!(vp.scale, MIN_SCALE);
}

#[test]
fn zoom_at_ignores_invalid_factor() {
    let mut vp = Viewport::default();
    vp.zoom_at(Point::new(10.0, 10.0), 0.0);
    vp.zoom_at(Point::new(10.0, 10.0), f64::NAN);
    assert_eq!(vp, Viewport::default());
}
