#![allow(clippy::float_cmp)]

use std::time::Duration;

use canvas::doc::{Geometry, Style};
use uuid::Uuid;

use super::*;

// =============================================================================
// Helpers
// =============================================================================

const STALE_MS: u64 = 30_000;

fn draft(x: f64, y: f64) -> ShapeDraft {
    ShapeDraft {
        id: Uuid::new_v4(),
        canvas_id: Uuid::nil(),
        x,
        y,
        geometry: Geometry::Rectangle { width: 50.0, height: 50.0 },
        style: Style::default(),
        z_index: 0,
    }
}

fn frame(shape_id: ShapeId, x: f64) -> TransientPosition {
    TransientPosition { shape_id, client_id: Uuid::nil(), x, y: 0.0, width: None, height: None, rotation: None }
}

async fn two_clients(store: &MemoryStore) -> (MemoryFacade, MemoryFacade) {
    let canvas_id = Uuid::nil();
    let a = store.connect(canvas_id, Uuid::from_u128(1)).await;
    let b = store.connect(canvas_id, Uuid::from_u128(2)).await;
    (a, b)
}

// =============================================================================
// Durable writes
// =============================================================================

#[tokio::test]
async fn create_is_visible_to_every_client() {
    let store = MemoryStore::new(STALE_MS);
    let (a, b) = two_clients(&store).await;
    let mut feed = b.subscribe_shapes();
    let shape = a.create_shape(draft(10.0, 20.0)).await.unwrap();
    feed.changed().await.unwrap();
    assert_eq!(feed.borrow().as_slice(), std::slice::from_ref(&shape));
    assert_eq!(store.shapes(Uuid::nil()).await, vec![shape]);
}

#[tokio::test]
async fn duplicate_create_fails() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let d = draft(0.0, 0.0);
    a.create_shape(d.clone()).await.unwrap();
    let err = a.create_shape(d).await.unwrap_err();
    assert!(matches!(err, SyncError::WriteFailed(_)));
}

#[tokio::test]
async fn update_applies_patch() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    let patch = ShapePatch { x: Some(300.0), ..ShapePatch::default() };
    a.update_shape_geometry(shape.id, patch, false).await.unwrap();
    assert_eq!(store.shapes(Uuid::nil()).await[0].x, 300.0);
}

#[tokio::test]
async fn update_of_missing_shape_is_not_found() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let id = Uuid::new_v4();
    let err = a.update_shape_geometry(id, ShapePatch::default(), true).await.unwrap_err();
    assert_eq!(err, SyncError::NotFound(id));
}

#[tokio::test]
async fn delete_removes_shape_and_its_transient() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    a.publish_transient(frame(shape.id, 5.0)).await.unwrap();
    a.delete_shape(shape.id).await.unwrap();
    assert!(store.shapes(Uuid::nil()).await.is_empty());
    assert!(store.transients(Uuid::nil()).await.is_empty());
    assert_eq!(a.delete_shape(shape.id).await, Err(SyncError::NotFound(shape.id)));
}

// =============================================================================
// Locks
// =============================================================================

#[tokio::test]
async fn second_client_is_denied_until_release() {
    let store = MemoryStore::new(STALE_MS);
    let (a, b) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    a.acquire_lock(shape.id).await.unwrap();
    assert_eq!(b.acquire_lock(shape.id).await, Err(SyncError::LockDenied(shape.id)));

    // Someone else's lock is not ours to release.
    b.release_lock(shape.id).await.unwrap();
    assert_eq!(b.acquire_lock(shape.id).await, Err(SyncError::LockDenied(shape.id)));

    a.release_lock(shape.id).await.unwrap();
    b.acquire_lock(shape.id).await.unwrap();
    let holder = store.shapes(Uuid::nil()).await[0].lock_holder();
    assert_eq!(holder, Some(b.client_id()));
}

#[tokio::test]
async fn reacquiring_own_lock_is_granted() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    a.acquire_lock(shape.id).await.unwrap();
    a.acquire_lock(shape.id).await.unwrap();
}

#[tokio::test]
async fn stale_lock_is_taken_over() {
    let store = MemoryStore::new(0);
    let (a, b) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    a.acquire_lock(shape.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    b.acquire_lock(shape.id).await.unwrap();
    assert_eq!(store.shapes(Uuid::nil()).await[0].lock_holder(), Some(b.client_id()));
}

#[tokio::test]
async fn final_update_clears_own_lock() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    a.acquire_lock(shape.id).await.unwrap();
    a.update_shape_geometry(shape.id, ShapePatch { x: Some(1.0), ..ShapePatch::default() }, false)
        .await
        .unwrap();
    assert!(store.shapes(Uuid::nil()).await[0].owner_lock.is_some());
    a.update_shape_geometry(shape.id, ShapePatch { x: Some(2.0), ..ShapePatch::default() }, true)
        .await
        .unwrap();
    assert!(store.shapes(Uuid::nil()).await[0].owner_lock.is_none());
}

#[tokio::test]
async fn late_final_write_keeps_other_clients_lock() {
    let store = MemoryStore::new(STALE_MS);
    let (a, b) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    b.acquire_lock(shape.id).await.unwrap();
    a.update_shape_geometry(shape.id, ShapePatch { x: Some(9.0), ..ShapePatch::default() }, true)
        .await
        .unwrap();
    let stored = &store.shapes(Uuid::nil()).await[0];
    assert_eq!(stored.x, 9.0);
    assert_eq!(stored.lock_holder(), Some(b.client_id()));
}

// =============================================================================
// Ephemeral
// =============================================================================

#[tokio::test]
async fn transient_is_stamped_with_sender() {
    let store = MemoryStore::new(STALE_MS);
    let (a, b) = two_clients(&store).await;
    let mut feed = b.subscribe_transient();
    let id = Uuid::new_v4();
    a.publish_transient(frame(id, 42.0)).await.unwrap();
    feed.changed().await.unwrap();
    let seen = feed.borrow().get(&id).cloned().unwrap();
    assert_eq!(seen.client_id, a.client_id());
    assert_eq!(seen.x, 42.0);
}

#[tokio::test]
async fn clear_only_removes_own_entry() {
    let store = MemoryStore::new(STALE_MS);
    let (a, b) = two_clients(&store).await;
    let id = Uuid::new_v4();
    a.publish_transient(frame(id, 1.0)).await.unwrap();
    b.clear_transient(id).await.unwrap();
    assert!(store.transients(Uuid::nil()).await.contains_key(&id));
    a.clear_transient(id).await.unwrap();
    assert!(store.transients(Uuid::nil()).await.is_empty());
}

// =============================================================================
// Reachability
// =============================================================================

#[tokio::test]
async fn offline_store_rejects_every_call() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let shape = a.create_shape(draft(0.0, 0.0)).await.unwrap();
    store.set_online(false);
    assert!(!store.is_online());
    assert_eq!(a.acquire_lock(shape.id).await, Err(SyncError::Offline));
    assert_eq!(a.publish_transient(frame(shape.id, 1.0)).await, Err(SyncError::Offline));
    assert!(matches!(a.create_shape(draft(1.0, 1.0)).await, Err(SyncError::Offline)));

    store.set_online(true);
    a.acquire_lock(shape.id).await.unwrap();
}

#[tokio::test]
async fn seed_publishes_in_draw_order() {
    let store = MemoryStore::new(STALE_MS);
    let (a, _) = two_clients(&store).await;
    let mut feed = a.subscribe_shapes();
    let mut low = draft(0.0, 0.0).into_shape();
    low.z_index = 1;
    let mut high = draft(10.0, 0.0).into_shape();
    high.z_index = 5;
    store.seed(Uuid::nil(), vec![high.clone(), low.clone()]).await;
    feed.changed().await.unwrap();
    let ids: Vec<ShapeId> = feed.borrow().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![low.id, high.id]);
}
