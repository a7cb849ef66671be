//! In-memory store: durable shapes, owner locks and ephemeral frames.
//!
//! DESIGN
//! ======
//! `MemoryStore` is the shared hub; `MemoryFacade` is one client's view of
//! one canvas and implements [`SyncFacade`]. Lock acquisition is a
//! compare-and-set under the canvas write lock using the same rule the
//! engine uses to judge editability (`canvas::lock::try_acquire`).
//!
//! Locks are advisory: a geometry write from a client that does not hold the
//! lock is still applied (last write wins). A final write only clears the
//! lock if the writer may release it, so a fresh lock taken by someone else
//! after a stale-lock override survives a late commit.
//!
//! TRADE-OFFS
//! ==========
//! Every mutation republishes the full snapshot of the affected feed. That is
//! O(shapes) per write, which is fine for an in-memory reference store and
//! keeps the feed semantics identical to "callback receives the full list".

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use canvas::doc::{CanvasId, ClientId, Shape, ShapeDraft, ShapeId, ShapePatch, TransientPosition};
use canvas::lock::{may_release, try_acquire};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::facade::{SyncError, SyncFacade, TransientMap};
use crate::state::{CanvasState, StoreState};

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    u64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// STORE
// =============================================================================

/// Shared in-memory backend. Clone to share between clients.
#[derive(Clone)]
pub struct MemoryStore {
    state: StoreState,
}

impl MemoryStore {
    #[must_use]
    pub fn new(stale_lock_ms: u64) -> Self {
        Self { state: StoreState::new(stale_lock_ms) }
    }

    /// Open a facade for `client_id` on `canvas_id`, creating the canvas if needed.
    pub async fn connect(&self, canvas_id: CanvasId, client_id: ClientId) -> MemoryFacade {
        let mut canvases = self.state.canvases.write().await;
        let canvas = canvases.entry(canvas_id).or_default();
        let shapes_rx = canvas.subscribe_shapes();
        let transients_rx = canvas.subscribe_transients();
        info!(%canvas_id, %client_id, "client connected");
        MemoryFacade { state: self.state.clone(), canvas_id, client_id, shapes_rx, transients_rx }
    }

    /// Flip reachability. While offline every facade call fails with
    /// [`SyncError::Offline`]; feeds stay open but stop changing.
    pub fn set_online(&self, online: bool) {
        self.state.online.store(online, Ordering::SeqCst);
        info!(online, "store reachability changed");
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state.online.load(Ordering::SeqCst)
    }

    /// Current durable shapes of a canvas in draw order.
    pub async fn shapes(&self, canvas_id: CanvasId) -> Vec<Shape> {
        let canvases = self.state.canvases.read().await;
        canvases.get(&canvas_id).map(CanvasState::snapshot).unwrap_or_default()
    }

    /// Current ephemeral map of a canvas.
    pub async fn transients(&self, canvas_id: CanvasId) -> TransientMap {
        let canvases = self.state.canvases.read().await;
        canvases.get(&canvas_id).map(|c| c.transients.clone()).unwrap_or_default()
    }

    /// Bulk-insert shapes, bypassing locks. Used to seed a canvas.
    pub async fn seed(&self, canvas_id: CanvasId, shapes: Vec<Shape>) {
        let mut canvases = self.state.canvases.write().await;
        let canvas = canvases.entry(canvas_id).or_default();
        let count = shapes.len();
        for shape in shapes {
            canvas.shapes.insert(shape.id, shape);
        }
        canvas.publish_shapes();
        debug!(%canvas_id, count, "canvas seeded");
    }
}

// =============================================================================
// FACADE
// =============================================================================

/// One client's handle on one canvas.
pub struct MemoryFacade {
    state: StoreState,
    canvas_id: CanvasId,
    client_id: ClientId,
    shapes_rx: watch::Receiver<Vec<Shape>>,
    transients_rx: watch::Receiver<TransientMap>,
}

impl MemoryFacade {
    fn check_online(&self) -> Result<(), SyncError> {
        if self.state.online.load(Ordering::SeqCst) { Ok(()) } else { Err(SyncError::Offline) }
    }

    /// Run `f` against this facade's canvas under the write lock.
    async fn with_canvas<T>(&self, f: impl FnOnce(&mut CanvasState) -> Result<T, SyncError>) -> Result<T, SyncError> {
        self.check_online()?;
        let mut canvases = self.state.canvases.write().await;
        let canvas = canvases.entry(self.canvas_id).or_default();
        f(canvas)
    }
}

#[async_trait::async_trait]
impl SyncFacade for MemoryFacade {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    async fn create_shape(&self, draft: ShapeDraft) -> Result<Shape, SyncError> {
        let client_id = self.client_id;
        self.with_canvas(|canvas| {
            if canvas.shapes.contains_key(&draft.id) {
                return Err(SyncError::WriteFailed(format!("shape {} already exists", draft.id)));
            }
            let shape = draft.into_shape();
            canvas.shapes.insert(shape.id, shape.clone());
            canvas.publish_shapes();
            debug!(shape_id = %shape.id, %client_id, kind = ?shape.kind(), "shape created");
            Ok(shape)
        })
        .await
    }

    async fn update_shape_geometry(&self, id: ShapeId, patch: ShapePatch, is_final: bool) -> Result<(), SyncError> {
        let (client_id, stale_ms) = (self.client_id, self.state.stale_lock_ms);
        self.with_canvas(|canvas| {
            let shape = canvas.shapes.get_mut(&id).ok_or(SyncError::NotFound(id))?;
            shape.apply_patch(&patch);
            if is_final && may_release(shape.owner_lock.as_ref(), client_id, now_ms(), stale_ms) {
                shape.owner_lock = None;
            }
            canvas.publish_shapes();
            Ok(())
        })
        .await
    }

    async fn delete_shape(&self, id: ShapeId) -> Result<(), SyncError> {
        let client_id = self.client_id;
        self.with_canvas(|canvas| {
            canvas.shapes.remove(&id).ok_or(SyncError::NotFound(id))?;
            if canvas.transients.remove(&id).is_some() {
                canvas.publish_transients();
            }
            canvas.publish_shapes();
            info!(shape_id = %id, %client_id, "shape deleted");
            Ok(())
        })
        .await
    }

    async fn acquire_lock(&self, id: ShapeId) -> Result<(), SyncError> {
        let (client_id, stale_ms) = (self.client_id, self.state.stale_lock_ms);
        self.with_canvas(|canvas| {
            let shape = canvas.shapes.get_mut(&id).ok_or(SyncError::NotFound(id))?;
            let lock = try_acquire(id, shape.owner_lock.as_ref(), client_id, now_ms(), stale_ms)
                .map_err(|_| SyncError::LockDenied(id))?;
            shape.owner_lock = Some(lock);
            canvas.publish_shapes();
            Ok(())
        })
        .await
    }

    async fn release_lock(&self, id: ShapeId) -> Result<(), SyncError> {
        let (client_id, stale_ms) = (self.client_id, self.state.stale_lock_ms);
        self.with_canvas(|canvas| {
            let shape = canvas.shapes.get_mut(&id).ok_or(SyncError::NotFound(id))?;
            if shape.owner_lock.is_none() {
                return Ok(());
            }
            if !may_release(shape.owner_lock.as_ref(), client_id, now_ms(), stale_ms) {
                debug!(shape_id = %id, %client_id, "release ignored, lock held by another client");
                return Ok(());
            }
            shape.owner_lock = None;
            canvas.publish_shapes();
            Ok(())
        })
        .await
    }

    async fn publish_transient(&self, position: TransientPosition) -> Result<(), SyncError> {
        let client_id = self.client_id;
        self.with_canvas(|canvas| {
            let position = TransientPosition { client_id, ..position };
            canvas.transients.insert(position.shape_id, position);
            canvas.publish_transients();
            Ok(())
        })
        .await
    }

    async fn clear_transient(&self, id: ShapeId) -> Result<(), SyncError> {
        let client_id = self.client_id;
        self.with_canvas(|canvas| {
            let ours = canvas.transients.get(&id).is_some_and(|t| t.client_id == client_id);
            if ours {
                canvas.transients.remove(&id);
                canvas.publish_transients();
            }
            Ok(())
        })
        .await
    }

    fn subscribe_transient(&self) -> watch::Receiver<TransientMap> {
        self.transients_rx.clone()
    }

    fn subscribe_shapes(&self) -> watch::Receiver<Vec<Shape>> {
        self.shapes_rx.clone()
    }
}
