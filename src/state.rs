//! Shared store state.
//!
//! DESIGN
//! ======
//! `StoreState` holds one `CanvasState` per canvas behind a single
//! `RwLock`. Each canvas owns its durable shapes, its ephemeral transient
//! map, and a `watch` sender per feed. Every mutation ends with a publish so
//! subscribers always see a full, consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use canvas::doc::{CanvasId, Shape, ShapeId};
use tokio::sync::{RwLock, watch};

use crate::facade::TransientMap;

// =============================================================================
// CANVAS STATE
// =============================================================================

/// Per-canvas durable and ephemeral state plus its change feeds.
pub struct CanvasState {
    /// Durable shapes keyed by id. Lock records live on the shapes.
    pub shapes: HashMap<ShapeId, Shape>,
    /// Ephemeral frames keyed by shape.
    pub transients: TransientMap,
    shapes_tx: watch::Sender<Vec<Shape>>,
    transients_tx: watch::Sender<TransientMap>,
}

impl CanvasState {
    #[must_use]
    pub fn new() -> Self {
        let (shapes_tx, _) = watch::channel(Vec::new());
        let (transients_tx, _) = watch::channel(HashMap::new());
        Self { shapes: HashMap::new(), transients: HashMap::new(), shapes_tx, transients_tx }
    }

    /// Shapes in draw order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Shape> {
        let mut shapes: Vec<Shape> = self.shapes.values().cloned().collect();
        shapes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        shapes
    }

    /// Push the current shape list to durable subscribers.
    pub fn publish_shapes(&self) {
        self.shapes_tx.send_replace(self.snapshot());
    }

    /// Push the current transient map to ephemeral subscribers.
    pub fn publish_transients(&self) {
        self.transients_tx.send_replace(self.transients.clone());
    }

    #[must_use]
    pub fn subscribe_shapes(&self) -> watch::Receiver<Vec<Shape>> {
        self.shapes_tx.subscribe()
    }

    #[must_use]
    pub fn subscribe_transients(&self) -> watch::Receiver<TransientMap> {
        self.transients_tx.subscribe()
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// STORE STATE
// =============================================================================

/// Shared store state. Clone is cheap; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct StoreState {
    pub canvases: Arc<RwLock<HashMap<CanvasId, CanvasState>>>,
    /// Reachability switch. While false every facade call fails.
    pub online: Arc<AtomicBool>,
    pub stale_lock_ms: u64,
}

impl StoreState {
    #[must_use]
    pub fn new(stale_lock_ms: u64) -> Self {
        Self {
            canvases: Arc::new(RwLock::new(HashMap::new())),
            online: Arc::new(AtomicBool::new(true)),
            stale_lock_ms,
        }
    }
}
