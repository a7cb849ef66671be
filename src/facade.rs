//! Sync facade: the only way the host reaches the durable and ephemeral stores.
//!
//! DESIGN
//! ======
//! One async trait covers both stores so the client driver can be tested
//! against a mock. Durable writes (`create_shape`, `update_shape_geometry`,
//! `delete_shape`, locks) are authoritative; ephemeral writes
//! (`publish_transient`, `clear_transient`) are best-effort broadcasts.
//! Both change feeds are `watch` channels carrying the full current state,
//! so a slow subscriber only ever sees the latest snapshot.
//!
//! Retries are the implementation's business. Callers treat any error as
//! final for that write.

#[cfg(test)]
#[path = "facade_test.rs"]
mod facade_test;

use std::collections::HashMap;

use canvas::doc::{ClientId, Shape, ShapeDraft, ShapeId, ShapePatch, TransientPosition};
use tokio::sync::watch;

/// Full ephemeral state of one canvas: latest frame per shape.
pub type TransientMap = HashMap<ShapeId, TransientPosition>;

/// Async access to the stores for one client on one canvas.
#[async_trait::async_trait]
pub trait SyncFacade: Send + Sync {
    /// The client this facade writes as.
    fn client_id(&self) -> ClientId;

    /// Durable create. The draft carries the client-generated id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WriteFailed`] if a shape with that id exists.
    async fn create_shape(&self, draft: ShapeDraft) -> Result<Shape, SyncError>;

    /// Durable partial update. `is_final` also clears this client's lock.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the shape is gone.
    async fn update_shape_geometry(&self, id: ShapeId, patch: ShapePatch, is_final: bool) -> Result<(), SyncError>;

    /// Durable delete.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the shape is gone.
    async fn delete_shape(&self, id: ShapeId) -> Result<(), SyncError>;

    /// Compare-and-set lock acquire.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LockDenied`] when another client holds a live lock.
    async fn acquire_lock(&self, id: ShapeId) -> Result<(), SyncError>;

    /// Clear this client's lock. Releasing a lock someone else holds is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the shape is gone.
    async fn release_lock(&self, id: ShapeId) -> Result<(), SyncError>;

    /// Ephemeral broadcast of an in-progress frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Offline`] when the store is unreachable.
    async fn publish_transient(&self, position: TransientPosition) -> Result<(), SyncError>;

    /// Remove this client's ephemeral entry for a shape.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Offline`] when the store is unreachable.
    async fn clear_transient(&self, id: ShapeId) -> Result<(), SyncError>;

    /// Ephemeral change feed.
    fn subscribe_transient(&self) -> watch::Receiver<TransientMap>;

    /// Durable change feed.
    fn subscribe_shapes(&self) -> watch::Receiver<Vec<Shape>>;
}

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Stable machine-readable codes, mirrored by every service error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("shape {0} is locked by another client")]
    LockDenied(ShapeId),
    #[error("shape not found: {0}")]
    NotFound(ShapeId),
    #[error("sync backend is offline")]
    Offline,
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("channel closed")]
    ChannelClosed,
}

impl ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LockDenied(_) => "E_LOCK_DENIED",
            Self::NotFound(_) => "E_SHAPE_NOT_FOUND",
            Self::Offline => "E_OFFLINE",
            Self::WriteFailed(_) => "E_WRITE_FAILED",
            Self::ChannelClosed => "E_CHANNEL_CLOSED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Offline | Self::WriteFailed(_))
    }
}
