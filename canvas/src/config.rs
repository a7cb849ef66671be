//! Tunable limits consumed by the engine.
//!
//! Defaults come from [`crate::consts`]. The host may override any of them
//! (the runtime crate reads them from the environment).

use serde::{Deserialize, Serialize};

use crate::consts::{
    CANVAS_HEIGHT, CANVAS_WIDTH, DRAG_THRESHOLD, FRAME_INTERVAL_MS, LARGE_SELECTION_INTERVAL_MS,
    LARGE_SELECTION_THRESHOLD, MIN_CREATE_HEIGHT, MIN_CREATE_WIDTH, MIN_RESIZE_SIZE, SAMPLE_QUEUE_LIMIT,
    STALE_LOCK_MS,
};

/// Every limit the engine enforces, bundled so tests can shrink or stretch them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Canvas width in canvas units.
    pub canvas_width: f64,
    /// Canvas height in canvas units.
    pub canvas_height: f64,
    /// Travel before a press becomes a move.
    pub drag_threshold: f64,
    /// Minimum width/height a resize may produce.
    pub min_resize_size: f64,
    /// Minimum width for a drawn shape to be kept.
    pub min_create_width: f64,
    /// Minimum height for a drawn shape to be kept.
    pub min_create_height: f64,
    /// Age in milliseconds after which a lock is abandoned.
    pub stale_lock_ms: u64,
    /// Selection size above which large-selection throttling applies.
    pub large_selection_threshold: usize,
    /// Follow-up flush delay in normal mode.
    pub frame_interval_ms: u64,
    /// Minimum spacing between flushes in large-selection mode.
    pub large_selection_interval_ms: u64,
    /// Queue depth above which flushes are sampled.
    pub sample_queue_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            drag_threshold: DRAG_THRESHOLD,
            min_resize_size: MIN_RESIZE_SIZE,
            min_create_width: MIN_CREATE_WIDTH,
            min_create_height: MIN_CREATE_HEIGHT,
            stale_lock_ms: STALE_LOCK_MS,
            large_selection_threshold: LARGE_SELECTION_THRESHOLD,
            frame_interval_ms: FRAME_INTERVAL_MS,
            large_selection_interval_ms: LARGE_SELECTION_INTERVAL_MS,
            sample_queue_limit: SAMPLE_QUEUE_LIMIT,
        }
    }
}
