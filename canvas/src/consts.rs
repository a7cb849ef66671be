//! Shared numeric constants for the canvas crate.

// ── Canvas surface ──────────────────────────────────────────────

/// Width of the shared drawing surface in canvas units.
pub const CANVAS_WIDTH: f64 = 5000.0;

/// Height of the shared drawing surface in canvas units.
pub const CANVAS_HEIGHT: f64 = 5000.0;

// ── Gestures ────────────────────────────────────────────────────

/// Pointer travel (canvas units) before a press on a shape becomes a move.
pub const DRAG_THRESHOLD: f64 = 5.0;

/// Smallest width/height a resize may produce.
pub const MIN_RESIZE_SIZE: f64 = 2.0;

/// A drawn shape narrower than this is discarded on release.
pub const MIN_CREATE_WIDTH: f64 = 2.0;

/// A drawn shape shorter than this is discarded on release.
pub const MIN_CREATE_HEIGHT: f64 = 1.0;

// ── Locks ───────────────────────────────────────────────────────

/// Age after which an owner lock is considered abandoned.
pub const STALE_LOCK_MS: u64 = 30_000;

// ── Ephemeral sync throttling ───────────────────────────────────

/// Selections above this size switch to large-selection throttling.
pub const LARGE_SELECTION_THRESHOLD: usize = 20;

/// Follow-up flush delay in normal mode (one animation frame).
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Minimum spacing between ephemeral flushes for large selections.
pub const LARGE_SELECTION_INTERVAL_MS: u64 = 100;

/// Queue depth above which a flush only sends a sample of the queue.
pub const SAMPLE_QUEUE_LIMIT: usize = 10;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for resize handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the bounding box top edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

// ── Viewport ────────────────────────────────────────────────────

/// Lowest allowed viewport scale.
pub const MIN_SCALE: f64 = 0.1;

/// Highest allowed viewport scale.
pub const MAX_SCALE: f64 = 10.0;

/// Scale factor applied per 100px of wheel travel.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Shape defaults ──────────────────────────────────────────────

/// Inner-to-outer radius ratio for newly drawn stars.
pub const STAR_INNER_RATIO: f64 = 0.5;

/// Point count for newly drawn stars.
pub const STAR_POINTS: u32 = 5;

/// Font size for newly drawn text boxes.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Placeholder content for newly drawn text boxes.
pub const DEFAULT_TEXT: &str = "Text";

/// Default fill color for new shapes.
pub const DEFAULT_FILL: &str = "#D94B4B";

/// Default stroke color for new shapes.
pub const DEFAULT_STROKE: &str = "#1F1A17";

/// Default stroke width for new shapes.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;
