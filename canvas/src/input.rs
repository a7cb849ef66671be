//! Input model: tools, modifier keys, pointer events, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is whatever is being tracked between pointer-down and
//! pointer-up; edits of existing shapes carry a full
//! [`InteractionSession`](crate::session::InteractionSession). `UiState` is
//! the persistent, renderer-visible part: active tool, selection, marquee,
//! connectivity and the locks this client believes it holds.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::{ShapeId, ShapeKind};
use crate::geometry::Rect;
use crate::session::InteractionSession;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tool {
    /// Drag to pan the viewport. The only tool available offline.
    Pan,
    /// Click, shift-click and marquee selection; handles resize and rotate.
    #[default]
    Select,
    /// Drag shapes.
    Move,
    /// Drag a corner to resize.
    Resize,
    /// Drag to rotate around the shape's center.
    Rotate,
    CreateRectangle,
    CreateCircle,
    CreateStar,
    CreateText,
    /// Click a shape to delete it.
    Delete,
}

impl Tool {
    pub const ALL: [Tool; 10] = [
        Tool::Pan,
        Tool::Select,
        Tool::Move,
        Tool::Resize,
        Tool::Rotate,
        Tool::CreateRectangle,
        Tool::CreateCircle,
        Tool::CreateStar,
        Tool::CreateText,
        Tool::Delete,
    ];

    /// The shape kind a creation tool draws.
    #[must_use]
    pub fn creates(self) -> Option<ShapeKind> {
        match self {
            Self::CreateRectangle => Some(ShapeKind::Rectangle),
            Self::CreateCircle => Some(ShapeKind::Circle),
            Self::CreateStar => Some(ShapeKind::Star),
            Self::CreateText => Some(ShapeKind::Text),
            Self::Pan | Self::Select | Self::Move | Self::Resize | Self::Rotate | Self::Delete => None,
        }
    }

    /// Whether the tool can change the document. Editing tools are disabled
    /// while offline.
    #[must_use]
    pub fn edits(self) -> bool {
        !matches!(self, Self::Pan)
    }
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    #[must_use]
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    #[default]
    Primary,
    /// Middle mouse button. Pans regardless of the active tool.
    Middle,
    /// Right mouse button. Ignored.
    Secondary,
}

/// Wheel / trackpad scroll delta in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive scrolls down.
    pub dy: f64,
}

/// One pointer event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Position in screen pixels.
    pub screen: Point,
    pub button: Button,
    pub modifiers: Modifiers,
    /// Host clock in milliseconds; drives throttling and lock expiry.
    pub time_ms: u64,
}

impl PointerEvent {
    /// Primary-button event with no modifiers.
    #[must_use]
    pub fn at(x: f64, y: f64, time_ms: u64) -> Self {
        Self { screen: Point::new(x, y), button: Button::Primary, modifiers: Modifiers::default(), time_ms }
    }

    #[must_use]
    pub fn with_modifiers(self, modifiers: Modifiers) -> Self {
        Self { modifiers, ..self }
    }

    #[must_use]
    pub fn with_button(self, button: Button) -> Self {
        Self { button, ..self }
    }
}

/// What the pointer is doing between down and up.
#[derive(Debug, Clone, Default, Serialize)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the viewport.
    Panning {
        /// Screen position at the previous event.
        last_screen: Point,
    },
    /// Rubber-band selection from `origin` (canvas units).
    Marquee {
        origin: Point,
        /// Shift was held: add to the selection instead of replacing it.
        additive: bool,
    },
    /// Drawing a new shape between `anchor` and `current` (canvas units).
    Drawing { kind: ShapeKind, anchor: Point, current: Point },
    /// Pointer went down on a shape with the delete tool.
    Deleting { id: ShapeId },
    /// Editing existing shapes.
    Gesture(InteractionSession),
}

impl InputState {
    #[must_use]
    pub fn session(&self) -> Option<&InteractionSession> {
        match self {
            Self::Gesture(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut InteractionSession> {
        match self {
            Self::Gesture(session) => Some(session),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct UiState {
    pub tool: Tool,
    /// Selected shapes in selection order.
    pub selection: Vec<ShapeId>,
    /// Marquee rectangle being dragged, canvas units.
    pub marquee: Option<Rect>,
    /// Whether the backend is reachable.
    pub online: bool,
    /// Locks granted to this client and not yet released.
    pub held_locks: BTreeSet<ShapeId>,
    /// Shape whose lock is kept between consecutive resize gestures.
    pub retained_lock: Option<ShapeId>,
    /// Shapes excluded from the current gesture because another client holds them.
    pub locked_by_other: BTreeSet<ShapeId>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            selection: Vec::new(),
            marquee: None,
            online: true,
            held_locks: BTreeSet::new(),
            retained_lock: None,
            locked_by_other: BTreeSet::new(),
        }
    }
}

impl UiState {
    #[must_use]
    pub fn is_selected(&self, id: &ShapeId) -> bool {
        self.selection.contains(id)
    }

    /// The selected shape when exactly one is selected.
    #[must_use]
    pub fn single_selection(&self) -> Option<ShapeId> {
        match self.selection.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Remove a shape from the selection, keeping order.
    pub fn deselect(&mut self, id: &ShapeId) {
        self.selection.retain(|s| s != id);
    }
}
