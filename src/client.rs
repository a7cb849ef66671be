//! Client driver: runs one [`EngineCore`] against a [`SyncFacade`].
//!
//! DESIGN
//! ======
//! The engine is synchronous and returns [`Action`]s. This module is the
//! event loop around it:
//!
//! - UI input arrives as [`Inbound`] messages through a [`ClientHandle`].
//! - Both change feeds are `watch` receivers polled in the same
//!   `tokio::select!`, so feed snapshots are applied between inputs and never
//!   concurrently with them.
//! - `ScheduleFlush` actions arm a single deadline (`sleep_until`) that
//!   drives the throttle.
//! - Store writes go to one writer task over an ordered `mpsc` queue, so
//!   writes for a shape reach the store in the order the engine produced
//!   them. Lock answers and write failures come back on a second queue.
//!
//! ERROR HANDLING
//! ==============
//! Lock denials are routine and logged at debug level. Any other failed
//! write is logged as a warning, the engine drops its local state for the
//! shape and asks for a best-effort lock release and transient clear, and a
//! [`Notice::SyncWriteFailed`] goes out on the notice channel. A closed feed
//! puts the client offline.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;
use std::time::Duration;

use canvas::camera::{Point, Viewport};
use canvas::config::EngineConfig;
use canvas::doc::{CanvasId, ClientId, ShapeId};
use canvas::engine::{Action, EngineCore, VisibleShape};
use canvas::input::{Modifiers, PointerEvent, Tool, WheelDelta};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::facade::{ErrorCode, SyncError, SyncFacade};
use crate::services::store::now_ms;

// =============================================================================
// MESSAGES
// =============================================================================

/// Everything the client loop reacts to, apart from the change feeds.
#[derive(Debug)]
pub enum Inbound {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    PointerLeave,
    Wheel { screen: Point, delta: WheelDelta, modifiers: Modifiers },
    SetTool(Tool),
    SelectShapes(Vec<ShapeId>),
    ClearSelection,
    SetOnline(bool),
    /// Answer to a lock acquire, from the writer.
    LockResult { id: ShapeId, granted: bool },
    /// A durable or ephemeral write failed, from the writer.
    SyncFailed { id: ShapeId, error: SyncError },
    /// Ask for a snapshot of the derived views.
    View(oneshot::Sender<ClientView>),
    Shutdown,
}

/// Advisory messages for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Non-blocking banner: a write did not make it.
    SyncWriteFailed { id: ShapeId, code: &'static str },
    Offline,
    Online,
    /// The engine switched tools on its own.
    ToolChanged(Tool),
}

/// Derived views at one instant.
#[derive(Debug, Clone)]
pub struct ClientView {
    pub visible: Vec<VisibleShape>,
    pub selection: Vec<ShapeId>,
    pub tool: Tool,
    pub viewport: Viewport,
    pub online: bool,
    pub gesture_active: bool,
    pub render_requests: u64,
    pub debug: serde_json::Value,
}

impl ClientView {
    /// The visible entry for `id`, if any.
    #[must_use]
    pub fn shape(&self, id: &ShapeId) -> Option<&VisibleShape> {
        self.visible.iter().find(|v| v.shape.id == *id)
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cheap, cloneable sender side of a running client.
#[derive(Clone)]
pub struct ClientHandle {
    client_id: ClientId,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl ClientHandle {
    #[must_use]
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn send(&self, msg: Inbound) -> Result<(), SyncError> {
        self.tx.send(msg).map_err(|_| SyncError::ChannelClosed)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn pointer_down(&self, x: f64, y: f64) -> Result<(), SyncError> {
        self.send(Inbound::PointerDown(PointerEvent::at(x, y, now_ms())))
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn pointer_move(&self, x: f64, y: f64) -> Result<(), SyncError> {
        self.send(Inbound::PointerMove(PointerEvent::at(x, y, now_ms())))
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn pointer_up(&self, x: f64, y: f64) -> Result<(), SyncError> {
        self.send(Inbound::PointerUp(PointerEvent::at(x, y, now_ms())))
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn pointer_leave(&self) -> Result<(), SyncError> {
        self.send(Inbound::PointerLeave)
    }

    /// Scroll at screen position `(x, y)`; with `zoom` the wheel zooms instead of panning.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn wheel(&self, x: f64, y: f64, dy: f64, zoom: bool) -> Result<(), SyncError> {
        let modifiers = Modifiers { ctrl: zoom, ..Modifiers::default() };
        self.send(Inbound::Wheel { screen: Point::new(x, y), delta: WheelDelta { dx: 0.0, dy }, modifiers })
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn set_tool(&self, tool: Tool) -> Result<(), SyncError> {
        self.send(Inbound::SetTool(tool))
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn select_shapes(&self, ids: Vec<ShapeId>) -> Result<(), SyncError> {
        self.send(Inbound::SelectShapes(ids))
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn clear_selection(&self) -> Result<(), SyncError> {
        self.send(Inbound::ClearSelection)
    }

    /// Report host connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub fn set_online(&self, online: bool) -> Result<(), SyncError> {
        self.send(Inbound::SetOnline(online))
    }

    /// Snapshot of the client's derived views.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has stopped.
    pub async fn view(&self) -> Result<ClientView, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.send(Inbound::View(reply))?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] if the client has already stopped.
    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.send(Inbound::Shutdown)
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Start a client on `canvas_id`. Returns its handle, the notice stream and
/// the loop's task handle.
pub fn spawn_client<F>(
    facade: F,
    canvas_id: CanvasId,
    config: EngineConfig,
) -> (ClientHandle, mpsc::UnboundedReceiver<Notice>, JoinHandle<()>)
where
    F: SyncFacade + 'static,
{
    let facade = Arc::new(facade);
    let client_id = facade.client_id();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (notice_tx, notice_rx) = mpsc::unbounded_channel();

    let writer = spawn_writer(Arc::clone(&facade), outbound_rx, results_tx);
    let client = CanvasClient {
        engine: EngineCore::new(client_id, canvas_id, config),
        facade,
        inbound_rx,
        results_rx,
        outbound_tx,
        notices: notice_tx,
        deadline: None,
        render_requests: 0,
        writer,
    };
    let task = tokio::spawn(client.run());
    (ClientHandle { client_id, tx: inbound_tx }, notice_rx, task)
}

struct CanvasClient<F: SyncFacade> {
    engine: EngineCore,
    facade: Arc<F>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    results_rx: mpsc::UnboundedReceiver<Inbound>,
    outbound_tx: mpsc::UnboundedSender<Action>,
    notices: mpsc::UnboundedSender<Notice>,
    /// Earliest pending throttle flush.
    deadline: Option<Instant>,
    render_requests: u64,
    writer: JoinHandle<()>,
}

impl<F: SyncFacade + 'static> CanvasClient<F> {
    async fn run(mut self) {
        let mut shapes_rx = self.facade.subscribe_shapes();
        let mut transients_rx = self.facade.subscribe_transient();

        let shapes = shapes_rx.borrow_and_update().clone();
        let actions = self.engine.apply_shapes(shapes, now_ms());
        self.dispatch(actions);
        let transients = transients_rx.borrow_and_update().clone();
        let actions = self.engine.apply_transients(transients);
        self.dispatch(actions);

        let client_id = self.engine.client_id;
        let mut feeds_open = true;
        info!(%client_id, canvas_id = %self.engine.canvas_id, "client started");

        loop {
            let deadline = self.deadline;
            tokio::select! {
                msg = self.inbound_rx.recv() => match msg {
                    None | Some(Inbound::Shutdown) => break,
                    Some(msg) => self.handle(msg),
                },
                Some(msg) = self.results_rx.recv() => self.handle(msg),
                changed = shapes_rx.changed(), if feeds_open => {
                    if changed.is_ok() {
                        let shapes = shapes_rx.borrow_and_update().clone();
                        let actions = self.engine.apply_shapes(shapes, now_ms());
                        self.dispatch(actions);
                    } else {
                        feeds_open = false;
                        self.feed_closed();
                    }
                }
                changed = transients_rx.changed(), if feeds_open => {
                    if changed.is_ok() {
                        let transients = transients_rx.borrow_and_update().clone();
                        let actions = self.engine.apply_transients(transients);
                        self.dispatch(actions);
                    } else {
                        feeds_open = false;
                        self.feed_closed();
                    }
                }
                () = wait_until(deadline) => {
                    self.deadline = None;
                    let actions = self.engine.on_flush_timer(now_ms());
                    self.dispatch(actions);
                }
            }
        }

        // Let queued writes drain before the writer sees its queue close.
        drop(self.outbound_tx);
        if let Err(e) = self.writer.await {
            warn!(%client_id, error = %e, "writer task failed");
        }
        info!(%client_id, "client stopped");
    }

    fn handle(&mut self, msg: Inbound) {
        let now = now_ms();
        let actions = match msg {
            Inbound::PointerDown(event) => self.engine.on_pointer_down(event),
            Inbound::PointerMove(event) => self.engine.on_pointer_move(event),
            Inbound::PointerUp(event) => self.engine.on_pointer_up(event),
            Inbound::PointerLeave => self.engine.on_pointer_leave(now),
            Inbound::Wheel { screen, delta, modifiers } => self.engine.on_wheel(screen, delta, modifiers),
            Inbound::SetTool(tool) => self.engine.set_tool(tool, now),
            Inbound::SelectShapes(ids) => self.engine.select_shapes(&ids, now),
            Inbound::ClearSelection => self.engine.clear_selection(now),
            Inbound::SetOnline(online) => {
                if online != self.engine.ui.online {
                    self.notify(if online { Notice::Online } else { Notice::Offline });
                }
                self.engine.set_online(online, now)
            }
            Inbound::LockResult { id, granted } => self.engine.on_lock_result(id, granted, now),
            Inbound::SyncFailed { id, error } => {
                warn!(
                    shape_id = %id,
                    error = %error,
                    code = error.error_code(),
                    retryable = error.retryable(),
                    "sync write failed"
                );
                self.notify(Notice::SyncWriteFailed { id, code: error.error_code() });
                self.engine.on_sync_failed(id, now)
            }
            Inbound::View(reply) => {
                if reply.send(self.view(now)).is_err() {
                    debug!("view requester went away");
                }
                Vec::new()
            }
            Inbound::Shutdown => Vec::new(),
        };
        self.dispatch(actions);
    }

    /// Route engine actions: timers and notices stay here, writes go to the writer.
    fn dispatch(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::ScheduleFlush { at_ms } => {
                    let at = Instant::now() + Duration::from_millis(at_ms.saturating_sub(now_ms()));
                    self.deadline = Some(self.deadline.map_or(at, |d| d.min(at)));
                }
                Action::ToolChanged(tool) => self.notify(Notice::ToolChanged(tool)),
                Action::RenderNeeded => self.render_requests += 1,
                write => {
                    if self.outbound_tx.send(write).is_err() {
                        warn!(client_id = %self.engine.client_id, "writer stopped, dropping write");
                    }
                }
            }
        }
    }

    fn feed_closed(&mut self) {
        warn!(client_id = %self.engine.client_id, "change feed closed, going offline");
        if self.engine.ui.online {
            self.notify(Notice::Offline);
        }
        let actions = self.engine.set_online(false, now_ms());
        self.dispatch(actions);
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("notice receiver dropped");
        }
    }

    fn view(&self, now: u64) -> ClientView {
        ClientView {
            visible: self.engine.visible_shapes(now),
            selection: self.engine.active_selection().to_vec(),
            tool: self.engine.tool(),
            viewport: self.engine.viewport(),
            online: self.engine.ui.online,
            gesture_active: self.engine.session().is_some(),
            render_requests: self.render_requests,
            debug: self.engine.debug_snapshot(),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// =============================================================================
// WRITER
// =============================================================================

/// Execute store writes one at a time, in queue order.
fn spawn_writer<F>(
    facade: Arc<F>,
    mut rx: mpsc::UnboundedReceiver<Action>,
    results: mpsc::UnboundedSender<Inbound>,
) -> JoinHandle<()>
where
    F: SyncFacade + 'static,
{
    tokio::spawn(async move {
        while let Some(action) = rx.recv().await {
            if let Some(reply) = execute(facade.as_ref(), action).await {
                if results.send(reply).is_err() {
                    debug!("client loop gone, dropping write result");
                }
            }
        }
    })
}

/// Perform one write. Returns the message the client loop must see, if any.
async fn execute<F: SyncFacade + ?Sized>(facade: &F, action: Action) -> Option<Inbound> {
    match action {
        Action::CreateShape(draft) => {
            let id = draft.id;
            facade.create_shape(draft).await.err().map(|error| Inbound::SyncFailed { id, error })
        }
        Action::UpdateGeometry { id, patch, is_final } => {
            failure(id, facade.update_shape_geometry(id, patch, is_final).await)
        }
        Action::DeleteShape { id } => failure(id, facade.delete_shape(id).await),
        Action::AcquireLock { id } => {
            let granted = match facade.acquire_lock(id).await {
                Ok(()) => true,
                Err(SyncError::LockDenied(_)) => {
                    debug!(shape_id = %id, "lock denied");
                    false
                }
                Err(e) => {
                    warn!(shape_id = %id, error = %e, "lock acquire failed");
                    false
                }
            };
            Some(Inbound::LockResult { id, granted })
        }
        Action::ReleaseLock { id } => {
            if let Err(e) = facade.release_lock(id).await {
                debug!(shape_id = %id, error = %e, "best-effort lock release failed");
            }
            None
        }
        Action::PublishTransient(position) => {
            let id = position.shape_id;
            failure(id, facade.publish_transient(position).await)
        }
        Action::ClearTransient { id } => {
            if let Err(e) = facade.clear_transient(id).await {
                debug!(shape_id = %id, error = %e, "best-effort transient clear failed");
            }
            None
        }
        Action::ScheduleFlush { .. } | Action::ToolChanged(_) | Action::RenderNeeded => None,
    }
}

fn failure(id: ShapeId, result: Result<(), SyncError>) -> Option<Inbound> {
    result.err().map(|error| Inbound::SyncFailed { id, error })
}
