//! Scripted two-client session against the in-memory store.
//!
//! Alice draws a rectangle and drags it while Bob watches the live frames
//! and is refused when he tries to grab it. Then a row of shapes is seeded,
//! Alice drags the whole group (exercising the large-selection throttle),
//! the store drops off the network for a moment, and both clients shut down.

use std::time::Duration;

use canvas::doc::{CanvasId, Geometry, Shape, Style};
use canvas::engine::ShapeSource;
use canvas::input::Tool;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{ClientHandle, ClientView, Notice, spawn_client};
use crate::config::AppConfig;
use crate::facade::SyncError;
use crate::services::store::MemoryStore;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const WAIT_LIMIT: Duration = Duration::from_secs(5);
const GROUP_ROW: f64 = 1000.0;
const GROUP_COLUMNS: usize = 40;
const GROUP_SPACING: f64 = 60.0;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("client task failed: {0}")]
    Join(#[from] JoinError),
}

/// Run the whole script.
///
/// # Errors
///
/// Fails if a client stops early or the store never reaches an expected state.
pub async fn run(store: MemoryStore, config: AppConfig) -> Result<(), DemoError> {
    let canvas_id = Uuid::new_v4();
    let (alice, alice_notices, alice_task) =
        spawn_client(store.connect(canvas_id, Uuid::new_v4()).await, canvas_id, config.engine);
    let (bob, bob_notices, bob_task) =
        spawn_client(store.connect(canvas_id, Uuid::new_v4()).await, canvas_id, config.engine);
    let alice_log = tokio::spawn(log_notices("alice", alice_notices));
    let bob_log = tokio::spawn(log_notices("bob", bob_notices));
    info!(%canvas_id, alice = %alice.client_id(), bob = %bob.client_id(), "demo started");

    // --- Draw ---
    alice.set_tool(Tool::CreateRectangle)?;
    alice.pointer_down(100.0, 100.0)?;
    alice.pointer_move(150.0, 150.0)?;
    alice.pointer_up(200.0, 200.0)?;
    let shapes = store_until(&store, canvas_id, "rectangle creation", |s| s.len() == 1).await?;
    let rect_id = shapes[0].id;
    info!(shape_id = %rect_id, x = shapes[0].x, y = shapes[0].y, "rectangle created");

    // --- Locked drag watched by a peer ---
    alice.pointer_down(150.0, 150.0)?;
    let alice_id = alice.client_id();
    store_until(&store, canvas_id, "alice's lock", |s| s[0].lock_holder() == Some(alice_id)).await?;
    alice.pointer_move(400.0, 300.0)?;

    let seen = view_until(&bob, "bob to see the live frame", |v| {
        v.shape(&rect_id).is_some_and(|s| s.source == ShapeSource::Transient)
    })
    .await?;
    if let Some(live) = seen.shape(&rect_id) {
        info!(x = live.shape.x, y = live.shape.y, locked = live.locked_by_other, "bob sees alice dragging");
    }

    bob.pointer_down(150.0, 150.0)?;
    let refused = bob.view().await?;
    info!(selected = refused.selection.len(), gesture = refused.gesture_active, "bob's press was refused");
    bob.pointer_up(150.0, 150.0)?;
    bob.pointer_leave()?;

    alice.pointer_up(400.0, 300.0)?;
    let shapes = store_until(&store, canvas_id, "drag commit", |s| s[0].owner_lock.is_none() && s[0].x > 100.0).await?;
    info!(x = shapes[0].x, y = shapes[0].y, "drag committed and lock released");

    // --- Large group drag ---
    if config.demo_shapes > 0 {
        group_drag(&store, canvas_id, &alice, config.demo_shapes).await?;
    }

    // --- Connectivity blip ---
    store.set_online(false);
    bob.set_online(false)?;
    bob.wheel(400.0, 300.0, -120.0, true)?;
    let offline = bob.view().await?;
    info!(online = offline.online, store_online = store.is_online(), scale = offline.viewport.scale, "bob offline");
    store.set_online(true);
    bob.set_online(true)?;

    // --- Wrap up ---
    alice.clear_selection()?;
    log_view("alice", &alice.view().await?);
    log_view("bob", &bob.view().await?);
    for shape in store.shapes(canvas_id).await {
        debug!(shape_id = %shape.id, kind = ?shape.kind(), x = shape.x, y = shape.y, "durable shape");
    }
    info!(
        shapes = store.shapes(canvas_id).await.len(),
        transients = store.transients(canvas_id).await.len(),
        "final canvas state"
    );

    alice.shutdown()?;
    bob.shutdown()?;
    alice_task.await?;
    bob_task.await?;
    alice_log.await?;
    bob_log.await?;
    info!("demo finished");
    Ok(())
}

async fn group_drag(store: &MemoryStore, canvas_id: CanvasId, alice: &ClientHandle, count: usize) -> Result<(), DemoError> {
    let mut shapes = Vec::with_capacity(count);
    let (mut x, mut y) = (100.0, GROUP_ROW);
    for i in 0..count {
        if i > 0 && i % GROUP_COLUMNS == 0 {
            x = 100.0;
            y += GROUP_SPACING;
        }
        shapes.push(Shape {
            id: Uuid::new_v4(),
            canvas_id,
            x,
            y,
            geometry: Geometry::Rectangle { width: 40.0, height: 40.0 },
            rotation: 0.0,
            style: Style::default(),
            z_index: 1,
            owner_lock: None,
        });
        x += GROUP_SPACING;
    }
    let ids: Vec<_> = shapes.iter().map(|s| s.id).collect();
    store.seed(canvas_id, shapes).await;
    view_until(alice, "seeded shapes", |v| ids.iter().all(|id| v.shape(id).is_some())).await?;

    alice.select_shapes(ids.clone())?;
    alice.pointer_down(110.0, GROUP_ROW + 10.0)?;
    let alice_id = alice.client_id();
    store_until(store, canvas_id, "group locks", |s| {
        s.iter().filter(|shape| ids.contains(&shape.id)).all(|shape| shape.lock_holder() == Some(alice_id))
    })
    .await?;
    alice.pointer_move(110.0, GROUP_ROW + 210.0)?;

    let wanted = ids.len();
    let started = tokio::time::Instant::now();
    while store.transients(canvas_id).await.len() < wanted {
        if started.elapsed() > WAIT_LIMIT {
            return Err(DemoError::Timeout("group transients"));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    info!(count = wanted, elapsed = ?started.elapsed(), "group frames drained through throttle");

    alice.pointer_up(110.0, GROUP_ROW + 210.0)?;
    store_until(store, canvas_id, "group commit", |s| s.iter().all(|shape| shape.owner_lock.is_none())).await?;
    info!(count = wanted, "group move committed");
    Ok(())
}

async fn store_until(
    store: &MemoryStore,
    canvas_id: CanvasId,
    what: &'static str,
    pred: impl Fn(&[Shape]) -> bool,
) -> Result<Vec<Shape>, DemoError> {
    let started = tokio::time::Instant::now();
    loop {
        let shapes = store.shapes(canvas_id).await;
        if !shapes.is_empty() && pred(&shapes) {
            return Ok(shapes);
        }
        if started.elapsed() > WAIT_LIMIT {
            return Err(DemoError::Timeout(what));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn view_until(
    handle: &ClientHandle,
    what: &'static str,
    pred: impl Fn(&ClientView) -> bool,
) -> Result<ClientView, DemoError> {
    let started = tokio::time::Instant::now();
    loop {
        let view = handle.view().await?;
        if pred(&view) {
            return Ok(view);
        }
        if started.elapsed() > WAIT_LIMIT {
            return Err(DemoError::Timeout(what));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn log_notices(who: &'static str, mut notices: mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = notices.recv().await {
        match notice {
            Notice::SyncWriteFailed { id, code } => warn!(who, shape_id = %id, code, "write failed"),
            other => info!(who, notice = ?other, "notice"),
        }
    }
}

fn log_view(who: &'static str, view: &ClientView) {
    info!(
        who,
        visible = view.visible.len(),
        selected = view.selection.len(),
        tool = ?view.tool,
        online = view.online,
        gesture = view.gesture_active,
        renders = view.render_requests,
        "client view"
    );
    debug!(who, snapshot = %view.debug, "engine snapshot");
}
