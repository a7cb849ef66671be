//! Advisory per-shape ownership.
//!
//! DESIGN
//! ======
//! A shape may carry an `OwnerLock` naming the client allowed to edit it.
//! The durable store enforces at most one active lock per shape with a
//! compare-and-set on [`try_acquire`]; the engine only consults the cached
//! lock to decide what it may touch. Locks expire implicitly: once
//! `now - acquired_at` exceeds the stale threshold anyone may take over.

#[cfg(test)]
#[path = "lock_test.rs"]
mod lock_test;

use serde::{Deserialize, Serialize};

use crate::doc::{ClientId, OwnerLock, ShapeId};

/// How a lock record looks from one client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// No record, or a record without a holder.
    Free,
    /// Held by the asking client.
    HeldByMe,
    /// Held by another client and not yet expired.
    HeldByOther { holder_id: ClientId },
    /// Held by another client but abandoned.
    Stale { holder_id: ClientId },
}

/// Result of an acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockOutcome {
    Granted,
    Denied,
}

impl LockOutcome {
    #[must_use]
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Whether a lock acquired at `acquired_at` has expired at `now_ms`.
#[must_use]
pub fn is_stale(acquired_at: u64, now_ms: u64, stale_ms: u64) -> bool {
    now_ms.saturating_sub(acquired_at) > stale_ms
}

/// Classify a lock record for `client_id`.
#[must_use]
pub fn lock_state(lock: Option<&OwnerLock>, client_id: ClientId, now_ms: u64, stale_ms: u64) -> LockState {
    let Some(lock) = lock else {
        return LockState::Free;
    };
    let Some(holder_id) = lock.holder_id else {
        return LockState::Free;
    };
    if holder_id == client_id {
        LockState::HeldByMe
    } else if is_stale(lock.acquired_at, now_ms, stale_ms) {
        LockState::Stale { holder_id }
    } else {
        LockState::HeldByOther { holder_id }
    }
}

/// True if the shape is unlocked, locked by `client_id`, or locked but stale.
#[must_use]
pub fn is_editable(lock: Option<&OwnerLock>, client_id: ClientId, now_ms: u64, stale_ms: u64) -> bool {
    !matches!(lock_state(lock, client_id, now_ms, stale_ms), LockState::HeldByOther { .. })
}

/// Compare-and-set acquire rule.
///
/// Grants (and refreshes `acquired_at`) when the shape is editable by
/// `client_id`. Taking over a stale lock counts as a grant.
///
/// # Errors
///
/// Returns `LockOutcome::Denied` when another client holds a live lock.
pub fn try_acquire(
    shape_id: ShapeId,
    current: Option<&OwnerLock>,
    client_id: ClientId,
    now_ms: u64,
    stale_ms: u64,
) -> Result<OwnerLock, LockOutcome> {
    match lock_state(current, client_id, now_ms, stale_ms) {
        LockState::HeldByOther { .. } => Err(LockOutcome::Denied),
        LockState::Stale { holder_id } => {
            tracing::debug!(%shape_id, %holder_id, %client_id, "overriding stale lock");
            Ok(OwnerLock { shape_id, holder_id: Some(client_id), acquired_at: now_ms })
        }
        LockState::Free | LockState::HeldByMe => {
            Ok(OwnerLock { shape_id, holder_id: Some(client_id), acquired_at: now_ms })
        }
    }
}

/// Whether `client_id` may clear the lock: only its own, or one already stale.
#[must_use]
pub fn may_release(current: Option<&OwnerLock>, client_id: ClientId, now_ms: u64, stale_ms: u64) -> bool {
    matches!(
        lock_state(current, client_id, now_ms, stale_ms),
        LockState::Free | LockState::HeldByMe | LockState::Stale { .. }
    )
}
