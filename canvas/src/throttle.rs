//! Load-adaptive throttling for ephemeral position broadcasts.
//!
//! DESIGN
//! ======
//! The local overlay is updated on every pointer move; only the outbound
//! ephemeral broadcast goes through this controller. Positions are coalesced
//! per shape (latest wins, first-queued slot kept) in a FIFO queue.
//!
//! - Normal mode (selection <= threshold): every poll flushes.
//! - Large-selection mode: flushes are at least `large_selection_interval_ms`
//!   apart; polls inside the window schedule a deadline instead.
//! - Sampling: when the queue is deeper than `sample_queue_limit` at flush
//!   time, only the oldest `sample_queue_limit` entries go out. The rest stay
//!   queued and a follow-up deadline is scheduled, so repeated flushes walk
//!   the whole selection round-robin.
//!
//! Durable commits never pass through here.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod throttle_test;

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::doc::{ShapeId, TransientPosition};

/// Throttling tier, fixed for the lifetime of one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThrottleMode {
    Normal,
    LargeSelection,
}

/// Result of one poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flush {
    /// Positions to publish now, oldest first.
    pub sent: Vec<TransientPosition>,
    /// A newly scheduled deadline the host should wake us at.
    pub schedule: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThrottleController {
    mode: ThrottleMode,
    min_interval_ms: u64,
    retry_interval_ms: u64,
    sample_limit: usize,
    order: VecDeque<ShapeId>,
    #[serde(skip)]
    pending: HashMap<ShapeId, TransientPosition>,
    last_flush_ms: Option<u64>,
    deadline: Option<u64>,
    flush_count: u64,
}

impl ThrottleController {
    /// Pick the tier for a gesture over `selection_len` shapes.
    #[must_use]
    pub fn new(selection_len: usize, config: &EngineConfig) -> Self {
        let (mode, min_interval_ms, retry_interval_ms) = if selection_len > config.large_selection_threshold {
            (
                ThrottleMode::LargeSelection,
                config.large_selection_interval_ms,
                config.large_selection_interval_ms,
            )
        } else {
            (ThrottleMode::Normal, 0, config.frame_interval_ms)
        };
        Self {
            mode,
            min_interval_ms,
            retry_interval_ms,
            sample_limit: config.sample_queue_limit.max(1),
            order: VecDeque::new(),
            pending: HashMap::new(),
            last_flush_ms: None,
            deadline: None,
            flush_count: 0,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ThrottleMode {
        self.mode
    }

    /// Queue a position, replacing any queued position for the same shape.
    pub fn enqueue(&mut self, position: TransientPosition) {
        let id = position.shape_id;
        if self.pending.insert(id, position).is_none() {
            self.order.push_back(id);
        }
    }

    /// Drop a shape's queued position, if any.
    pub fn discard(&mut self, id: &ShapeId) {
        if self.pending.remove(id).is_some() {
            self.order.retain(|queued| queued != id);
        }
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.order.clear();
        self.deadline = None;
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.order.len()
    }

    /// Scheduled wake-up time, if a flush is waiting.
    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    #[must_use]
    pub fn last_flush_ms(&self) -> Option<u64> {
        self.last_flush_ms
    }

    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    fn is_due(&self, now_ms: u64) -> bool {
        self.last_flush_ms
            .is_none_or(|last| now_ms >= last.saturating_add(self.min_interval_ms))
    }

    /// Flush if the window allows it, otherwise make sure a deadline is set.
    pub fn poll(&mut self, now_ms: u64) -> Flush {
        if self.order.is_empty() {
            self.deadline = None;
            return Flush::default();
        }

        if !self.is_due(now_ms) {
            if self.deadline.is_some_and(|d| d > now_ms) {
                return Flush::default();
            }
            let at = self
                .last_flush_ms
                .map_or(now_ms, |last| last.saturating_add(self.min_interval_ms));
            self.deadline = Some(at);
            return Flush { sent: Vec::new(), schedule: Some(at) };
        }

        let take = if self.order.len() > self.sample_limit { self.sample_limit } else { self.order.len() };
        let mut sent = Vec::with_capacity(take);
        for _ in 0..take {
            let Some(id) = self.order.pop_front() else {
                break;
            };
            if let Some(position) = self.pending.remove(&id) {
                sent.push(position);
            }
        }

        self.last_flush_ms = Some(now_ms);
        self.flush_count += 1;

        let schedule = if self.order.is_empty() {
            self.deadline = None;
            None
        } else {
            let at = now_ms.saturating_add(self.retry_interval_ms);
            self.deadline = Some(at);
            Some(at)
        };

        Flush { sent, schedule }
    }
}
