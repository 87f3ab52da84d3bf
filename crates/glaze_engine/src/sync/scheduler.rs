//! Debounce scheduler
//!
//! Holds at most one pending rebuild per target. Scheduling again cancels the
//! outstanding token and arms a fresh quiescence window. Time is passed in by
//! the caller so the frame loop (or a test) controls the clock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::scene::NodeId;

/// The single outstanding rebuild for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingUpdate {
    /// Node to rebuild
    pub target: NodeId,
    /// Monotonic token; a newer schedule always has a larger generation
    pub generation: u64,
    /// When the rebuild fires
    pub deadline: Instant,
}

/// Cancel-and-reschedule timer table
#[derive(Debug)]
pub struct DebounceScheduler {
    window: Duration,
    pending: HashMap<NodeId, PendingUpdate>,
    next_generation: u64,
}

impl DebounceScheduler {
    /// Create a scheduler with the given quiescence window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Quiescence window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm the timer for `target`, replacing any outstanding token
    ///
    /// Returns the new token and whether an older one was superseded.
    pub fn schedule(&mut self, target: NodeId, now: Instant) -> (PendingUpdate, bool) {
        let update = PendingUpdate {
            target,
            generation: self.next_generation,
            deadline: now + self.window,
        };
        self.next_generation += 1;
        let superseded = self.pending.insert(target, update).is_some();
        (update, superseded)
    }

    /// Drop the token for `target`, returning it if there was one
    pub fn cancel(&mut self, target: NodeId) -> Option<PendingUpdate> {
        self.pending.remove(&target)
    }

    /// Outstanding token for `target`
    pub fn pending(&self, target: NodeId) -> Option<PendingUpdate> {
        self.pending.get(&target).copied()
    }

    /// Whether `update` is still the outstanding token for its target
    pub fn is_current(&self, update: &PendingUpdate) -> bool {
        self.pending(update.target).is_some_and(|p| p.generation == update.generation)
    }

    /// Remove and return every token whose deadline has passed, oldest first
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingUpdate> {
        let mut due: Vec<PendingUpdate> = self
            .pending
            .values()
            .filter(|p| p.deadline <= now)
            .copied()
            .collect();
        due.sort_by_key(|p| (p.deadline, p.generation));

        for update in &due {
            self.pending.remove(&update.target);
        }
        due
    }

    /// Earliest deadline among outstanding tokens
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Number of outstanding tokens
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
