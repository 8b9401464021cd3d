//! Explicit timers for the annotator
//!
//! The host drives time: every call takes the current `Instant`, so the
//! debounce window and the cue revert delay are testable without sleeping.

use std::time::{Duration, Instant};

use crate::dom::NodeId;

/// Coalesces bursts of requests into a single due event
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Request a run; pushes any pending deadline out to `now + delay`
    pub fn request(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Consume the pending request if its deadline has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Selection cues waiting to be reverted
#[derive(Debug, Clone)]
pub struct DelayQueue {
    delay: Duration,
    entries: Vec<(Instant, NodeId)>,
}

impl DelayQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, node: NodeId, now: Instant) {
        self.entries.push((now + self.delay, node));
    }

    /// Remove and return every entry whose deadline has passed, oldest first
    pub fn drain_expired(&mut self, now: Instant) -> Vec<NodeId> {
        let (expired, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|(deadline, _)| now >= *deadline);
        self.entries = pending;
        expired.into_iter().map(|(_, node)| node).collect()
    }

    /// Remove and return everything regardless of deadline
    pub fn drain_all(&mut self) -> Vec<NodeId> {
        self.entries.drain(..).map(|(_, node)| node).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
