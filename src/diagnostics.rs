//! Runtime diagnostics.
//!
//! Counters are maintained by the engine inside its critical section and
//! handed out as a `Copy` snapshot, so a reader never observes a
//! half-updated set.

use serde::{Deserialize, Serialize};

/// Runtime counters of one engine instance.  Reset by `init`; counters
/// wrap on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Arbitration passes run (one per applied mode request).
    pub arbitrations: u32,
    /// Requests parked in the queue because a pass was active.
    pub queued_requests: u32,
    /// Requests dropped on a full queue.
    pub queue_overflows: u32,
    /// Highest queue depth observed.
    pub max_queue_depth: u16,
    /// Main-function cycles that ran.
    pub cycles: u32,
    /// Main-function cycles postponed behind an active pass.
    pub postponed_cycles: u32,
    /// Immediate actions that reported a failure.
    pub action_failures: u32,
    /// Action-list executions started by the interpreter.
    pub interpreter_passes: u32,
}

/// Increment a counter.
pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

impl Diagnostics {
    pub(crate) fn note_queue_depth(&mut self, depth: usize) {
        let depth = u16::try_from(depth).unwrap_or(u16::MAX);
        self.max_queue_depth = self.max_queue_depth.max(depth);
    }
}
