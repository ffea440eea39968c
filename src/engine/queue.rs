//! Bounded FIFO of re-entrant mode requests.
//!
//! ```text
//!   ISR / other task ──push──▶ ┌──────────────────────┐ ──pop──▶ owner of the
//!   (pass already active)      │ Deque<_, QUEUE_MAX>  │          arbitration pass
//!                              └──────────────────────┘
//! ```
//!
//! The storage is fixed at [`REQUEST_QUEUE_MAX`]; the configured logical
//! capacity may be smaller.  Only the engine touches the queue, always
//! inside its critical section.

use heapless::Deque;

use crate::config::REQUEST_QUEUE_MAX;
use crate::topology::PortId;

/// Which entry point produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// Typed indication or key-based notification.
    Static,
    /// Generic user request.
    Generic,
    /// Timer expiry detected by the main function.
    TimerExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEntry {
    pub port: PortId,
    pub mode: u32,
    pub origin: RequestOrigin,
}

#[derive(Debug)]
pub(crate) struct RequestQueue {
    entries: Deque<RequestEntry, REQUEST_QUEUE_MAX>,
    capacity: usize,
}

impl RequestQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Deque::new(),
            capacity: capacity.clamp(1, REQUEST_QUEUE_MAX),
        }
    }

    /// Append; hands the entry back when the logical capacity is reached.
    pub fn push(&mut self, entry: RequestEntry) -> Result<(), RequestEntry> {
        if self.entries.len() >= self.capacity {
            return Err(entry);
        }
        self.entries.push_back(entry)
    }

    pub fn pop(&mut self) -> Option<RequestEntry> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
