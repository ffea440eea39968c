//! Countdown timers.
//!
//! A timer is started / stopped by a `TimerControl` action and counted
//! down once per main-function cycle.  The timer port mirrors the timer
//! state; only the transition to `Expired` is arbitrated.
//!
//! ```text
//!   Stopped ──start(n)──▶ Started ──n ticks──▶ Expired
//!      ▲                    │  ▲                  │
//!      └──────stop──────────┘  └────start(n)──────┘
//! ```

use log::debug;

use crate::modes::TimerState;
use crate::topology::{CompiledTopology, TimerId, TimerOp};

use super::context::{RunTimeContext, TimerSlot};

/// Apply a timer-control action.  Updates the timer and its port without
/// arbitrating.
pub(crate) fn control(
    topology: &CompiledTopology,
    ctx: &mut RunTimeContext,
    timer: TimerId,
    op: TimerOp,
) {
    let slot = match op {
        TimerOp::Start { ticks } => TimerSlot {
            state: TimerState::Started,
            remaining: ticks,
        },
        TimerOp::Stop => TimerSlot::STOPPED,
    };
    ctx.timers[timer.index()] = slot;

    let port = topology.timers()[timer.index()].port;
    ctx.modes[port.index()] = u32::from(slot.state);
    ctx.defined[port.index()] = true;
    debug!("timer {timer} -> {:?} ({} ticks)", slot.state, slot.remaining);
}

/// Count every started timer down by one tick; returns the timers that
/// expired on this tick, ascending.
pub(crate) fn tick(ctx: &mut RunTimeContext) -> Vec<TimerId> {
    let mut expired = Vec::new();
    for (idx, slot) in ctx.timers.iter_mut().enumerate() {
        if slot.state != TimerState::Started {
            continue;
        }
        debug_assert!(slot.remaining > 0, "started timer with no ticks left");
        slot.remaining = slot.remaining.saturating_sub(1);
        if slot.remaining == 0 {
            slot.state = TimerState::Expired;
            expired.push(TimerId(idx as u16));
        }
    }
    expired
}
