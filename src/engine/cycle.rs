//! Cyclic main function.
//!
//! One cycle, in this order:
//!
//! 1. count timers down and arbitrate every timer that expired,
//! 2. evaluate the deferred rules (ascending) and run the lists they
//!    activate, ascending and deduplicated,
//! 3. drain the requests that arrived while the cycle was running.
//!
//! A cycle that finds an arbitration pass active is postponed (when
//! `delay_main_function` is set) and re-run by whoever finishes the pass.

use log::{debug, trace};

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::diagnostics::bump;
use crate::modes::TimerState;
use crate::ports::BswPorts;

use super::Engine;
use super::evaluate::{ActivatedLists, evaluate_rule};
use super::queue::{RequestEntry, RequestOrigin};
use super::timers;

enum Gate {
    NotInitialized,
    /// Run the cycle; `owner` cycles drain the queue and release `active`.
    Run { owner: bool },
    Postponed,
}

impl<M: RawMutex> Engine<M> {
    /// Periodic entry point.  Never blocks; a no-op before `init`.
    pub fn main_function<B>(&self, bsw: &B)
    where
        B: BswPorts + ?Sized,
    {
        loop {
            match self.enter_cycle() {
                Gate::NotInitialized => return,
                Gate::Postponed => {
                    debug!("main function postponed behind active pass");
                    return;
                }
                Gate::Run { owner } => {
                    self.run_cycle(bsw);
                    if !owner || !self.drain_queue(bsw) {
                        return;
                    }
                    // Another cycle was postponed while this one ran.
                }
            }
        }
    }

    fn enter_cycle(&self) -> Gate {
        self.with_ctx(|ctx| {
            if !ctx.initialized {
                return Gate::NotInitialized;
            }
            if !self.config.queued_arbitration {
                return Gate::Run { owner: false };
            }
            if !ctx.active {
                ctx.active = true;
                Gate::Run { owner: true }
            } else if self.config.delay_main_function {
                ctx.main_function_delayed = true;
                bump(&mut ctx.metrics.postponed_cycles);
                Gate::Postponed
            } else {
                Gate::Run { owner: false }
            }
        })
    }

    fn run_cycle<B>(&self, bsw: &B)
    where
        B: BswPorts + ?Sized,
    {
        let expired = self.with_ctx(|ctx| {
            bump(&mut ctx.metrics.cycles);
            timers::tick(ctx)
        });
        for timer in expired {
            let port = self.topology.timers()[timer.index()].port;
            debug!("timer {timer} expired");
            self.arbitrate(
                bsw,
                RequestEntry {
                    port,
                    mode: u32::from(TimerState::Expired),
                    origin: RequestOrigin::TimerExpired,
                },
            );
        }

        let activated = self.with_ctx(|ctx| {
            let mut lists = ActivatedLists::new(self.topology.list_count());
            for &rule in self.topology.deferred_rules() {
                if let Some(list) = evaluate_rule(&self.topology, ctx, rule) {
                    lists.insert(list);
                }
            }
            lists
        });
        if activated.is_empty() {
            trace!("no deferred rule fired");
        } else {
            self.execute_mode_control(bsw, &activated);
        }
    }
}
