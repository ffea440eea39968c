//! Request dispatcher and arbitration.
//!
//! ```text
//!   handle_request ─┬─ bypass ──────────────────────────────▶ arbitrate
//!                   └─ lock ─┬─ idle:   active = true ─unlock─▶ arbitrate
//!                            │                                  drain queue (FIFO)
//!                            │                                  active = false
//!                            │                                  run postponed cycle
//!                            └─ active: enqueue (or drop on overflow)
//! ```

use log::{debug, warn};

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::diagnostics::bump;
use crate::error::DevError;
use crate::ports::{BswPorts, DevErrorSink, ServiceId};

use super::Engine;
use super::evaluate::{ActivatedLists, evaluate_rule};
use super::queue::RequestEntry;

enum Admission {
    /// This call owns the pass.
    Owner,
    Queued,
    Dropped,
}

impl<M: RawMutex> Engine<M> {
    /// Serialize a validated request against any pass already running.
    pub(super) fn handle_request<B>(&self, bsw: &B, request: RequestEntry, service: ServiceId)
    where
        B: BswPorts + ?Sized,
    {
        let immediate = self.topology.port(request.port).is_immediate();
        let bypass = !self.config.queued_arbitration
            || (!immediate && !self.config.queue_deferred_requests);
        if bypass {
            self.arbitrate(bsw, request);
            return;
        }

        let admission = self.with_ctx(|ctx| {
            if !ctx.active {
                ctx.active = true;
                return Admission::Owner;
            }
            match ctx.queue.push(request) {
                Ok(()) => {
                    bump(&mut ctx.metrics.queued_requests);
                    ctx.metrics.note_queue_depth(ctx.queue.len());
                    Admission::Queued
                }
                Err(_) => {
                    bump(&mut ctx.metrics.queue_overflows);
                    Admission::Dropped
                }
            }
        });

        match admission {
            Admission::Owner => {
                self.arbitrate(bsw, request);
                if self.drain_queue(bsw) {
                    debug!("running postponed main function");
                    self.main_function(bsw);
                }
            }
            Admission::Queued => {
                debug!("queued request on port {} (mode {})", request.port, request.mode);
            }
            Admission::Dropped => {
                warn!(
                    "request queue full; dropped port {} mode {}",
                    request.port, request.mode
                );
                self.report(bsw, service, DevError::QueueFull);
            }
        }
    }

    /// Replay queued requests until the queue is empty, then release the
    /// pass.  Returns whether a main-function cycle was postponed meanwhile.
    pub(super) fn drain_queue<B>(&self, bsw: &B) -> bool
    where
        B: BswPorts + ?Sized,
    {
        loop {
            let next = self.with_ctx(|ctx| match ctx.queue.pop() {
                Some(request) => Ok(request),
                None => {
                    ctx.active = false;
                    Err(core::mem::take(&mut ctx.main_function_delayed))
                }
            });
            match next {
                Ok(request) => self.arbitrate(bsw, request),
                Err(postponed) => return postponed,
            }
        }
    }

    /// Apply one mode request: store the mode, evaluate the rules depending
    /// on an immediate port and execute the lists they activate.
    pub(super) fn arbitrate<B>(&self, bsw: &B, request: RequestEntry)
    where
        B: BswPorts + ?Sized,
    {
        let port = self.topology.port(request.port);
        let activated = self.with_ctx(|ctx| {
            bump(&mut ctx.metrics.arbitrations);
            ctx.modes[request.port.index()] = request.mode;
            ctx.defined[request.port.index()] = true;

            let mut lists = ActivatedLists::new(self.topology.list_count());
            if port.is_immediate() {
                for &rule in self.topology.dependents(request.port) {
                    if let Some(list) = evaluate_rule(&self.topology, ctx, rule) {
                        lists.insert(list);
                    }
                }
            }
            lists
        });

        debug!(
            "arbitrate {:?} {} '{}' = {}",
            request.origin, request.port, port.name, request.mode
        );
        if !activated.is_empty() {
            self.execute_mode_control(bsw, &activated);
        }
    }

    /// Report a developer error when detection is enabled.
    pub(super) fn report<B>(&self, bsw: &B, service: ServiceId, error: DevError)
    where
        B: DevErrorSink + ?Sized,
    {
        if !self.config.dev_error_detect {
            return;
        }
        debug!(
            "bswm[{}] {service}: {error}",
            self.config.instance_id
        );
        bsw.report_dev_error(self.config.instance_id, service, error);
    }
}
