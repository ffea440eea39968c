//! The mode-manager engine.
//!
//! ```text
//!   indication / request_mode ──▶ dispatch ──┬─▶ queue (pass active)
//!                                            └─▶ arbitrate ──▶ rules ──▶ interpreter ──▶ BswPorts
//!   main_function ──▶ timers ──▶ arbitrate
//!                 ──▶ deferred rules ──▶ interpreter
//!                 ──▶ drain queue
//! ```
//!
//! One `Engine` owns one instance: its immutable compiled topology plus a
//! run-time context behind an `embassy_sync` blocking mutex.  The mutex
//! only guards short read-modify-write sections; it is never held while a
//! collaborator is called, so collaborators may re-enter the engine.
//!
//! Collaborators are passed to every entry point (`bsw: &impl BswPorts`)
//! rather than stored, the same way a caller hands its hardware to a
//! service tick.

mod context;
mod cycle;
mod dispatch;
mod evaluate;
mod indications;
mod interpreter;
mod queue;
mod timers;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use log::info;

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::groups::GroupControl;
use crate::modes::TimerState;
use crate::topology::{CompiledTopology, ExprId, PortId, RuleId, TimerId, Topology};

use context::RunTimeContext;

pub use evaluate::Tristate;
pub use queue::{RequestEntry, RequestOrigin};

/// One mode-manager instance.
///
/// `M` selects the critical-section implementation:
/// [`CriticalSectionRawMutex`] for instances shared with interrupts or
/// other cores, `NoopRawMutex` for a single execution context.
pub struct Engine<M: RawMutex = CriticalSectionRawMutex> {
    topology: CompiledTopology,
    config: EngineConfig,
    ctx: Mutex<M, RefCell<RunTimeContext>>,
}

impl Engine {
    /// Validate and compile `topology`; the engine starts uninitialized.
    pub fn new(topology: &Topology, config: EngineConfig) -> Result<Self> {
        Self::from_compiled(topology.compile()?, config)
    }
}

impl<M: RawMutex> Engine<M> {
    pub fn from_compiled(topology: CompiledTopology, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let ctx = RunTimeContext::new(&topology, &config);
        Ok(Self {
            topology,
            config,
            ctx: Mutex::new(RefCell::new(ctx)),
        })
    }

    /// Run `f` on the run-time context inside the critical section.
    ///
    /// Never nest calls and never call a collaborator from `f`.
    fn with_ctx<R>(&self, f: impl FnOnce(&mut RunTimeContext) -> R) -> R {
        self.ctx.lock(|cell| f(&mut cell.borrow_mut()))
    }

    // -- Lifecycle --------------------------------------------------------

    /// Reset all run-time state and accept requests.
    pub fn init(&self) {
        self.with_ctx(|ctx| ctx.reset(&self.topology));
        info!(
            "bswm[{}] initialized: {} ports, {} rules, {} action lists",
            self.config.instance_id,
            self.topology.ports().len(),
            self.topology.rule_count(),
            self.topology.list_count()
        );
    }

    /// Stop accepting requests.  State is kept until the next `init`.
    pub fn deinit(&self) {
        self.with_ctx(|ctx| ctx.initialized = false);
        info!("bswm[{}] deinitialized", self.config.instance_id);
    }

    pub fn is_initialized(&self) -> bool {
        self.with_ctx(|ctx| ctx.initialized)
    }

    // -- Accessors --------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn topology(&self) -> &CompiledTopology {
        &self.topology
    }

    /// Current mode of a port, `None` until it was first reported.
    pub fn port_mode(&self, port: PortId) -> Option<u32> {
        self.with_ctx(|ctx| {
            ctx.defined
                .get(port.index())
                .copied()
                .unwrap_or(false)
                .then(|| ctx.modes[port.index()])
        })
    }

    /// Last determined result of a rule.
    pub fn rule_result(&self, rule: RuleId) -> Option<bool> {
        self.with_ctx(|ctx| ctx.rule_results.get(rule.index()).copied().flatten())
    }

    /// Last computed result of an expression, `None` while uninitialized.
    pub fn expression_result(&self, expr: ExprId) -> Option<bool> {
        self.with_ctx(|ctx| {
            let idx = expr.index();
            (*ctx.expr_initialized.get(idx)?).then(|| ctx.expr_result[idx])
        })
    }

    pub fn timer_state(&self, timer: TimerId) -> Option<TimerState> {
        self.with_ctx(|ctx| ctx.timers.get(timer.index()).map(|t| t.state))
    }

    /// Snapshot of the PDU group-control vectors.
    pub fn groups(&self) -> GroupControl {
        self.with_ctx(|ctx| ctx.groups.clone())
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.with_ctx(|ctx| ctx.metrics)
    }

    /// Requests waiting for the active pass.
    pub fn pending_requests(&self) -> usize {
        self.with_ctx(|ctx| ctx.queue.len())
    }

    /// Whether an arbitration pass or main-function cycle is running.
    pub fn is_active(&self) -> bool {
        self.with_ctx(|ctx| ctx.active)
    }
}
