//! Mutable run-time state of one engine instance.
//!
//! Everything here lives behind the engine's blocking mutex; the topology
//! tables it is indexed by are immutable and live outside of it.

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::groups::GroupControl;
use crate::modes::TimerState;
use crate::topology::CompiledTopology;

use super::queue::RequestQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerSlot {
    pub state: TimerState,
    pub remaining: u32,
}

impl TimerSlot {
    pub const STOPPED: Self = Self {
        state: TimerState::Stopped,
        remaining: 0,
    };
}

#[derive(Debug)]
pub(crate) struct RunTimeContext {
    pub initialized: bool,

    // --- Ports ---
    pub modes: Vec<u32>,
    pub defined: Vec<bool>,

    // --- Expressions / rules / lists ---
    pub expr_initialized: Vec<bool>,
    pub expr_result: Vec<bool>,
    pub rule_results: Vec<Option<bool>>,
    pub list_triggered: Vec<bool>,

    pub timers: Vec<TimerSlot>,

    // --- Arbitration ---
    pub queue: RequestQueue,
    /// An arbitration pass or main-function cycle owns the engine.
    pub active: bool,
    /// A main-function call found `active` set and must be re-run.
    pub main_function_delayed: bool,

    pub groups: GroupControl,
    pub metrics: Diagnostics,
}

impl RunTimeContext {
    /// Uninitialized context sized for `topology`.
    pub fn new(topology: &CompiledTopology, config: &EngineConfig) -> Self {
        let ports = topology.ports().len();
        let exprs = topology.exprs().len();
        Self {
            initialized: false,
            modes: vec![0; ports],
            defined: vec![false; ports],
            expr_initialized: vec![false; exprs],
            expr_result: vec![false; exprs],
            rule_results: vec![None; topology.rule_count()],
            list_triggered: vec![false; topology.list_count()],
            timers: vec![TimerSlot::STOPPED; topology.timers().len()],
            queue: RequestQueue::new(config.request_queue_capacity),
            active: false,
            main_function_delayed: false,
            groups: GroupControl::new(),
            metrics: Diagnostics::default(),
        }
    }

    /// Return to the post-`init` state: ports take their initial modes,
    /// everything derived from them is forgotten.
    pub fn reset(&mut self, topology: &CompiledTopology) {
        for (idx, port) in topology.ports().iter().enumerate() {
            self.modes[idx] = port.initial_mode.unwrap_or(0);
            self.defined[idx] = port.initial_mode.is_some();
        }
        self.expr_initialized.fill(false);
        self.expr_result.fill(false);
        self.rule_results.fill(None);
        self.list_triggered.fill(false);
        self.timers.fill(TimerSlot::STOPPED);
        self.queue.clear();
        self.active = false;
        self.main_function_delayed = false;
        self.groups = GroupControl::new();
        self.metrics = Diagnostics::default();
        self.initialized = true;
    }
}
