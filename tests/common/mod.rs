//! Shared fixtures: a recording collaborator and topology builders.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bswm::error::{ActionError, ActionResult, DevError};
use bswm::groups::GroupVector;
use bswm::modes::{ComMMode, EcuMState, SourceKind};
use bswm::ports::{
    CalloutPort, ComPort, DevErrorSink, FaultSink, FaultStatus, ModeSwitchPort, PduRouterPort,
    ResetPort, ServiceId,
};
use bswm::topology::{
    ActionId, ActionListSpec, ActionSpec, ExprId, FaultId, Item, ListExecution, ListId, PortId,
    PortSpec, RequestProcessing, RuleSpec,
};
use bswm::{Engine, EngineConfig, Topology};

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    IpduGroupControl { groups: Vec<u16>, initialize: bool },
    ReceptionDm(Vec<u16>),
    EnableRouting(u16),
    DisableRouting(u16),
    AllowCom(u8, bool),
    RequestComMode(u8, ComMMode),
    LimitToNoCom(u8, bool),
    SetEcuMState(EcuMState),
    Nm(u8, bool),
    SwitchMode(u16, u32),
    PartitionReset(u8),
    Callout(u16),
    Fault(FaultId, FaultStatus),
    DevError(u8, ServiceId, DevError),
    /// Port mode seen by a callout while its pass was running.
    PortMode(PortId, Option<u32>),
}

/// Work a callout performs on the engine before returning.
#[derive(Debug, Clone, Copy)]
pub enum Reentry {
    Request { user: u16, mode: u32 },
    MainFunction,
    /// Record the current mode of a port as [`Call::PortMode`].
    ReadPort(PortId),
}

/// Collaborator that records every call in order.
///
/// Callouts can be made to fail, and can re-enter the bound engine.
#[derive(Default)]
pub struct Recorder<'e> {
    calls: RefCell<Vec<Call>>,
    failing: RefCell<HashSet<u16>>,
    failing_routing: RefCell<HashSet<u16>>,
    engine: Cell<Option<&'e Engine>>,
    reentries: RefCell<Vec<(u16, Reentry)>>,
}

impl<'e> Recorder<'e> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, engine: &'e Engine) {
        self.engine.set(Some(engine));
    }

    /// Make `callout` re-enter the engine with `work`, in the order added.
    pub fn on_callout(&self, callout: u16, work: Reentry) {
        self.reentries.borrow_mut().push((callout, work));
    }

    pub fn fail_callout(&self, callout: u16) {
        self.failing.borrow_mut().insert(callout);
    }

    pub fn fail_routing(&self, group: u16) {
        self.failing_routing.borrow_mut().insert(group);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    pub fn callouts(&self) -> Vec<u16> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Callout(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn dev_errors(&self) -> Vec<(ServiceId, DevError)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::DevError(_, service, error) => Some((*service, *error)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn groups(v: &GroupVector) -> Vec<u16> {
    v.iter().collect()
}

impl ComPort for Recorder<'_> {
    fn ipdu_group_control(&self, v: &GroupVector, initialize: bool) {
        self.push(Call::IpduGroupControl {
            groups: groups(v),
            initialize,
        });
    }

    fn reception_dm_control(&self, v: &GroupVector) {
        self.push(Call::ReceptionDm(groups(v)));
    }
}

impl PduRouterPort for Recorder<'_> {
    fn enable_routing(&self, group: u16) -> ActionResult {
        self.push(Call::EnableRouting(group));
        if self.failing_routing.borrow().contains(&group) {
            return Err(ActionError::NotAvailable);
        }
        Ok(())
    }

    fn disable_routing(&self, group: u16) -> ActionResult {
        self.push(Call::DisableRouting(group));
        Ok(())
    }
}

impl ModeSwitchPort for Recorder<'_> {
    fn comm_allow_com(&self, channel: u8, allowed: bool) -> ActionResult {
        self.push(Call::AllowCom(channel, allowed));
        Ok(())
    }

    fn comm_request_mode(&self, channel: u8, mode: ComMMode) -> ActionResult {
        self.push(Call::RequestComMode(channel, mode));
        Ok(())
    }

    fn comm_limit_to_no_com(&self, channel: u8, limit: bool) -> ActionResult {
        self.push(Call::LimitToNoCom(channel, limit));
        Ok(())
    }

    fn ecum_set_state(&self, state: EcuMState) -> ActionResult {
        self.push(Call::SetEcuMState(state));
        Ok(())
    }

    fn nm_control(&self, channel: u8, enable: bool) -> ActionResult {
        self.push(Call::Nm(channel, enable));
        Ok(())
    }

    fn switch_mode(&self, switch_port: u16, mode: u32) -> ActionResult {
        self.push(Call::SwitchMode(switch_port, mode));
        Ok(())
    }
}

impl ResetPort for Recorder<'_> {
    fn request_partition_reset(&self, application: u8) -> ActionResult {
        self.push(Call::PartitionReset(application));
        Ok(())
    }
}

impl CalloutPort for Recorder<'_> {
    fn callout(&self, id: u16) -> ActionResult {
        self.push(Call::Callout(id));

        let work: Vec<Reentry> = self
            .reentries
            .borrow()
            .iter()
            .filter(|(c, _)| *c == id)
            .map(|(_, w)| *w)
            .collect();
        if let Some(engine) = self.engine.get() {
            for w in work {
                match w {
                    Reentry::Request { user, mode } => engine.request_mode(self, user, mode),
                    Reentry::MainFunction => engine.main_function(self),
                    Reentry::ReadPort(port) => {
                        self.push(Call::PortMode(port, engine.port_mode(port)));
                    }
                }
            }
        }

        if self.failing.borrow().contains(&id) {
            Err(ActionError::Rejected)
        } else {
            Ok(())
        }
    }
}

impl FaultSink for Recorder<'_> {
    fn report_fault_status(&self, fault: FaultId, status: FaultStatus) {
        self.push(Call::Fault(fault, status));
    }
}

impl DevErrorSink for Recorder<'_> {
    fn report_dev_error(&self, instance: u8, service: ServiceId, error: DevError) {
        self.push(Call::DevError(instance, service, error));
    }
}

/// Thread-safe collaborator for concurrency tests.
#[derive(Default)]
pub struct CountingBsw {
    pub callouts: Mutex<Vec<u16>>,
    pub dev_errors: AtomicUsize,
}

impl ComPort for CountingBsw {
    fn ipdu_group_control(&self, _: &GroupVector, _: bool) {}
    fn reception_dm_control(&self, _: &GroupVector) {}
}

impl PduRouterPort for CountingBsw {
    fn enable_routing(&self, _: u16) -> ActionResult {
        Ok(())
    }
    fn disable_routing(&self, _: u16) -> ActionResult {
        Ok(())
    }
}

impl ModeSwitchPort for CountingBsw {
    fn comm_allow_com(&self, _: u8, _: bool) -> ActionResult {
        Ok(())
    }
    fn comm_request_mode(&self, _: u8, _: ComMMode) -> ActionResult {
        Ok(())
    }
    fn comm_limit_to_no_com(&self, _: u8, _: bool) -> ActionResult {
        Ok(())
    }
    fn ecum_set_state(&self, _: EcuMState) -> ActionResult {
        Ok(())
    }
    fn nm_control(&self, _: u8, _: bool) -> ActionResult {
        Ok(())
    }
    fn switch_mode(&self, _: u16, _: u32) -> ActionResult {
        Ok(())
    }
}

impl ResetPort for CountingBsw {
    fn request_partition_reset(&self, _: u8) -> ActionResult {
        Ok(())
    }
}

impl CalloutPort for CountingBsw {
    fn callout(&self, id: u16) -> ActionResult {
        self.callouts.lock().unwrap().push(id);
        Ok(())
    }
}

impl FaultSink for CountingBsw {
    fn report_fault_status(&self, _: FaultId, _: FaultStatus) {}
}

impl DevErrorSink for CountingBsw {
    fn report_dev_error(&self, _: u8, _: ServiceId, _: DevError) {
        self.dev_errors.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Topology builders
// ---------------------------------------------------------------------------

pub fn port(name: &str, source: SourceKind, channel: u32) -> PortSpec {
    PortSpec {
        name: name.into(),
        source,
        channel,
        processing: RequestProcessing::Immediate,
        initial_mode: None,
        max_mode: None,
    }
}

pub fn generic(name: &str, user: u32) -> PortSpec {
    port(name, SourceKind::Generic, user)
}

pub fn deferred(mut p: PortSpec) -> PortSpec {
    p.processing = RequestProcessing::Deferred;
    p
}

pub fn rule(name: &str, expression: u16, true_list: Option<u16>, false_list: Option<u16>) -> RuleSpec {
    RuleSpec {
        name: name.into(),
        expression: ExprId(expression),
        true_list: true_list.map(ListId),
        false_list: false_list.map(ListId),
        nested_only: false,
    }
}

pub fn list(name: &str, items: Vec<Item>) -> ActionListSpec {
    ActionListSpec {
        name: name.into(),
        execution: ListExecution::Trigger,
        items,
    }
}

pub fn condition_list(name: &str, items: Vec<Item>) -> ActionListSpec {
    ActionListSpec {
        execution: ListExecution::Condition,
        ..list(name, items)
    }
}

pub fn act(id: u16) -> Item {
    Item::Action {
        id: ActionId(id),
        abort_on_fail: false,
        fault: None,
    }
}

pub fn act_abort(id: u16, fault: Option<u16>) -> Item {
    Item::Action {
        id: ActionId(id),
        abort_on_fail: true,
        fault: fault.map(FaultId),
    }
}

pub fn callout(id: u16) -> ActionSpec {
    ActionSpec::UserCallout { callout: id }
}

pub fn engine(topology: &Topology) -> Engine {
    engine_with(topology, EngineConfig::default())
}

pub fn engine_with(topology: &Topology, config: EngineConfig) -> Engine {
    let engine = Engine::new(topology, config).unwrap();
    engine.init();
    engine
}
