//! Log-based collaborator adapter.
//!
//! Implements every outbound port by writing one line per call to the
//! `log` facade.  Used by the simulation binary; a real integration would
//! implement the same traits on top of its Com, PduR and ComM modules.

use core::cell::Cell;

use log::{info, warn};

use crate::error::{ActionResult, DevError};
use crate::groups::GroupVector;
use crate::modes::{ComMMode, EcuMState};
use crate::ports::{
    CalloutPort, ComPort, DevErrorSink, FaultSink, FaultStatus, ModeSwitchPort, PduRouterPort,
    ResetPort, ServiceId,
};
use crate::topology::FaultId;

/// Adapter that logs every collaborator call.
#[derive(Debug, Default)]
pub struct LoggingBsw {
    calls: Cell<u64>,
}

impl LoggingBsw {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collaborator calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn ok(&self) -> ActionResult {
        self.count();
        Ok(())
    }
}

impl ComPort for LoggingBsw {
    fn ipdu_group_control(&self, groups: &GroupVector, initialize: bool) {
        info!("COM   | ipdu_group_control init={initialize} groups={groups:?}");
        self.count();
    }

    fn reception_dm_control(&self, groups: &GroupVector) {
        info!("COM   | reception_dm_control groups={groups:?}");
        self.count();
    }
}

impl PduRouterPort for LoggingBsw {
    fn enable_routing(&self, routing_group: u16) -> ActionResult {
        info!("PDUR  | enable routing group {routing_group}");
        self.ok()
    }

    fn disable_routing(&self, routing_group: u16) -> ActionResult {
        info!("PDUR  | disable routing group {routing_group}");
        self.ok()
    }
}

impl ModeSwitchPort for LoggingBsw {
    fn comm_allow_com(&self, channel: u8, allowed: bool) -> ActionResult {
        info!("COMM  | channel {channel} allow_com={allowed}");
        self.ok()
    }

    fn comm_request_mode(&self, channel: u8, mode: ComMMode) -> ActionResult {
        info!("COMM  | channel {channel} request {mode:?}");
        self.ok()
    }

    fn comm_limit_to_no_com(&self, channel: u8, limit: bool) -> ActionResult {
        info!("COMM  | channel {channel} limit_to_no_com={limit}");
        self.ok()
    }

    fn ecum_set_state(&self, state: EcuMState) -> ActionResult {
        info!("ECUM  | set state {state:?}");
        self.ok()
    }

    fn nm_control(&self, channel: u8, enable: bool) -> ActionResult {
        info!("NM    | channel {channel} communication={}", if enable { "on" } else { "off" });
        self.ok()
    }

    fn switch_mode(&self, switch_port: u16, mode: u32) -> ActionResult {
        info!("SWITCH| port {switch_port} mode {mode}");
        self.ok()
    }
}

impl ResetPort for LoggingBsw {
    fn request_partition_reset(&self, application: u8) -> ActionResult {
        info!("RESET | partition reset for application {application}");
        self.ok()
    }
}

impl CalloutPort for LoggingBsw {
    fn callout(&self, id: u16) -> ActionResult {
        info!("USER  | callout {id}");
        self.ok()
    }
}

impl FaultSink for LoggingBsw {
    fn report_fault_status(&self, fault: FaultId, status: FaultStatus) {
        info!("FAULT | {fault} {status:?}");
        self.count();
    }
}

impl DevErrorSink for LoggingBsw {
    fn report_dev_error(&self, instance: u8, service: ServiceId, error: DevError) {
        warn!("DET   | bswm[{instance}] {service}: {error} (0x{:02X})", error.code());
        self.count();
    }
}
