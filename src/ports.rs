//! Port traits: the boundary between the mode manager and the modules it
//! controls.
//!
//! ```text
//!   Engine ──▶ BswPorts (ComPort + PduRouterPort + ModeSwitchPort + ...)
//!                 │
//!                 └─▶ adapters (logging sim, test recorders, real BSW)
//! ```
//!
//! Every method takes `&self`: a collaborator may call back into the
//! engine from inside an action (a mode switch that is itself reported as
//! a new mode request), so the engine never holds a `&mut` to it.
//! Implementations needing mutable state use interior mutability.

use core::fmt;

use crate::error::{ActionResult, DevError};
use crate::groups::GroupVector;
use crate::modes::{ComMMode, EcuMState};
use crate::topology::FaultId;

// ───────────────────────────────────────────────────────────────
// Communication stack (Com / PduR)
// ───────────────────────────────────────────────────────────────

/// PDU group control; called once per interpreter pass with the
/// coalesced vectors.
pub trait ComPort {
    /// Start / stop PDU groups.  `initialize` is true for the re-init
    /// shadow vector.
    fn ipdu_group_control(&self, groups: &GroupVector, initialize: bool);

    /// Enable / disable reception deadline monitoring per group.
    fn reception_dm_control(&self, groups: &GroupVector);
}

pub trait PduRouterPort {
    fn enable_routing(&self, routing_group: u16) -> ActionResult;
    fn disable_routing(&self, routing_group: u16) -> ActionResult;
}

// ───────────────────────────────────────────────────────────────
// Mode switches (ComM / EcuM / Nm / generic switch ports)
// ───────────────────────────────────────────────────────────────

pub trait ModeSwitchPort {
    fn comm_allow_com(&self, channel: u8, allowed: bool) -> ActionResult;
    fn comm_request_mode(&self, channel: u8, mode: ComMMode) -> ActionResult;
    fn comm_limit_to_no_com(&self, channel: u8, limit: bool) -> ActionResult;
    fn ecum_set_state(&self, state: EcuMState) -> ActionResult;
    /// Enable or disable network-management communication.
    fn nm_control(&self, channel: u8, enable: bool) -> ActionResult;
    /// Report a mode on a generic mode-switch port.
    fn switch_mode(&self, switch_port: u16, mode: u32) -> ActionResult;
}

/// Partition reset requests.
pub trait ResetPort {
    fn request_partition_reset(&self, application: u8) -> ActionResult;
}

/// Integrator-supplied callouts.
pub trait CalloutPort {
    fn callout(&self, id: u16) -> ActionResult;
}

// ───────────────────────────────────────────────────────────────
// Diagnostics sinks
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStatus {
    Passed,
    Failed,
}

/// Fault memory (one Passed / Failed report per action item carrying a
/// fault id).
pub trait FaultSink {
    fn report_fault_status(&self, fault: FaultId, status: FaultStatus);
}

/// Entry point that detected a developer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceId {
    Init = 0x00,
    Deinit = 0x04,
    RequestMode = 0x02,
    MainFunction = 0x03,
    ComMCurrentMode = 0x0E,
    ComMCurrentPncMode = 0x15,
    ComMInitiateReset = 0x22,
    DcmCommunicationModeCurrentState = 0x06,
    DcmApplicationUpdated = 0x14,
    DcmRequestSessionMode = 0x09,
    DcmRequestResetMode = 0x0A,
    CanSmCurrentState = 0x05,
    EthSmCurrentState = 0x0D,
    FrSmCurrentState = 0x0C,
    LinSmCurrentState = 0x1A,
    LinSmCurrentSchedule = 0x1B,
    EcuMCurrentState = 0x0F,
    EcuMCurrentWakeup = 0x10,
    NmCarWakeUpIndication = 0x18,
    NvMCurrentBlockMode = 0x16,
    NvMCurrentJobMode = 0x17,
    WdgMRequestPartitionReset = 0x11,
    J1939NmStateChange = 0x19,
    DcmRequestCommunicationMode = 0x07,
    EthIfPortGroupLinkStateChg = 0x26,
    LinTpRequestMode = 0x0B,
    SdClientServiceCurrentState = 0x1F,
    SdEventHandlerCurrentState = 0x20,
    SdConsumedEventGroupCurrentState = 0x21,
    J1939DcmBroadcastStatus = 0x1C,
    /// Notification through the key-based entry point.
    NotifyMode = 0x30,
    /// Raised inside the interpreter rather than at an entry point.
    Internal = 0xFF,
}

impl ServiceId {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:02X})", self.code())
    }
}

pub trait DevErrorSink {
    fn report_dev_error(&self, instance: u8, service: ServiceId, error: DevError);
}

// ───────────────────────────────────────────────────────────────
// Aggregate
// ───────────────────────────────────────────────────────────────

/// Everything an engine entry point may call out to.
pub trait BswPorts:
    ComPort + PduRouterPort + ModeSwitchPort + ResetPort + CalloutPort + FaultSink + DevErrorSink
{
}

impl<T> BswPorts for T where
    T: ComPort
        + PduRouterPort
        + ModeSwitchPort
        + ResetPort
        + CalloutPort
        + FaultSink
        + DevErrorSink
        + ?Sized
{
}
