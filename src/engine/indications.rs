//! Inbound mode-request entry points.
//!
//! Every entry point validates up front and turns into a no-op on a usage
//! error: it is reported to the developer-error sink (when detection is
//! enabled) and the mode is not applied.  Range checks themselves only run
//! with detection enabled.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::error::DevError;
use crate::modes::{
    CanSmState, ComMMode, EVENT_IS_CLEARED, EVENT_IS_SET, EcuMState, EthLinkState, LinTpMode,
    NvmRequestResult, PncMode, SdClientServiceState, SdEventGroupState, SdEventHandlerState,
    SourceKind, WakeupStatus,
};
use crate::ports::{BswPorts, ServiceId};
use crate::topology::PortKey;

use super::Engine;
use super::queue::{RequestEntry, RequestOrigin};

impl<M: RawMutex> Engine<M> {
    /// Report `mode` on the port bound to `key`.
    pub fn notify_mode<B>(&self, bsw: &B, key: PortKey, mode: u32)
    where
        B: BswPorts + ?Sized,
    {
        self.indication(bsw, ServiceId::NotifyMode, key, mode);
    }

    /// Generic user request.
    pub fn request_mode<B>(&self, bsw: &B, user: u16, mode: u32)
    where
        B: BswPorts + ?Sized,
    {
        self.indication(
            bsw,
            ServiceId::RequestMode,
            PortKey::new(SourceKind::Generic, u32::from(user)),
            mode,
        );
    }

    fn indication<B>(&self, bsw: &B, service: ServiceId, key: PortKey, mode: u32)
    where
        B: BswPorts + ?Sized,
    {
        if !self.is_initialized() {
            self.report(bsw, service, DevError::NoInit);
            return;
        }
        let detect = self.config.dev_error_detect;
        if detect && !key.source.accepts(mode) {
            self.report(bsw, service, DevError::ReqModeOutOfRange);
            return;
        }
        let Some(port) = self.topology.find_port(key) else {
            self.report(bsw, service, DevError::ReqUserOutOfRange);
            return;
        };
        if detect && !self.topology.port(port).accepts(mode) {
            self.report(bsw, service, DevError::ReqModeOutOfRange);
            return;
        }

        let origin = if key.source == SourceKind::Generic {
            RequestOrigin::Generic
        } else {
            RequestOrigin::Static
        };
        self.handle_request(bsw, RequestEntry { port, mode, origin }, service);
    }

    // -- ComM --------------------------------------------------------------

    pub fn comm_current_mode<B>(&self, bsw: &B, network: u8, mode: ComMMode)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::ComMIndication, u32::from(network));
        self.indication(bsw, ServiceId::ComMCurrentMode, key, mode.into());
    }

    pub fn comm_current_pnc_mode<B>(&self, bsw: &B, pnc: u8, mode: PncMode)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::ComMPncRequest, u32::from(pnc));
        self.indication(bsw, ServiceId::ComMCurrentPncMode, key, mode.into());
    }

    pub fn comm_initiate_reset<B>(&self, bsw: &B)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::ComMInitiateReset, 0);
        self.indication(bsw, ServiceId::ComMInitiateReset, key, EVENT_IS_SET);
    }

    // -- Dcm ---------------------------------------------------------------

    pub fn dcm_communication_mode_current_state<B>(&self, bsw: &B, network: u8, mode: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::DcmComMode, u32::from(network));
        self.indication(
            bsw,
            ServiceId::DcmCommunicationModeCurrentState,
            key,
            u32::from(mode),
        );
    }

    /// Legacy request for a communication mode (`0..=0x0B`).
    pub fn dcm_request_communication_mode<B>(&self, bsw: &B, network: u8, mode: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::DcmComModeRequest, u32::from(network));
        self.indication(
            bsw,
            ServiceId::DcmRequestCommunicationMode,
            key,
            u32::from(mode),
        );
    }

    /// Reported with mode `EVENT_IS_CLEARED`; rules react to the port
    /// becoming defined.
    pub fn dcm_application_updated<B>(&self, bsw: &B)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::DcmApplicationUpdated, 0);
        self.indication(bsw, ServiceId::DcmApplicationUpdated, key, EVENT_IS_CLEARED);
    }

    pub fn dcm_request_session_mode<B>(&self, bsw: &B, session: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::DcmSession, 0);
        self.indication(bsw, ServiceId::DcmRequestSessionMode, key, u32::from(session));
    }

    pub fn dcm_request_reset_mode<B>(&self, bsw: &B, reset: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::DcmReset, 0);
        self.indication(bsw, ServiceId::DcmRequestResetMode, key, u32::from(reset));
    }

    // -- Bus state managers ------------------------------------------------

    pub fn cansm_current_state<B>(&self, bsw: &B, network: u8, state: CanSmState)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::CanSm, u32::from(network));
        self.indication(bsw, ServiceId::CanSmCurrentState, key, state.into());
    }

    pub fn ethsm_current_state<B>(&self, bsw: &B, network: u8, state: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::EthSm, u32::from(network));
        self.indication(bsw, ServiceId::EthSmCurrentState, key, u32::from(state));
    }

    pub fn ethif_port_group_link_state_chg<B>(&self, bsw: &B, group: u8, state: EthLinkState)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::EthIfPortGroup, u32::from(group));
        self.indication(bsw, ServiceId::EthIfPortGroupLinkStateChg, key, state.into());
    }

    pub fn frsm_current_state<B>(&self, bsw: &B, network: u8, state: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::FrSm, u32::from(network));
        self.indication(bsw, ServiceId::FrSmCurrentState, key, u32::from(state));
    }

    pub fn linsm_current_state<B>(&self, bsw: &B, network: u8, state: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::LinSm, u32::from(network));
        self.indication(bsw, ServiceId::LinSmCurrentState, key, u32::from(state));
    }

    pub fn linsm_current_schedule<B>(&self, bsw: &B, network: u8, schedule: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::LinSchedule, u32::from(network));
        self.indication(bsw, ServiceId::LinSmCurrentSchedule, key, u32::from(schedule));
    }

    pub fn lintp_request_mode<B>(&self, bsw: &B, network: u8, mode: LinTpMode)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::LinTp, u32::from(network));
        self.indication(bsw, ServiceId::LinTpRequestMode, key, mode.into());
    }

    // -- Service discovery -------------------------------------------------

    pub fn sd_client_service_current_state<B>(
        &self,
        bsw: &B,
        handle: u16,
        state: SdClientServiceState,
    ) where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::SdClientService, u32::from(handle));
        self.indication(bsw, ServiceId::SdClientServiceCurrentState, key, state.into());
    }

    pub fn sd_consumed_event_group_current_state<B>(
        &self,
        bsw: &B,
        handle: u16,
        state: SdEventGroupState,
    ) where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::SdConsumedEventGroup, u32::from(handle));
        self.indication(
            bsw,
            ServiceId::SdConsumedEventGroupCurrentState,
            key,
            state.into(),
        );
    }

    pub fn sd_event_handler_current_state<B>(
        &self,
        bsw: &B,
        handle: u16,
        state: SdEventHandlerState,
    ) where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::SdEventHandler, u32::from(handle));
        self.indication(bsw, ServiceId::SdEventHandlerCurrentState, key, state.into());
    }

    // -- EcuM --------------------------------------------------------------

    pub fn ecum_current_state<B>(&self, bsw: &B, state: EcuMState)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::EcuMState, 0);
        self.indication(bsw, ServiceId::EcuMCurrentState, key, state.into());
    }

    pub fn ecum_current_wakeup<B>(&self, bsw: &B, source: u32, state: WakeupStatus)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::EcuMWakeup, source);
        self.indication(bsw, ServiceId::EcuMCurrentWakeup, key, state.into());
    }

    // -- Nm / NvM / WdgM / J1939 -------------------------------------------

    pub fn nmif_car_wakeup_indication<B>(&self, bsw: &B, network: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::NmCarWakeUp, u32::from(network));
        self.indication(bsw, ServiceId::NmCarWakeUpIndication, key, EVENT_IS_CLEARED);
    }

    pub fn nvm_current_block_mode<B>(&self, bsw: &B, block: u16, mode: NvmRequestResult)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::NvMBlock, u32::from(block));
        self.indication(bsw, ServiceId::NvMCurrentBlockMode, key, mode.into());
    }

    pub fn nvm_current_job_mode<B>(&self, bsw: &B, service: u8, mode: NvmRequestResult)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::NvMJob, u32::from(service));
        self.indication(bsw, ServiceId::NvMCurrentJobMode, key, mode.into());
    }

    pub fn wdgm_request_partition_reset<B>(&self, bsw: &B, application: u8)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::WdgMPartitionReset, u32::from(application));
        self.indication(bsw, ServiceId::WdgMRequestPartitionReset, key, 0);
    }

    /// Channel is `network << 8 | node`.
    pub fn j1939nm_state_change<B>(&self, bsw: &B, network: u8, node: u8, state: u8)
    where
        B: BswPorts + ?Sized,
    {
        let channel = (u32::from(network) << 8) | u32::from(node);
        let key = PortKey::new(SourceKind::J1939Nm, channel);
        self.indication(bsw, ServiceId::J1939NmStateChange, key, u32::from(state));
    }

    /// Broadcast status of the J1939 diagnostics; the channel is the
    /// network mask and the mode is always 0.
    pub fn j1939dcm_broadcast_status<B>(&self, bsw: &B, network_mask: u16)
    where
        B: BswPorts + ?Sized,
    {
        let key = PortKey::new(SourceKind::J1939DcmBroadcast, u32::from(network_mask));
        self.indication(bsw, ServiceId::J1939DcmBroadcastStatus, key, 0);
    }
}
