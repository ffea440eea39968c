//! Mode-request sources and their typed mode values.
//!
//! Every port is fed by exactly one [`SourceKind`].  Each source declares
//! the range of mode values it may report; [`SourceKind::accepts`] is the
//! check applied by developer-error detection before a request is
//! dispatched.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mode value of an event-type source that has fired.
pub const EVENT_IS_SET: u32 = 1;
/// Mode value of an event-type source that was cleared.
pub const EVENT_IS_CLEARED: u32 = 0;

// ---------------------------------------------------------------------------
// Source kinds
// ---------------------------------------------------------------------------

/// The producer of a mode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Generic user request (`request_mode`), resolved by linear search.
    Generic,
    /// Internal timer port; reported on expiry by the main function.
    Timer,
    ComMIndication,
    ComMPncRequest,
    ComMInitiateReset,
    DcmComMode,
    /// Legacy Dcm communication-mode request.
    DcmComModeRequest,
    DcmApplicationUpdated,
    DcmSession,
    DcmReset,
    CanSm,
    EthSm,
    EthIfPortGroup,
    FrSm,
    LinSm,
    LinSchedule,
    LinTp,
    SdClientService,
    SdConsumedEventGroup,
    SdEventHandler,
    EcuMState,
    EcuMWakeup,
    NmCarWakeUp,
    NvMBlock,
    NvMJob,
    WdgMPartitionReset,
    J1939Nm,
    /// Channel is the network mask.
    J1939DcmBroadcast,
}

impl SourceKind {
    pub const ALL: [SourceKind; 28] = [
        Self::Generic,
        Self::Timer,
        Self::ComMIndication,
        Self::ComMPncRequest,
        Self::ComMInitiateReset,
        Self::DcmComMode,
        Self::DcmComModeRequest,
        Self::DcmApplicationUpdated,
        Self::DcmSession,
        Self::DcmReset,
        Self::CanSm,
        Self::EthSm,
        Self::EthIfPortGroup,
        Self::FrSm,
        Self::LinSm,
        Self::LinSchedule,
        Self::LinTp,
        Self::SdClientService,
        Self::SdConsumedEventGroup,
        Self::SdEventHandler,
        Self::EcuMState,
        Self::EcuMWakeup,
        Self::NmCarWakeUp,
        Self::NvMBlock,
        Self::NvMJob,
        Self::WdgMPartitionReset,
        Self::J1939Nm,
        Self::J1939DcmBroadcast,
    ];

    /// Configuration / command-line name (matches the serde name).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Timer => "timer",
            Self::ComMIndication => "com_m_indication",
            Self::ComMPncRequest => "com_m_pnc_request",
            Self::ComMInitiateReset => "com_m_initiate_reset",
            Self::DcmComMode => "dcm_com_mode",
            Self::DcmComModeRequest => "dcm_com_mode_request",
            Self::DcmApplicationUpdated => "dcm_application_updated",
            Self::DcmSession => "dcm_session",
            Self::DcmReset => "dcm_reset",
            Self::CanSm => "can_sm",
            Self::EthSm => "eth_sm",
            Self::EthIfPortGroup => "eth_if_port_group",
            Self::FrSm => "fr_sm",
            Self::LinSm => "lin_sm",
            Self::LinSchedule => "lin_schedule",
            Self::LinTp => "lin_tp",
            Self::SdClientService => "sd_client_service",
            Self::SdConsumedEventGroup => "sd_consumed_event_group",
            Self::SdEventHandler => "sd_event_handler",
            Self::EcuMState => "ecu_m_state",
            Self::EcuMWakeup => "ecu_m_wakeup",
            Self::NmCarWakeUp => "nm_car_wake_up",
            Self::NvMBlock => "nv_m_block",
            Self::NvMJob => "nv_m_job",
            Self::WdgMPartitionReset => "wdg_m_partition_reset",
            Self::J1939Nm => "j1939_nm",
            Self::J1939DcmBroadcast => "j1939_dcm_broadcast",
        }
    }

    /// Whether `mode` lies in the range declared for this source.
    ///
    /// Generic ports carry their own bound (`max_mode`), checked by the
    /// engine; any value is accepted here.
    pub fn accepts(self, mode: u32) -> bool {
        match self {
            Self::Generic | Self::J1939Nm => true,
            Self::Timer => TimerState::try_from(mode).is_ok(),
            Self::ComMIndication => ComMMode::try_from(mode).is_ok(),
            Self::ComMPncRequest => PncMode::try_from(mode).is_ok(),
            Self::ComMInitiateReset
            | Self::DcmApplicationUpdated
            | Self::NmCarWakeUp => mode == EVENT_IS_SET || mode == EVENT_IS_CLEARED,
            // Dcm_CommunicationModeType: ENABLE_RX_TX_NORM .. DISABLE_RX_TX_NORM_NM
            Self::DcmComMode | Self::DcmComModeRequest => mode <= 0x0B,
            Self::DcmSession | Self::DcmReset | Self::LinSchedule => mode <= u32::from(u8::MAX),
            Self::CanSm => CanSmState::try_from(mode).is_ok(),
            Self::EthSm => mode <= 7,
            Self::EthIfPortGroup => EthLinkState::try_from(mode).is_ok(),
            Self::FrSm => mode <= 10,
            Self::LinSm => mode <= 2,
            Self::LinTp => LinTpMode::try_from(mode).is_ok(),
            Self::SdClientService => SdClientServiceState::try_from(mode).is_ok(),
            Self::SdConsumedEventGroup => SdEventGroupState::try_from(mode).is_ok(),
            Self::SdEventHandler => SdEventHandlerState::try_from(mode).is_ok(),
            Self::EcuMState => EcuMState::try_from(mode).is_ok(),
            Self::EcuMWakeup => WakeupStatus::try_from(mode).is_ok(),
            Self::NvMBlock | Self::NvMJob => NvmRequestResult::try_from(mode).is_ok(),
            Self::WdgMPartitionReset | Self::J1939DcmBroadcast => mode == 0,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown source name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownSource;

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode-request source")
    }
}

impl core::error::Error for UnknownSource {}

impl FromStr for SourceKind {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or(UnknownSource)
    }
}

// ---------------------------------------------------------------------------
// Typed mode values
// ---------------------------------------------------------------------------

/// Declares a `#[repr(u8)]` mode enum with a checked `TryFrom<u32>`.
macro_rules! mode_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl TryFrom<u32> for $name {
            type Error = u32;

            fn try_from(raw: u32) -> Result<Self, u32> {
                match raw {
                    $(v if v == $value => Ok(Self::$variant),)+
                    other => Err(other),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(m: $name) -> u32 {
                m as u32
            }
        }
    };
}

mode_enum! {
    /// Communication mode of a ComM channel.
    pub enum ComMMode {
        NoCommunication = 0,
        SilentCommunication = 1,
        FullCommunication = 2,
    }
}

mode_enum! {
    /// Partial-network cluster state.
    pub enum PncMode {
        PrepareSleep = 0,
        ReadySleep = 1,
        Requested = 2,
        NoCommunication = 3,
        FullCommunication = 4,
    }
}

mode_enum! {
    /// Current state of a CAN state-manager network.
    pub enum CanSmState {
        NoCommunication = 0,
        SilentCommunication = 1,
        FullCommunication = 2,
        BusOff = 3,
        ChangeBaudrate = 4,
    }
}

mode_enum! {
    /// ECU state-manager state.
    pub enum EcuMState {
        Startup = 0x10,
        StartupOne = 0x11,
        StartupTwo = 0x12,
        Wakeup = 0x20,
        WakeupValidation = 0x22,
        WakeupReaction = 0x23,
        WakeupTwo = 0x24,
        WakeupWakeSleep = 0x25,
        WakeupTtii = 0x26,
        Run = 0x30,
        AppRun = 0x32,
        AppPostRun = 0x33,
        Shutdown = 0x40,
        PrepShutdown = 0x44,
        GoSleep = 0x49,
        GoOffOne = 0x4D,
        GoOffTwo = 0x4E,
        Sleep = 0x50,
        Off = 0x80,
        Reset = 0x90,
    }
}

mode_enum! {
    /// Validation status of a wakeup source.
    pub enum WakeupStatus {
        None = 0,
        Pending = 1,
        Validated = 2,
        Expired = 3,
    }
}

mode_enum! {
    /// Result of an NVRAM block or job request.
    pub enum NvmRequestResult {
        Ok = 0,
        NotOk = 1,
        Pending = 2,
        IntegrityFailed = 3,
        BlockSkipped = 4,
        NvBlockInvalid = 5,
        Canceled = 6,
        RedundancyFailed = 7,
        RestoredFromRom = 8,
    }
}

mode_enum! {
    /// Link state of an Ethernet switch port group.
    pub enum EthLinkState {
        Down = 0,
        Active = 1,
    }
}

mode_enum! {
    /// Mode requested from the LIN transport layer.
    pub enum LinTpMode {
        ApplicativeSchedule = 0,
        DiagRequest = 1,
        DiagResponse = 2,
    }
}

mode_enum! {
    /// Service-discovery client service state.
    pub enum SdClientServiceState {
        Down = 0,
        Available = 1,
    }
}

mode_enum! {
    /// Service-discovery consumed event group state.
    pub enum SdEventGroupState {
        Down = 0,
        Available = 1,
    }
}

mode_enum! {
    /// Service-discovery event handler state.
    pub enum SdEventHandlerState {
        Released = 0,
        Requested = 1,
    }
}

mode_enum! {
    /// Mode value carried by a timer port.
    pub enum TimerState {
        Stopped = 0,
        Started = 1,
        Expired = 2,
    }
}
