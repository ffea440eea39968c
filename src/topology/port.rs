//! Mode-request ports and timers.

use serde::{Deserialize, Serialize};

use super::PortId;
use crate::modes::SourceKind;

/// When a request on a port is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestProcessing {
    /// Dependent rules are evaluated synchronously by the arbitration pass.
    #[default]
    Immediate,
    /// Dependent rules wait for the next main-function cycle.
    Deferred,
}

/// Lookup key of a port: the reporting source plus its channel / user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortKey {
    pub source: SourceKind,
    pub channel: u32,
}

impl PortKey {
    pub const fn new(source: SourceKind, channel: u32) -> Self {
        Self { source, channel }
    }
}

/// Configured mode-request port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub source: SourceKind,
    /// Network / channel handle, or the requesting user for generic ports.
    #[serde(default)]
    pub channel: u32,
    #[serde(default)]
    pub processing: RequestProcessing,
    /// Mode the port holds after `init`; the port counts as defined.
    #[serde(default)]
    pub initial_mode: Option<u32>,
    /// Upper bound of generic user modes.
    #[serde(default)]
    pub max_mode: Option<u32>,
}

impl PortSpec {
    pub const fn key(&self) -> PortKey {
        PortKey::new(self.source, self.channel)
    }

    pub const fn is_immediate(&self) -> bool {
        matches!(self.processing, RequestProcessing::Immediate)
    }

    /// Whether `mode` is a legal request for this port.
    pub fn accepts(&self, mode: u32) -> bool {
        if !self.source.accepts(mode) {
            return false;
        }
        match (self.source, self.max_mode) {
            (SourceKind::Generic, Some(max)) => mode <= max,
            _ => true,
        }
    }
}

/// Countdown timer bound to a timer port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSpec {
    pub name: String,
    pub port: PortId,
}
