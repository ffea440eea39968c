//! Basic-software mode manager.
//!
//! Arbitrates mode requests reported by communication, diagnostic and
//! state-manager modules against a fixed rule topology and executes the
//! action lists the rules select.  Hosted builds enable the `std` feature
//! for the critical-section implementation; targets without it link their
//! own `critical-section` provider.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod groups;
pub mod modes;
pub mod partition;
pub mod ports;
pub mod topology;

pub use config::EngineConfig;
pub use engine::{Engine, RequestEntry, RequestOrigin, Tristate};
pub use error::{ActionError, ActionResult, ConfigError, DevError, Error, Result};
pub use groups::GroupVector;
pub use partition::PartitionRegistry;
pub use ports::BswPorts;
pub use topology::{CompiledTopology, PortKey, Topology};
