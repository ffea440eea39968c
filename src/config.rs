//! Engine configuration parameters.
//!
//! Switches that select how the mode manager validates requests and
//! serializes concurrent arbitration.  The rule/action topology itself
//! lives in [`crate::topology`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hard capacity of the request queue (stack-allocated).
pub const REQUEST_QUEUE_MAX: usize = 32;

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instance id reported with every developer error.
    pub instance_id: u8,

    // --- Validation ---
    /// Validate inputs of public entry points and report usage errors.
    pub dev_error_detect: bool,
    /// Report Passed/Failed per action item that carries a fault id.
    pub fault_reporting: bool,

    // --- Arbitration ---
    /// Serialize re-entrant requests through the active flag and queue.
    pub queued_arbitration: bool,
    /// Route requests on deferred ports through the queue as well.
    pub queue_deferred_requests: bool,
    /// Postpone a main function that finds an arbitration pass active.
    pub delay_main_function: bool,
    /// Logical bound of the request queue (`1..=REQUEST_QUEUE_MAX`).
    pub request_queue_capacity: usize,

    // --- Timing ---
    /// Period of the main function (milliseconds).
    pub main_function_period_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_id: 0,

            dev_error_detect: true,
            fault_reporting: true,

            queued_arbitration: true,
            queue_deferred_requests: true,
            delay_main_function: true,
            request_queue_capacity: 8,

            main_function_period_ms: 10, // 100 Hz
        }
    }
}

impl EngineConfig {
    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_queue_capacity == 0 || self.request_queue_capacity > REQUEST_QUEUE_MAX {
            return Err(ConfigError::Invalid("request_queue_capacity"));
        }
        if self.main_function_period_ms == 0 {
            return Err(ConfigError::Invalid("main_function_period_ms"));
        }
        Ok(())
    }
}
