//! Adapters: concrete implementations of the collaborator port traits.
//!
//! | Adapter   | Implements                  | Connects to        |
//! |-----------|-----------------------------|--------------------|
//! | `log_bsw` | every port in `BswPorts`    | `log` facade       |

pub mod log_bsw;

pub use log_bsw::LoggingBsw;
