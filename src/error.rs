//! Unified error types for the mode manager.
//!
//! A single `Error` enum that every subsystem can convert into. All
//! variants are `Copy` so they can be passed to the developer-error sink
//! and stored in diagnostics without allocation.
//!
//! Note that none of these ever escape the interpreter at run time: action
//! failures are consumed locally (abort-on-fail, fault reporting) and
//! usage errors turn the offending call into a no-op.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The topology or engine configuration is inconsistent.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Rejections raised while validating and compiling a [`Topology`]
/// or an [`EngineConfig`].
///
/// [`Topology`]: crate::topology::Topology
/// [`EngineConfig`]: crate::config::EngineConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A reference names a port index that does not exist.
    UnknownPort(u16),
    UnknownExpression(u16),
    UnknownRule(u16),
    UnknownActionList(u16),
    UnknownAction(u16),
    UnknownTimer(u16),
    /// Two static ports share the same `(source, channel)` key.
    DuplicatePortKey(u16),
    /// Expression references form a cycle through `Ref` nodes.
    ExpressionCycle(u16),
    /// An expression (with its `Ref` targets) nests too deep to evaluate.
    ExpressionTooDeep(u16),
    /// Nested action lists / nested rules form a cycle.
    ActionListCycle(u16),
    /// An action list tree is nested deeper than the interpreter stack.
    NestingTooDeep { list: u16, depth: usize },
    /// A PDU group id in a mask is outside `ipdu_group_count`.
    GroupOutOfRange(u16),
    /// A timer is bound to a port whose source is not `Timer`.
    TimerPortMismatch(u16),
    /// A timer start action requests zero ticks.
    ZeroTimerTicks(u16),
    /// More items than an index type can address.
    TableTooLarge(&'static str),
    /// An engine configuration field is out of range.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPort(i) => write!(f, "unknown port #{i}"),
            Self::UnknownExpression(i) => write!(f, "unknown expression #{i}"),
            Self::UnknownRule(i) => write!(f, "unknown rule #{i}"),
            Self::UnknownActionList(i) => write!(f, "unknown action list #{i}"),
            Self::UnknownAction(i) => write!(f, "unknown action #{i}"),
            Self::UnknownTimer(i) => write!(f, "unknown timer #{i}"),
            Self::DuplicatePortKey(i) => write!(f, "port #{i} duplicates an existing key"),
            Self::ExpressionCycle(i) => write!(f, "expression #{i} references itself"),
            Self::ExpressionTooDeep(i) => write!(f, "expression #{i} nests too deep"),
            Self::ActionListCycle(i) => write!(f, "action list #{i} nests itself"),
            Self::NestingTooDeep { list, depth } => {
                write!(f, "action list #{list} nests {depth} levels deep")
            }
            Self::GroupOutOfRange(g) => write!(f, "PDU group {g} out of range"),
            Self::TimerPortMismatch(i) => write!(f, "timer #{i} is not bound to a timer port"),
            Self::ZeroTimerTicks(i) => write!(f, "action #{i} starts a timer with zero ticks"),
            Self::TableTooLarge(table) => write!(f, "{table} table too large"),
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Developer errors
// ---------------------------------------------------------------------------

/// Error codes reported to the developer-error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DevError {
    /// The engine has not been initialized (or was deinitialized).
    NoInit = 0x01,
    /// No port is configured for the requesting user / source key.
    ReqUserOutOfRange = 0x03,
    /// The reported mode is outside the range declared for its source.
    ReqModeOutOfRange = 0x04,
    /// The caller is not running in a partition that owns an instance.
    WrongContext = 0x06,
    /// The request queue overflowed; the request was dropped.
    QueueFull = 0x07,
    /// An internal invariant was violated (stack depth, dispatch).
    Internal = 0x08,
}

impl DevError {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInit => write!(f, "not initialized"),
            Self::ReqUserOutOfRange => write!(f, "requesting user out of range"),
            Self::ReqModeOutOfRange => write!(f, "requested mode out of range"),
            Self::WrongContext => write!(f, "wrong execution context"),
            Self::QueueFull => write!(f, "request queue full"),
            Self::Internal => write!(f, "internal invariant violated"),
        }
    }
}

// ---------------------------------------------------------------------------
// Action results
// ---------------------------------------------------------------------------

/// Failure of a single side-effect action.  Recoverable: governs only
/// `abort_on_fail` and the fault report of the failing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// The collaborator rejected the request.
    Rejected,
    /// The collaborator is not available in its current state.
    NotAvailable,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::NotAvailable => write!(f, "not available"),
        }
    }
}

/// Outcome of one side-effect call.
pub type ActionResult = core::result::Result<(), ActionError>;

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
