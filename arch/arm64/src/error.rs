// =============================================================================
// Pulse - Error Types
// =============================================================================

use thiserror::Error;

/// Configuration and registration failures.
///
/// Hardware faults are not represented here: a transport that never drains
/// or a missing device simply hangs the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// GIC interrupt IDs 1020-1023 are reserved and cannot be enabled.
    #[error("interrupt id {0} is outside the configurable range 0..1020")]
    InvalidInterruptId(u32),

    /// A local-controller line must name at least one timer source and
    /// nothing else.
    #[error("core interrupt source mask {0:#x} is not a non-empty set of timer sources")]
    InvalidSourceMask(u32),

    #[error("an IRQ handler is already registered")]
    HandlerAlreadyRegistered,
}

pub type Result<T> = core::result::Result<T, Error>;
