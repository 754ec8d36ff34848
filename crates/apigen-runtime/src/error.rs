//! Trampoline errors

use thiserror::Error;

/// Errors raised while resolving trampolines or instance handles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrampolineError {
    /// No locator was registered for the type
    #[error("Trampoline locator is not set for {type_name}")]
    LocatorNotRegistered {
        /// Owning type
        type_name: &'static str,
    },

    /// The locator returned no entry point for the slot
    #[error("Unknown trampoline {slot} in {type_name}")]
    UnknownSlot {
        /// Owning type
        type_name: &'static str,
        /// Raw slot value
        slot: i32,
    },

    /// The handle was released or never issued
    #[error("Stale instance handle {0:#x}")]
    StaleHandle(u64),
}
