//! Apigen Runtime
//!
//! Process-lifetime state behind the trampoline protocol, for native
//! libraries written in Rust that speak the generated C ABI.
//!
//! - [`TrampolineRegistry`]: the native half. Holds the single locator
//!   callback registered by the managed side and resolves slots through it.
//! - [`DispatchTable`]: the managed half. Creates the entry point for a slot
//!   on first lookup and keeps it pinned for the rest of the process.
//! - [`InstanceHandles`]: opaque, address-stable tokens handed across the
//!   boundary in place of object references.
//! - [`InteropString`]: NUL-terminated UTF-16 buffers with explicit
//!   ownership transfer.
//!
//! Nothing here is ever torn down: registrations and pinned entries live
//! until the process exits.

pub mod dispatch;
pub mod error;
pub mod handles;
pub mod interop;
pub mod registry;
pub mod slot;

pub use dispatch::{DispatchTable, Trampoline};
pub use error::TrampolineError;
pub use handles::{InstanceHandle, InstanceHandles};
pub use interop::{EntryPoint, InteropString};
pub use registry::{Locator, TrampolineRegistry};
pub use slot::Slot;
