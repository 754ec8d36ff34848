//! Managed half of the trampoline protocol
//!
//! The table creates a slot's entry point the first time the locator asks
//! for it and pins it for the rest of the process. Creation happens under
//! the map's shard lock, so concurrent first lookups of one slot still run
//! the factory exactly once.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::ffi::c_void;

use crate::interop::EntryPoint;
use crate::slot::Slot;

/// A freshly created slot implementation.
pub struct Trampoline {
    pub entry: EntryPoint,

    /// Whatever keeps `entry` callable (closure state, boxed delegate)
    pub state: Option<Box<dyn Any + Send + Sync>>,
}

impl Trampoline {
    /// An entry point needing no extra state
    pub fn bare(entry: EntryPoint) -> Self {
        Self { entry, state: None }
    }
}

struct Pinned {
    entry: EntryPoint,
    _state: Option<&'static (dyn Any + Send + Sync)>,
}

/// Permanent slot-to-entry-point cache for one type.
pub struct DispatchTable<S: Slot> {
    entries: DashMap<S, Pinned>,
    factory: fn(S) -> Option<Trampoline>,
}

impl<S: Slot> DispatchTable<S> {
    /// `factory` returns `None` for slots the type does not implement.
    ///
    /// The factory runs while the slot's shard is write-locked, so it must
    /// not call back into this table. A nested lookup that lands in the
    /// same shard deadlocks.
    pub fn new(factory: fn(S) -> Option<Trampoline>) -> Self {
        Self {
            entries: DashMap::new(),
            factory,
        }
    }

    /// Entry point for `slot`, created and pinned on first use
    pub fn lookup(&self, slot: S) -> Option<EntryPoint> {
        if let Some(pinned) = self.entries.get(&slot) {
            return Some(pinned.entry);
        }
        match self.entries.entry(slot) {
            Entry::Occupied(pinned) => Some(pinned.get().entry),
            Entry::Vacant(vacant) => {
                let trampoline = (self.factory)(slot)?;
                let entry = trampoline.entry;
                vacant.insert(Pinned {
                    entry,
                    _state: trampoline.state.map(|state| &*Box::leak(state)),
                });
                Some(entry)
            }
        }
    }

    /// Raw form of [`lookup`](Self::lookup), for use inside a locator;
    /// null for undefined or unimplemented slots.
    pub fn locate_raw(&self, raw: i32) -> *const c_void {
        S::from_raw(raw)
            .and_then(|slot| self.lookup(slot))
            .map_or(std::ptr::null(), EntryPoint::as_ptr)
    }

    /// Number of slots pinned so far
    pub fn pinned_count(&self) -> usize {
        self.entries.len()
    }
}
