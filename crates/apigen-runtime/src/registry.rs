//! Native half of the trampoline protocol
//!
//! One registry per managed-server type, usually a `static`. The managed
//! side registers its locator once; every later call resolves a slot to
//! the entry point implementing it.

use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::marker::PhantomData;

use crate::error::TrampolineError;
use crate::interop::EntryPoint;
use crate::slot::Slot;

/// Callback mapping a raw slot value to its entry point (null if unknown)
pub type Locator = extern "C" fn(raw: i32) -> *const c_void;

/// Locator registration for one type.
pub struct TrampolineRegistry<S> {
    type_name: &'static str,
    locator: OnceCell<Locator>,
    _slots: PhantomData<fn(S)>,
}

impl<S: Slot> TrampolineRegistry<S> {
    pub const fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            locator: OnceCell::new(),
            _slots: PhantomData,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Store the locator unless one is already set.
    ///
    /// Returns whether this call won; the first registration is permanent.
    pub fn register_once(&self, locator: Locator) -> bool {
        self.locator.set(locator).is_ok()
    }

    pub fn is_registered(&self) -> bool {
        self.locator.get().is_some()
    }

    /// Entry point implementing `slot`
    pub fn resolve(&self, slot: S) -> Result<EntryPoint, TrampolineError> {
        let locator = self.locator.get().ok_or(TrampolineError::LocatorNotRegistered {
            type_name: self.type_name,
        })?;
        let raw = slot.to_raw();
        EntryPoint::from_ptr(locator(raw)).ok_or(TrampolineError::UnknownSlot {
            type_name: self.type_name,
            slot: raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::define_slots! {
        enum GaugeSlot { GetValue, Reset }
    }

    static MARKER: u8 = 0;

    extern "C" fn only_reset(raw: i32) -> *const c_void {
        if raw == GaugeSlot::Reset.to_raw() {
            &MARKER as *const u8 as *const c_void
        } else {
            std::ptr::null()
        }
    }

    extern "C" fn nothing(_raw: i32) -> *const c_void {
        std::ptr::null()
    }

    #[test]
    fn test_unregistered_fails() {
        let registry: TrampolineRegistry<GaugeSlot> = TrampolineRegistry::new("Gauge");
        assert!(!registry.is_registered());
        assert_eq!(
            registry.resolve(GaugeSlot::Reset),
            Err(TrampolineError::LocatorNotRegistered { type_name: "Gauge" })
        );
    }

    #[test]
    fn test_resolve_through_locator() {
        let registry: TrampolineRegistry<GaugeSlot> = TrampolineRegistry::new("Gauge");
        assert!(registry.register_once(only_reset));

        let entry = registry.resolve(GaugeSlot::Reset).unwrap();
        assert_eq!(entry.as_ptr(), &MARKER as *const u8 as *const c_void);
        assert_eq!(
            registry.resolve(GaugeSlot::GetValue),
            Err(TrampolineError::UnknownSlot { type_name: "Gauge", slot: 0 })
        );
    }

    #[test]
    fn test_first_registration_wins() {
        static REGISTRY: TrampolineRegistry<GaugeSlot> = TrampolineRegistry::new("Gauge");
        assert!(REGISTRY.register_once(only_reset));
        assert!(!REGISTRY.register_once(nothing));
        assert!(REGISTRY.resolve(GaugeSlot::Reset).is_ok());
    }
}
