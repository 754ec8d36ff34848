//! Opaque instance handles
//!
//! Trampolines receive the target instance as a `void*`. Instead of handing
//! out real addresses, an object is pinned in a registry and the boundary
//! sees a nonzero token that stays valid until released.

use dashmap::DashMap;
use std::ffi::c_void;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::TrampolineError;

/// Token standing in for one pinned instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(NonZeroU64);

impl InstanceHandle {
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as usize as *mut c_void
    }

    /// `None` for a null pointer
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        NonZeroU64::new(ptr as usize as u64).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Thread-safe registry of pinned instances.
pub struct InstanceHandles<T> {
    map: DashMap<u64, Arc<T>>,
    next_id: AtomicU64,
}

impl<T> InstanceHandles<T> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Pin `value` and return its handle.
    pub fn pin(&self, value: Arc<T>) -> InstanceHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.map.insert(id, value);
        // ids start at 1 and only grow
        InstanceHandle(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }

    pub fn resolve(&self, handle: InstanceHandle) -> Result<Arc<T>, TrampolineError> {
        self.map
            .get(&handle.get())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(TrampolineError::StaleHandle(handle.get()))
    }

    /// Unpin; later resolves of the handle fail.
    pub fn release(&self, handle: InstanceHandle) -> Option<Arc<T>> {
        self.map.remove(&handle.get()).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<T> Default for InstanceHandles<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_resolve_release() {
        let handles = InstanceHandles::new();
        let handle = handles.pin(Arc::new("widget".to_string()));
        assert_eq!(handles.len(), 1);
        assert_eq!(handles.resolve(handle).unwrap().as_str(), "widget");

        let released = handles.release(handle).unwrap();
        assert_eq!(released.as_str(), "widget");
        assert!(handles.is_empty());
        assert_eq!(handles.resolve(handle), Err(TrampolineError::StaleHandle(handle.get())));
        assert!(handles.release(handle).is_none());
    }

    #[test]
    fn test_pointer_round_trip() {
        let handles = InstanceHandles::new();
        let handle = handles.pin(Arc::new(5u32));
        let ptr = handle.as_ptr();
        assert!(!ptr.is_null());
        assert_eq!(InstanceHandle::from_ptr(ptr), Some(handle));
        assert_eq!(InstanceHandle::from_ptr(std::ptr::null()), None);
    }

    #[test]
    fn test_handles_are_distinct() {
        let handles = InstanceHandles::new();
        let a = handles.pin(Arc::new(1));
        let b = handles.pin(Arc::new(1));
        assert_ne!(a, b);
        assert_eq!(*handles.resolve(b).unwrap(), 1);
    }
}
