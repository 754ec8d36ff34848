//! Boundary value types

use std::ffi::c_void;
use std::ptr::NonNull;

/// A non-null function pointer handed across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(NonNull<c_void>);

// Entry points are addresses of code, never of data owned by a thread.
unsafe impl Send for EntryPoint {}
unsafe impl Sync for EntryPoint {}

impl EntryPoint {
    /// `None` for a null pointer
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        NonNull::new(ptr as *mut c_void).map(Self)
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0.as_ptr()
    }
}

/// NUL-terminated UTF-16 text owned by one side of the boundary at a time.
///
/// [`into_raw`](Self::into_raw) hands the buffer out;
/// [`from_raw`](Self::from_raw) takes it back for release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropString {
    units: Box<[u16]>,
}

impl InteropString {
    /// Encode `text`, truncated at its first NUL.
    ///
    /// The buffer length is recovered from the terminator in
    /// [`from_raw`](Self::from_raw), so no NUL may precede it.
    pub fn new(text: &str) -> Self {
        let units: Vec<u16> = text
            .encode_utf16()
            .take_while(|&unit| unit != 0)
            .chain(std::iter::once(0))
            .collect();
        Self {
            units: units.into_boxed_slice(),
        }
    }

    /// Code units without the terminator
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.units.len() - 1]
    }

    pub fn as_ptr(&self) -> *const u16 {
        self.units.as_ptr()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_units())
    }

    /// Release ownership to the other side
    pub fn into_raw(self) -> *mut u16 {
        Box::into_raw(self.units) as *mut u16
    }

    /// Reclaim a buffer produced by [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` and must not be used afterwards.
    pub unsafe fn from_raw(ptr: *mut u16) -> Self {
        let len = unit_len(ptr) + 1;
        let units = Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len));
        Self { units }
    }

    /// Copy borrowed text; a null pointer reads as empty.
    ///
    /// # Safety
    /// `ptr` must be null or point to a NUL-terminated UTF-16 buffer.
    pub unsafe fn read(ptr: *const u16) -> String {
        if ptr.is_null() {
            return String::new();
        }
        let units = std::slice::from_raw_parts(ptr, unit_len(ptr));
        String::from_utf16_lossy(units)
    }
}

unsafe fn unit_len(ptr: *const u16) -> usize {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    len
}
