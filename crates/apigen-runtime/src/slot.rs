//! Trampoline slot enumerations
//!
//! Both halves number slots by position: the first declared slot is 0.
//! [`define_slots!`](crate::define_slots) derives that numbering so it
//! cannot drift from the declaration.

use std::hash::Hash;

/// A per-type trampoline slot enumeration.
pub trait Slot: Copy + Eq + Hash + Send + Sync + 'static {
    /// Slot for a raw value crossing the boundary; `None` when undefined
    fn from_raw(raw: i32) -> Option<Self>;

    fn to_raw(self) -> i32;

    fn name(self) -> &'static str;
}

/// Declare a slot enumeration numbered by declaration order.
///
/// ```ignore
/// apigen_runtime::define_slots! {
///     pub enum WidgetSlot { GetText, SetText, Click }
/// }
/// ```
#[macro_export]
macro_rules! define_slots {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($slot:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $($slot),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$slot),*];
        }

        impl $crate::Slot for $name {
            fn from_raw(raw: i32) -> Option<Self> {
                usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
            }

            fn to_raw(self) -> i32 {
                self as i32
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$slot => stringify!($slot)),*
                }
            }
        }
    };
}
