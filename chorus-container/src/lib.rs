//! Containers with typed, generation checked keys.
#![warn(missing_docs)]

/// Creates a typed key for a [`GenerationalSlab`].
///
/// The key is `Copy`, hashable and ordered, so it can be used freely as a
/// handle by callers that don't own the slab.
#[macro_export]
macro_rules! create_generational_key {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Ord, Eq, Hash)]
        pub struct $name {
            slot: u32,
            generation: core::num::NonZeroU32,
        }

        impl $crate::GenerationalKey for $name {
            fn new(slot: u32, generation: core::num::NonZeroU32) -> Self {
                Self { slot, generation }
            }

            fn slot(&self) -> u32 {
                self.slot
            }

            fn generation(&self) -> core::num::NonZeroU32 {
                self.generation
            }
        }
    };
    ($name:ident) => {
        $crate::create_generational_key!($name, "no documentation");
    };
}

mod generational_slab;

pub use generational_slab::{GenerationalKey, GenerationalSlab, Keys};
