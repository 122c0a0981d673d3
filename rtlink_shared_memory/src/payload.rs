//! Payload types that may live in a shared memory segment.
//!
//! Producers and consumers are built independently, so a payload's identity is
//! an explicit [`ShmPayload::TYPE_TAG`] string both sides agree on, never a
//! compiler-generated type id.

use rtlink_common::consts::CACHE_LINE_SIZE;

/// A type that can be placed in shared memory.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or a primitive), contain no pointers or
/// references, be valid for every bit pattern another process may write and
/// have an alignment no greater than [`CACHE_LINE_SIZE`]. Interior mutability
/// is only allowed through atomics.
pub unsafe trait ShmPayload: Sized + Send + Sync + 'static {
    /// Tag written into the segment header and checked on attach.
    const TYPE_TAG: &'static str;
}

/// Whether `T`'s alignment is satisfied by the payload offset.
pub(crate) const fn alignment_supported<T>() -> bool {
    std::mem::align_of::<T>() <= CACHE_LINE_SIZE
}

/// Implement [`ShmPayload`] for plain types with explicit tags.
///
/// ```rust
/// # use rtlink_shared_memory::impl_shm_payload;
/// #[repr(C)]
/// #[derive(Clone, Copy, Default)]
/// pub struct Wrench { pub force: [f64; 3], pub torque: [f64; 3] }
///
/// impl_shm_payload!(Wrench => "Wrench");
/// ```
#[macro_export]
macro_rules! impl_shm_payload {
    ($($ty:ty => $tag:literal),+ $(,)?) => {
        $(
            unsafe impl $crate::payload::ShmPayload for $ty {
                const TYPE_TAG: &'static str = $tag;
            }
        )+
    };
}

impl_shm_payload!(
    i8 => "Int8",
    i16 => "Int16",
    i32 => "Int32",
    i64 => "Int64",
    u8 => "UInt8",
    u16 => "UInt16",
    u32 => "UInt32",
    u64 => "UInt64",
    f32 => "Float",
    f64 => "Double",
);
