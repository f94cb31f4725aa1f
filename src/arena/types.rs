/*!
 * Arena Types
 * Usage snapshots and block handles
 */

use crate::core::limits::ALIGN_SIZE;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::ptr::NonNull;

/// Arena usage snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaUsage {
    /// Bytes currently handed out to callers (aligned sizes)
    pub outstanding_bytes: Size,
    /// Highest value `outstanding_bytes` has reached
    pub high_water_bytes: Size,
    /// Bytes currently held from the system backend
    pub system_bytes: Size,
    /// Blocks currently handed out
    pub live_blocks: usize,
    /// Blocks handed out over the arena's lifetime
    pub total_allocations: u64,
}

#[repr(C, align(16))]
struct ZeroSized([u8; ALIGN_SIZE]);

/// Handle returned for zero-byte requests
///
/// Aligned and non-null, so it is distinguishable from failure, but it must
/// never be dereferenced. Freeing it is a no-op.
#[inline]
pub fn zero_sized_block() -> NonNull<u8> {
    NonNull::<ZeroSized>::dangling().cast()
}

/// Whether `ptr` is the zero-size sentinel
#[inline]
pub fn is_zero_sized_block(ptr: *mut u8) -> bool {
    ptr == zero_sized_block().as_ptr()
}
