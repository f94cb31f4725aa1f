/*!
 * Arena Traits
 * The allocator interface every memory pool implements
 */

use super::align;
use super::policy::MemoryPolicy;
use super::types::ArenaUsage;
use crate::core::errors::ArenaResult;
use crate::core::types::Size;
use std::fmt;
use std::ptr::NonNull;

/// Memory arena interface
///
/// Every block returned by [`alloc`](Arena::alloc) starts on a 16-byte
/// boundary. A block must be freed through the same arena that produced it.
pub trait Arena: Send + Sync + fmt::Debug {
    /// Allocate at least `size` bytes
    ///
    /// A zero-byte request returns [`zero_sized_block`](super::zero_sized_block).
    fn alloc(&self, size: Size) -> ArenaResult<NonNull<u8>>;

    /// Free a block returned by [`alloc`](Arena::alloc)
    ///
    /// Null and the zero-size handle are no-ops.
    fn free(&self, ptr: *mut u8) -> ArenaResult<()>;

    /// Round `size` up to the arena alignment boundary
    ///
    /// Panics if the rounded size does not fit in `Size`.
    fn align(&self, size: Size) -> Size {
        align::align(size)
    }

    /// The policy this arena was built with
    fn policy(&self) -> &MemoryPolicy;

    /// Arena name for logs and reports
    fn name(&self) -> &str;

    /// Current usage counters
    fn usage(&self) -> ArenaUsage;

    /// Retire the arena and release every backend resource it holds
    ///
    /// Blocks still held by callers become invalid.
    fn shutdown(&self);

    /// Whether the arena still serves requests
    fn is_live(&self) -> bool;

    /// Return cached, fully free backing memory to the system
    ///
    /// Returns the number of bytes released.
    fn release_unused(&self) -> Size {
        0
    }
}
