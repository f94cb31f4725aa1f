/*!
 * System Backend
 * The seam between arenas and whatever actually hands out raw memory
 */

mod host;

pub use host::HostBackend;

use super::policy::BackingStore;
use crate::core::errors::ArenaResult;
use crate::core::types::Size;
use std::fmt;
use std::ptr::NonNull;

/// Raw memory provider
///
/// Arenas never call this directly; they go through
/// [`ArenaCore`](crate::arena::ArenaCore), which centralizes alignment,
/// accounting and out-of-memory handling.
pub trait SystemBackend: Send + Sync + fmt::Debug {
    /// Backend name for logs and reports
    fn name(&self) -> &'static str;

    /// Acquire `nbytes` from `store`
    ///
    /// `nbytes` is non-zero and a multiple of the arena alignment; the returned
    /// address must be aligned to it.
    fn acquire(&self, store: BackingStore, nbytes: Size) -> ArenaResult<NonNull<u8>>;

    /// Release memory obtained from [`acquire`](Self::acquire)
    ///
    /// # Safety
    ///
    /// `ptr` must come from `acquire` on this backend with the same `store`
    /// and `nbytes`, and must not have been released already.
    unsafe fn release(&self, store: BackingStore, ptr: NonNull<u8>, nbytes: Size);
}
