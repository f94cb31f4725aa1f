/*!
 * Host Backend
 * Serves every backing store from the host heap
 *
 * Pinned requests are page-aligned and page-locked with `mlock`. Device and
 * managed requests are emulated on the host heap so the arenas run on
 * machines without an accelerator.
 */

use super::SystemBackend;
use crate::arena::policy::BackingStore;
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::limits::ALIGN_SIZE;
use crate::core::types::Size;
use log::{trace, warn};
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| {
        #[cfg(unix)]
        {
            // SAFETY: sysconf has no preconditions
            let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            if size > 0 {
                return size as usize;
            }
        }
        4096
    })
}

/// Host heap backend
#[derive(Debug, Default)]
pub struct HostBackend {
    pin_warned: AtomicBool,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn layout(store: BackingStore, nbytes: Size) -> Option<Layout> {
        match store {
            BackingStore::Pinned => {
                let page = page_size();
                let rounded = nbytes.checked_add(page - 1)? / page * page;
                Layout::from_size_align(rounded, page).ok()
            }
            _ => Layout::from_size_align(nbytes, ALIGN_SIZE).ok(),
        }
    }

    fn lock_pages(&self, ptr: NonNull<u8>, len: usize) {
        #[cfg(unix)]
        {
            // SAFETY: the range was just allocated and is owned by us
            let rc = unsafe { libc::mlock(ptr.as_ptr() as *const libc::c_void, len) };
            if rc == 0 {
                return;
            }
        }
        if !self.pin_warned.swap(true, Ordering::Relaxed) {
            warn!(
                "Could not page-lock {} bytes at {:p}; pinned blocks fall back to pageable memory (raise RLIMIT_MEMLOCK)",
                len, ptr
            );
        }
    }

    fn unlock_pages(ptr: NonNull<u8>, len: usize) {
        #[cfg(unix)]
        {
            // Result ignored: the range may never have been locked
            // SAFETY: the range is still allocated
            unsafe {
                libc::munlock(ptr.as_ptr() as *const libc::c_void, len);
            }
        }
        #[cfg(not(unix))]
        let _ = (ptr, len);
    }
}

impl SystemBackend for HostBackend {
    fn name(&self) -> &'static str {
        "host"
    }

    fn acquire(&self, store: BackingStore, nbytes: Size) -> ArenaResult<NonNull<u8>> {
        let out_of_memory = || ArenaError::OutOfMemory {
            requested: nbytes,
            store,
            used: 0,
            limit: None,
        };

        let layout = Self::layout(store, nbytes)
            .filter(|l| l.size() > 0)
            .ok_or_else(out_of_memory)?;

        // SAFETY: layout has non-zero size
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) }).ok_or_else(out_of_memory)?;

        match store {
            BackingStore::Pinned => self.lock_pages(ptr, layout.size()),
            BackingStore::Managed {
                read_only,
                preferred,
            } => trace!(
                "Managed block {:p} ({} bytes, read_only={}, preferred={}) emulated on host",
                ptr,
                nbytes,
                read_only,
                preferred
            ),
            BackingStore::Device => {
                trace!("Device block {:p} ({} bytes) emulated on host", ptr, nbytes)
            }
            BackingStore::Host => {}
        }

        Ok(ptr)
    }

    unsafe fn release(&self, store: BackingStore, ptr: NonNull<u8>, nbytes: Size) {
        let Some(layout) = Self::layout(store, nbytes) else {
            warn!("Release of {:p} with unrepresentable size {}", ptr, nbytes);
            return;
        };
        if store == BackingStore::Pinned {
            Self::unlock_pages(ptr, layout.size());
        }
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}
