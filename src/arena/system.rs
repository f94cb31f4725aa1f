/*!
 * Arena Core
 * System memory acquisition and release shared by every arena strategy
 */

use super::align::checked_align;
use super::backend::SystemBackend;
use super::policy::{BackingStore, MemoryPolicy};
use super::tracking::UsageTracker;
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::limits::ALIGN_SIZE;
use crate::core::types::Size;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::alloc::{handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

/// What an arena does when the backend cannot satisfy a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OomPolicy {
    /// Terminate through `std::alloc::handle_alloc_error`
    #[default]
    Abort,
    /// Hand `ArenaError::OutOfMemory` back to the caller
    ReturnError,
}

/// State every arena strategy embeds
///
/// All backing-store traffic goes through [`allocate_system`](Self::allocate_system)
/// and [`deallocate_system`](Self::deallocate_system) so alignment, capacity
/// accounting and the out-of-memory policy live in one place.
#[derive(Debug)]
pub struct ArenaCore {
    name: String,
    policy: MemoryPolicy,
    backend: Arc<dyn SystemBackend>,
    usage: UsageTracker,
    max_system_bytes: Option<Size>,
    oom: OomPolicy,
}

impl ArenaCore {
    pub fn new(name: impl Into<String>, policy: MemoryPolicy, backend: Arc<dyn SystemBackend>) -> Self {
        Self {
            name: name.into(),
            policy,
            backend,
            usage: UsageTracker::new(),
            max_system_bytes: None,
            oom: OomPolicy::default(),
        }
    }

    /// Cap the bytes this arena may hold from the backend
    pub fn with_max_system_bytes(mut self, limit: Option<Size>) -> Self {
        self.max_system_bytes = limit;
        self
    }

    pub fn with_oom_policy(mut self, oom: OomPolicy) -> Self {
        self.oom = oom;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &MemoryPolicy {
        &self.policy
    }

    pub fn store(&self) -> BackingStore {
        self.policy.backing_store()
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn oom_policy(&self) -> OomPolicy {
        self.oom
    }

    /// Acquire at least `nbytes` of backing store, aligned to [`ALIGN_SIZE`]
    ///
    /// Returns the pointer and the size actually acquired, which the caller
    /// must hand back to [`deallocate_system`](Self::deallocate_system).
    pub fn allocate_system(&self, nbytes: Size) -> ArenaResult<(NonNull<u8>, Size)> {
        let store = self.store();
        let Some(size) = checked_align(nbytes.max(ALIGN_SIZE)) else {
            return self.oversized(nbytes);
        };

        if let Err(used) = self.usage.reserve_system(size, self.max_system_bytes) {
            return self.fail(ArenaError::OutOfMemory {
                requested: size,
                store,
                used,
                limit: self.max_system_bytes,
            });
        }

        match self.backend.acquire(store, size) {
            Ok(ptr) => {
                debug!(
                    "[{}] acquired {} bytes of {} memory at {:p} from {} backend",
                    self.name,
                    size,
                    store,
                    ptr,
                    self.backend.name()
                );
                Ok((ptr, size))
            }
            Err(err) => {
                self.usage.release_system(size);
                let err = match err {
                    ArenaError::OutOfMemory { requested, store, .. } => ArenaError::OutOfMemory {
                        requested,
                        store,
                        used: self.usage.system_bytes(),
                        limit: self.max_system_bytes,
                    },
                    other => other,
                };
                self.fail(err)
            }
        }
    }

    /// Return backing store obtained from [`allocate_system`](Self::allocate_system)
    ///
    /// # Safety
    ///
    /// `ptr` and `size` must be exactly what `allocate_system` returned on this
    /// core, and the range must not be released twice.
    pub unsafe fn deallocate_system(&self, ptr: NonNull<u8>, size: Size) {
        self.backend.release(self.store(), ptr, size);
        self.usage.release_system(size);
        debug!("[{}] released {} bytes at {:p}", self.name, size, ptr);
    }

    /// Fail a request whose size cannot even be represented once aligned
    pub(crate) fn oversized<T>(&self, requested: Size) -> ArenaResult<T> {
        self.fail(ArenaError::OutOfMemory {
            requested,
            store: self.store(),
            used: self.usage.system_bytes(),
            limit: self.max_system_bytes,
        })
    }

    fn fail<T>(&self, err: ArenaError) -> ArenaResult<T> {
        error!("[{}] {}", self.name, err);
        if self.oom == OomPolicy::Abort {
            let requested = match &err {
                ArenaError::OutOfMemory { requested, .. } => *requested,
                _ => ALIGN_SIZE,
            };
            let layout = Layout::from_size_align(requested, ALIGN_SIZE)
                .unwrap_or_else(|_| Layout::new::<u8>());
            handle_alloc_error(layout);
        }
        Err(err)
    }

    /// Report a free of memory this arena does not own
    ///
    /// Panics in debug builds; release builds log and return the error.
    pub fn ownership_violation(&self, ptr: *mut u8) -> ArenaError {
        error!(
            "[{}] free of {:p}: not a live block of this arena (double free or foreign pointer)",
            self.name, ptr
        );
        if cfg!(debug_assertions) {
            panic!(
                "arena '{}': free of {:p}, which is not a live block of this arena",
                self.name, ptr
            );
        }
        ArenaError::InvalidAddress(ptr as usize)
    }

    pub fn retired(&self) -> ArenaError {
        ArenaError::ArenaRetired {
            arena: self.name.clone(),
        }
    }
}
