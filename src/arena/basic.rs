/*!
 * Basic Arena
 * Pass-through strategy: one backend request per block
 */

use super::system::ArenaCore;
use super::traits::Arena;
use super::types::{is_zero_sized_block, zero_sized_block, ArenaUsage};
use super::policy::MemoryPolicy;
use crate::core::errors::ArenaResult;
use crate::core::types::{Address, Size};
use ahash::RandomState;
use dashmap::DashMap;
use log::{info, trace};
use parking_lot::RwLock;
use std::ptr::NonNull;

/// Arena that forwards every request to the system backend
///
/// No caching: freed memory goes straight back to the backend. Useful for
/// large, long-lived buffers and as a baseline for the pool strategy.
#[derive(Debug)]
pub struct BasicArena {
    core: ArenaCore,
    // Readers are alloc/free, the writer is shutdown
    live: RwLock<bool>,
    blocks: DashMap<Address, Size, RandomState>,
}

impl BasicArena {
    pub fn new(core: ArenaCore) -> Self {
        info!(
            "Basic arena '{}' created for {} memory",
            core.name(),
            core.store()
        );
        Self {
            core,
            live: RwLock::new(true),
            blocks: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl Arena for BasicArena {
    fn alloc(&self, size: Size) -> ArenaResult<NonNull<u8>> {
        let live = self.live.read();
        if !*live {
            return Err(self.core.retired());
        }
        if size == 0 {
            return Ok(zero_sized_block());
        }

        let (ptr, acquired) = self.core.allocate_system(size)?;
        self.blocks.insert(ptr.as_ptr() as Address, acquired);
        self.core.usage().add_allocation(acquired);
        trace!(
            "[{}] alloc {} bytes (aligned {}) at {:p}",
            self.core.name(),
            size,
            acquired,
            ptr
        );
        Ok(ptr)
    }

    fn free(&self, ptr: *mut u8) -> ArenaResult<()> {
        let Some(block) = NonNull::new(ptr) else {
            return Ok(());
        };
        if is_zero_sized_block(ptr) {
            return Ok(());
        }

        let live = self.live.read();
        if !*live {
            return Err(self.core.retired());
        }

        let Some((_, size)) = self.blocks.remove(&(ptr as Address)) else {
            return Err(self.core.ownership_violation(ptr));
        };
        self.core.usage().remove_allocation(size);
        // SAFETY: the block map only holds pointers from allocate_system with their sizes
        unsafe { self.core.deallocate_system(block, size) };
        trace!("[{}] free {} bytes at {:p}", self.core.name(), size, ptr);
        Ok(())
    }

    fn policy(&self) -> &MemoryPolicy {
        self.core.policy()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn usage(&self) -> ArenaUsage {
        self.core.usage().snapshot()
    }

    fn shutdown(&self) {
        let mut live = self.live.write();
        if !*live {
            return;
        }
        *live = false;

        let blocks: Vec<(Address, Size)> = self
            .blocks
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        self.blocks.clear();

        for (address, size) in &blocks {
            if let Some(ptr) = NonNull::new(*address as *mut u8) {
                // SAFETY: taken out of the block map, so released exactly once
                unsafe { self.core.deallocate_system(ptr, *size) };
            }
        }
        self.core.usage().clear_outstanding();

        info!(
            "Basic arena '{}' shut down, reclaimed {} outstanding blocks",
            self.core.name(),
            blocks.len()
        );
    }

    fn is_live(&self) -> bool {
        *self.live.read()
    }
}

impl Drop for BasicArena {
    fn drop(&mut self) {
        self.shutdown();
    }
}
