/*!
 * Pool Arena
 *
 * Default arena strategy. Backing memory is requested from the system in
 * chunks and carved into blocks through a segregated free list.
 *
 * ## Allocation
 *
 * - **Best fit**: size-class buckets give O(1) lookup for small and medium
 *   blocks, O(log n) for large ones
 * - **Splitting**: the unused tail of an oversized free block goes back to
 *   the free list
 * - **Coalescing**: adjacent free blocks of the same chunk are merged every
 *   `coalesce_interval` frees, and once more before the pool grows
 * - **Growth**: a miss acquires `max(chunk_size, request)` from the backend
 *
 * Chunks are only returned to the system by `release_unused` and `shutdown`.
 */

mod free_list;

use super::align::checked_align;
use super::policy::MemoryPolicy;
use super::system::ArenaCore;
use super::traits::Arena;
use super::types::{is_zero_sized_block, zero_sized_block, ArenaUsage};
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::limits::{DEFAULT_CHUNK_SIZE, DEFAULT_COALESCE_INTERVAL};
use crate::core::types::{Address, Size};
use ahash::RandomState;
use free_list::{FreeBlock, SegregatedFreeList};
use log::{debug, info, trace};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ptr::NonNull;

/// Pool growth settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Minimum bytes requested from the backend when the pool runs dry
    pub chunk_size: Size,
    /// Frees between coalescing passes
    pub coalesce_interval: u64,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            coalesce_interval: DEFAULT_COALESCE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chunk {
    address: Address,
    size: Size,
}

#[derive(Debug, Clone, Copy)]
struct BusyBlock {
    size: Size,
    chunk: usize,
}

#[derive(Debug)]
struct PoolState {
    live: bool,
    free_list: SegregatedFreeList,
    // Slots keep chunk ids stable after release_unused
    chunks: Vec<Option<Chunk>>,
    busy: HashMap<Address, BusyBlock, RandomState>,
    frees_since_coalesce: u64,
}

/// Chunked, coalescing pool arena
#[derive(Debug)]
pub struct PoolArena {
    core: ArenaCore,
    options: PoolOptions,
    state: Mutex<PoolState>,
}

impl PoolArena {
    pub fn new(core: ArenaCore, options: PoolOptions) -> Self {
        info!(
            "Pool arena '{}' created for {} memory (chunk size {} bytes)",
            core.name(),
            core.store(),
            options.chunk_size
        );
        Self {
            core,
            options,
            state: Mutex::new(PoolState {
                live: true,
                free_list: SegregatedFreeList::new(),
                chunks: Vec::new(),
                busy: HashMap::with_hasher(RandomState::new()),
                frees_since_coalesce: 0,
            }),
        }
    }

    /// Pre-acquire at least `nbytes` of backing store as one free chunk
    pub fn reserve(&self, nbytes: Size) -> ArenaResult<()> {
        if nbytes == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        if !state.live {
            return Err(self.core.retired());
        }
        let chunk = self.grow(&mut state, nbytes)?;
        state.free_list.insert(chunk);
        info!(
            "Pool arena '{}' reserved {} bytes up front",
            self.core.name(),
            chunk.size
        );
        Ok(())
    }

    /// Chunks currently held from the backend
    pub fn chunk_count(&self) -> usize {
        self.state.lock().chunks.iter().flatten().count()
    }

    /// Free bytes cached in the pool
    pub fn free_bytes(&self) -> Size {
        self.state.lock().free_list.free_bytes()
    }

    fn grow(&self, state: &mut PoolState, needed: Size) -> ArenaResult<FreeBlock> {
        let (ptr, size) = self
            .core
            .allocate_system(needed.max(self.options.chunk_size))?;
        let chunk = Chunk {
            address: ptr.as_ptr() as Address,
            size,
        };
        let id = match state.chunks.iter().position(Option::is_none) {
            Some(slot) => {
                state.chunks[slot] = Some(chunk);
                slot
            }
            None => {
                state.chunks.push(Some(chunk));
                state.chunks.len() - 1
            }
        };
        debug!(
            "[{}] pool grew by chunk #{} ({} bytes at 0x{:x})",
            self.core.name(),
            id,
            size,
            chunk.address
        );
        Ok(FreeBlock {
            address: chunk.address,
            size,
            chunk: id,
        })
    }
}

impl Arena for PoolArena {
    fn alloc(&self, size: Size) -> ArenaResult<NonNull<u8>> {
        let Some(needed) = checked_align(size) else {
            return self.core.oversized(size);
        };

        let mut state = self.state.lock();
        if !state.live {
            return Err(self.core.retired());
        }
        if needed == 0 {
            return Ok(zero_sized_block());
        }

        let block = match state.free_list.find_best_fit(needed) {
            Some(block) => block,
            None => {
                let retry = if state.free_list.coalesce() > 0 {
                    state.free_list.find_best_fit(needed)
                } else {
                    None
                };
                match retry {
                    Some(block) => block,
                    None => self.grow(&mut state, needed)?,
                }
            }
        };

        if block.size > needed {
            state.free_list.insert(FreeBlock {
                address: block.address + needed,
                size: block.size - needed,
                chunk: block.chunk,
            });
        }
        state.busy.insert(
            block.address,
            BusyBlock {
                size: needed,
                chunk: block.chunk,
            },
        );
        self.core.usage().add_allocation(needed);

        trace!(
            "[{}] alloc {} bytes (aligned {}) at 0x{:x} from chunk #{}",
            self.core.name(),
            size,
            needed,
            block.address,
            block.chunk
        );
        NonNull::new(block.address as *mut u8).ok_or(ArenaError::InvalidAddress(block.address))
    }

    fn free(&self, ptr: *mut u8) -> ArenaResult<()> {
        if ptr.is_null() || is_zero_sized_block(ptr) {
            return Ok(());
        }

        let mut state = self.state.lock();
        if !state.live {
            return Err(self.core.retired());
        }

        let address = ptr as Address;
        let Some(busy) = state.busy.remove(&address) else {
            drop(state);
            return Err(self.core.ownership_violation(ptr));
        };

        state.free_list.insert(FreeBlock {
            address,
            size: busy.size,
            chunk: busy.chunk,
        });
        self.core.usage().remove_allocation(busy.size);

        state.frees_since_coalesce += 1;
        if state.frees_since_coalesce >= self.options.coalesce_interval {
            state.frees_since_coalesce = 0;
            state.free_list.coalesce();
        }

        trace!("[{}] free {} bytes at {:p}", self.core.name(), busy.size, ptr);
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
        let mut state = self.state.lock();
        if !state.live {
            return;
        }
        state.live = false;

        let outstanding = state.busy.len();
        state.busy.clear();
        state.free_list = SegregatedFreeList::new();
        let chunks: Vec<Chunk> = state.chunks.drain(..).flatten().collect();
        for chunk in &chunks {
            if let Some(ptr) = NonNull::new(chunk.address as *mut u8) {
                // SAFETY: chunk table entries come from allocate_system and are drained once
                unsafe { self.core.deallocate_system(ptr, chunk.size) };
            }
        }
        self.core.usage().clear_outstanding();

        info!(
            "Pool arena '{}' shut down, released {} chunks ({} blocks were still outstanding)",
            self.core.name(),
            chunks.len(),
            outstanding
        );
    }

    fn is_live(&self) -> bool {
        self.state.lock().live
    }

    fn release_unused(&self) -> Size {
        let mut state = self.state.lock();
        if !state.live {
            return 0;
        }
        state.free_list.coalesce();
        state.frees_since_coalesce = 0;

        let PoolState {
            free_list, chunks, ..
        } = &mut *state;
        let idle = free_list.take_where(|block| {
            matches!(
                chunks.get(block.chunk),
                Some(Some(chunk)) if chunk.address == block.address && chunk.size == block.size
            )
        });

        let mut released = 0;
        for block in idle {
            chunks[block.chunk] = None;
            if let Some(ptr) = NonNull::new(block.address as *mut u8) {
                // SAFETY: the block spans its whole chunk, which is now out of the table
                unsafe { self.core.deallocate_system(ptr, block.size) };
                released += block.size;
            }
        }

        if released > 0 {
            info!(
                "Pool arena '{}' returned {} idle bytes to the system",
                self.core.name(),
                released
            );
        }
        released
    }
}

impl Drop for PoolArena {
    fn drop(&mut self) {
        self.shutdown();
    }
}
