/*!
 * Segregated Free List
 * Size-class buckets of free ranges carved out of pool chunks
 */

use crate::core::limits::{MEDIUM_BLOCK_MAX, SMALL_BLOCK_MAX, SMALL_BUCKET_MIN};
use crate::core::types::{Address, Size};
use log::debug;
use std::collections::BTreeMap;

/// Free range inside one pool chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct FreeBlock {
    pub address: Address,
    pub size: Size,
    pub chunk: usize,
}

const SMALL_BUCKETS: usize = 7; // 64, 128, 256, 512, 1KB, 2KB, 4KB
const MEDIUM_BUCKETS: usize = 15; // 8KB, 12KB, ..., 64KB
const MEDIUM_STEP: Size = 4 * 1024;

/// Segregated free list
/// - Small blocks (<=4KB): power-of-2 size classes
/// - Medium blocks (4KB-64KB): 4KB size classes
/// - Large blocks (>64KB): O(log n) using BTreeMap keyed by size
#[derive(Debug)]
pub(super) struct SegregatedFreeList {
    small_blocks: Vec<Vec<FreeBlock>>,
    medium_blocks: Vec<Vec<FreeBlock>>,
    large_blocks: BTreeMap<Size, Vec<FreeBlock>>,
}

impl SegregatedFreeList {
    pub fn new() -> Self {
        Self {
            small_blocks: vec![Vec::new(); SMALL_BUCKETS],
            medium_blocks: vec![Vec::new(); MEDIUM_BUCKETS],
            large_blocks: BTreeMap::new(),
        }
    }

    /// Bucket b holds sizes in (2^(b+5), 2^(b+6)], bucket 0 everything up to 64
    fn small_bucket_index(size: Size) -> Option<usize> {
        if size > SMALL_BLOCK_MAX {
            return None;
        }
        if size <= SMALL_BUCKET_MIN {
            return Some(0);
        }
        let bucket = (size.next_power_of_two().trailing_zeros()
            - SMALL_BUCKET_MIN.trailing_zeros()) as usize;
        Some(bucket.min(SMALL_BUCKETS - 1))
    }

    /// Bucket b holds sizes in ((b+1)*4KB, (b+2)*4KB]
    fn medium_bucket_index(size: Size) -> Option<usize> {
        if size <= SMALL_BLOCK_MAX || size > MEDIUM_BLOCK_MAX {
            return None;
        }
        let bucket = (size - 1) / MEDIUM_STEP - 1;
        Some(bucket.min(MEDIUM_BUCKETS - 1))
    }

    pub fn insert(&mut self, block: FreeBlock) {
        if let Some(idx) = Self::small_bucket_index(block.size) {
            self.small_blocks[idx].push(block);
        } else if let Some(idx) = Self::medium_bucket_index(block.size) {
            self.medium_blocks[idx].push(block);
        } else {
            self.large_blocks.entry(block.size).or_default().push(block);
        }
    }

    /// Remove and return a free block of at least `size` bytes
    ///
    /// Blocks sharing the request's size class are checked for fit; any block
    /// from a larger class fits by construction.
    pub fn find_best_fit(&mut self, size: Size) -> Option<FreeBlock> {
        if let Some(start) = Self::small_bucket_index(size) {
            if let Some(block) = take_fitting(&mut self.small_blocks[start], size) {
                return Some(block);
            }
            for bucket in &mut self.small_blocks[start + 1..] {
                if let Some(block) = bucket.pop() {
                    return Some(block);
                }
            }
        }

        if let Some(start) = Self::medium_bucket_index(size.max(SMALL_BLOCK_MAX + 1)) {
            if let Some(block) = take_fitting(&mut self.medium_blocks[start], size) {
                return Some(block);
            }
            for bucket in &mut self.medium_blocks[start + 1..] {
                if let Some(block) = bucket.pop() {
                    return Some(block);
                }
            }
        }

        // Empty size entries are removed eagerly, so the first key in range fits
        let block_size = *self.large_blocks.range(size..).next()?.0;
        let blocks = self.large_blocks.get_mut(&block_size)?;
        let block = blocks.pop();
        if blocks.is_empty() {
            self.large_blocks.remove(&block_size);
        }
        block
    }

    pub fn len(&self) -> usize {
        let small_count: usize = self.small_blocks.iter().map(Vec::len).sum();
        let medium_count: usize = self.medium_blocks.iter().map(Vec::len).sum();
        let large_count: usize = self.large_blocks.values().map(Vec::len).sum();
        small_count + medium_count + large_count
    }

    /// Total free bytes
    pub fn free_bytes(&self) -> Size {
        self.small_blocks
            .iter()
            .chain(self.medium_blocks.iter())
            .chain(self.large_blocks.values())
            .flatten()
            .map(|b| b.size)
            .sum()
    }

    /// Drain every block, sorted by chunk then address
    fn drain_sorted(&mut self) -> Vec<FreeBlock> {
        let mut all_blocks = Vec::with_capacity(self.len());
        for bucket in &mut self.small_blocks {
            all_blocks.append(bucket);
        }
        for bucket in &mut self.medium_blocks {
            all_blocks.append(bucket);
        }
        for (_, mut blocks) in std::mem::take(&mut self.large_blocks) {
            all_blocks.append(&mut blocks);
        }
        all_blocks.sort_by_key(|b| (b.chunk, b.address));
        all_blocks
    }

    fn reinsert_all(&mut self, blocks: Vec<FreeBlock>) {
        for block in blocks {
            self.insert(block);
        }
    }

    /// Merge adjacent free blocks of the same chunk
    ///
    /// Returns the number of merges performed.
    pub fn coalesce(&mut self) -> usize {
        if self.len() < 2 {
            return 0;
        }

        let blocks = self.drain_sorted();
        let before = blocks.len();
        let mut merged: Vec<FreeBlock> = Vec::with_capacity(before);
        for block in blocks {
            match merged.last_mut() {
                Some(last) if last.chunk == block.chunk && last.address + last.size == block.address => {
                    last.size += block.size;
                }
                _ => merged.push(block),
            }
        }

        let coalesced = before - merged.len();
        if coalesced > 0 {
            debug!(
                "Coalesced {} pairs of adjacent free blocks, reduced from {} to {} blocks",
                coalesced,
                before,
                merged.len()
            );
        }
        self.reinsert_all(merged);
        coalesced
    }

    /// Remove and return every block matching `pred`
    pub fn take_where(&mut self, mut pred: impl FnMut(&FreeBlock) -> bool) -> Vec<FreeBlock> {
        let (taken, kept): (Vec<_>, Vec<_>) = self.drain_sorted().into_iter().partition(|b| pred(b));
        self.reinsert_all(kept);
        taken
    }
}

fn take_fitting(bucket: &mut Vec<FreeBlock>, size: Size) -> Option<FreeBlock> {
    let idx = bucket.iter().position(|b| b.size >= size)?;
    Some(bucket.swap_remove(idx))
}
