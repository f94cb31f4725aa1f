/*!
 * Arena Usage Tracking
 * Lock-free counters behind `Arena::usage`
 */

use super::types::ArenaUsage;
use crate::core::types::Size;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Per-arena usage counters
///
/// # Performance
/// - Cache-line aligned to prevent false sharing with neighbouring arena state
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct UsageTracker {
    outstanding_bytes: AtomicUsize,
    high_water_bytes: AtomicUsize,
    system_bytes: AtomicUsize,
    live_blocks: AtomicUsize,
    total_allocations: AtomicU64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a block handed to a caller
    pub fn add_allocation(&self, size: Size) {
        let current = self.outstanding_bytes.fetch_add(size, Ordering::AcqRel) + size;
        self.high_water_bytes.fetch_max(current, Ordering::AcqRel);
        self.live_blocks.fetch_add(1, Ordering::AcqRel);
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a block returned by a caller
    pub fn remove_allocation(&self, size: Size) {
        saturating_sub(&self.outstanding_bytes, size);
        saturating_sub(&self.live_blocks, 1);
    }

    /// Reserve `size` system bytes, refusing to exceed `limit`
    ///
    /// Returns the bytes in use on failure. Overflowing `Size` also fails.
    pub fn reserve_system(&self, size: Size, limit: Option<Size>) -> Result<(), Size> {
        // Check and update in one CAS so a refused request is never visible
        self.system_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                let next = used.checked_add(size)?;
                match limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
    }

    /// Return `size` system bytes
    pub fn release_system(&self, size: Size) {
        saturating_sub(&self.system_bytes, size);
    }

    pub fn system_bytes(&self) -> Size {
        self.system_bytes.load(Ordering::Acquire)
    }

    /// Drop caller-side counters after the arena released everything
    pub fn clear_outstanding(&self) {
        self.outstanding_bytes.store(0, Ordering::Release);
        self.live_blocks.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> ArenaUsage {
        ArenaUsage {
            outstanding_bytes: self.outstanding_bytes.load(Ordering::Acquire),
            high_water_bytes: self.high_water_bytes.load(Ordering::Acquire),
            system_bytes: self.system_bytes.load(Ordering::Acquire),
            live_blocks: self.live_blocks.load(Ordering::Acquire),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
        }
    }
}

fn saturating_sub(counter: &AtomicUsize, delta: usize) {
    let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
        Some(v.saturating_sub(delta))
    });
}
