/*!
 * Arena Limits and Constants
 *
 * Centralized location for alignment, size-class and pool growth constants.
 * Organized by domain so the arenas and the registry agree on one set of values.
 */

// =============================================================================
// ALIGNMENT
// =============================================================================

/// Alignment boundary of every block handed out by an arena (16 bytes)
/// [PERF] Wide enough for SSE-width loads on any returned buffer
pub const ALIGN_SIZE: usize = 16;

// =============================================================================
// SIZE CLASSES
// =============================================================================

/// Small block threshold for segregated free list (4KB)
/// Power-of-2 buckets up to this size
pub const SMALL_BLOCK_MAX: usize = 4 * 1024;

/// Medium block threshold (64KB)
/// 4KB-increment buckets between small and this size, ordered map above
pub const MEDIUM_BLOCK_MAX: usize = 64 * 1024;

/// Smallest small bucket (64 bytes)
pub const SMALL_BUCKET_MIN: usize = 64;

// =============================================================================
// POOL GROWTH
// =============================================================================

/// Default chunk requested from the system when a pool runs dry (1MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Coalescing interval (every 100 frees)
/// [PERF] Amortizes the O(n log n) sort across frees
pub const DEFAULT_COALESCE_INTERVAL: u64 = 100;
