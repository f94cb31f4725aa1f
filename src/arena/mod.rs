/*!
 * Arena Module
 *
 * Memory arenas over heterogeneous backing stores.
 *
 * ## Layers
 *
 * - **Policy**: [`MemoryPolicy`] picks one [`BackingStore`] (host, pinned,
 *   device or managed) plus access hints
 * - **Backend**: a [`SystemBackend`] acquires and releases raw memory for a
 *   store; [`HostBackend`] is the default
 * - **Core**: [`ArenaCore`] is the only path from an arena to its backend and
 *   owns alignment, capacity accounting and out-of-memory handling
 * - **Strategies**: [`BasicArena`] forwards every request, [`PoolArena`]
 *   carves blocks out of cached chunks
 *
 * Every block starts on a 16-byte boundary ([`ALIGN_SIZE`]).
 */

pub mod align;
pub mod backend;
pub mod basic;
pub mod policy;
pub mod pool;
pub mod system;
pub mod tracking;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use crate::core::limits::ALIGN_SIZE;
pub use align::{align, aligned_size, is_aligned};
pub use backend::{HostBackend, SystemBackend};
pub use basic::BasicArena;
pub use policy::{BackingStore, MemoryPolicy};
pub use pool::{PoolArena, PoolOptions};
pub use system::{ArenaCore, OomPolicy};
pub use tracking::UsageTracker;
pub use traits::Arena;
pub use types::{is_zero_sized_block, zero_sized_block, ArenaUsage};
