/*!
 * Heterogeneous Arena Library
 * Memory arenas over host, device, managed and pinned memory behind one allocator interface
 */

pub mod arena;
pub mod core;
pub mod registry;

// Re-exports
pub use crate::core::{init_tracing, ArenaError, ArenaResult};
pub use arena::{aligned_size, Arena, ArenaUsage, BackingStore, MemoryPolicy, ALIGN_SIZE};
pub use registry::{ArenaKind, ArenaRegistry, RegistryConfig, StrategyKind, UsageReport};
