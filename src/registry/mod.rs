/*!
 * Arena Registry
 *
 * Owns the process-wide singleton arenas and their lifecycle.
 *
 * ## Lifecycle
 *
 * - **Uninitialized**: the first lookup builds every arena
 * - **Live**: lookups return the same `Arc` for a kind every time
 * - **Finalized**: every arena is shut down and its backing memory released;
 *   lookups fail with `ArenaError::RegistryFinalized` until `initialize()`
 *
 * Arenas are built host-side first (host, pinned) and torn down in reverse.
 */

mod config;
mod kind;
mod report;

pub use config::{RegistryConfig, StrategyKind};
pub use kind::ArenaKind;
pub use report::{UsageEntry, UsageReport};

use crate::arena::{Arena, ArenaCore, BasicArena, HostBackend, PoolArena, SystemBackend};
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::types::Size;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};

static GLOBAL_REGISTRY: OnceLock<ArenaRegistry> = OnceLock::new();

/// Live arenas in construction order
#[derive(Debug)]
struct ArenaSet {
    arenas: Vec<(ArenaKind, Arc<dyn Arena>)>,
}

impl ArenaSet {
    fn get(&self, kind: ArenaKind) -> Option<&Arc<dyn Arena>> {
        self.arenas
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, arena)| arena)
    }
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Live(ArenaSet),
    Finalized,
}

/// Registry of named singleton arenas
///
/// # Example
///
/// ```
/// use hetero_arena::registry::{ArenaRegistry, RegistryConfig};
///
/// let registry = ArenaRegistry::new(RegistryConfig::testing());
/// registry.initialize().unwrap();
///
/// let arena = registry.managed_arena().unwrap();
/// let block = arena.alloc(100).unwrap();
/// assert_eq!(block.as_ptr() as usize % 16, 0);
/// arena.free(block.as_ptr()).unwrap();
///
/// registry.finalize();
/// assert!(registry.managed_arena().is_err());
/// ```
#[derive(Debug)]
pub struct ArenaRegistry {
    config: RegistryConfig,
    backend: Arc<dyn SystemBackend>,
    state: RwLock<Lifecycle>,
}

impl ArenaRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_backend(config, Arc::new(HostBackend::new()))
    }

    /// Registry whose arenas draw from `backend`
    pub fn with_backend(config: RegistryConfig, backend: Arc<dyn SystemBackend>) -> Self {
        Self {
            config,
            backend,
            state: RwLock::new(Lifecycle::Uninitialized),
        }
    }

    /// Process-wide registry, configured from `ARENA_*` environment variables
    pub fn global() -> &'static ArenaRegistry {
        GLOBAL_REGISTRY.get_or_init(|| {
            let config = RegistryConfig::from_env().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring arena environment configuration");
                RegistryConfig::default()
            });
            ArenaRegistry::new(config)
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Build every arena; no-op while already live
    #[instrument(skip_all)]
    pub fn initialize(&self) -> ArenaResult<()> {
        let mut state = self.state.write();
        if matches!(*state, Lifecycle::Live(_)) {
            debug!("Arena registry already initialized");
            return Ok(());
        }
        *state = Lifecycle::Live(self.build()?);
        Ok(())
    }

    /// Shut down every arena and release its backing memory
    #[instrument(skip_all)]
    pub fn finalize(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), Lifecycle::Finalized);
        if let Lifecycle::Live(set) = previous {
            for (kind, arena) in set.arenas.iter().rev() {
                arena.shutdown();
                debug!(arena = %kind, "Arena shut down");
            }
            info!(arenas = set.arenas.len(), "Arena registry finalized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.state.read(), Lifecycle::Live(_))
    }

    /// Look up a singleton arena, initializing the registry on first use
    pub fn arena(&self, kind: ArenaKind) -> ArenaResult<Arc<dyn Arena>> {
        {
            let state = self.state.read();
            match &*state {
                Lifecycle::Live(set) => return Self::lookup(set, kind),
                Lifecycle::Finalized => return Err(ArenaError::RegistryFinalized),
                Lifecycle::Uninitialized => {}
            }
        }

        // Double-checked: another thread may have initialized or finalized meanwhile
        let mut state = self.state.write();
        if matches!(*state, Lifecycle::Uninitialized) {
            debug!(arena = %kind, "Lazy arena registry initialization");
            *state = Lifecycle::Live(self.build()?);
        }
        match &*state {
            Lifecycle::Live(set) => Self::lookup(set, kind),
            _ => Err(ArenaError::RegistryFinalized),
        }
    }

    pub fn default_arena(&self) -> ArenaResult<Arc<dyn Arena>> {
        self.arena(ArenaKind::Default)
    }

    pub fn device_arena(&self) -> ArenaResult<Arc<dyn Arena>> {
        self.arena(ArenaKind::Device)
    }

    pub fn managed_arena(&self) -> ArenaResult<Arc<dyn Arena>> {
        self.arena(ArenaKind::Managed)
    }

    pub fn pinned_arena(&self) -> ArenaResult<Arc<dyn Arena>> {
        self.arena(ArenaKind::Pinned)
    }

    pub fn host_arena(&self) -> ArenaResult<Arc<dyn Arena>> {
        self.arena(ArenaKind::Host)
    }

    /// Snapshot and log the usage of every live arena
    ///
    /// Does not initialize the registry; an uninitialized registry reports
    /// no arenas.
    pub fn print_usage(&self) -> ArenaResult<UsageReport> {
        let state = self.state.read();
        let set = match &*state {
            Lifecycle::Live(set) => set,
            Lifecycle::Uninitialized => return Ok(UsageReport::default()),
            Lifecycle::Finalized => return Err(ArenaError::RegistryFinalized),
        };

        let entries: Vec<UsageEntry> = set
            .arenas
            .iter()
            .map(|(kind, arena)| UsageEntry {
                kind: *kind,
                store: arena.policy().backing_store(),
                usage: arena.usage(),
            })
            .collect();

        for entry in &entries {
            info!(
                arena = %entry.kind,
                store = %entry.store,
                outstanding_bytes = entry.usage.outstanding_bytes,
                high_water_bytes = entry.usage.high_water_bytes,
                system_bytes = entry.usage.system_bytes,
                live_blocks = entry.usage.live_blocks,
                "Arena usage"
            );
        }

        Ok(UsageReport { entries })
    }

    /// Return idle cached memory of every live arena to the system
    pub fn release_unused(&self) -> Size {
        match &*self.state.read() {
            Lifecycle::Live(set) => set.arenas.iter().map(|(_, a)| a.release_unused()).sum(),
            _ => 0,
        }
    }

    fn lookup(set: &ArenaSet, kind: ArenaKind) -> ArenaResult<Arc<dyn Arena>> {
        set.get(kind)
            .map(Arc::clone)
            .ok_or(ArenaError::RegistryFinalized)
    }

    fn build(&self) -> ArenaResult<ArenaSet> {
        self.config.validate()?;

        let mut arenas: Vec<(ArenaKind, Arc<dyn Arena>)> = Vec::with_capacity(ArenaKind::INIT_ORDER.len());
        for kind in ArenaKind::INIT_ORDER {
            let core = ArenaCore::new(kind.as_str(), kind.policy(&self.config), Arc::clone(&self.backend))
                .with_max_system_bytes(self.config.max_system_bytes)
                .with_oom_policy(self.config.oom_policy());
            let init_size = kind.init_size(&self.config);

            let arena: Arc<dyn Arena> = match self.config.strategy {
                StrategyKind::Basic => {
                    if init_size > 0 {
                        debug!(arena = %kind, init_size, "Basic strategy ignores initial reservation");
                    }
                    Arc::new(BasicArena::new(core))
                }
                StrategyKind::Pool => {
                    let pool = PoolArena::new(core, self.config.pool_options());
                    pool.reserve(init_size)?;
                    Arc::new(pool)
                }
            };
            arenas.push((kind, arena));
        }

        info!(
            strategy = %self.config.strategy,
            backend = self.backend.name(),
            default_is_managed = self.config.default_is_managed,
            "Arena registry initialized"
        );
        Ok(ArenaSet { arenas })
    }
}

impl Drop for ArenaRegistry {
    fn drop(&mut self) {
        self.finalize();
    }
}
