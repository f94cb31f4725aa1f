/*!
 * Registry Configuration
 *
 * Settings shared by the singleton arenas, with environment overrides
 */

use crate::arena::{OomPolicy, PoolOptions};
use crate::core::errors::{ArenaError, ArenaResult};
use crate::core::limits::{DEFAULT_CHUNK_SIZE, DEFAULT_COALESCE_INTERVAL};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bookkeeping strategy used by every registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// One backend request per block
    Basic,
    /// Chunked pool with a segregated free list
    Pool,
}

impl FromStr for StrategyKind {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(StrategyKind::Basic),
            "pool" => Ok(StrategyKind::Pool),
            other => Err(ArenaError::InvalidConfig(format!(
                "unknown arena strategy '{other}' (expected 'basic' or 'pool')"
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StrategyKind::Basic => write!(f, "basic"),
            StrategyKind::Pool => write!(f, "pool"),
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Strategy for every arena
    pub strategy: StrategyKind,
    /// Default arena draws managed memory (otherwise plain device memory)
    pub default_is_managed: bool,
    /// Pool growth granularity
    pub chunk_size: Size,
    /// Frees between pool coalescing passes
    pub coalesce_interval: u64,
    /// Bytes reserved up front by the default arena
    pub default_init_size: Size,
    /// Bytes reserved up front by the pinned arena
    pub pinned_init_size: Size,
    /// Per-arena cap on bytes held from the backend
    pub max_system_bytes: Option<Size>,
    /// Terminate on allocation failure instead of returning an error
    pub abort_on_out_of_memory: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Pool,
            default_is_managed: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            coalesce_interval: DEFAULT_COALESCE_INTERVAL,
            default_init_size: 0,
            pinned_init_size: 0,
            max_system_bytes: None,
            abort_on_out_of_memory: true,
        }
    }
}

impl RegistryConfig {
    /// Configuration for tests: small chunks, recoverable out-of-memory
    pub const fn testing() -> Self {
        Self {
            strategy: StrategyKind::Pool,
            default_is_managed: true,
            chunk_size: 64 * 1024,
            coalesce_interval: 16,
            default_init_size: 0,
            pinned_init_size: 0,
            max_system_bytes: None,
            abort_on_out_of_memory: false,
        }
    }

    /// Defaults overridden by `ARENA_*` environment variables
    ///
    /// - ARENA_STRATEGY: `basic` or `pool`
    /// - ARENA_DEFAULT_IS_MANAGED: bool
    /// - ARENA_CHUNK_SIZE: bytes
    /// - ARENA_INIT_SIZE: bytes reserved by the default arena
    /// - ARENA_PINNED_INIT_SIZE: bytes reserved by the pinned arena
    /// - ARENA_MAX_SYSTEM_BYTES: per-arena cap in bytes
    /// - ARENA_ABORT_ON_OOM: bool
    pub fn from_env() -> ArenaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `ARENA_*` key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ArenaResult<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("ARENA_STRATEGY") {
            config.strategy = value.parse()?;
        }
        if let Some(value) = lookup("ARENA_DEFAULT_IS_MANAGED") {
            config.default_is_managed = parse_bool("ARENA_DEFAULT_IS_MANAGED", &value)?;
        }
        if let Some(value) = lookup("ARENA_CHUNK_SIZE") {
            config.chunk_size = parse_size("ARENA_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = lookup("ARENA_INIT_SIZE") {
            config.default_init_size = parse_size("ARENA_INIT_SIZE", &value)?;
        }
        if let Some(value) = lookup("ARENA_PINNED_INIT_SIZE") {
            config.pinned_init_size = parse_size("ARENA_PINNED_INIT_SIZE", &value)?;
        }
        if let Some(value) = lookup("ARENA_MAX_SYSTEM_BYTES") {
            config.max_system_bytes = Some(parse_size("ARENA_MAX_SYSTEM_BYTES", &value)?);
        }
        if let Some(value) = lookup("ARENA_ABORT_ON_OOM") {
            config.abort_on_out_of_memory = parse_bool("ARENA_ABORT_ON_OOM", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no arena can work with
    pub fn validate(&self) -> ArenaResult<()> {
        if self.chunk_size == 0 {
            return Err(ArenaError::InvalidConfig("chunk_size must be non-zero".into()));
        }
        if self.coalesce_interval == 0 {
            return Err(ArenaError::InvalidConfig(
                "coalesce_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn oom_policy(&self) -> OomPolicy {
        if self.abort_on_out_of_memory {
            OomPolicy::Abort
        } else {
            OomPolicy::ReturnError
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            chunk_size: self.chunk_size,
            coalesce_interval: self.coalesce_interval,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> ArenaResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ArenaError::InvalidConfig(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_size(key: &str, value: &str) -> ArenaResult<Size> {
    value
        .trim()
        .parse::<Size>()
        .map_err(|e| ArenaError::InvalidConfig(format!("{key}: {e}")))
}
