/*!
 * Memory Policy
 * Which backing store an arena draws from and which access hints apply
 */

use crate::core::errors::{ArenaError, ArenaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory policy of one arena
///
/// Built once through the fluent setters and then handed to the arena, which
/// only ever reads it. Invalid hint combinations are rejected at configuration
/// time, never at allocation time.
///
/// # Example
///
/// ```
/// use hetero_arena::arena::{BackingStore, MemoryPolicy};
///
/// let policy = MemoryPolicy::default().set_read_only().unwrap();
/// assert_eq!(
///     policy.backing_store(),
///     BackingStore::Managed { read_only: true, preferred: false }
/// );
/// assert!(policy.set_device_memory().set_read_only().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryPolicy {
    use_host_memory: bool,
    device_use_managed_memory: bool,
    device_set_readonly: bool,
    device_set_preferred: bool,
    device_use_hostalloc: bool,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            use_host_memory: false,
            device_use_managed_memory: true,
            device_set_readonly: false,
            device_set_preferred: false,
            device_use_hostalloc: false,
        }
    }
}

impl MemoryPolicy {
    /// Plain host heap
    pub fn host() -> Self {
        Self::default().set_host_memory()
    }

    /// Page-locked host memory reachable by the device
    pub fn pinned() -> Self {
        Self::default().set_host_alloc()
    }

    /// Plain device memory
    pub fn device() -> Self {
        Self::default().set_device_memory()
    }

    /// Managed (unified) memory, no hints
    pub fn managed() -> Self {
        Self::default()
    }

    /// Select plain device memory
    #[must_use]
    pub fn set_device_memory(mut self) -> Self {
        self.device_use_managed_memory = false;
        self.device_use_hostalloc = false;
        self
    }

    /// Mark managed memory as read-only on the device
    pub fn set_read_only(mut self) -> ArenaResult<Self> {
        self.require_managed("set_read_only")?;
        self.device_set_readonly = true;
        Ok(self)
    }

    /// Prefer device placement for managed memory
    pub fn set_preferred(mut self) -> ArenaResult<Self> {
        self.require_managed("set_preferred")?;
        self.device_set_preferred = true;
        Ok(self)
    }

    /// Select pinned host memory
    #[must_use]
    pub fn set_host_alloc(mut self) -> Self {
        self.device_use_hostalloc = true;
        self.device_use_managed_memory = false;
        self
    }

    /// Select plain host memory; clears every device setting
    #[must_use]
    pub fn set_host_memory(mut self) -> Self {
        self.use_host_memory = true;
        self.device_use_managed_memory = false;
        self.device_set_readonly = false;
        self.device_set_preferred = false;
        self.device_use_hostalloc = false;
        self
    }

    fn require_managed(&self, setter: &str) -> ArenaResult<()> {
        if self.device_use_managed_memory {
            Ok(())
        } else {
            Err(ArenaError::policy_violation(
                setter,
                "managed memory is not enabled",
            ))
        }
    }

    pub fn use_host_memory(&self) -> bool {
        self.use_host_memory
    }

    pub fn device_use_managed_memory(&self) -> bool {
        self.device_use_managed_memory
    }

    pub fn device_set_readonly(&self) -> bool {
        self.device_set_readonly
    }

    pub fn device_set_preferred(&self) -> bool {
        self.device_set_preferred
    }

    pub fn device_use_hostalloc(&self) -> bool {
        self.device_use_hostalloc
    }

    /// The single backing store this policy selects
    pub fn backing_store(&self) -> BackingStore {
        if self.use_host_memory {
            BackingStore::Host
        } else if self.device_use_hostalloc {
            BackingStore::Pinned
        } else if self.device_use_managed_memory {
            BackingStore::Managed {
                read_only: self.device_set_readonly,
                preferred: self.device_set_preferred,
            }
        } else {
            BackingStore::Device
        }
    }
}

/// Backing store selected by a [`MemoryPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackingStore {
    /// Ordinary host heap
    Host,
    /// Page-locked host memory
    Pinned,
    /// Device memory, not host-addressable on real hardware
    Device,
    /// Unified memory with optional access hints
    Managed { read_only: bool, preferred: bool },
}

impl BackingStore {
    /// Whether the host may dereference blocks from this store
    pub fn is_host_accessible(&self) -> bool {
        !matches!(self, BackingStore::Device)
    }
}

impl fmt::Display for BackingStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackingStore::Host => write!(f, "host"),
            BackingStore::Pinned => write!(f, "pinned"),
            BackingStore::Device => write!(f, "device"),
            BackingStore::Managed { .. } => write!(f, "managed"),
        }
    }
}
