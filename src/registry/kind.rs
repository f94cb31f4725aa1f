/*!
 * Arena Kinds
 * The fixed set of singleton arenas and the policy each one is built with
 */

use super::config::RegistryConfig;
use crate::arena::MemoryPolicy;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named singleton arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaKind {
    /// General-purpose arena
    Default,
    /// Plain device memory
    Device,
    /// Managed (unified) memory
    Managed,
    /// Pinned host memory
    Pinned,
    /// Plain host memory
    Host,
}

impl ArenaKind {
    /// Construction order: host-side arenas before device-side ones
    pub const INIT_ORDER: [ArenaKind; 5] = [
        ArenaKind::Host,
        ArenaKind::Pinned,
        ArenaKind::Device,
        ArenaKind::Managed,
        ArenaKind::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArenaKind::Default => "default",
            ArenaKind::Device => "device",
            ArenaKind::Managed => "managed",
            ArenaKind::Pinned => "pinned",
            ArenaKind::Host => "host",
        }
    }

    /// Policy the registry builds this arena with
    pub fn policy(&self, config: &RegistryConfig) -> MemoryPolicy {
        match self {
            ArenaKind::Default if config.default_is_managed => MemoryPolicy::managed(),
            ArenaKind::Default => MemoryPolicy::device(),
            ArenaKind::Device => MemoryPolicy::device(),
            ArenaKind::Managed => MemoryPolicy::managed(),
            ArenaKind::Pinned => MemoryPolicy::pinned(),
            ArenaKind::Host => MemoryPolicy::host(),
        }
    }

    /// Bytes reserved when the arena is built
    pub fn init_size(&self, config: &RegistryConfig) -> Size {
        match self {
            ArenaKind::Default => config.default_init_size,
            ArenaKind::Pinned => config.pinned_init_size,
            _ => 0,
        }
    }
}

impl fmt::Display for ArenaKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
