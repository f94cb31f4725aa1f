/*!
 * Usage Report
 * Point-in-time usage of every live registry arena
 */

use super::kind::ArenaKind;
use crate::arena::{ArenaUsage, BackingStore};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Usage of one arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub kind: ArenaKind,
    pub store: BackingStore,
    pub usage: ArenaUsage,
}

/// Usage of every live arena, in construction order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub entries: Vec<UsageEntry>,
}

impl UsageReport {
    pub fn get(&self, kind: ArenaKind) -> Option<&ArenaUsage> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| &entry.usage)
    }

    /// Bytes handed out across all arenas
    pub fn total_outstanding(&self) -> Size {
        self.entries.iter().map(|e| e.usage.outstanding_bytes).sum()
    }

    /// Bytes held from backends across all arenas
    pub fn total_system(&self) -> Size {
        self.entries.iter().map(|e| e.usage.system_bytes).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{:<8} {:<8} {:>14} {:>14} {:>14} {:>8}",
            "arena", "store", "outstanding", "high water", "system", "blocks"
        )?;
        for entry in &self.entries {
            writeln!(
                f,
                "{:<8} {:<8} {:>14} {:>14} {:>14} {:>8}",
                entry.kind.as_str(),
                entry.store.to_string(),
                entry.usage.outstanding_bytes,
                entry.usage.high_water_bytes,
                entry.usage.system_bytes,
                entry.usage.live_blocks
            )?;
        }
        write!(
            f,
            "total outstanding: {} bytes, system: {} bytes",
            self.total_outstanding(),
            self.total_system()
        )
    }
}
