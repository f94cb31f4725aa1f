/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::arena::BackingStore;
use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arena operation result
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Arena errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ArenaError {
    #[error("Memory policy violation in {setter}: {reason}")]
    #[diagnostic(
        code(arena::policy_violation),
        help("Read-only and preferred hints require managed memory. Configure them before switching to device, pinned or host memory.")
    )]
    PolicyViolation { setter: String, reason: String },

    #[error("Out of {store} memory: requested {requested} bytes ({used} bytes in use, limit {limit:?})")]
    #[diagnostic(
        code(arena::out_of_memory),
        help("The backend could not supply the request. Free blocks, call release_unused(), or raise the capacity limit.")
    )]
    OutOfMemory {
        requested: Size,
        store: BackingStore,
        used: Size,
        limit: Option<Size>,
    },

    #[error("Arena '{arena}' has been shut down")]
    #[diagnostic(
        code(arena::retired),
        help("The registry was finalized. Call initialize() and look the arena up again.")
    )]
    ArenaRetired { arena: String },

    #[error("Arena registry has been finalized")]
    #[diagnostic(
        code(arena::registry_finalized),
        help("Call initialize() before looking up arenas again.")
    )]
    RegistryFinalized,

    #[error("Invalid block address: 0x{0:x}")]
    #[diagnostic(
        code(arena::invalid_address),
        help("The block was not allocated by this arena, or it was already freed.")
    )]
    InvalidAddress(usize),

    #[error("Invalid arena configuration: {0}")]
    #[diagnostic(code(arena::invalid_config))]
    InvalidConfig(String),
}

impl ArenaError {
    pub(crate) fn policy_violation(setter: &str, reason: &str) -> Self {
        Self::PolicyViolation {
            setter: setter.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is a lifecycle violation (use outside initialize/finalize)
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Self::ArenaRetired { .. } | Self::RegistryFinalized)
    }
}
