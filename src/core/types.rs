/*!
 * Core Types
 * Common types used across the arenas
 */

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;
