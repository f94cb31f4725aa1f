/*!
 * Core Module
 * Fundamental arena types, limits and error handling
 */

pub mod errors;
pub mod limits;
pub mod tracer;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use tracer::init_tracing;
pub use types::*;
