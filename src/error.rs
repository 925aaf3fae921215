//! Error types for resolution operations

use thiserror::Error;

/// Errors raised when a caller asks for strict resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Resolved and original documents diverge: {count} mismatch(es), first: {first}")]
    StructuralMismatch { count: usize, first: String },

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Stage '{0}' has no execution block")]
    NoExecution(String),
}
