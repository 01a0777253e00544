use thiserror::Error;

/// Restore-point failures. Always non-fatal to apply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RollbackError {
    #[error("restore point service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("restore point creation failed: {message}")]
    Failed { message: String },
}
