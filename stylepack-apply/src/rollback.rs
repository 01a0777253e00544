use crate::error::RollbackError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePointHandle {
    pub id: String,
}

/// System-level safety net taken before the first mutation.
pub trait SystemRollbackService {
    fn create_restore_point(&self, label: &str) -> Result<RestorePointHandle, RollbackError>;
}
