//! Apply executor.
//!
//! Walks a `DryRunPlan` strictly in order on one thread, invoking the owning
//! capability's `apply` for each eligible entry. A restore point is
//! requested before the first mutation; failing to get one is a warning.
//!
//! Failures never trigger retries. A failed `high` step stops the run unless
//! the caller runs unattended or the `ContinuePolicy` says otherwise.

mod error;
mod executor;
mod policy;
mod rollback;

pub use error::RollbackError;
pub use executor::{ApplyExecutor, ApplyOptions};
pub use policy::{AlwaysContinue, ContinuePolicy, DeclineContinue};
pub use rollback::{RestorePointHandle, SystemRollbackService};
