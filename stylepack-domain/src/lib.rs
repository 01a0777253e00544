//! Domain logic: classify live configuration against a baseline and turn
//! packages into risk-annotated import plans.
//!
//! This crate owns *what* is customized and *what* should be applied. It
//! does not perform the apply itself; that is `stylepack-apply`.

mod cancel;
mod capability;
mod classify;
mod diff;
mod import;
mod ports;
mod risk;
mod scan;

pub use cancel::{CancelToken, Cancelled};
pub use capability::{CapabilityInfo, CapabilityRegistry, ScannerCapability, WriteScope, WriteTraits};
pub use classify::{classify, fold_path, values_equal};
pub use diff::{diff_packages, diff_scans};
pub use import::{ImportPlanner, PlanContext, RelocationError};
pub use ports::{FsStagingArea, StagingArea};
pub use risk::assess_risk;
pub use scan::{ScanContext, ScanOrchestrator, ScanRequest};
