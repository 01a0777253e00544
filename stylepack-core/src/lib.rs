//! Embeddable stylepack pipeline.
//!
//! This crate provides the scan, export, plan, apply and diff pipelines
//! without any dependency on clap. Filesystem access for baselines and
//! artifacts goes through small port traits so the pipelines can be driven
//! from a CLI, a GUI front end, or a test harness.
//!
//! # Entry points
//!
//! - [`run_scan`] classifies live configuration against the baseline store.
//! - [`run_export`] writes a scan as a package archive.
//! - [`run_plan`] opens a package and builds a dry-run import plan.
//! - [`run_apply`] executes a plan and returns the apply log.
//! - [`run_diff`] compares two packages item by item.
//!
//! # Adapters
//!
//! - [`FsBaselineSource`] / [`InMemoryBaselineSource`] feed the baseline store.
//! - [`RecordedCapability`] replays recorded observations and writes applied
//!   values under a state directory.
//! - [`FsRollbackService`] / [`NoRollbackService`] implement restore points.
//! - [`FsWritePort`] writes artifacts.

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use adapters::{
    FsBaselineSource, FsRollbackService, FsWritePort, InMemoryBaselineSource, NoRollbackService,
    RecordedCapability, recorded_registry,
};
pub use pipeline::{
    ToolError, load_plan, load_scan, run_apply, run_diff, run_export, run_plan, run_scan,
    write_json,
};
pub use ports::{BaselineSource, WritePort};
pub use settings::{ApplySettings, ExportSettings, PlanSettings, ScanSettings};
