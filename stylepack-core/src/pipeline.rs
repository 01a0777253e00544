//! Core scan, export, plan, apply and diff pipelines, extracted from the CLI.
//!
//! These entry points perform no filesystem access of their own beyond
//! opening and writing packages: baselines come through `BaselineSource`,
//! artifacts leave through `WritePort`.

use crate::ports::{BaselineSource, WritePort};
use crate::settings::{ApplySettings, ExportSettings, PlanSettings, ScanSettings};
use anyhow::Context;
use camino::Utf8Path;
use chrono::Utc;
use fs_err as fs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stylepack_apply::{ApplyExecutor, ApplyOptions, ContinuePolicy, SystemRollbackService};
use stylepack_domain::{
    CancelToken, Cancelled, CapabilityRegistry, ImportPlanner, PlanContext, ScanContext,
    ScanOrchestrator, ScanRequest, StagingArea, diff_packages,
};
use stylepack_package::{ExportOptions, Package, PackageError};
use stylepack_types::apply::ApplyLog;
use stylepack_types::diff::ItemDelta;
use stylepack_types::manifest::Manifest;
use stylepack_types::plan::DryRunPlan;
use stylepack_types::{ScanResult, schema};
use tracing::{debug, info};

/// Error type for pipeline results. Exit code 2 = corrupt package or
/// cancelled run, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("package is corrupt: {0}")]
    PackageCorrupt(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::PackageCorrupt(_) | ToolError::Cancelled => 2,
            ToolError::Internal(_) => 1,
        }
    }
}

impl From<Cancelled> for ToolError {
    fn from(_: Cancelled) -> Self {
        ToolError::Cancelled
    }
}

impl From<PackageError> for ToolError {
    fn from(e: PackageError) -> Self {
        match e {
            PackageError::Corrupt { reason } => ToolError::PackageCorrupt(reason),
            other => ToolError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Run the scan pipeline against the baselines provided by `baselines`.
pub fn run_scan(
    settings: &ScanSettings,
    registry: &CapabilityRegistry,
    baselines: &dyn BaselineSource,
    cancel: &CancelToken,
) -> Result<ScanResult, ToolError> {
    let store = baselines.load_store().context("load baseline store")?;
    let ctx = ScanContext {
        os_build: settings.os_build,
        created_at: settings.clock.unwrap_or_else(Utc::now),
        cancel: cancel.clone(),
    };
    let req = ScanRequest {
        categories: settings.categories.clone(),
        modified_only: settings.modified_only,
    };
    let scan = ScanOrchestrator::new(registry, &store).scan(&ctx, &req)?;
    info!(
        scan_id = %scan.scan_id,
        items = scan.items.len(),
        modified = scan.modified_count(),
        errors = scan.errors.len(),
        "scan complete"
    );
    Ok(scan)
}

/// Write `scan` as a package archive at `settings.out_path`.
pub fn run_export(settings: &ExportSettings, scan: &ScanResult) -> Result<Manifest, ToolError> {
    let opts = ExportOptions {
        include_defaults: settings.include_defaults,
        include_binary_assets: settings.include_binary_assets,
        created_at: settings.clock.unwrap_or_else(Utc::now),
    };
    let manifest = stylepack_package::export(scan, &settings.out_path, &opts)
        .with_context(|| format!("export package to {}", settings.out_path))?;
    info!(
        package_id = %manifest.package_id,
        items = manifest.item_count(),
        assets = manifest.assets.len(),
        path = %settings.out_path,
        "package exported"
    );
    Ok(manifest)
}

/// Open the package at `settings.package_path` and build a dry-run plan.
///
/// A corrupt package fails before anything is staged.
pub fn run_plan(
    settings: &PlanSettings,
    registry: &CapabilityRegistry,
    staging: &dyn StagingArea,
    cancel: &CancelToken,
) -> Result<DryRunPlan, ToolError> {
    let package = Package::open(&settings.package_path)?;
    debug!(package_id = %package.package_id(), origin = %package.origin(), "package opened");

    let ctx = PlanContext {
        os_build: settings.os_build,
        created_at: settings.clock.unwrap_or_else(Utc::now),
        skip_readonly: settings.skip_readonly,
        cancel: cancel.clone(),
    };
    let plan = ImportPlanner::new(registry, staging).plan(&package, &ctx)?;
    info!(
        plan_id = %plan.plan_id,
        eligible = plan.summary.eligible,
        skipped = plan.summary.skipped,
        "plan complete"
    );
    Ok(plan)
}

/// Execute `plan`. Never fails as a whole; per-step failures live in the log.
pub fn run_apply(
    settings: &ApplySettings,
    plan: &DryRunPlan,
    registry: &CapabilityRegistry,
    rollback: &dyn SystemRollbackService,
    policy: &dyn ContinuePolicy,
    cancel: &CancelToken,
) -> ApplyLog {
    let opts = ApplyOptions {
        skip_restore_point: settings.skip_restore_point,
        unattended: settings.unattended,
        restore_label: settings.restore_label.clone(),
        started_at: settings.clock.unwrap_or_else(Utc::now),
    };
    ApplyExecutor::new(registry, rollback, policy).apply(plan, &opts, cancel)
}

/// Compare two packages; `left` plays the role of the baseline.
pub fn run_diff(
    left: &Utf8Path,
    right: &Utf8Path,
    registry: &CapabilityRegistry,
) -> Result<Vec<ItemDelta>, ToolError> {
    let left = Package::open(left)?;
    let right = Package::open(right)?;
    Ok(diff_packages(&left, &right, registry))
}

fn read_json<T: DeserializeOwned>(path: &Utf8Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path))
}

/// Read a scan artifact written by `stylepack scan`.
pub fn load_scan(path: &Utf8Path) -> Result<ScanResult, ToolError> {
    let scan: ScanResult = read_json(path)?;
    if scan.schema != schema::STYLEPACK_SCAN_V1 {
        return Err(anyhow::anyhow!("{} is not a scan (schema '{}')", path, scan.schema).into());
    }
    Ok(scan)
}

/// Read a plan artifact written by `stylepack plan`.
pub fn load_plan(path: &Utf8Path) -> Result<DryRunPlan, ToolError> {
    let plan: DryRunPlan = read_json(path)?;
    if plan.schema != schema::STYLEPACK_PLAN_V1 {
        return Err(anyhow::anyhow!("{} is not a plan (schema '{}')", path, plan.schema).into());
    }
    Ok(plan)
}

/// Pretty-print `value` as JSON at `path`.
pub fn write_json<T: Serialize>(
    port: &dyn WritePort,
    path: &Utf8Path,
    value: &T,
) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("serialize artifact")?;
    json.push('\n');
    port.write_file(path, json.as_bytes())
}
