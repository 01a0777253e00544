mod config;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{CliPaths, ConfigMerger, ResolvedPaths};
use std::process::ExitCode;
use stylepack_apply::DeclineContinue;
use stylepack_core::{
    ApplySettings, ExportSettings, FsBaselineSource, FsRollbackService, FsWritePort, PlanSettings,
    ScanSettings, ToolError, load_plan, load_scan, recorded_registry, run_apply, run_diff,
    run_export, run_plan, run_scan, write_json,
};
use stylepack_domain::{CancelToken, FsStagingArea};
use stylepack_types::Category;
use stylepack_types::plan::DryRunPlan;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "stylepack",
    version,
    about = "Capture, package, and re-apply desktop personalization against stock baselines."
)]
struct Cli {
    /// Config file (default: ./stylepack.toml if present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, clap::Args)]
struct PathArgs {
    /// Directory of baseline JSON files.
    #[arg(long, global = true)]
    baselines_dir: Option<Utf8PathBuf>,

    /// Directory of recorded observations (one subdirectory per category).
    #[arg(long, global = true)]
    observations_dir: Option<Utf8PathBuf>,

    /// Directory for applied state and restore points.
    #[arg(long, global = true)]
    state_dir: Option<Utf8PathBuf>,

    /// Directory where package assets are staged during planning.
    #[arg(long, global = true)]
    staging_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify current configuration against the stock baseline.
    Scan(ScanArgs),
    /// Package a scan into a portable archive.
    Export(ExportArgs),
    /// Build a dry-run import plan from a package.
    Plan(PlanArgs),
    /// Execute a previously generated plan.
    Apply(ApplyArgs),
    /// Compare two packages item by item.
    Diff(DiffArgs),
}

#[derive(Debug, Parser)]
struct ScanArgs {
    /// Build of this machine, e.g. 22631 or 10.0.22631.
    #[arg(long)]
    os_build: Option<String>,

    /// Restrict the scan to these categories (repeatable).
    #[arg(long = "category")]
    categories: Vec<Category>,

    /// Drop items that match the baseline.
    #[arg(long, default_value_t = false)]
    modified_only: bool,

    /// Where to write the scan result.
    #[arg(long, default_value = "stylepack-scan.json")]
    out: Utf8PathBuf,
}

#[derive(Debug, Parser)]
struct ExportArgs {
    /// Scan result produced by `stylepack scan`.
    #[arg(long, default_value = "stylepack-scan.json")]
    scan: Utf8PathBuf,

    /// Package archive to create.
    #[arg(long, default_value = "stylepack.tar.gz")]
    out: Utf8PathBuf,

    /// Also package items that match the baseline.
    #[arg(long, default_value_t = false)]
    include_defaults: bool,

    /// Inventory referenced files without copying them.
    #[arg(long, default_value_t = false)]
    no_binary_assets: bool,
}

#[derive(Debug, Parser)]
struct PlanArgs {
    /// Package archive or unpacked package directory.
    package: Utf8PathBuf,

    /// Build of the machine being imported into.
    #[arg(long)]
    os_build: Option<String>,

    /// Leave read-only items out of the plan instead of listing them as skipped.
    #[arg(long, default_value_t = false)]
    skip_readonly: bool,

    /// Where to write the plan.
    #[arg(long, default_value = "stylepack-plan.json")]
    out: Utf8PathBuf,
}

#[derive(Debug, Parser)]
struct ApplyArgs {
    /// Plan produced by `stylepack plan`.
    #[arg(default_value = "stylepack-plan.json")]
    plan: Utf8PathBuf,

    /// Keep going after a failed high-risk step.
    #[arg(long, default_value_t = false)]
    unattended: bool,

    /// Do not request a restore point.
    #[arg(long, default_value_t = false)]
    skip_restore_point: bool,

    /// Label for the restore point.
    #[arg(long)]
    restore_label: Option<String>,

    /// Where to write the apply log.
    #[arg(long, default_value = "stylepack-apply.json")]
    out: Utf8PathBuf,
}

#[derive(Debug, Parser)]
struct DiffArgs {
    /// Package treated as the reference side.
    left: Utf8PathBuf,

    /// Package compared against it.
    right: Utf8PathBuf,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match real_main(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn real_main(cli: Cli) -> Result<ExitCode, ToolError> {
    let cwd = Utf8PathBuf::from(".");
    let file_config =
        config::load_or_default(cli.config.as_deref(), &cwd).context("load stylepack.toml config")?;
    let merger = ConfigMerger::new(file_config);
    let paths = merger.merge_paths(&CliPaths {
        baselines_dir: cli.paths.baselines_dir,
        observations_dir: cli.paths.observations_dir,
        state_dir: cli.paths.state_dir,
        staging_dir: cli.paths.staging_dir,
    });
    debug!(?paths, "resolved paths");

    match cli.cmd {
        Command::Scan(args) => cmd_scan(args, &merger, &paths),
        Command::Export(args) => cmd_export(args, &merger),
        Command::Plan(args) => cmd_plan(args, &merger, &paths),
        Command::Apply(args) => cmd_apply(args, &merger, &paths),
        Command::Diff(args) => cmd_diff(args, &paths),
    }
}

fn cmd_scan(args: ScanArgs, merger: &ConfigMerger, paths: &ResolvedPaths) -> Result<ExitCode, ToolError> {
    let merged = merger.merge_scan(&args.categories, args.modified_only, args.os_build.as_deref())?;
    let os_build = merged
        .os_build
        .context("OS build unknown; pass --os-build or set [scan].os_build")?;

    let settings = ScanSettings {
        os_build,
        categories: merged.categories,
        modified_only: merged.modified_only,
        clock: None,
    };
    let registry = recorded_registry(&paths.observations_dir, &paths.state_dir);
    let scan = run_scan(
        &settings,
        &registry,
        &FsBaselineSource::new(paths.baselines_dir.clone()),
        &CancelToken::new(),
    )?;

    write_json(&FsWritePort, &args.out, &scan)?;
    for failure in &scan.errors {
        println!("error    {} ({}): {}", failure.category, failure.capability_id, failure.message);
    }
    println!(
        "scanned {} items, {} customized; wrote {}",
        scan.items.len(),
        scan.modified_count(),
        args.out
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_export(args: ExportArgs, merger: &ConfigMerger) -> Result<ExitCode, ToolError> {
    let merged = merger.merge_export(args.include_defaults, args.no_binary_assets);
    let scan = load_scan(&args.scan)?;
    let settings = ExportSettings {
        out_path: args.out.clone(),
        include_defaults: merged.include_defaults,
        include_binary_assets: merged.include_binary_assets,
        clock: None,
    };
    let manifest = run_export(&settings, &scan)?;
    println!(
        "exported {} items and {} assets to {} (package {})",
        manifest.item_count(),
        manifest.stored_assets().count(),
        args.out,
        manifest.package_id
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_plan(args: PlanArgs, merger: &ConfigMerger, paths: &ResolvedPaths) -> Result<ExitCode, ToolError> {
    let merged = merger.merge_scan(&[], false, args.os_build.as_deref())?;
    let os_build = merged
        .os_build
        .context("target OS build unknown; pass --os-build or set [scan].os_build")?;

    let settings = PlanSettings {
        package_path: args.package.clone(),
        os_build,
        skip_readonly: merger.merge_import(args.skip_readonly),
        clock: None,
    };
    let registry = recorded_registry(&paths.observations_dir, &paths.state_dir);
    let staging = FsStagingArea::new(paths.staging_dir.clone());
    let plan = run_plan(&settings, &registry, &staging, &CancelToken::new())?;

    write_json(&FsWritePort, &args.out, &plan)?;
    print_plan(&plan);
    info!("wrote plan to {}", args.out);
    Ok(ExitCode::SUCCESS)
}

fn cmd_apply(args: ApplyArgs, merger: &ConfigMerger, paths: &ResolvedPaths) -> Result<ExitCode, ToolError> {
    let merged = merger.merge_apply(
        args.unattended,
        args.skip_restore_point,
        args.restore_label.as_deref(),
    );
    let plan = load_plan(&args.plan)?;
    let settings = ApplySettings {
        unattended: merged.unattended,
        skip_restore_point: merged.skip_restore_point,
        restore_label: merged.restore_label,
        clock: None,
    };
    let registry = recorded_registry(&paths.observations_dir, &paths.state_dir);
    let rollback = FsRollbackService::new(paths.state_dir.clone());
    let log = run_apply(
        &settings,
        &plan,
        &registry,
        &rollback,
        &DeclineContinue,
        &CancelToken::new(),
    );

    write_json(&FsWritePort, &args.out, &log)?;
    for step in log.steps.iter().filter(|s| s.error_detail.is_some()) {
        println!(
            "failed   {}/{}: {}",
            step.category,
            step.key,
            step.error_detail.as_deref().unwrap_or_default()
        );
    }
    for warning in &log.warnings {
        println!("warning  {warning}");
    }
    println!(
        "applied {} of {} actions ({} failed, {} skipped, {} not attempted); wrote {}",
        log.summary.succeeded,
        log.summary.total,
        log.summary.failed,
        log.summary.skipped,
        log.summary.not_attempted,
        args.out
    );

    if log.is_committed() {
        Ok(ExitCode::SUCCESS)
    } else {
        if let Some(idx) = log.halted_at {
            println!("halted at step {idx}");
        }
        Ok(ExitCode::from(2))
    }
}

fn cmd_diff(args: DiffArgs, paths: &ResolvedPaths) -> Result<ExitCode, ToolError> {
    let registry = recorded_registry(&paths.observations_dir, &paths.state_dir);
    let deltas = run_diff(&args.left, &args.right, &registry)?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&deltas).context("serialize diff")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            if deltas.is_empty() {
                println!("no differences");
            }
            for d in &deltas {
                println!(
                    "{:<9} {}/{}: {} -> {}",
                    d.change_type.as_str(),
                    d.category,
                    d.key,
                    display_opt(d.left.as_ref()),
                    display_opt(d.right.as_ref())
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_plan(plan: &DryRunPlan) {
    println!("  {:<7} {:<7} {:<40} REASON", "ACTION", "RISK", "ITEM");
    for a in &plan.actions {
        println!(
            "  {:<7} {:<7} {:<40} {}",
            a.action.as_str(),
            a.risk_level.as_str(),
            format!("{}/{}", a.category, a.target_key),
            a.reason
        );
    }
    println!(
        "\n{} actions: {} eligible, {} skipped (low {}, medium {}, high {})",
        plan.summary.total,
        plan.summary.eligible,
        plan.summary.skipped,
        plan.summary.low,
        plan.summary.medium,
        plan.summary.high
    );
}

fn display_opt(value: Option<&stylepack_types::ConfigValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
