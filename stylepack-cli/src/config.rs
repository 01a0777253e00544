//! Configuration file loading for stylepack.
//!
//! Discovers and loads `stylepack.toml` from the working directory (or an
//! explicit `--config` path) and merges it with CLI arguments.
//!
//! Merge rules: CLI booleans OR into file values, CLI category lists replace
//! the file list when non-empty, CLI paths override file paths.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeSet;
use stylepack_types::{Category, OsBuild};
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "stylepack.toml";

/// Top-level configuration from stylepack.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StylepackConfig {
    pub paths: PathsConfig,
    pub scan: ScanConfig,
    pub export: ExportConfig,
    pub import: ImportConfig,
    pub apply: ApplyConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of baseline JSON files.
    pub baselines_dir: Option<Utf8PathBuf>,

    /// Directory of recorded observations, one subdirectory per category.
    pub observations_dir: Option<Utf8PathBuf>,

    /// Where applied values and restore points are written.
    pub state_dir: Option<Utf8PathBuf>,

    /// Where package assets are staged during planning.
    pub staging_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Categories to scan. Empty means all.
    pub categories: Vec<Category>,

    pub modified_only: bool,

    /// Build of this machine, e.g. `22631` or `10.0.22631`.
    pub os_build: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub include_defaults: bool,
    pub include_binary_assets: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_defaults: false,
            include_binary_assets: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub skip_readonly: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    pub unattended: bool,
    pub skip_restore_point: bool,
    pub restore_label: Option<String>,
}

/// Discover `stylepack.toml` in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a stylepack.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<StylepackConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<StylepackConfig> {
    let config: StylepackConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config, else the discovered one, else defaults.
///
/// An explicit path that does not exist is an error.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<StylepackConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => match discover_config(dir) {
            Some(path) => load_config(&path),
            None => Ok(StylepackConfig::default()),
        },
    }
}

/// Resolved directory layout for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub baselines_dir: Utf8PathBuf,
    pub observations_dir: Utf8PathBuf,
    pub state_dir: Utf8PathBuf,
    pub staging_dir: Utf8PathBuf,
}

/// Path overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliPaths {
    pub baselines_dir: Option<Utf8PathBuf>,
    pub observations_dir: Option<Utf8PathBuf>,
    pub state_dir: Option<Utf8PathBuf>,
    pub staging_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedScan {
    pub categories: BTreeSet<Category>,
    pub modified_only: bool,
    pub os_build: Option<OsBuild>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedExport {
    pub include_defaults: bool,
    pub include_binary_assets: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedApply {
    pub unattended: bool,
    pub skip_restore_point: bool,
    pub restore_label: String,
}

/// Merges the config file with CLI arguments.
pub struct ConfigMerger {
    config: StylepackConfig,
}

impl ConfigMerger {
    pub fn new(config: StylepackConfig) -> Self {
        Self { config }
    }

    /// CLI paths win; otherwise the file; otherwise defaults relative to
    /// the working directory, with state under the user's local data dir.
    pub fn merge_paths(&self, cli: &CliPaths) -> ResolvedPaths {
        let file = &self.config.paths;
        let pick = |cli: &Option<Utf8PathBuf>, file: &Option<Utf8PathBuf>| {
            cli.clone().or_else(|| file.clone())
        };

        let state_dir = pick(&cli.state_dir, &file.state_dir).unwrap_or_else(default_state_dir);
        let staging_dir =
            pick(&cli.staging_dir, &file.staging_dir).unwrap_or_else(|| state_dir.join("staging"));

        ResolvedPaths {
            baselines_dir: pick(&cli.baselines_dir, &file.baselines_dir)
                .unwrap_or_else(|| Utf8PathBuf::from("baselines")),
            observations_dir: pick(&cli.observations_dir, &file.observations_dir)
                .unwrap_or_else(|| Utf8PathBuf::from("observations")),
            state_dir,
            staging_dir,
        }
    }

    /// `os_build` from the CLI wins over the file; it stays `None` when
    /// neither gives one.
    pub fn merge_scan(
        &self,
        cli_categories: &[Category],
        cli_modified_only: bool,
        cli_os_build: Option<&str>,
    ) -> anyhow::Result<MergedScan> {
        let categories = if cli_categories.is_empty() {
            self.config.scan.categories.iter().copied().collect()
        } else {
            cli_categories.iter().copied().collect()
        };

        let os_build = match cli_os_build.or(self.config.scan.os_build.as_deref()) {
            Some(raw) => Some(raw.parse::<OsBuild>()?),
            None => None,
        };

        Ok(MergedScan {
            categories,
            modified_only: cli_modified_only || self.config.scan.modified_only,
            os_build,
        })
    }

    /// `--no-binary-assets` turns off a file-enabled `include_binary_assets`.
    pub fn merge_export(&self, cli_include_defaults: bool, cli_no_binary_assets: bool) -> MergedExport {
        MergedExport {
            include_defaults: cli_include_defaults || self.config.export.include_defaults,
            include_binary_assets: self.config.export.include_binary_assets && !cli_no_binary_assets,
        }
    }

    pub fn merge_import(&self, cli_skip_readonly: bool) -> bool {
        cli_skip_readonly || self.config.import.skip_readonly
    }

    pub fn merge_apply(
        &self,
        cli_unattended: bool,
        cli_skip_restore_point: bool,
        cli_restore_label: Option<&str>,
    ) -> MergedApply {
        let restore_label = cli_restore_label
            .map(str::to_string)
            .or_else(|| self.config.apply.restore_label.clone())
            .unwrap_or_else(|| "stylepack import".to_string());
        MergedApply {
            unattended: cli_unattended || self.config.apply.unattended,
            skip_restore_point: cli_skip_restore_point || self.config.apply.skip_restore_point,
            restore_label,
        }
    }
}

fn default_state_dir() -> Utf8PathBuf {
    dirs::data_local_dir()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .map(|p| p.join("stylepack"))
        .unwrap_or_else(|| Utf8PathBuf::from(".stylepack"))
}
