//! Clap-free settings for the pipelines.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use stylepack_types::{Category, OsBuild};

/// Settings for the scan pipeline.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Build of the machine being scanned.
    pub os_build: OsBuild,
    /// Empty means every registered category.
    pub categories: BTreeSet<Category>,
    pub modified_only: bool,
    /// Fixed timestamp for reproducible output; `None` uses the current time.
    pub clock: Option<DateTime<Utc>>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            os_build: OsBuild(0),
            categories: BTreeSet::new(),
            modified_only: false,
            clock: None,
        }
    }
}

/// Settings for the export pipeline.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub out_path: Utf8PathBuf,
    pub include_defaults: bool,
    pub include_binary_assets: bool,
    pub clock: Option<DateTime<Utc>>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            out_path: Utf8PathBuf::from("stylepack.tar.gz"),
            include_defaults: false,
            include_binary_assets: true,
            clock: None,
        }
    }
}

/// Settings for the plan pipeline.
#[derive(Debug, Clone)]
pub struct PlanSettings {
    pub package_path: Utf8PathBuf,
    /// Build of the machine the plan targets.
    pub os_build: OsBuild,
    pub skip_readonly: bool,
    pub clock: Option<DateTime<Utc>>,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            package_path: Utf8PathBuf::from("stylepack.tar.gz"),
            os_build: OsBuild(0),
            skip_readonly: false,
            clock: None,
        }
    }
}

/// Settings for the apply pipeline.
#[derive(Debug, Clone)]
pub struct ApplySettings {
    pub unattended: bool,
    pub skip_restore_point: bool,
    pub restore_label: String,
    pub clock: Option<DateTime<Utc>>,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            unattended: false,
            skip_restore_point: false,
            restore_label: "stylepack import".to_string(),
            clock: None,
        }
    }
}
