use crate::os::OsBuild;
use crate::value::Category;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PACKAGE_FORMAT_VERSION: u32 = 1;

/// File names inside a package.
pub mod layout {
    pub const MANIFEST: &str = "manifest.json";
    pub const SCAN: &str = "scan.json";
    pub const ASSETS_DIR: &str = "assets";
}

/// Export-time summary of a package. Written once, read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: String,
    pub format_version: u32,
    pub package_id: String,
    pub scan_id: String,
    pub os_build: OsBuild,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub include_defaults: bool,

    #[serde(default)]
    pub include_binary_assets: bool,

    #[serde(default)]
    pub items_by_category: BTreeMap<Category, u64>,

    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

impl Manifest {
    pub fn item_count(&self) -> u64 {
        self.items_by_category.values().sum()
    }

    pub fn asset_for(&self, category: Category, original: &Utf8Path) -> Option<&AssetEntry> {
        self.assets
            .iter()
            .find(|a| a.category == category && a.original_path == original)
    }

    pub fn stored_assets(&self) -> impl Iterator<Item = &AssetEntry> {
        self.assets.iter().filter(|a| a.is_stored())
    }
}

/// One referenced binary asset.
///
/// `rel_path` and `sha256` are absent when the asset was recorded but not
/// copied into the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub category: Category,
    pub original_path: Utf8PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl AssetEntry {
    pub fn is_stored(&self) -> bool {
        self.rel_path.is_some()
    }
}
