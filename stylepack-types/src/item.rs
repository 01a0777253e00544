use crate::os::OsBuild;
use crate::value::{Category, ChangeType, ConfigValue};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Well-known `ScannedItem::metadata` keys.
pub mod metadata_keys {
    pub const READONLY: &str = "readonly";
    pub const SCOPE: &str = "scope";
    pub const RAW_VALUE: &str = "raw_value";
    pub const IS_OPENSOURCE: &str = "is_opensource";
    pub const ASSET_MISSING: &str = "asset_missing";
}

/// Where a value was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSource {
    pub kind: SourceKind,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Registry,
    File,
    SystemApi,
}

/// One value as reported by a scanner capability, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub key: String,

    /// `None` when the scanner knows the key but found nothing on the machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub associated_files: BTreeSet<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ValueSource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RawObservation {
    pub fn new(key: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            associated_files: BTreeSet::new(),
            source: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.associated_files.insert(path.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// One observed configuration value, classified against the baseline.
///
/// `key` + `category` identify the item within a scan. `metadata` travels
/// with the item but does not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedItem {
    pub key: String,
    pub category: Category,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ConfigValue>,

    pub change_type: ChangeType,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub associated_files: BTreeSet<Utf8PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ValueSource>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PartialEq for ScannedItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.category == other.category
            && self.current_value == other.current_value
            && self.default_value == other.default_value
            && self.change_type == other.change_type
            && self.associated_files == other.associated_files
            && self.source == other.source
    }
}

impl ScannedItem {
    fn flag(&self, name: &str) -> bool {
        matches!(self.metadata.get(name), Some(serde_json::Value::Bool(true)))
    }

    pub fn is_readonly(&self) -> bool {
        self.flag(metadata_keys::READONLY)
    }

    pub fn is_asset_missing(&self) -> bool {
        self.flag(metadata_keys::ASSET_MISSING)
    }

    pub fn scope(&self) -> Option<&str> {
        self.metadata
            .get(metadata_keys::SCOPE)
            .and_then(|v| v.as_str())
    }

    /// Sort key used for every ordered collection of items.
    pub fn sort_key(&self) -> (Category, &str) {
        (self.category, self.key.as_str())
    }
}

/// A capability whose `scan()` failed. Its items are absent from the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFailure {
    pub category: Category,
    pub capability_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanWarning {
    /// No baseline is known at all; every item classified `added`.
    BaselineMissing { os_build: OsBuild },

    /// No baseline for the exact build; the nearest one was used.
    BaselineFallback { requested: OsBuild, used: OsBuild },

    /// Two capabilities reported the same key; the first one wins.
    DuplicateItem {
        category: Category,
        key: String,
        capability_id: String,
    },
}

/// Ordered output of one orchestrator run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub schema: String,
    pub scan_id: String,
    pub os_build: OsBuild,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub items: Vec<ScannedItem>,

    #[serde(default)]
    pub summary: BTreeMap<Category, u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CapabilityFailure>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScanWarning>,
}

impl ScanResult {
    pub fn modified_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.change_type.is_customized())
            .count()
    }

    pub fn find(&self, category: Category, key: &str) -> Option<&ScannedItem> {
        self.items
            .binary_search_by(|i| i.sort_key().cmp(&(category, key)))
            .ok()
            .map(|idx| &self.items[idx])
    }

    pub fn count_by_category(items: &[ScannedItem]) -> BTreeMap<Category, u64> {
        let mut out = BTreeMap::new();
        for item in items {
            *out.entry(item.category).or_insert(0) += 1;
        }
        out
    }
}
