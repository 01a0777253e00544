//! Default filesystem-backed port implementations.

use crate::ports::{BaselineSource, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use std::collections::BTreeMap;
use stylepack_apply::{RestorePointHandle, RollbackError, SystemRollbackService};
use stylepack_baseline::{Baseline, BaselineStore};
use stylepack_domain::{
    CapabilityInfo, CapabilityRegistry, ScannerCapability, WriteScope, WriteTraits, fold_path,
};
use stylepack_types::{Category, ConfigValue, RawObservation, ScannedItem};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Loads baseline files from a directory via `stylepack_baseline::load_baselines`.
#[derive(Debug, Clone)]
pub struct FsBaselineSource {
    pub baselines_dir: Utf8PathBuf,
}

impl FsBaselineSource {
    pub fn new(baselines_dir: Utf8PathBuf) -> Self {
        Self { baselines_dir }
    }
}

impl BaselineSource for FsBaselineSource {
    fn load_store(&self) -> anyhow::Result<BaselineStore> {
        let loaded = stylepack_baseline::load_baselines(&self.baselines_dir)
            .with_context(|| format!("load baselines from {}", self.baselines_dir))?;
        if loaded.is_empty() {
            warn!(dir = %self.baselines_dir, "no baseline files found");
        }
        Ok(BaselineStore::from_loaded(loaded))
    }
}

/// In-memory baseline source for embedding and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBaselineSource {
    baselines: Vec<Baseline>,
}

impl InMemoryBaselineSource {
    pub fn new(baselines: Vec<Baseline>) -> Self {
        Self { baselines }
    }
}

impl BaselineSource for InMemoryBaselineSource {
    fn load_store(&self) -> anyhow::Result<BaselineStore> {
        Ok(BaselineStore::new(self.baselines.iter().cloned()))
    }
}

/// Filesystem write port.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create dir {}", path))
    }
}

/// Capability that replays observations recorded on disk.
///
/// `scan` reads `<observations_dir>/<category>/observations.json` (a JSON
/// array of raw observations). `apply` merges the item into
/// `<state_dir>/applied/<category>.json`; a removed item deletes its key.
#[derive(Debug, Clone)]
pub struct RecordedCapability {
    category: Category,
    observations_dir: Utf8PathBuf,
    state_dir: Utf8PathBuf,
}

impl RecordedCapability {
    pub fn new(category: Category, observations_dir: Utf8PathBuf, state_dir: Utf8PathBuf) -> Self {
        Self {
            category,
            observations_dir,
            state_dir,
        }
    }

    pub fn observations_path(&self) -> Utf8PathBuf {
        self.observations_dir
            .join(self.category.as_str())
            .join("observations.json")
    }

    pub fn applied_path(&self) -> Utf8PathBuf {
        self.state_dir
            .join("applied")
            .join(format!("{}.json", self.category))
    }

    fn read_applied(&self, path: &Utf8Path) -> anyhow::Result<BTreeMap<String, ConfigValue>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path))
    }
}

impl ScannerCapability for RecordedCapability {
    fn identify(&self) -> CapabilityInfo {
        CapabilityInfo {
            id: format!("recorded.{}", self.category),
            name: format!("Recorded {} observations", self.category),
            category: self.category,
        }
    }

    fn scan(&self) -> anyhow::Result<Vec<RawObservation>> {
        let path = self.observations_path();
        if !path.exists() {
            debug!(path = %path, "no recorded observations");
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path)?;
        let observations: Vec<RawObservation> =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path))?;
        debug!(path = %path, count = observations.len(), "loaded recorded observations");
        Ok(observations)
    }

    fn apply(&self, item: &ScannedItem) -> anyhow::Result<bool> {
        if item.is_readonly() {
            return Ok(false);
        }
        let path = self.applied_path();
        let mut applied = self.read_applied(&path)?;
        match &item.current_value {
            Some(value) => {
                applied.insert(item.key.clone(), value.clone());
            }
            None => {
                applied.remove(&item.key);
            }
        }
        let json = serde_json::to_string_pretty(&applied).context("serialize applied state")?;
        FsWritePort.write_file(&path, json.as_bytes())?;
        Ok(true)
    }

    fn normalize(&self, text: &str) -> String {
        match self.category {
            Category::Cursor | Category::Fonts | Category::Wallpaper => fold_path(text),
            _ => text.to_string(),
        }
    }

    fn write_traits(&self, item: &ScannedItem) -> WriteTraits {
        let machine = self.category == Category::Fonts || item.scope() == Some("machine");
        WriteTraits {
            requires_elevation: machine,
            scope: if machine {
                WriteScope::Machine
            } else {
                WriteScope::User
            },
            requires_restart: self.category == Category::Theme,
        }
    }
}

/// One recorded capability per category, all sharing the same directories.
pub fn recorded_registry(observations_dir: &Utf8Path, state_dir: &Utf8Path) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for category in Category::ALL {
        registry.register(Box::new(RecordedCapability::new(
            category,
            observations_dir.to_path_buf(),
            state_dir.to_path_buf(),
        )));
    }
    registry
}

#[derive(Debug, Serialize)]
struct RestorePointRecord<'a> {
    id: &'a str,
    label: &'a str,
    created_at: DateTime<Utc>,
}

/// Records restore points as `<state_dir>/restore_points/<uuid>.json`.
#[derive(Debug, Clone)]
pub struct FsRollbackService {
    pub state_dir: Utf8PathBuf,
}

impl FsRollbackService {
    pub fn new(state_dir: Utf8PathBuf) -> Self {
        Self { state_dir }
    }
}

impl SystemRollbackService for FsRollbackService {
    fn create_restore_point(&self, label: &str) -> Result<RestorePointHandle, RollbackError> {
        let id = Uuid::new_v4().to_string();
        let record = RestorePointRecord {
            id: &id,
            label,
            created_at: Utc::now(),
        };
        let path = self
            .state_dir
            .join("restore_points")
            .join(format!("{id}.json"));

        let written = serde_json::to_string_pretty(&record)
            .context("serialize restore point")
            .and_then(|json| FsWritePort.write_file(&path, json.as_bytes()));
        match written {
            Ok(()) => {
                info!(path = %path, "restore point recorded");
                Ok(RestorePointHandle { id })
            }
            Err(e) => Err(RollbackError::Failed {
                message: format!("{e:#}"),
            }),
        }
    }
}

/// Rollback service for hosts without one.
#[derive(Debug, Clone, Default)]
pub struct NoRollbackService;

impl SystemRollbackService for NoRollbackService {
    fn create_restore_point(&self, _label: &str) -> Result<RestorePointHandle, RollbackError> {
        Err(RollbackError::Unavailable {
            reason: "no restore point service on this host".to_string(),
        })
    }
}
