#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;
use stylepack_domain::{CapabilityInfo, ScannerCapability, WriteTraits, fold_path};
use stylepack_types::{Category, RawObservation, ScannedItem};

/// Capability that replays canned observations and records applies.
pub struct StaticCapability {
    pub id: String,
    pub category: Category,
    pub observations: Vec<RawObservation>,
    pub fail_scan: Option<String>,
    pub traits: WriteTraits,
    pub fold_paths: bool,
    pub applied: Mutex<Vec<String>>,
}

impl StaticCapability {
    pub fn new(id: &str, category: Category, observations: Vec<RawObservation>) -> Self {
        Self {
            id: id.to_string(),
            category,
            observations,
            fail_scan: None,
            traits: WriteTraits::default(),
            fold_paths: false,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(id: &str, category: Category, message: &str) -> Self {
        let mut cap = Self::new(id, category, vec![]);
        cap.fail_scan = Some(message.to_string());
        cap
    }

    pub fn with_traits(mut self, traits: WriteTraits) -> Self {
        self.traits = traits;
        self
    }
}

impl ScannerCapability for StaticCapability {
    fn identify(&self) -> CapabilityInfo {
        CapabilityInfo {
            id: self.id.clone(),
            name: self.id.clone(),
            category: self.category,
        }
    }

    fn scan(&self) -> anyhow::Result<Vec<RawObservation>> {
        match &self.fail_scan {
            Some(msg) => anyhow::bail!("{msg}"),
            None => Ok(self.observations.clone()),
        }
    }

    fn apply(&self, item: &ScannedItem) -> anyhow::Result<bool> {
        self.applied
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(item.key.clone());
        Ok(true)
    }

    fn normalize(&self, text: &str) -> String {
        if self.fold_paths {
            fold_path(text)
        } else {
            text.to_string()
        }
    }

    fn write_traits(&self, _item: &ScannedItem) -> WriteTraits {
        self.traits
    }
}

pub fn clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}
