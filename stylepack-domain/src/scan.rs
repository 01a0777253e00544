use crate::cancel::{CancelToken, Cancelled};
use crate::capability::{CapabilityInfo, CapabilityRegistry, ScannerCapability};
use crate::classify::classify;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use stylepack_baseline::{BaselineStore, Resolution};
use stylepack_types::item::{CapabilityFailure, ScanWarning};
use stylepack_types::{Category, ChangeType, OsBuild, RawObservation, ScanResult, ScannedItem, schema};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-run inputs that would otherwise be process-wide state.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub os_build: OsBuild,
    pub created_at: DateTime<Utc>,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Empty means every registered category.
    pub categories: BTreeSet<Category>,
    /// Drop `default` items after classification.
    pub modified_only: bool,
}

/// Runs capabilities, classifies their observations, and merges the result.
pub struct ScanOrchestrator<'a> {
    registry: &'a CapabilityRegistry,
    baselines: &'a BaselineStore,
}

impl<'a> ScanOrchestrator<'a> {
    pub fn new(registry: &'a CapabilityRegistry, baselines: &'a BaselineStore) -> Self {
        Self {
            registry,
            baselines,
        }
    }

    pub fn scan(&self, ctx: &ScanContext, req: &ScanRequest) -> Result<ScanResult, Cancelled> {
        ctx.cancel.check()?;

        let mut warnings = Vec::new();
        let resolution = self.baselines.resolve(ctx.os_build);
        match resolution {
            Resolution::Exact(b) => {
                debug!(os_build = %b.os_build, revision = b.revision, "baseline matched");
            }
            Resolution::Nearest {
                requested,
                baseline,
            } => {
                info!(requested = %requested, used = %baseline.os_build, "using nearest baseline");
                warnings.push(ScanWarning::BaselineFallback {
                    requested,
                    used: baseline.os_build,
                });
            }
            Resolution::Missing => {
                warn!(os_build = %ctx.os_build, "no baseline available; every item classifies as added");
                warnings.push(ScanWarning::BaselineMissing {
                    os_build: ctx.os_build,
                });
            }
        }
        let baseline = resolution.baseline();

        let selected = self.registry.select(&req.categories);

        // Capabilities are independent and read-only; results are merged in
        // registry order afterwards so thread timing never shows up in output.
        let outcomes: Vec<(CapabilityInfo, anyhow::Result<Vec<RawObservation>>)> = selected
            .par_iter()
            .map(|cap| {
                let info = cap.identify();
                debug!(capability = %info.id, category = %info.category, "scan started");
                let outcome = cap.scan();
                (info, outcome)
            })
            .collect();

        let mut merged: BTreeMap<(Category, String), ScannedItem> = BTreeMap::new();
        let mut errors = Vec::new();

        for ((info, outcome), cap) in outcomes.into_iter().zip(selected.iter()) {
            let observations = match outcome {
                Ok(obs) => obs,
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(capability = %info.id, category = %info.category, error = %message, "capability scan failed");
                    errors.push(CapabilityFailure {
                        category: info.category,
                        capability_id: info.id,
                        message,
                    });
                    continue;
                }
            };
            info!(capability = %info.id, observations = observations.len(), "scan finished");

            for obs in observations {
                ctx.cancel.check()?;
                let classified =
                    self.classify_observation(*cap, &info, baseline, obs, &merged, &mut warnings);
                if let Some(item) = classified {
                    merged.insert((item.category, item.key.clone()), item);
                }
            }
        }

        let mut items: Vec<ScannedItem> = merged.into_values().collect();
        if req.modified_only {
            items.retain(|i| i.change_type != ChangeType::Default);
        }

        Ok(ScanResult {
            schema: schema::STYLEPACK_SCAN_V1.to_string(),
            scan_id: deterministic_scan_id(ctx, &items).to_string(),
            os_build: ctx.os_build,
            created_at: ctx.created_at,
            summary: ScanResult::count_by_category(&items),
            items,
            errors,
            warnings,
        })
    }

    fn classify_observation(
        &self,
        cap: &dyn ScannerCapability,
        info: &CapabilityInfo,
        baseline: Option<&stylepack_baseline::Baseline>,
        obs: RawObservation,
        merged: &BTreeMap<(Category, String), ScannedItem>,
        warnings: &mut Vec<ScanWarning>,
    ) -> Option<ScannedItem> {
        let category = info.category;
        if merged.contains_key(&(category, obs.key.clone())) {
            debug!(key = %obs.key, capability = %info.id, "duplicate observation ignored");
            warnings.push(ScanWarning::DuplicateItem {
                category,
                key: obs.key,
                capability_id: info.id.clone(),
            });
            return None;
        }

        let default_value = baseline.and_then(|b| b.get(category, &obs.key)).cloned();
        if obs.value.is_none() && default_value.is_none() {
            debug!(key = %obs.key, "absent and not in baseline; dropped");
            return None;
        }

        let normalize = |s: &str| cap.normalize(s);
        let change_type = classify(
            obs.value.as_ref(),
            default_value.as_ref(),
            self.baselines.corrections_for(category, &obs.key),
            &normalize,
        );

        Some(ScannedItem {
            key: obs.key,
            category,
            current_value: obs.value,
            default_value,
            change_type,
            associated_files: obs.associated_files,
            source: obs.source,
            metadata: obs.metadata,
        })
    }
}

fn deterministic_scan_id(ctx: &ScanContext, items: &[ScannedItem]) -> Uuid {
    const NAMESPACE: Uuid = Uuid::from_bytes([
        0x6f, 0x1e, 0x2a, 0x93, 0x5c, 0x07, 0x4d, 0x1b, 0x9a, 0x52, 0x3e, 0x80, 0x11, 0xc4, 0x7d,
        0x25,
    ]);
    let body = serde_json::to_string(items).unwrap_or_default();
    let stable_key = format!("{}|{}|{}", ctx.os_build, ctx.created_at.to_rfc3339(), body);
    Uuid::new_v5(&NAMESPACE, stable_key.as_bytes())
}
