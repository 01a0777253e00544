use crate::cancel::{CancelToken, Cancelled};
use crate::capability::{CapabilityRegistry, ScannerCapability};
use crate::ports::StagingArea;
use crate::risk::assess_risk;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use stylepack_package::{Package, sanitize_basename};
use stylepack_types::manifest::layout;
use stylepack_types::plan::{
    DryRunPlan, PlanAction, PlanSummary, PlannedAction, RiskLevel, skip_tokens,
};
use stylepack_types::{Category, ChangeType, ConfigValue, OsBuild, ScannedItem, schema};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PlanContext {
    /// Build of the machine the plan targets.
    pub os_build: OsBuild,
    pub created_at: DateTime<Utc>,
    /// Omit read-only items instead of listing them as skipped.
    pub skip_readonly: bool,
    pub cancel: CancelToken,
}

/// Why an item's assets could not be made available on this machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelocationError {
    #[error("asset {original} was not included in the package")]
    NotIncluded { original: Utf8PathBuf },

    #[error("asset {original} is not present in the package")]
    NotFound { original: Utf8PathBuf },

    #[error("asset path '{rel_path}' has no file name")]
    InvalidPath { rel_path: String },

    #[error("staging '{rel_path}' failed: {message}")]
    Staging { rel_path: String, message: String },
}

impl RelocationError {
    pub fn reason_token(&self) -> &'static str {
        match self {
            RelocationError::NotIncluded { .. } | RelocationError::NotFound { .. } => {
                skip_tokens::ASSET_MISSING
            }
            RelocationError::InvalidPath { .. } | RelocationError::Staging { .. } => {
                skip_tokens::ASSET_RELOCATION_FAILED
            }
        }
    }
}

/// Per-item outcome of the eligibility check.
enum Eligibility {
    Eligible(ScannedItem),
    Ineligible { token: &'static str, reason: String },
}

/// Turns a package into an ordered, risk-annotated plan.
///
/// Planning never calls a capability's `apply`; the only writes are asset
/// copies into the staging area.
pub struct ImportPlanner<'a> {
    registry: &'a CapabilityRegistry,
    staging: &'a dyn StagingArea,
}

impl<'a> ImportPlanner<'a> {
    pub fn new(registry: &'a CapabilityRegistry, staging: &'a dyn StagingArea) -> Self {
        Self { registry, staging }
    }

    pub fn plan(&self, package: &Package, ctx: &PlanContext) -> Result<DryRunPlan, Cancelled> {
        let package_dir = sanitize_basename(package.package_id());
        let mut actions = Vec::with_capacity(package.scan().items.len());

        for item in &package.scan().items {
            ctx.cancel.check()?;
            if item.is_readonly() && ctx.skip_readonly {
                debug!(key = %item.key, "read-only item omitted from plan");
                continue;
            }
            actions.push(self.plan_item(package, &package_dir, item));
        }

        let summary = PlanSummary::from_actions(&actions);
        info!(
            package_id = %package.package_id(),
            total = summary.total,
            eligible = summary.eligible,
            skipped = summary.skipped,
            high = summary.high,
            "import plan ready"
        );

        Ok(DryRunPlan {
            schema: schema::STYLEPACK_PLAN_V1.to_string(),
            plan_id: deterministic_plan_id(package.package_id(), ctx, &actions).to_string(),
            package_id: package.package_id().to_string(),
            os_build: ctx.os_build,
            created_at: ctx.created_at,
            staging_dir: self.staging.root().join(&package_dir),
            actions,
            summary,
        })
    }

    fn plan_item(&self, package: &Package, package_dir: &str, item: &ScannedItem) -> PlannedAction {
        let capability = self.registry.route(item);
        let risk_level = capability
            .map(|c| assess_risk(c.write_traits(item)))
            .unwrap_or(RiskLevel::Low);
        let capability_id = capability.map(|c| c.identify().id);

        let eligibility = self.check(package, package_dir, item, capability);
        match eligibility {
            Eligibility::Eligible(relocated) => {
                let action = if relocated.change_type == ChangeType::Removed {
                    PlanAction::Remove
                } else {
                    PlanAction::Set
                };
                PlannedAction {
                    action,
                    target_key: item.key.clone(),
                    category: item.category,
                    risk_level,
                    reason: describe(&relocated),
                    reason_token: None,
                    capability_id,
                    item: relocated,
                }
            }
            Eligibility::Ineligible { token, reason } => {
                debug!(key = %item.key, token, "item skipped");
                PlannedAction {
                    action: PlanAction::Skip,
                    target_key: item.key.clone(),
                    category: item.category,
                    risk_level,
                    reason,
                    reason_token: Some(token.to_string()),
                    capability_id,
                    item: item.clone(),
                }
            }
        }
    }

    fn check(
        &self,
        package: &Package,
        package_dir: &str,
        item: &ScannedItem,
        capability: Option<&dyn ScannerCapability>,
    ) -> Eligibility {
        if item.is_readonly() {
            return Eligibility::Ineligible {
                token: skip_tokens::READONLY,
                reason: "item is read-only".to_string(),
            };
        }
        if !self.registry.is_registered(item.category) {
            return Eligibility::Ineligible {
                token: skip_tokens::CATEGORY_UNREGISTERED,
                reason: format!("no capability registered for category {}", item.category),
            };
        }
        if capability.is_none() {
            return Eligibility::Ineligible {
                token: skip_tokens::NO_CAPABILITY,
                reason: format!("no {} capability accepts {}", item.category, item.key),
            };
        }
        if item.is_asset_missing() {
            return Eligibility::Ineligible {
                token: skip_tokens::ASSET_MISSING,
                reason: "binary assets were not included in the package".to_string(),
            };
        }
        match self.relocate(package, package_dir, item) {
            Ok(relocated) => Eligibility::Eligible(relocated),
            Err(e) => {
                warn!(key = %item.key, error = %e, "asset relocation failed");
                Eligibility::Ineligible {
                    token: e.reason_token(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Copies the item's assets into `<staging>/<package>/` under their
    /// package-relative location and rewrites every reference to the source
    /// machine's paths.
    fn relocate(
        &self,
        package: &Package,
        package_dir: &str,
        item: &ScannedItem,
    ) -> Result<ScannedItem, RelocationError> {
        let mut out = item.clone();
        if item.associated_files.is_empty() {
            return Ok(out);
        }

        let mut moved: BTreeMap<Utf8PathBuf, Utf8PathBuf> = BTreeMap::new();
        for original in &item.associated_files {
            let rel_path = locate(package, item.category, original)?;
            let bytes = package
                .asset(&rel_path)
                .ok_or_else(|| RelocationError::NotFound {
                    original: original.clone(),
                })?;
            let staged_rel = staged_path(package_dir, &rel_path)?;
            let staged = self
                .staging
                .stage(&staged_rel, bytes)
                .map_err(|e| RelocationError::Staging {
                    rel_path: rel_path.clone(),
                    message: format!("{e:#}"),
                })?;
            debug!(original = %original, staged = %staged, "asset relocated");
            moved.insert(original.clone(), staged);
        }

        out.associated_files = moved.values().cloned().collect();
        out.current_value = out.current_value.map(|v| rewrite_paths(v, &moved));
        Ok(out)
    }
}

/// Mirrors a package asset name below the package's staging directory:
/// `assets/<dir>/<file>` stages to `<package>/<dir>/<file>`.
fn staged_path(package_dir: &str, rel_path: &str) -> Result<Utf8PathBuf, RelocationError> {
    let invalid = || RelocationError::InvalidPath {
        rel_path: rel_path.to_string(),
    };
    let inner = Utf8Path::new(rel_path)
        .strip_prefix(layout::ASSETS_DIR)
        .map_err(|_| invalid())?;
    if inner.file_name().is_none() {
        return Err(invalid());
    }
    Ok(Utf8PathBuf::from(package_dir).join(inner))
}

/// Finds the package entry for an export-time path: the manifest entry for
/// this category, then a stored entry for the same file under another
/// category, then `assets/<category>/<basename>` or a hash-suffixed variant.
///
/// Only names the manifest lists are accepted, so every staged asset has had
/// its hash verified when the package was opened.
fn locate(
    package: &Package,
    category: Category,
    original: &Utf8Path,
) -> Result<String, RelocationError> {
    let manifest = package.manifest();
    if let Some(entry) = manifest.asset_for(category, original) {
        return entry
            .rel_path
            .clone()
            .ok_or_else(|| RelocationError::NotIncluded {
                original: original.to_path_buf(),
            });
    }
    if let Some(rel) = manifest
        .stored_assets()
        .filter(|a| a.original_path == original)
        .find_map(|a| a.rel_path.clone())
    {
        return Ok(rel);
    }

    let verified = |name: &str| {
        manifest
            .stored_assets()
            .any(|a| a.rel_path.as_deref() == Some(name))
    };
    let base = sanitize_basename(original.as_str());
    let dir = format!("{}/{}/", layout::ASSETS_DIR, category);
    let plain = format!("{dir}{base}");
    if verified(plain.as_str()) && package.asset(&plain).is_some() {
        return Ok(plain);
    }

    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (base.as_str(), None),
    };
    package
        .asset_names()
        .filter(|name| verified(*name))
        .filter_map(|name| name.strip_prefix(&dir).map(|file| (name, file)))
        .find(|(_, file)| is_hash_variant(file, stem, ext))
        .map(|(name, _)| name.to_string())
        .ok_or_else(|| {
            if package.asset(&plain).is_some() {
                warn!(rel_path = %plain, "asset is not listed in the manifest");
            }
            RelocationError::NotFound {
                original: original.to_path_buf(),
            }
        })
}

fn is_hash_variant(file: &str, stem: &str, ext: Option<&str>) -> bool {
    let Some(rest) = file.strip_prefix(stem).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    let hash = match ext {
        Some(ext) => match rest.strip_suffix(ext).and_then(|r| r.strip_suffix('.')) {
            Some(h) => h,
            None => return false,
        },
        None => rest,
    };
    !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit())
}

fn rewrite_paths(value: ConfigValue, moved: &BTreeMap<Utf8PathBuf, Utf8PathBuf>) -> ConfigValue {
    let swap = |s: String| match moved.get(Utf8Path::new(&s)) {
        Some(staged) => staged.to_string(),
        None => s,
    };
    match value {
        ConfigValue::String(s) => ConfigValue::String(swap(s)),
        ConfigValue::List(items) => ConfigValue::List(items.into_iter().map(swap).collect()),
        other => other,
    }
}

fn describe(item: &ScannedItem) -> String {
    match (&item.change_type, &item.current_value) {
        (ChangeType::Removed, _) => format!("removed: restore stock value of {}", item.key),
        (ct, Some(v)) => format!("{ct}: set {} to {v}", item.key),
        (ct, None) => format!("{ct}: set {}", item.key),
    }
}

fn deterministic_plan_id(package_id: &str, ctx: &PlanContext, actions: &[PlannedAction]) -> Uuid {
    const NAMESPACE: Uuid = Uuid::from_bytes([
        0x2c, 0x8b, 0x47, 0xd0, 0x13, 0x6a, 0x4f, 0x88, 0xb1, 0x0e, 0x95, 0x3d, 0x7a, 0x21, 0xe6,
        0x5f,
    ]);
    let mut stable_key = format!("{package_id}|{}|{}", ctx.os_build, ctx.created_at.to_rfc3339());
    for a in actions {
        stable_key.push_str(&format!(
            "|{}/{}/{:?}/{}",
            a.category,
            a.target_key,
            a.action,
            a.reason_token.as_deref().unwrap_or("-")
        ));
    }
    Uuid::new_v5(&NAMESPACE, stable_key.as_bytes())
}
