use crate::item::ScannedItem;
use crate::os::OsBuild;
use crate::value::Category;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable reason tokens for skipped plan entries.
pub mod skip_tokens {
    pub const READONLY: &str = "readonly";
    pub const CATEGORY_UNREGISTERED: &str = "category_unregistered";
    pub const NO_CAPABILITY: &str = "no_capability";
    pub const ASSET_MISSING: &str = "asset_missing";
    pub const ASSET_RELOCATION_FAILED: &str = "asset_relocation_failed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Cosmetic and reversible.
    Low,
    /// Needs a dependent process restart to show.
    Medium,
    /// Needs elevation or touches machine-wide scope.
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Set,
    Remove,
    Skip,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Set => "set",
            PlanAction::Remove => "remove",
            PlanAction::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: PlanAction,
    pub target_key: String,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_id: Option<String>,

    /// The item as it will be handed to `apply`, with asset paths relocated.
    pub item: ScannedItem,
}

impl PlannedAction {
    pub fn is_eligible(&self) -> bool {
        self.action != PlanAction::Skip
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total: u64,
    pub eligible: u64,
    pub skipped: u64,
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl PlanSummary {
    pub fn from_actions(actions: &[PlannedAction]) -> Self {
        let mut s = PlanSummary {
            total: actions.len() as u64,
            ..PlanSummary::default()
        };
        for a in actions {
            if !a.is_eligible() {
                s.skipped += 1;
                continue;
            }
            s.eligible += 1;
            match a.risk_level {
                RiskLevel::Low => s.low += 1,
                RiskLevel::Medium => s.medium += 1,
                RiskLevel::High => s.high += 1,
            }
        }
        s
    }
}

/// Ordered, risk-annotated import actions. Producing it performs no writes
/// outside the staging directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryRunPlan {
    pub schema: String,
    pub plan_id: String,
    pub package_id: String,
    pub os_build: OsBuild,
    pub created_at: DateTime<Utc>,
    pub staging_dir: Utf8PathBuf,

    #[serde(default)]
    pub actions: Vec<PlannedAction>,

    #[serde(default)]
    pub summary: PlanSummary,
}

impl DryRunPlan {
    pub fn eligible(&self) -> impl Iterator<Item = &PlannedAction> {
        self.actions.iter().filter(|a| a.is_eligible())
    }

    pub fn has_eligible(&self) -> bool {
        self.actions.iter().any(PlannedAction::is_eligible)
    }
}
