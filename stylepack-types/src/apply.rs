use crate::plan::RiskLevel;
use crate::value::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Apply executor states, in the order they can be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApplyPhase {
    Init,
    RestorePointCreated,
    RestoreSkipped,
    Executing { step: usize },
    Committed,
    Faulted,
}

impl ApplyPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplyPhase::Committed | ApplyPhase::Faulted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestorePointStatus {
    Created { handle: String, label: String },
    Skipped { reason: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failure,
    Skipped,
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub key: String,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub outcome: StepOutcome,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Set on a failed high-risk step that required a decision to continue.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_confirmation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub not_attempted: u64,
}

impl ApplySummary {
    pub fn from_steps(steps: &[StepRecord]) -> Self {
        let mut s = ApplySummary {
            total: steps.len() as u64,
            ..ApplySummary::default()
        };
        for step in steps {
            match step.outcome {
                StepOutcome::Success => s.succeeded += 1,
                StepOutcome::Failure => s.failed += 1,
                StepOutcome::Skipped => s.skipped += 1,
                StepOutcome::NotAttempted => s.not_attempted += 1,
            }
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyLog {
    pub schema: String,
    pub plan_id: String,
    pub started_at: DateTime<Utc>,

    /// Terminal phase.
    pub phase: ApplyPhase,

    /// Every phase entered, in order.
    #[serde(default)]
    pub transitions: Vec<ApplyPhase>,

    pub restore_point: RestorePointStatus,

    #[serde(default)]
    pub steps: Vec<StepRecord>,

    #[serde(default)]
    pub summary: ApplySummary,

    /// Index of the step where execution stopped early, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ApplyLog {
    pub fn is_committed(&self) -> bool {
        self.phase == ApplyPhase::Committed
    }
}
