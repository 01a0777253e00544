use crate::policy::ContinuePolicy;
use crate::rollback::SystemRollbackService;
use chrono::{DateTime, Utc};
use stylepack_domain::{CancelToken, CapabilityRegistry, ScannerCapability};
use stylepack_types::apply::{
    ApplyLog, ApplyPhase, ApplySummary, RestorePointStatus, StepOutcome, StepRecord,
};
use stylepack_types::plan::{DryRunPlan, PlannedAction, RiskLevel};
use stylepack_types::schema;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub skip_restore_point: bool,
    /// Continue past failed high-risk steps without consulting the policy.
    pub unattended: bool,
    pub restore_label: String,
    pub started_at: DateTime<Utc>,
}

impl ApplyOptions {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            skip_restore_point: false,
            unattended: false,
            restore_label: "stylepack import".to_string(),
            started_at,
        }
    }
}

pub struct ApplyExecutor<'a> {
    registry: &'a CapabilityRegistry,
    rollback: &'a dyn SystemRollbackService,
    policy: &'a dyn ContinuePolicy,
}

/// Running state of one apply.
struct Run {
    phase: ApplyPhase,
    transitions: Vec<ApplyPhase>,
    steps: Vec<StepRecord>,
    warnings: Vec<String>,
    halted_at: Option<usize>,
}

impl Run {
    fn enter(&mut self, phase: ApplyPhase) {
        debug!(?phase, "apply phase");
        self.phase = phase;
        self.transitions.push(phase);
    }
}

impl<'a> ApplyExecutor<'a> {
    pub fn new(
        registry: &'a CapabilityRegistry,
        rollback: &'a dyn SystemRollbackService,
        policy: &'a dyn ContinuePolicy,
    ) -> Self {
        Self {
            registry,
            rollback,
            policy,
        }
    }

    pub fn apply(&self, plan: &DryRunPlan, opts: &ApplyOptions, cancel: &CancelToken) -> ApplyLog {
        let mut run = Run {
            phase: ApplyPhase::Init,
            transitions: vec![ApplyPhase::Init],
            steps: Vec::with_capacity(plan.actions.len()),
            warnings: Vec::new(),
            halted_at: None,
        };

        let restore_point = self.restore_point(plan, opts, &mut run);

        for (idx, action) in plan.actions.iter().enumerate() {
            if !action.is_eligible() {
                run.steps.push(record(action, None, StepOutcome::Skipped, None));
                continue;
            }
            if run.halted_at.is_some() {
                run.steps.push(record(action, None, StepOutcome::NotAttempted, None));
                continue;
            }
            if cancel.is_cancelled() {
                warn!(step = idx, "apply cancelled between steps");
                run.warnings.push(format!("cancelled before step {idx}"));
                run.halted_at = Some(idx);
                run.steps.push(record(action, None, StepOutcome::NotAttempted, None));
                continue;
            }

            run.enter(ApplyPhase::Executing { step: idx });
            let mut step = self.execute(action);
            let failed_high =
                step.outcome == StepOutcome::Failure && step.risk_level == RiskLevel::High;
            if failed_high && !opts.unattended {
                step.needs_confirmation = true;
                if !self.policy.continue_after(&step) {
                    warn!(step = idx, key = %step.key, "halting after high-risk failure");
                    run.halted_at = Some(idx);
                }
            }
            run.steps.push(step);
        }

        let terminal = if run.halted_at.is_some() {
            ApplyPhase::Faulted
        } else {
            ApplyPhase::Committed
        };
        run.enter(terminal);

        let summary = ApplySummary::from_steps(&run.steps);
        info!(
            plan_id = %plan.plan_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            not_attempted = summary.not_attempted,
            committed = terminal == ApplyPhase::Committed,
            "apply finished"
        );

        ApplyLog {
            schema: schema::STYLEPACK_APPLY_V1.to_string(),
            plan_id: plan.plan_id.clone(),
            started_at: opts.started_at,
            phase: run.phase,
            transitions: run.transitions,
            restore_point,
            steps: run.steps,
            summary,
            halted_at: run.halted_at,
            warnings: run.warnings,
        }
    }

    fn restore_point(&self, plan: &DryRunPlan, opts: &ApplyOptions, run: &mut Run) -> RestorePointStatus {
        if opts.skip_restore_point {
            run.enter(ApplyPhase::RestoreSkipped);
            return RestorePointStatus::Skipped {
                reason: "skipped by request".to_string(),
            };
        }
        if !plan.has_eligible() {
            run.enter(ApplyPhase::RestoreSkipped);
            return RestorePointStatus::Skipped {
                reason: "plan has no eligible actions".to_string(),
            };
        }
        match self.rollback.create_restore_point(&opts.restore_label) {
            Ok(handle) => {
                info!(handle = %handle.id, label = %opts.restore_label, "restore point created");
                run.enter(ApplyPhase::RestorePointCreated);
                RestorePointStatus::Created {
                    handle: handle.id,
                    label: opts.restore_label.clone(),
                }
            }
            Err(e) => {
                warn!(error = %e, "continuing without a restore point");
                run.warnings.push(e.to_string());
                run.enter(ApplyPhase::RestoreSkipped);
                RestorePointStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn capability_for(&self, action: &PlannedAction) -> Option<&dyn ScannerCapability> {
        action
            .capability_id
            .as_deref()
            .and_then(|id| self.registry.find(id))
            .or_else(|| self.registry.route(&action.item))
    }

    fn execute(&self, action: &PlannedAction) -> StepRecord {
        let Some(capability) = self.capability_for(action) else {
            warn!(key = %action.target_key, "no capability available");
            return record(
                action,
                None,
                StepOutcome::Failure,
                Some(format!("no capability available for {}", action.target_key)),
            );
        };
        let capability_id = capability.identify().id;

        match capability.apply(&action.item) {
            Ok(true) => {
                info!(key = %action.target_key, capability = %capability_id, "step applied");
                record(action, Some(capability_id), StepOutcome::Success, None)
            }
            Ok(false) => {
                warn!(key = %action.target_key, capability = %capability_id, "capability reported failure");
                record(
                    action,
                    Some(capability_id),
                    StepOutcome::Failure,
                    Some("capability reported the write did not complete".to_string()),
                )
            }
            Err(e) => {
                let detail = format!("{e:#}");
                warn!(key = %action.target_key, capability = %capability_id, error = %detail, "step failed");
                record(action, Some(capability_id), StepOutcome::Failure, Some(detail))
            }
        }
    }
}

fn record(
    action: &PlannedAction,
    capability_id: Option<String>,
    outcome: StepOutcome,
    error_detail: Option<String>,
) -> StepRecord {
    StepRecord {
        key: action.target_key.clone(),
        category: action.category,
        risk_level: action.risk_level,
        outcome,
        capability_id: capability_id.or_else(|| action.capability_id.clone()),
        error_detail,
        needs_confirmation: false,
    }
}
