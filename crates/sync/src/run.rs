//! Stage execution state machine.
//!
//! Stages run strictly in order; a stage stays current until every entry has a terminal
//! outcome. A failure moves the run onto the SyncFail stages (when the plan has any)
//! and the run ends Failed either way. The actual apply/hook calls belong to a
//! [`StageExecutor`]; [`drive`] wires the two together with cancellation.

use async_trait::async_trait;
use drift_core::{HealthStatus, HookPhase, ResourceIdentity, SyncPlan, SyncStage};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceOutcome {
    Pending,
    Running,
    /// Synced and healthy, or hook completed.
    Succeeded,
    /// Apply failed, degraded, or hook failed.
    Failed,
}

impl ResourceOutcome {
    pub fn is_terminal(&self) -> bool { matches!(self, ResourceOutcome::Succeeded | ResourceOutcome::Failed) }

    pub fn from_health(health: HealthStatus) -> Self {
        match health {
            HealthStatus::Healthy => ResourceOutcome::Succeeded,
            HealthStatus::Degraded => ResourceOutcome::Failed,
            HealthStatus::Progressing | HealthStatus::Missing | HealthStatus::Unknown => ResourceOutcome::Running,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Index into the plan's stages.
    Running { stage: usize },
    /// Running SyncFail stages after a failure; ends Failed.
    RunningSyncFail { stage: usize },
    Succeeded,
    Failed { message: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool { matches!(self, RunState::Succeeded | RunState::Failed { .. }) }
}

#[derive(Debug, Clone)]
pub struct PlanRun {
    plan: SyncPlan,
    outcomes: Vec<Vec<ResourceOutcome>>,
    main: Vec<usize>,
    sync_fail: Vec<usize>,
    cursor: usize,
    failure: Option<String>,
    state: RunState,
}

impl PlanRun {
    pub fn new(plan: SyncPlan) -> Self {
        let outcomes = plan.stages.iter().map(|s| vec![ResourceOutcome::Pending; s.len()]).collect();
        let (sync_fail, main): (Vec<usize>, Vec<usize>) =
            (0..plan.stages.len()).partition(|i| plan.stages[*i].phase == HookPhase::SyncFail);
        let state = match main.first() {
            Some(&stage) => RunState::Running { stage },
            None => RunState::Succeeded,
        };
        Self { plan, outcomes, main, sync_fail, cursor: 0, failure: None, state }
    }

    pub fn state(&self) -> &RunState { &self.state }
    pub fn plan(&self) -> &SyncPlan { &self.plan }

    fn current_index(&self) -> Option<usize> {
        match self.state {
            RunState::Running { stage } | RunState::RunningSyncFail { stage } => Some(stage),
            _ => None,
        }
    }

    pub fn current_stage(&self) -> Option<&SyncStage> { self.current_index().map(|i| &self.plan.stages[i]) }

    /// Record an outcome for a member of the current stage. Returns false when the
    /// resource is not part of it (or the run is over).
    pub fn record(&mut self, id: &ResourceIdentity, outcome: ResourceOutcome) -> bool {
        let Some(i) = self.current_index() else { return false };
        match self.plan.stages[i].entries.iter().position(|e| &e.id == id) {
            Some(pos) => { self.outcomes[i][pos] = outcome; true }
            None => false,
        }
    }

    /// Mark every non-terminal member of the current stage as failed.
    pub fn fail_unfinished(&mut self) -> usize {
        let Some(i) = self.current_index() else { return 0 };
        let mut n = 0;
        for o in self.outcomes[i].iter_mut().filter(|o| !o.is_terminal()) {
            *o = ResourceOutcome::Failed;
            n += 1;
        }
        n
    }

    pub fn outcome(&self, stage: usize, id: &ResourceIdentity) -> Option<ResourceOutcome> {
        let pos = self.plan.stages.get(stage)?.entries.iter().position(|e| &e.id == id)?;
        Some(self.outcomes[stage][pos])
    }

    /// Evaluate the barrier of the current stage and move on when it is complete.
    pub fn advance(&mut self) -> &RunState {
        let Some(i) = self.current_index() else { return &self.state };
        if !self.outcomes[i].iter().all(|o| o.is_terminal()) { return &self.state; }

        let stage = &self.plan.stages[i];
        let failed: Vec<String> = stage
            .entries
            .iter()
            .zip(self.outcomes[i].iter())
            .filter(|(_, o)| **o == ResourceOutcome::Failed)
            .map(|(e, _)| e.id.to_string())
            .collect();
        let on_fail_path = matches!(self.state, RunState::RunningSyncFail { .. });
        counter!("stage_transitions_total", 1u64);

        if !failed.is_empty() && !on_fail_path {
            let message = format!("{} wave {} failed: {}", stage.phase, stage.wave, failed.join(", "));
            warn!(phase = %stage.phase, wave = stage.wave, failed = failed.len(), "stage failed");
            self.failure = Some(message.clone());
            self.cursor = 0;
            self.state = match self.sync_fail.first() {
                Some(&stage) => RunState::RunningSyncFail { stage },
                None => RunState::Failed { message },
            };
            return &self.state;
        }

        self.cursor += 1;
        self.state = if on_fail_path {
            let mut message = self.failure.clone().unwrap_or_else(|| "sync failed".to_string());
            if !failed.is_empty() {
                message.push_str(&format!("; SyncFail hooks failed: {}", failed.join(", ")));
                RunState::Failed { message }
            } else {
                match self.sync_fail.get(self.cursor) {
                    Some(&stage) => RunState::RunningSyncFail { stage },
                    None => RunState::Failed { message },
                }
            }
        } else {
            match self.main.get(self.cursor) {
                Some(&stage) => RunState::Running { stage },
                None => RunState::Succeeded,
            }
        };
        &self.state
    }

    /// Stop the run: no further stages start.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Failed { message: "cancelled".to_string() };
        }
    }
}

/// Applies one stage and reports a terminal outcome per entry.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn run_stage(&self, stage: &SyncStage) -> Vec<(ResourceIdentity, ResourceOutcome)>;
}

/// Run `plan` to a terminal state. Cancelling `cancel` drops the in-flight stage and
/// starts nothing after it.
pub async fn drive(plan: SyncPlan, executor: &dyn StageExecutor, cancel: CancellationToken) -> PlanRun {
    let mut run = PlanRun::new(plan);
    while let Some(stage) = run.current_stage().cloned() {
        info!(phase = %stage.phase, wave = stage.wave, members = stage.len(), "stage started");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(phase = %stage.phase, wave = stage.wave, "sync cancelled");
                run.cancel();
                break;
            }
            outcomes = executor.run_stage(&stage) => {
                for (id, outcome) in outcomes {
                    if !run.record(&id, outcome) {
                        warn!(resource = %id, "executor reported a resource outside the current stage");
                    }
                }
            }
        }
        let unfinished = run.fail_unfinished();
        if unfinished > 0 {
            warn!(unfinished, "executor returned before every member finished; marking them failed");
        }
        run.advance();
    }
    info!(state = ?run.state(), "sync finished");
    run
}

/// Executor that applies nothing and reports every member as succeeded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

#[async_trait]
impl StageExecutor for DryRunExecutor {
    async fn run_stage(&self, stage: &SyncStage) -> Vec<(ResourceIdentity, ResourceOutcome)> {
        stage
            .entries
            .iter()
            .map(|e| {
                info!(resource = %e.id, hook = e.hook, in_sync = e.in_sync, "dry-run apply");
                (e.id.clone(), ResourceOutcome::Succeeded)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{StageEntry, Wave};
    use smallvec::SmallVec;

    fn id(name: &str) -> ResourceIdentity { ResourceIdentity::new("", "ConfigMap", "ns", name) }

    fn stage(phase: HookPhase, wave: Wave, names: &[&str]) -> SyncStage {
        let entries = names
            .iter()
            .map(|n| StageEntry { id: id(n), in_sync: false, hook: phase != HookPhase::Sync, delete_policies: SmallVec::new() })
            .collect();
        SyncStage { phase, wave, entries }
    }

    fn plan() -> SyncPlan {
        SyncPlan {
            stages: vec![
                stage(HookPhase::PreSync, 0, &["pre"]),
                stage(HookPhase::Sync, 0, &["a", "b"]),
                stage(HookPhase::PostSync, 0, &["post"]),
                stage(HookPhase::SyncFail, 0, &["cleanup"]),
            ],
            skipped: vec![],
        }
    }

    #[test]
    fn stage_is_a_barrier() {
        let mut run = PlanRun::new(plan());
        assert_eq!(run.state(), &RunState::Running { stage: 0 });
        assert!(run.record(&id("pre"), ResourceOutcome::Succeeded));
        assert_eq!(run.advance(), &RunState::Running { stage: 1 });

        run.record(&id("a"), ResourceOutcome::Succeeded);
        run.record(&id("b"), ResourceOutcome::Running);
        assert_eq!(run.advance(), &RunState::Running { stage: 1 });
        run.record(&id("b"), ResourceOutcome::Succeeded);
        assert_eq!(run.advance(), &RunState::Running { stage: 2 });

        run.record(&id("post"), ResourceOutcome::Succeeded);
        assert_eq!(run.advance(), &RunState::Succeeded);
        assert!(run.current_stage().is_none());
    }

    #[test]
    fn sync_fail_stages_are_skipped_on_success() {
        let mut run = PlanRun::new(plan());
        for name in ["pre", "a", "b", "post"] {
            run.record(&id(name), ResourceOutcome::Succeeded);
            run.advance();
        }
        assert_eq!(run.state(), &RunState::Succeeded);
        assert_eq!(run.outcome(3, &id("cleanup")), Some(ResourceOutcome::Pending));
    }

    #[test]
    fn failure_runs_sync_fail_then_fails() {
        let mut run = PlanRun::new(plan());
        run.record(&id("pre"), ResourceOutcome::Succeeded);
        run.advance();
        run.record(&id("a"), ResourceOutcome::Failed);
        run.record(&id("b"), ResourceOutcome::Succeeded);
        assert_eq!(run.advance(), &RunState::RunningSyncFail { stage: 3 });
        assert!(!run.record(&id("post"), ResourceOutcome::Succeeded));

        run.record(&id("cleanup"), ResourceOutcome::Succeeded);
        match run.advance() {
            RunState::Failed { message } => assert!(message.contains("ConfigMap/ns/a"), "{message}"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn failure_without_sync_fail_ends_immediately() {
        let mut p = plan();
        p.stages.pop();
        let mut run = PlanRun::new(p);
        run.record(&id("pre"), ResourceOutcome::Failed);
        assert!(matches!(run.advance(), RunState::Failed { .. }));
    }

    #[test]
    fn failing_sync_fail_hook_is_reported() {
        let mut run = PlanRun::new(plan());
        run.record(&id("pre"), ResourceOutcome::Failed);
        run.advance();
        run.record(&id("cleanup"), ResourceOutcome::Failed);
        match run.advance() {
            RunState::Failed { message } => assert!(message.contains("SyncFail hooks failed"), "{message}"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn cancel_is_terminal() {
        let mut run = PlanRun::new(plan());
        run.cancel();
        assert_eq!(run.state(), &RunState::Failed { message: "cancelled".into() });
        assert!(!run.record(&id("pre"), ResourceOutcome::Succeeded));
    }

    #[test]
    fn empty_plan_succeeds() {
        assert_eq!(PlanRun::new(SyncPlan::default()).state(), &RunState::Succeeded);
    }

    #[test]
    fn health_maps_to_outcome() {
        assert_eq!(ResourceOutcome::from_health(HealthStatus::Healthy), ResourceOutcome::Succeeded);
        assert_eq!(ResourceOutcome::from_health(HealthStatus::Degraded), ResourceOutcome::Failed);
        assert!(!ResourceOutcome::from_health(HealthStatus::Progressing).is_terminal());
        assert!(!ResourceOutcome::from_health(HealthStatus::Missing).is_terminal());
    }
}
