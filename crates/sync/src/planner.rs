use std::collections::BTreeMap;

use drift_core::{DriftError, HookPhase, ReconciledResource, ResourceIdentity, StageEntry, SyncPlan, SyncStage, Wave};
use metrics::histogram;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::hooks::HookClassifier;
use crate::kinds::kind_rank;
use crate::waves::WaveResolver;

/// Groups resources into (phase, wave) barrier stages.
///
/// Pure ordering: sync status is carried on each entry but never filters membership.
#[derive(Debug, Clone, Default)]
pub struct SyncPlanBuilder {
    hooks: HookClassifier,
    waves: WaveResolver,
}

impl SyncPlanBuilder {
    pub fn new(hooks: HookClassifier, waves: WaveResolver) -> Self { Self { hooks, waves } }

    pub fn hooks(&self) -> &HookClassifier { &self.hooks }
    pub fn waves(&self) -> &WaveResolver { &self.waves }

    pub fn build(&self, resources: &[ReconciledResource]) -> Result<SyncPlan, DriftError> {
        let mut seen: FxHashSet<&ResourceIdentity> = FxHashSet::default();
        let mut buckets: BTreeMap<(HookPhase, Wave), Vec<StageEntry>> = BTreeMap::new();
        let mut expected: Vec<(&ResourceIdentity, HookPhase)> = Vec::with_capacity(resources.len());
        let mut skipped = Vec::new();

        for r in resources {
            if !seen.insert(&r.id) {
                return Err(DriftError::DuplicateResource(r.id.clone()));
            }
            let declared = self.hooks.classify(&r.desired);
            if declared.contains(&HookPhase::SkipSync) {
                debug!(resource = %r.id, "skipped via hook annotation");
                skipped.push(r.id.clone());
                continue;
            }
            let hook = !declared.is_empty();
            let wave = self.waves.resolve(&r.desired);
            let delete_policies = if hook { self.hooks.delete_policies(&r.desired) } else { SmallVec::new() };
            let phases: Vec<HookPhase> = if hook { declared.into_iter().collect() } else { vec![HookPhase::Sync] };
            for phase in phases {
                expected.push((&r.id, phase));
                buckets.entry((phase, wave)).or_default().push(StageEntry {
                    id: r.id.clone(),
                    in_sync: r.verdict.in_sync,
                    hook,
                    delete_policies: delete_policies.clone(),
                });
            }
        }

        let stages: Vec<SyncStage> = buckets
            .into_iter()
            .map(|((phase, wave), mut entries)| {
                entries.sort_by(|a, b| kind_rank(&a.id.kind).cmp(&kind_rank(&b.id.kind)).then_with(|| a.id.cmp(&b.id)));
                SyncStage { phase, wave, entries }
            })
            .collect();
        skipped.sort();

        let plan = SyncPlan { stages, skipped };
        check_coverage(&plan, &expected)?;
        histogram!("plan_stages", plan.len() as f64);
        debug!(stages = plan.len(), skipped = plan.skipped.len(), "sync plan built");
        Ok(plan)
    }
}

/// Every non-skipped resource must sit in exactly one stage per phase it belongs to.
fn check_coverage(plan: &SyncPlan, expected: &[(&ResourceIdentity, HookPhase)]) -> Result<(), DriftError> {
    let mut placed: FxHashMap<(&ResourceIdentity, HookPhase), usize> = FxHashMap::default();
    for stage in plan.stages.iter() {
        for e in stage.entries.iter() {
            *placed.entry((&e.id, stage.phase)).or_default() += 1;
        }
    }
    for (id, phase) in expected.iter().copied() {
        if placed.get(&(id, phase)) != Some(&1) {
            return Err(DriftError::PlanGap(id.clone(), phase));
        }
    }
    Ok(())
}
