use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{DeletePolicy, Document, HookPhase, ResourceIdentity, Wave};

/// Result of diffing one resource in one reconciliation pass. Replaced wholesale each pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffVerdict {
    pub id: ResourceIdentity,
    /// Live document after normalization and pruning against desired; `Null` when the
    /// resource does not exist live.
    pub normalized_live: Document,
    pub in_sync: bool,
}

/// Desired document plus its verdict, as handed to the plan builder.
#[derive(Debug, Clone)]
pub struct ReconciledResource {
    pub id: ResourceIdentity,
    pub desired: Document,
    pub verdict: DiffVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub id: ResourceIdentity,
    pub in_sync: bool,
    pub hook: bool,
    /// Empty for plain resources.
    pub delete_policies: SmallVec<[DeletePolicy; 2]>,
}

/// One barrier: every entry must reach a terminal state before the next stage starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStage {
    pub phase: HookPhase,
    pub wave: Wave,
    pub entries: Vec<StageEntry>,
}

impl SyncStage {
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
    pub fn resources(&self) -> impl Iterator<Item = &ResourceIdentity> + '_ { self.entries.iter().map(|e| &e.id) }
    pub fn contains(&self, id: &ResourceIdentity) -> bool { self.entries.iter().any(|e| &e.id == id) }
}

/// Ordered stages for one pass, plus the resources excluded via the skip phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub stages: Vec<SyncStage>,
    pub skipped: Vec<ResourceIdentity>,
}

impl SyncPlan {
    pub fn len(&self) -> usize { self.stages.len() }
    pub fn is_empty(&self) -> bool { self.stages.is_empty() }

    pub fn has_sync_fail(&self) -> bool {
        self.stages.iter().any(|s| s.phase == HookPhase::SyncFail)
    }

    /// Stages of a single phase, in wave order.
    pub fn stages_for(&self, phase: HookPhase) -> impl Iterator<Item = &SyncStage> + '_ {
        self.stages.iter().filter(move |s| s.phase == phase)
    }

    /// Every stage containing `id`, in execution order.
    pub fn placements(&self, id: &ResourceIdentity) -> Vec<(HookPhase, Wave)> {
        self.stages.iter().filter(|s| s.contains(id)).map(|s| (s.phase, s.wave)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> StageEntry {
        StageEntry { id: ResourceIdentity::new("", "ConfigMap", "ns", name), in_sync: false, hook: false, delete_policies: SmallVec::new() }
    }

    #[test]
    fn plan_queries_by_phase_and_identity() {
        let plan = SyncPlan {
            stages: vec![
                SyncStage { phase: HookPhase::Sync, wave: 0, entries: vec![entry("a")] },
                SyncStage { phase: HookPhase::Sync, wave: 3, entries: vec![entry("b")] },
                SyncStage { phase: HookPhase::SyncFail, wave: 0, entries: vec![entry("a")] },
            ],
            skipped: vec![],
        };
        assert!(plan.has_sync_fail());
        assert_eq!(plan.stages_for(HookPhase::Sync).count(), 2);
        let a = ResourceIdentity::new("", "ConfigMap", "ns", "a");
        assert_eq!(plan.placements(&a), vec![(HookPhase::Sync, 0), (HookPhase::SyncFail, 0)]);
    }
}
