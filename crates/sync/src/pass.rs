//! One reconciliation pass: fetch desired, diff every resource in parallel, gather,
//! then build the plan from the complete result set.

use std::sync::Arc;
use std::time::Instant;

use drift_core::{
    DesiredSource, DiffVerdict, Document, DriftError, FaultKind, LiveSource, ReconciledResource, ResourceFault,
    ResourceIdentity, SyncPlan,
};
use metrics::{counter, histogram};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::planner::SyncPlanBuilder;

fn default_workers() -> usize {
    std::env::var("DRIFT_DIFF_WORKERS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(16)
}

/// What to do with resources whose live state could not be fetched or whose
/// processing panicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultPolicy {
    #[default]
    FailPass,
    Exclude,
}

#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Upper bound on resources diffed concurrently.
    pub workers: usize,
    pub faults: FaultPolicy,
}

impl Default for PassOptions {
    fn default() -> Self { Self { workers: default_workers(), faults: FaultPolicy::default() } }
}

#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub verdicts: Vec<DiffVerdict>,
    /// Desired document next to each verdict, in manifest order.
    pub resources: Vec<ReconciledResource>,
    /// Resources excluded under `FaultPolicy::Exclude`.
    pub faults: Vec<ResourceFault>,
    pub plan: SyncPlan,
}

impl PassOutcome {
    pub fn out_of_sync(&self) -> usize { self.verdicts.iter().filter(|v| !v.in_sync).count() }
}

pub async fn run_pass(
    desired: &dyn DesiredSource,
    live: Arc<dyn LiveSource>,
    builder: &SyncPlanBuilder,
    opts: &PassOptions,
) -> Result<PassOutcome, DriftError> {
    let t0 = Instant::now();
    let manifests = desired.fetch_desired().await.map_err(|e| DriftError::Desired(format!("{:#}", e)))?;

    let mut ids: FxHashSet<&ResourceIdentity> = FxHashSet::default();
    for (id, _) in manifests.iter() {
        if !ids.insert(id) { return Err(DriftError::DuplicateResource(id.clone())); }
    }

    let results = diff_all(manifests, live, opts.workers).await;

    let mut verdicts = Vec::with_capacity(results.len());
    let mut reconciled = Vec::with_capacity(results.len());
    let mut faults = Vec::new();
    for (id, desired, res) in results {
        match res {
            Ok(verdict) => {
                verdicts.push(verdict.clone());
                reconciled.push(ReconciledResource { id, desired, verdict });
            }
            Err(fault) => faults.push(fault),
        }
    }

    if !faults.is_empty() {
        counter!("pass_faults_total", faults.len() as u64);
        if opts.faults == FaultPolicy::FailPass {
            return Err(faults.swap_remove(0).into());
        }
        for f in faults.iter() {
            warn!(resource = %f.id, kind = ?f.kind, error = %f.message, "excluding resource from plan");
        }
    }

    let plan = builder.build(&reconciled)?;
    let out = PassOutcome { verdicts, resources: reconciled, faults, plan };
    histogram!("pass_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    info!(
        resources = out.verdicts.len(),
        out_of_sync = out.out_of_sync(),
        faults = out.faults.len(),
        stages = out.plan.len(),
        "reconciliation pass complete"
    );
    Ok(out)
}

type DiffResult = (ResourceIdentity, Document, Result<DiffVerdict, ResourceFault>);

/// Fan out one task per resource (bounded by `workers`) and join all of them, in input
/// order, before returning. A panicking task becomes a fault for that resource only.
async fn diff_all(manifests: Vec<(ResourceIdentity, Document)>, live: Arc<dyn LiveSource>, workers: usize) -> Vec<DiffResult> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(manifests.len());
    for (id, desired) in manifests {
        let task = tokio::spawn({
            let live = Arc::clone(&live);
            let permits = Arc::clone(&permits);
            let id = id.clone();
            let desired = desired.clone();
            async move {
                let _permit = permits.acquire_owned().await.ok();
                diff_one(live.as_ref(), &id, &desired).await
            }
        });
        handles.push((id, desired, task));
    }

    let mut out = Vec::with_capacity(handles.len());
    for (id, desired, task) in handles {
        let res = match task.await {
            Ok(r) => r,
            Err(e) => Err(ResourceFault { id: id.clone(), kind: FaultKind::Panicked, message: join_error_message(e) }),
        };
        out.push((id, desired, res));
    }
    out
}

async fn diff_one(live: &dyn LiveSource, id: &ResourceIdentity, desired: &Document) -> Result<DiffVerdict, ResourceFault> {
    let current = live
        .fetch_live(id)
        .await
        .map_err(|e| ResourceFault { id: id.clone(), kind: FaultKind::FetchFailed, message: format!("{:#}", e) })?;
    Ok(drift_diff::compute(id, desired, current.as_ref()))
}

fn join_error_message(e: tokio::task::JoinError) -> String {
    if !e.is_panic() { return e.to_string(); }
    let payload = e.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() { return format!("panicked: {}", s); }
    if let Some(s) = payload.downcast_ref::<String>() { return format!("panicked: {}", s); }
    "panicked".to_string()
}
