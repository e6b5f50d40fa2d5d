//! Drift sync: turn per-resource diff verdicts into an ordered, hook-aware sync plan.
//!
//! - [`HookClassifier`] and [`WaveResolver`] read ordering declarations from annotations
//!   through ordered fallback chains ([`AnnotationChain`]).
//! - [`SyncPlanBuilder`] buckets resources by (phase, wave) into barrier stages.
//! - [`run_pass`] diffs a declared set in parallel and builds the plan once every
//!   result is in.
//! - [`PlanRun`] / [`drive`] model stage execution for an external executor.

#![forbid(unsafe_code)]

pub mod annotations;
mod hooks;
mod kinds;
mod pass;
mod planner;
mod run;
mod waves;

pub use annotations::AnnotationChain;
pub use hooks::{DeletePolicies, HookClassifier, PhaseSet};
pub use kinds::kind_rank;
pub use pass::{run_pass, FaultPolicy, PassOptions, PassOutcome};
pub use planner::SyncPlanBuilder;
pub use run::{drive, DryRunExecutor, PlanRun, ResourceOutcome, RunState, StageExecutor};
pub use waves::{parse_wave, WaveResolver};
