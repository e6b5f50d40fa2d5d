use serde::{Deserialize, Serialize};

use crate::ResourceIdentity;

/// Pass-level failures. Annotation parsing and structural mismatches never end up here.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
    #[error("duplicate resource in sync set: {0}")]
    DuplicateResource(ResourceIdentity),
    /// A resource that was not skipped is missing from the plan. Always a bucketing bug.
    #[error("sync plan omits resource {0} (phase {1})")]
    PlanGap(ResourceIdentity, crate::HookPhase),
    #[error("fetching live state for {id}: {message}")]
    Fetch { id: ResourceIdentity, message: String },
    #[error("processing {id} failed: {message}")]
    Resource { id: ResourceIdentity, message: String },
    #[error("fetching desired manifests: {0}")]
    Desired(String),
    #[error("sync cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    FetchFailed,
    Panicked,
}

/// Failure captured while processing one resource during a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFault {
    pub id: ResourceIdentity,
    pub kind: FaultKind,
    pub message: String,
}

impl From<ResourceFault> for DriftError {
    fn from(f: ResourceFault) -> Self {
        match f.kind {
            FaultKind::FetchFailed => DriftError::Fetch { id: f.id, message: f.message },
            FaultKind::Panicked => DriftError::Resource { id: f.id, message: f.message },
        }
    }
}
