use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordering weight of a resource within its phase.
pub type Wave = i64;

/// Lifecycle phase a resource is applied in.
///
/// Variant order is the phase priority used by the plan builder:
/// PreSync < Sync < PostSync < SyncFail. `SkipSync` excludes a resource entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    PreSync,
    Sync,
    PostSync,
    SyncFail,
    SkipSync,
}

impl HookPhase {
    /// Canonical annotation token.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::PreSync => "PreSync",
            HookPhase::Sync => "Sync",
            HookPhase::PostSync => "PostSync",
            HookPhase::SyncFail => "SyncFail",
            HookPhase::SkipSync => "Skip",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "PreSync" => Some(HookPhase::PreSync),
            "Sync" => Some(HookPhase::Sync),
            "PostSync" => Some(HookPhase::PostSync),
            "SyncFail" => Some(HookPhase::SyncFail),
            "Skip" => Some(HookPhase::SkipSync),
            _ => None,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.pad(self.as_str()) }
}

/// When the executor should delete a hook resource it created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeletePolicy {
    HookSucceeded,
    HookFailed,
    BeforeHookCreation,
}

impl DeletePolicy {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HookSucceeded" => Some(DeletePolicy::HookSucceeded),
            "HookFailed" => Some(DeletePolicy::HookFailed),
            "BeforeHookCreation" => Some(DeletePolicy::BeforeHookCreation),
            _ => None,
        }
    }
}

/// Opaque health signal supplied by the executor's health assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Progressing,
    Degraded,
    Missing,
    Unknown,
}
