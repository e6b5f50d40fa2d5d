//! Drift core types: documents, resource identities, hook phases and sync plans.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

mod error;
mod hook;
mod plan;
mod source;

pub use error::{DriftError, FaultKind, ResourceFault};
pub use hook::{DeletePolicy, HealthStatus, HookPhase, Wave};
pub use plan::{DiffVerdict, ReconciledResource, StageEntry, SyncPlan, SyncStage};
pub use source::{DesiredSource, LiveSource};

/// Desired manifests and live snapshots share one recursive tree type
/// (mapping / sequence / scalar). Diff code matches on the variant explicitly.
pub type Document = serde_json::Value;

/// (apiGroup, kind, namespace, name). Cluster-scoped resources carry an empty namespace.
///
/// Field order matters: the derived `Ord` is the lexicographic order used for stable
/// ordering inside a sync stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(group: impl Into<String>, kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { group: group.into(), kind: kind.into(), namespace: namespace.into(), name: name.into() }
    }

    /// Read the identity from `apiVersion`, `kind` and `metadata`. Returns `None` when
    /// `kind` or `metadata.name` is missing.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let kind = doc.get("kind").and_then(|v| v.as_str())?;
        let meta = doc.get("metadata");
        let name = meta.and_then(|m| m.get("name")).and_then(|v| v.as_str())?;
        let namespace = meta.and_then(|m| m.get("namespace")).and_then(|v| v.as_str()).unwrap_or("");
        let api_version = doc.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
        let group = match api_version.split_once('/') { Some((g, _)) => g, None => "" };
        Some(Self::new(group, kind, namespace, name))
    }

    pub fn is_namespaced(&self) -> bool { !self.namespace.is_empty() }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.group.is_empty() { write!(f, "{}/", self.group)?; }
        write!(f, "{}/", self.kind)?;
        if self.is_namespaced() { write!(f, "{}/", self.namespace)?; }
        f.write_str(&self.name)
    }
}

/// Look up a single annotation value in `metadata.annotations`.
pub fn annotation<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get("metadata")
        .and_then(|m| m.get("annotations"))
        .and_then(|a| a.get(key))
        .and_then(|v| v.as_str())
}

pub mod prelude {
    pub use super::{
        annotation, DeletePolicy, DesiredSource, DiffVerdict, Document, DriftError, HealthStatus, HookPhase,
        LiveSource, ReconciledResource, ResourceIdentity, StageEntry, SyncPlan, SyncStage, Wave,
    };
}
