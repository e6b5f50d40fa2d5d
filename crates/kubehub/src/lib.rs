//! Drift kubehub: adapters that feed the diff/plan core.
//!
//! - [`ManifestDir`]: rendered manifests from a directory of YAML/JSON files.
//! - [`SnapshotDir`]: live state captured to disk (`kubectl get -o yaml` dumps work).
//! - [`KubeLive`]: live state read from a cluster with kube-rs.

#![forbid(unsafe_code)]

mod cluster;
mod manifests;

pub use cluster::KubeLive;
pub use manifests::{load_dir, parse_documents, ManifestDir, SnapshotDir};
