//! Drift diff: normalize, prune live fields the manifest does not own, and compare.
//!
//! Everything here is a pure function over already-fetched documents; callers may run
//! it concurrently across resources without coordination.

#![forbid(unsafe_code)]

use drift_core::{DiffVerdict, Document, ResourceIdentity};
use metrics::counter;
use tracing::debug;

mod equal;
mod normalize;
mod prune;
mod redact;
mod summary;

pub use equal::docs_equal;
pub use normalize::normalize;
pub use prune::prune;
pub use redact::hide_secret_data;
pub use summary::{diff_summary, DiffSummary};

/// Diff one resource. `live == None` means the resource does not exist; the
/// normalized live document is then `Null` and the verdict is out of sync.
pub fn compute(id: &ResourceIdentity, desired: &Document, live: Option<&Document>) -> DiffVerdict {
    let desired = normalize(desired);
    let live = live.map(normalize).unwrap_or(Document::Null);
    let normalized_live = prune(&desired, &live);
    let in_sync = docs_equal(&desired, &normalized_live);
    counter!("diff_computed_total", 1u64);
    if !in_sync { counter!("diff_out_of_sync_total", 1u64); }
    debug!(resource = %id, in_sync, "diff computed");
    DiffVerdict { id: id.clone(), normalized_live, in_sync }
}

/// Desired and normalized live, Secret values masked, ready to print side by side.
pub fn display_pair(desired: &Document, verdict: &DiffVerdict) -> (Document, Document) {
    hide_secret_data(&normalize(desired), &verdict.normalized_live)
}
