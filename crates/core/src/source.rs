//! Collaborator seams. Implementations live outside the diff/plan core
//! (cluster readers, manifest loaders, test fakes).

use async_trait::async_trait;

use crate::{Document, ResourceIdentity};

/// Live-state accessor. `Ok(None)` means the resource does not exist.
#[async_trait]
pub trait LiveSource: Send + Sync {
    async fn fetch_live(&self, id: &ResourceIdentity) -> anyhow::Result<Option<Document>>;
}

/// Rendered-manifest accessor.
#[async_trait]
pub trait DesiredSource: Send + Sync {
    async fn fetch_desired(&self) -> anyhow::Result<Vec<(ResourceIdentity, Document)>>;
}
