use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use drift_core::{Document, LiveSource, ResourceIdentity};
use kube::{
    api::Api,
    core::{ApiResource, DynamicObject},
    discovery::{Discovery, Scope},
    Client,
};
use metrics::{counter, histogram};
use tracing::{debug, info};

/// Live state read straight from the API server.
///
/// Discovery runs once at connect time; a resource whose kind the server does not
/// serve is reported as not found rather than as an error.
pub struct KubeLive {
    client: Client,
    discovery: Discovery,
}

impl KubeLive {
    pub async fn connect() -> Result<Self> {
        let client = Client::try_default().await.context("building kube client")?;
        Self::with_client(client).await
    }

    pub async fn with_client(client: Client) -> Result<Self> {
        let t0 = Instant::now();
        let discovery = Discovery::new(client.clone()).run().await.context("running API discovery")?;
        histogram!("kube_discovery_ms", t0.elapsed().as_secs_f64() * 1000.0);
        info!(groups = discovery.groups().count(), "kube discovery complete");
        Ok(Self { client, discovery })
    }

    fn find_api_resource(&self, id: &ResourceIdentity) -> Option<(ApiResource, bool)> {
        for group in self.discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                if ar.group == id.group && ar.kind == id.kind {
                    let namespaced = matches!(caps.scope, Scope::Namespaced);
                    return Some((ar, namespaced));
                }
            }
        }
        None
    }
}

#[async_trait]
impl LiveSource for KubeLive {
    async fn fetch_live(&self, id: &ResourceIdentity) -> Result<Option<Document>> {
        let Some((ar, namespaced)) = self.find_api_resource(id) else {
            debug!(resource = %id, "kind not served by cluster; treating as missing");
            return Ok(None);
        };
        let api: Api<DynamicObject> = if namespaced {
            if id.namespace.is_empty() {
                return Err(anyhow!("namespace required for namespaced kind {}", id.kind));
            }
            Api::namespaced_with(self.client.clone(), &id.namespace, &ar)
        } else {
            Api::all_with(self.client.clone(), &ar)
        };
        counter!("kube_live_reads_total", 1u64);
        let obj = api.get_opt(&id.name).await.with_context(|| format!("reading {}", id))?;
        let Some(obj) = obj else { return Ok(None) };
        let mut raw = serde_json::to_value(&obj).context("serializing DynamicObject")?;
        strip_managed_fields(&mut raw);
        Ok(Some(raw))
    }
}

fn strip_managed_fields(v: &mut Document) {
    if let Some(meta) = v.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        meta.remove("managedFields");
    }
}
