use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use drift_core::{DesiredSource, Document, LiveSource, ResourceIdentity};
use serde::Deserialize;
use tracing::{debug, warn};

fn max_yaml_bytes() -> usize {
    std::env::var("DRIFT_MAX_YAML_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000_000) // 1 MiB default
}

fn max_yaml_nodes() -> usize {
    std::env::var("DRIFT_MAX_YAML_NODES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100_000)
}

fn node_budget_exceeded(v: &Document, max: usize) -> bool {
    // Bail as soon as the running count reaches max
    fn walk(v: &Document, cur: &mut usize, max: usize) {
        if *cur >= max { return; }
        *cur += 1;
        match v {
            Document::Object(map) => {
                for vv in map.values() {
                    if *cur >= max { break; }
                    walk(vv, cur, max);
                }
            }
            Document::Array(arr) => {
                for vv in arr.iter() {
                    if *cur >= max { break; }
                    walk(vv, cur, max);
                }
            }
            _ => {}
        }
    }
    let mut count = 0usize;
    walk(v, &mut count, max);
    count >= max
}

/// Parse a (multi-document) YAML or JSON payload into identified resources.
///
/// Empty documents are skipped and `kind: *List` documents are flattened into their items.
/// `default_ns` fills in `metadata.namespace` when the manifest leaves it out.
pub fn parse_documents(text: &str, default_ns: Option<&str>) -> Result<Vec<(ResourceIdentity, Document)>> {
    if text.len() > max_yaml_bytes() {
        return Err(anyhow!("YAML payload too large (>{} bytes)", max_yaml_bytes()));
    }
    let mut out = Vec::new();
    for (i, de) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let val = serde_yaml::Value::deserialize(de).with_context(|| format!("parsing YAML document #{}", i + 1))?;
        if val.is_null() { continue; }
        let json = serde_json::to_value(val).context("converting YAML to JSON")?;
        if node_budget_exceeded(&json, max_yaml_nodes()) {
            return Err(anyhow!("YAML document too complex (>{} nodes)", max_yaml_nodes()));
        }
        let is_list = json.get("kind").and_then(|v| v.as_str()).is_some_and(|k| k.ends_with("List"));
        match json.get("items").and_then(|v| v.as_array()) {
            Some(items) if is_list => {
                for item in items { out.push(identify(item.clone(), default_ns)?); }
            }
            _ => out.push(identify(json, default_ns)?),
        }
    }
    Ok(out)
}

/// Kinds that never take a namespace, so the default one is not applied to them.
const CLUSTER_SCOPED: &[&str] = &[
    "Namespace",
    "Node",
    "PersistentVolume",
    "StorageClass",
    "CustomResourceDefinition",
    "ClusterRole",
    "ClusterRoleBinding",
    "PriorityClass",
    "IngressClass",
    "APIService",
    "ValidatingWebhookConfiguration",
    "MutatingWebhookConfiguration",
];

fn identify(mut doc: Document, default_ns: Option<&str>) -> Result<(ResourceIdentity, Document)> {
    if doc.get("apiVersion").and_then(|v| v.as_str()).is_none() { return Err(anyhow!("manifest missing apiVersion")); }
    if doc.get("kind").and_then(|v| v.as_str()).is_none() { return Err(anyhow!("manifest missing kind")); }
    let cluster_scoped = doc.get("kind").and_then(|v| v.as_str()).is_some_and(|k| CLUSTER_SCOPED.contains(&k));
    let default_ns = default_ns.filter(|_| !cluster_scoped);
    if let (Some(ns), Some(meta)) = (default_ns, doc.get_mut("metadata").and_then(|m| m.as_object_mut())) {
        meta.entry("namespace").or_insert_with(|| Document::String(ns.to_string()));
    }
    let id = ResourceIdentity::from_document(&doc).ok_or_else(|| anyhow!("manifest missing metadata.name"))?;
    Ok((id, doc))
}

/// Load every `.yaml`, `.yml` and `.json` file under `dir` (recursively, sorted by path).
pub fn load_dir(dir: &Path, default_ns: Option<&str>) -> Result<Vec<(ResourceIdentity, Document)>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();
    let mut out = Vec::new();
    for f in files {
        let text = std::fs::read_to_string(&f).with_context(|| format!("reading {}", f.display()))?;
        let docs = parse_documents(&text, default_ns).with_context(|| format!("loading {}", f.display()))?;
        debug!(file = %f.display(), count = docs.len(), "loaded manifests");
        out.extend(docs);
    }
    Ok(out)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml" | "json")) {
            out.push(path);
        }
    }
    Ok(())
}

/// Desired state from a directory of already-rendered manifests.
#[derive(Debug, Clone)]
pub struct ManifestDir {
    root: PathBuf,
    default_ns: Option<String>,
}

impl ManifestDir {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into(), default_ns: None } }

    pub fn with_default_namespace(mut self, ns: Option<String>) -> Self { self.default_ns = ns; self }
}

#[async_trait]
impl DesiredSource for ManifestDir {
    async fn fetch_desired(&self) -> Result<Vec<(ResourceIdentity, Document)>> {
        let root = self.root.clone();
        let ns = self.default_ns.clone();
        tokio::task::spawn_blocking(move || load_dir(&root, ns.as_deref())).await?
    }
}

/// Live state captured to disk, indexed by identity.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDir {
    objects: HashMap<ResourceIdentity, Document>,
}

impl SnapshotDir {
    pub fn load(root: &Path) -> Result<Self> {
        let mut objects = HashMap::new();
        for (id, doc) in load_dir(root, None)? {
            if objects.insert(id.clone(), doc).is_some() {
                warn!(resource = %id, "duplicate live snapshot; keeping the last one");
            }
        }
        Ok(Self { objects })
    }

    pub fn len(&self) -> usize { self.objects.len() }
    pub fn is_empty(&self) -> bool { self.objects.is_empty() }
}

#[async_trait]
impl LiveSource for SnapshotDir {
    async fn fetch_live(&self, id: &ResourceIdentity) -> Result<Option<Document>> {
        Ok(self.objects.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_document_yaml_with_lists() {
        let y = "\
apiVersion: v1
kind: ConfigMap
metadata:
  name: a
---
apiVersion: v1
kind: List
items:
  - apiVersion: apps/v1
    kind: Deployment
    metadata: { name: web, namespace: prod }
";
        let docs = parse_documents(y, Some("default")).unwrap();
        let ids: Vec<String> = docs.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, vec!["ConfigMap/default/a", "apps/Deployment/prod/web"]);
        assert_eq!(docs[0].1["metadata"]["namespace"], "default");
    }

    #[test]
    fn parse_errors_are_friendly() {
        let e1 = parse_documents("kind: Foo\nmetadata:\n  name: x\n", None).unwrap_err().to_string();
        assert!(e1.contains("missing apiVersion"), "e1={}", e1);
        let e2 = parse_documents("apiVersion: v1\nmetadata:\n  name: x\n", None).unwrap_err().to_string();
        assert!(e2.contains("missing kind"), "e2={}", e2);
        let e3 = parse_documents("apiVersion: v1\nkind: ConfigMap\nmetadata: {}\n", None).unwrap_err().to_string();
        assert!(e3.contains("missing metadata.name"), "e3={}", e3);
    }

    #[test]
    fn json_payloads_parse_too() {
        let docs = parse_documents(r#"{"apiVersion":"v1","kind":"Namespace","metadata":{"name":"prod"}}"#, Some("x")).unwrap();
        assert_eq!(docs[0].0.to_string(), "Namespace/prod");
    }

    #[test]
    fn node_budget_counts_nested_values() {
        let v = serde_json::json!({ "a": [1, 2, 3], "b": { "c": null } });
        assert!(!node_budget_exceeded(&v, 100));
        assert!(node_budget_exceeded(&v, 4));
    }
}
