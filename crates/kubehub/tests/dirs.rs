use drift_core::{DesiredSource, LiveSource, ResourceIdentity};
use drift_kubehub::{ManifestDir, SnapshotDir};

fn write(dir: &std::path::Path, rel: &str, body: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() { std::fs::create_dir_all(parent).unwrap(); }
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn manifest_dir_loads_nested_files_in_path_order() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "b/deploy.yaml", "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n");
    write(tmp.path(), "a.yml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n---\napiVersion: v1\nkind: Namespace\nmetadata:\n  name: shop\n");
    write(tmp.path(), "notes.txt", "not a manifest");

    let src = ManifestDir::new(tmp.path()).with_default_namespace(Some("shop".into()));
    let docs = src.fetch_desired().await.unwrap();
    let ids: Vec<String> = docs.iter().map(|(id, _)| id.to_string()).collect();
    assert_eq!(ids, vec!["ConfigMap/shop/cfg", "Namespace/shop", "apps/Deployment/shop/web"]);
}

#[tokio::test]
async fn manifest_dir_reports_the_bad_file() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "broken.yaml", "kind: ConfigMap\nmetadata:\n  name: x\n");
    let err = ManifestDir::new(tmp.path()).fetch_desired().await.unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("broken.yaml") && msg.contains("missing apiVersion"), "{msg}");
}

#[tokio::test]
async fn snapshot_dir_answers_by_identity() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "live.yaml", "\
apiVersion: v1
kind: ConfigMapList
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata: { name: cfg, namespace: shop, uid: abc }
    data: { k: v }
");
    let snap = SnapshotDir::load(tmp.path()).unwrap();
    assert_eq!(snap.len(), 1);
    let hit = snap.fetch_live(&ResourceIdentity::new("", "ConfigMap", "shop", "cfg")).await.unwrap();
    assert_eq!(hit.unwrap()["data"]["k"], "v");
    let miss = snap.fetch_live(&ResourceIdentity::new("", "ConfigMap", "shop", "other")).await.unwrap();
    assert!(miss.is_none());
}
