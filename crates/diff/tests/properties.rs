use drift_core::ResourceIdentity;
use drift_diff::{compute, diff_summary, prune};
use serde_json::json;

fn cm(name: &str) -> ResourceIdentity { ResourceIdentity::new("", "ConfigMap", "default", name) }

#[test]
fn prune_is_identity_on_matching_documents() {
    let docs = [
        json!({ "apiVersion": "v1", "kind": "ConfigMap", "data": { "a": "1" } }),
        json!([1, "two", { "three": [3] }]),
        json!("scalar"),
        json!(null),
    ];
    for d in docs.iter() {
        assert_eq!(&prune(d, d), d);
        assert!(compute(&cm("x"), d, Some(d)).in_sync, "doc {}", d);
    }
}

#[test]
fn extra_container_surfaces_as_drift() {
    let desired = json!({
        "spec": { "containers": [ { "name": "app", "image": "app:1" } ] }
    });
    let live = json!({
        "spec": { "containers": [
            { "name": "app", "image": "app:1", "imagePullPolicy": "IfNotPresent" },
            { "name": "sidecar", "image": "proxy:2" }
        ] }
    });
    let v = compute(&cm("pod"), &desired, Some(&live));
    assert!(!v.in_sync);
    assert_eq!(v.normalized_live["spec"]["containers"][1], json!({ "name": "sidecar", "image": "proxy:2" }));
    let s = diff_summary(&desired, &v.normalized_live);
    assert_eq!(s.removes, 1);
}

#[test]
fn reordered_list_is_positional_drift() {
    let desired = json!({ "args": ["--a", "--b"] });
    let live = json!({ "args": ["--b", "--a"] });
    assert!(!compute(&cm("args"), &desired, Some(&live)).in_sync);
}

#[test]
fn desired_field_missing_live_is_drift() {
    let desired = json!({ "data": { "a": "1", "b": "2" } });
    let live = json!({ "data": { "a": "1" } });
    let v = compute(&cm("partial"), &desired, Some(&live));
    assert!(!v.in_sync);
    assert_eq!(v.normalized_live, live);
    assert_eq!(diff_summary(&desired, &v.normalized_live).adds, 1);
}
