//! Remove live fields the desired document does not declare.

use drift_core::Document;
use serde_json::{Map, Value as Json};

/// Prune `live` down to the shape of `desired`.
///
/// Mappings keep only keys present on both sides; a null live value is kept as-is
/// without recursing. Sequences keep live's length: indices past the end of desired
/// are copied verbatim so extra live elements still show up in the diff. Any other
/// pairing (scalars, type mismatch) returns live unchanged and leaves the verdict to
/// the equality step.
pub fn prune(desired: &Document, live: &Document) -> Document {
    match (desired, live) {
        (Json::Object(d), Json::Object(l)) => {
            let mut out = Map::new();
            for (k, dv) in d.iter() {
                if let Some(lv) = l.get(k) {
                    out.insert(k.clone(), prune_value(dv, lv));
                }
            }
            Json::Object(out)
        }
        (Json::Array(d), Json::Array(l)) => Json::Array(
            l.iter()
                .enumerate()
                .map(|(i, lv)| match d.get(i) {
                    Some(dv) => prune_value(dv, lv),
                    None => lv.clone(),
                })
                .collect(),
        ),
        _ => live.clone(),
    }
}

fn prune_value(desired: &Json, live: &Json) -> Json {
    if live.is_null() { Json::Null } else { prune(desired, live) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_documents_prune_to_live() {
        let doc = json!({ "a": 1, "b": { "c": [1, { "d": "x" }] }, "e": null });
        assert_eq!(prune(&doc, &doc), doc);
    }

    #[test]
    fn extra_live_list_elements_are_kept() {
        let desired = json!([{ "name": "a" }]);
        let live = json!([{ "name": "a", "image": "x" }, { "name": "b" }]);
        assert_eq!(prune(&desired, &live), json!([{ "name": "a" }, { "name": "b" }]));
    }

    #[test]
    fn desired_only_keys_are_dropped_not_nulled() {
        let pruned = prune(&json!({ "x": 1, "y": 2 }), &json!({ "x": 1 }));
        assert_eq!(pruned, json!({ "x": 1 }));
        assert!(pruned.get("y").is_none());
    }

    #[test]
    fn null_live_value_short_circuits() {
        assert_eq!(prune(&json!({ "x": { "a": 1 } }), &json!({ "x": null })), json!({ "x": null }));
    }

    #[test]
    fn server_populated_fields_disappear() {
        let desired = json!({ "metadata": { "name": "web" }, "spec": { "replicas": 2 } });
        let live = json!({
            "metadata": { "name": "web", "uid": "123", "resourceVersion": "9" },
            "spec": { "replicas": 2, "revisionHistoryLimit": 10 },
            "status": { "readyReplicas": 2 }
        });
        assert_eq!(prune(&desired, &live), desired);
    }

    #[test]
    fn type_mismatch_returns_live() {
        assert_eq!(prune(&json!({ "a": 1 }), &json!("scalar")), json!("scalar"));
        assert_eq!(prune(&json!([1]), &json!({ "a": 1 })), json!({ "a": 1 }));
        assert_eq!(prune(&json!("x"), &json!({ "a": 1 })), json!({ "a": 1 }));
    }

    #[test]
    fn shorter_live_list_stays_short() {
        assert_eq!(prune(&json!([1, 2, 3]), &json!([1])), json!([1]));
    }
}
