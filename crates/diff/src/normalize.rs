//! Field rules applied to both sides before pruning, so the comparison does not
//! report differences the API server introduces on its own.

use base64::Engine as _;
use drift_core::Document;
use serde_json::{Map, Value as Json};

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

/// Return a normalized copy of `doc`. Non-mapping documents come back unchanged.
pub fn normalize(doc: &Document) -> Document {
    let mut out = doc.clone();
    if !out.is_object() { return out; }

    // Exported manifests sometimes carry `creationTimestamp: null`.
    if let Some(meta) = out.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        meta.remove("creationTimestamp");
    }

    let (group, kind) = group_kind(&out);
    match (group.as_str(), kind.as_str()) {
        ("", "Secret") => normalize_secret(&mut out),
        (RBAC_GROUP, "Role") | (RBAC_GROUP, "ClusterRole") => normalize_role(&mut out),
        _ => {}
    }
    out
}

fn group_kind(doc: &Json) -> (String, String) {
    let api_version = doc.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
    let group = api_version.split_once('/').map(|(g, _)| g).unwrap_or("");
    let kind = doc.get("kind").and_then(|v| v.as_str()).unwrap_or("");
    (group.to_string(), kind.to_string())
}

/// Fold `stringData` into `data` (base64) and turn null data values into empty strings.
pub(crate) fn normalize_secret(doc: &mut Json) {
    let Some(obj) = doc.as_object_mut() else { return };
    let string_data = match obj.get("stringData") {
        Some(Json::Object(sd)) => Some(sd.clone()),
        _ => None,
    };
    if let Some(Json::Object(data)) = obj.get_mut("data") {
        for v in data.values_mut() {
            if v.is_null() { *v = Json::String(String::new()); }
        }
    }
    let Some(sd) = string_data else { return };
    if sd.is_empty() { return; }
    let data = obj.entry("data").or_insert_with(|| Json::Object(Map::new()));
    if data.is_null() { *data = Json::Object(Map::new()); }
    // Non-mapping `data`: both fields stay as declared.
    let Some(data) = data.as_object_mut() else { return };
    for (k, v) in sd {
        let v = match v {
            Json::String(s) => Json::String(base64::engine::general_purpose::STANDARD.encode(s)),
            // Non-string values pass through unencoded.
            other => other,
        };
        data.insert(k, v);
    }
    obj.remove("stringData");
}

fn normalize_role(doc: &mut Json) {
    if let Some(rules) = doc.get_mut("rules") {
        if rules.as_array().is_some_and(|r| r.is_empty()) { *rules = Json::Null; }
    }
}
