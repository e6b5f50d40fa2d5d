use std::collections::{BTreeSet, HashMap};

use drift_core::Document;
use serde_json::Value as Json;

/// Mask Secret `data` values on both sides for display.
///
/// Each distinct value of a key becomes a run of `+` (8 for the first value seen, 4 more
/// for every further distinct value), so equal values still look equal and changed
/// values still look changed. Non-Secret documents are returned as-is.
pub fn hide_secret_data(desired: &Document, live: &Document) -> (Document, Document) {
    let mut out = [desired.clone(), live.clone()];
    if !out.iter().any(is_secret) { return (desired.clone(), live.clone()); }
    for doc in out.iter_mut() {
        if is_secret(doc) { crate::normalize::normalize_secret(doc); }
    }

    let keys: BTreeSet<String> = out
        .iter()
        .filter_map(|d| d.get("data").and_then(|v| v.as_object()))
        .flat_map(|m| m.keys().cloned())
        .collect();

    for key in keys {
        let mut next = "++++++++".to_string();
        let mut seen: HashMap<String, String> = HashMap::new();
        for doc in out.iter_mut() {
            let Some(v) = doc.get_mut("data").and_then(|d| d.as_object_mut()).and_then(|m| m.get_mut(&key)) else { continue };
            let raw = match &*v { Json::String(s) => s.clone(), Json::Null => String::new(), other => other.to_string() };
            let masked = seen.entry(raw).or_insert_with(|| {
                let m = next.clone();
                next.push_str("++++");
                m
            });
            *v = Json::String(masked.clone());
        }
    }
    let [d, l] = out;
    (d, l)
}

fn is_secret(doc: &Json) -> bool {
    doc.get("kind").and_then(|v| v.as_str()) == Some("Secret")
        && doc.get("apiVersion").and_then(|v| v.as_str()).is_some_and(|av| !av.contains('/'))
}
