use serde_json::{Number, Value as Json};

/// Structural equality used for the in-sync verdict.
///
/// Mapping key order is irrelevant and numbers compare by logical value (`1 == 1.0`).
/// Everything else is strict: `"1"` and `1` differ, as do `null` and a missing key.
pub fn docs_equal(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Object(ao), Json::Object(bo)) => {
            ao.len() == bo.len() && ao.iter().all(|(k, av)| bo.get(k).is_some_and(|bv| docs_equal(av, bv)))
        }
        (Json::Array(aa), Json::Array(ba)) => aa.len() == ba.len() && aa.iter().zip(ba).all(|(x, y)| docs_equal(x, y)),
        (Json::Number(an), Json::Number(bn)) => numbers_equal(an, bn),
        _ => a == b,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) { return x == y; }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) { return x == y; }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
