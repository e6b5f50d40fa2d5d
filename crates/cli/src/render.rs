//! Human-readable output for verdicts and plans.

use std::fmt::Write as _;

use anyhow::Result;
use drift_core::{DiffVerdict, Document, SyncPlan};
use drift_diff::{diff_summary, display_pair};

pub fn verdict_line(desired: &Document, v: &DiffVerdict) -> String {
    let status = if v.in_sync { "Synced" } else if v.normalized_live.is_null() { "Missing" } else { "OutOfSync" };
    let s = diff_summary(&drift_diff::normalize(desired), &v.normalized_live);
    if v.in_sync {
        format!("{:<10} {}", status, v.id)
    } else {
        format!("{:<10} {}  (+{} ~{} -{})", status, v.id, s.adds, s.updates, s.removes)
    }
}

/// Unified diff from normalized live to desired, Secret values masked.
pub fn unified_patch(desired: &Document, v: &DiffVerdict) -> Result<String> {
    let (d, l) = display_pair(desired, v);
    let live_yaml = if l.is_null() { String::new() } else { serde_yaml::to_string(&l)? };
    let desired_yaml = serde_yaml::to_string(&d)?;
    let diff = similar::TextDiff::from_lines(&live_yaml, &desired_yaml);
    Ok(diff.unified_diff().context_radius(3).header("live", "desired").to_string())
}

pub fn plan_table(plan: &SyncPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<9} {:>5}  RESOURCE", "STAGE", "PHASE", "WAVE");
    for (i, stage) in plan.stages.iter().enumerate() {
        for e in stage.entries.iter() {
            let mut flags = Vec::new();
            if e.hook { flags.push("hook"); }
            if e.in_sync { flags.push("in-sync"); }
            let flags = if flags.is_empty() { String::new() } else { format!("  [{}]", flags.join(",")) };
            let _ = writeln!(out, "{:<6} {:<9} {:>5}  {}{}", i + 1, stage.phase, stage.wave, e.id, flags);
        }
    }
    for id in plan.skipped.iter() {
        let _ = writeln!(out, "{:<6} {:<9} {:>5}  {}", "-", "Skip", "-", id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{HookPhase, ResourceIdentity, StageEntry, SyncStage};
    use serde_json::json;

    #[test]
    fn verdict_line_shows_counts() {
        let id = ResourceIdentity::new("", "ConfigMap", "ns", "a");
        let desired = json!({ "data": { "k": "new", "extra": "1" } });
        let v = drift_diff::compute(&id, &desired, Some(&json!({ "data": { "k": "old" } })));
        assert_eq!(verdict_line(&desired, &v), "OutOfSync  ConfigMap/ns/a  (+1 ~1 -0)");
        let missing = drift_diff::compute(&id, &desired, None);
        assert!(verdict_line(&desired, &missing).starts_with("Missing"));
    }

    #[test]
    fn patch_has_headers_and_changes() {
        let id = ResourceIdentity::new("", "ConfigMap", "ns", "a");
        let desired = json!({ "data": { "k": "new" } });
        let v = drift_diff::compute(&id, &desired, Some(&json!({ "data": { "k": "old" } })));
        let p = unified_patch(&desired, &v).unwrap();
        assert!(p.contains("--- live") && p.contains("+++ desired"), "{p}");
        assert!(p.contains("-  k: old") && p.contains("+  k: new"), "{p}");
    }

    #[test]
    fn plan_table_lists_stages_in_order() {
        let entry = |name: &str, hook| StageEntry { id: ResourceIdentity::new("", "Job", "ns", name), in_sync: false, hook, delete_policies: Default::default() };
        let plan = SyncPlan {
            stages: vec![
                SyncStage { phase: HookPhase::PreSync, wave: 0, entries: vec![entry("migrate", true)] },
                SyncStage { phase: HookPhase::Sync, wave: 2, entries: vec![entry("app", false)] },
            ],
            skipped: vec![ResourceIdentity::new("", "Job", "ns", "manual")],
        };
        let t = plan_table(&plan);
        let lines: Vec<&str> = t.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("PreSync") && lines[1].contains("Job/ns/migrate") && lines[1].ends_with("[hook]"));
        assert!(lines[2].contains("Sync") && lines[2].contains("    2"));
        assert!(lines[3].contains("Skip") && lines[3].contains("manual"));
    }
}
