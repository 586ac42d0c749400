//! Human and JSON renderings of command results.

use facesync_core::{ExtractReport, Plan};
use std::fmt::Write;

pub fn status(plan: &Plan, json: bool) -> String {
    if json {
        return serde_json::json!({
            "store_entries": plan.store.len(),
            "known": plan.known_names.len(),
            "dataset": plan.identities.len(),
            "remaining": &plan.remaining,
        })
        .to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "store:     {} entries, {} identities",
        plan.store.len(),
        plan.known_names.len()
    );
    let _ = writeln!(out, "dataset:   {} identities", plan.identities.len());
    let _ = write!(out, "remaining: {}", plan.remaining.len());
    for name in &plan.remaining {
        let _ = write!(out, "\n  {name}");
    }
    out
}

/// What an extract run would embed, without touching the model or the store.
pub fn dry_run(names: &[&str], rebuild: bool, json: bool) -> String {
    if json {
        return serde_json::json!({
            "dry_run": true,
            "rebuild": rebuild,
            "identities": names,
        })
        .to_string();
    }
    if names.is_empty() {
        return "Store is up to date; nothing to embed".to_string();
    }

    let verb = if rebuild { "Would rebuild from" } else { "Would embed" };
    let mut out = format!("{verb} {} identities:", names.len());
    for name in names {
        let _ = write!(out, "\n  {name}");
    }
    out
}

pub fn extract(report: &ExtractReport, json: bool) -> String {
    if json {
        return serde_json::to_string(report).unwrap_or_else(|e| {
            serde_json::json!({ "error": e.to_string() }).to_string()
        });
    }
    if report.images == 0 {
        return "Store is up to date; nothing to embed".to_string();
    }

    let verb = if report.rebuild { "Rebuilt store from" } else { "Embedded" };
    format!(
        "{verb} {} images for {} identities ({} store entries)",
        report.images,
        report.identities.len(),
        report.store_entries
    )
}
