//! CLI output: rendering of decisions and lint reports, error mapping.

use crate::error::PolicyError;
use crate::filters::FilterList;
use crate::types::{Decision, ElemHideStatus};
use serde_json::json;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &PolicyError) -> String {
    e.to_string()
}

pub fn format_decision(decision: &Decision) -> Result<String, PolicyError> {
    Ok(serde_json::to_string_pretty(decision)?)
}

pub fn format_elemhide_status(status: &ElemHideStatus) -> Result<String, PolicyError> {
    Ok(serde_json::to_string_pretty(status)?)
}

/// Filter counts per kind followed by every invalid line and its reason.
pub fn format_lint_report(list: &FilterList, as_json: bool) -> Result<String, PolicyError> {
    let counts = list.counts_by_kind();
    let invalid = list.invalid();

    if as_json {
        let invalid: Vec<_> = invalid
            .iter()
            .map(|(text, reason)| json!({ "text": text, "reason": reason }))
            .collect();
        let report = json!({
            "total": list.len(),
            "counts": counts,
            "invalid": invalid,
        });
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = format!("{} filters\n", list.len());
    for (kind, count) in &counts {
        out.push_str(&format!("  {:<10} {}\n", kind, count));
    }
    if !invalid.is_empty() {
        out.push_str(&format!("\n{} invalid:\n", invalid.len()));
        for (text, reason) in &invalid {
            out.push_str(&format!("  {}  ({})\n", text, reason));
        }
    }
    Ok(out.trim_end().to_string())
}
