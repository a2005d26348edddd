//! Cross-tool aggregation into a CodeClimate-style report.
//!
//! Consumes a directory of per-run result JSON files, fingerprints
//! every finding, and emits the deduplicated array. Fingerprints are
//! fully deterministic for identical inputs; file read order (sorted)
//! only decides which duplicate is kept, first seen wins.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// One aggregated report item, CodeClimate-compatible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeClimateItem {
    pub description: String,
    pub check_name: String,
    pub fingerprint: String,
    /// Second severity scale: blocker|critical|major|minor|info.
    pub severity: String,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub path: String,
    pub lines: Lines,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lines {
    pub begin: usize,
}

/// Map the finding scale onto the CodeClimate scale. Unknown values
/// land on "info" rather than being dropped.
fn codeclimate_severity(severity: &str) -> &'static str {
    match severity {
        "critical" => "blocker",
        "high" => "critical",
        "medium" => "major",
        "low" => "minor",
        "info" => "info",
        _ => "info",
    }
}

/// Stable fingerprint for one finding.
///
/// SHA-256 of `"<relative_path>|<line_number>|<check_name>|<title>"`;
/// this is the sole deduplication key.
pub fn fingerprint(relative_path: &str, line_number: usize, check_name: &str, title: &str) -> String {
    let input = format!("{}|{}|{}|{}", relative_path, line_number, check_name, title);
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Best-effort resolution against the working directory; the raw path
/// is kept when resolution fails.
fn repo_relative(path: &str, cwd: &Path) -> String {
    let p = Path::new(path);
    if p.is_absolute() {
        if let Ok(rel) = p.strip_prefix(cwd) {
            return rel.to_string_lossy().to_string();
        }
    }
    path.to_string()
}

/// Derive the check name for one result payload: analyzer metadata
/// name, else analyzer type, else the recorded script name.
fn source_name(payload: &serde_json::Value) -> String {
    let meta = &payload["metadata"];
    meta["name"]
        .as_str()
        .or_else(|| meta["analyzer_type"].as_str())
        .or_else(|| payload["script_name"].as_str())
        .unwrap_or("analyzer")
        .to_string()
}

fn convert_finding(
    check_name: &str,
    finding: &serde_json::Value,
    cwd: &Path,
) -> Option<CodeClimateItem> {
    let title = finding["title"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| finding["description"].as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Finding")
        .trim()
        .to_string();
    let description = finding["description"]
        .as_str()
        .unwrap_or(&title)
        .trim()
        .to_string();
    let file_path = finding["file_path"].as_str()?;
    if file_path.is_empty() {
        return None;
    }
    let line_number = finding["line_number"]
        .as_u64()
        .filter(|&n| n >= 1)
        .unwrap_or(1) as usize;
    let severity = finding["severity"]
        .as_str()
        .unwrap_or("info")
        .to_lowercase();

    let relative = repo_relative(file_path, cwd);
    let fp = fingerprint(&relative, line_number, check_name, &title);

    let rendered = if !description.is_empty() && description != title {
        format!("{}: {}", title, description)
    } else {
        title
    };

    Some(CodeClimateItem {
        description: rendered,
        check_name: check_name.to_string(),
        fingerprint: fp,
        severity: codeclimate_severity(&severity).to_string(),
        location: Location {
            path: relative,
            lines: Lines { begin: line_number },
        },
    })
}

/// Read every `*.json` result file under `root`, sorted by name.
/// Unreadable or non-object payloads are skipped.
fn load_result_files(root: &Path) -> Vec<serde_json::Value> {
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(root) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json")
            })
            .collect(),
        Err(_) => return Vec::new(),
    };
    paths.sort();

    paths
        .into_iter()
        .filter_map(|p| std::fs::read_to_string(p).ok())
        .filter_map(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .filter(|v| v.is_object())
        .collect()
}

/// Aggregate all result files under `root` into one deduplicated array.
///
/// Re-running over an unchanged directory yields an identical array.
pub fn convert_dir(root: &Path) -> Vec<CodeClimateItem> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    convert_dir_relative_to(root, &cwd)
}

/// [`convert_dir`] with an explicit working directory for path
/// resolution.
pub fn convert_dir_relative_to(root: &Path, cwd: &Path) -> Vec<CodeClimateItem> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for payload in load_result_files(root) {
        let check_name = source_name(&payload);
        let findings = match payload["findings"].as_array() {
            Some(f) => f,
            None => continue,
        };
        for finding in findings {
            let item = match convert_finding(&check_name, finding, cwd) {
                Some(i) => i,
                None => continue,
            };
            if !seen.insert(item.fingerprint.clone()) {
                continue;
            }
            out.push(item);
        }
    }

    out
}
