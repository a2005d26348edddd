//! Supply chain vulnerability scanning via osv-scanner.
//!
//! Walks the scanner's vulnerability graph (results → packages →
//! vulnerabilities) and resolves severity from the database-specific
//! label first, then the maximum CVSS score.

use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};

use super::{effective_timeout, run_tool};

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 1];

pub struct OsvScannerAnalyzer {
    config: AnalyzerConfig,
}

impl OsvScannerAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for OsvScannerAnalyzer {
    fn key(&self) -> &'static str {
        "security:osv"
    }

    fn category(&self) -> &'static str {
        "security"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        AnalyzerMetadata {
            name: "OSV Scanner Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Supply chain vulnerability scanning via osv-scanner".to_string(),
            category: "security".to_string(),
            priority: "high".to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn tool(&self) -> Option<ToolRequirement> {
        Some(ToolRequirement::new(
            "osv-scanner",
            "Install from https://google.github.io/osv-scanner/installation/",
        ))
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let target_str = target.to_string_lossy();
        let timeout = effective_timeout(self.config.timeout_seconds, DEFAULT_TIMEOUT_SECS);

        let output = run_tool(
            "osv-scanner",
            &["--format", "json", "--recursive", &target_str],
            None,
            timeout,
            Some(ACCEPTED_EXIT_CODES),
        )?;

        let raw = if output.stdout.trim().is_empty() {
            "{}"
        } else {
            &output.stdout
        };
        let payload: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| AnalyzerError::OutputParse {
                tool: "osv-scanner".to_string(),
                message: e.to_string(),
            })?;

        Ok(convert_results(&payload))
    }
}

fn convert_results(payload: &serde_json::Value) -> Vec<Finding> {
    let results = match payload["results"].as_array() {
        Some(r) => r,
        None => return Vec::new(),
    };

    let mut findings = Vec::new();
    for result in results {
        let source_path = result["source"]["path"].as_str().unwrap_or("unknown");
        let packages = match result["packages"].as_array() {
            Some(p) => p,
            None => continue,
        };

        for package_entry in packages {
            let pkg = &package_entry["package"];
            let pkg_name = pkg["name"].as_str().unwrap_or("unknown");
            let pkg_version = pkg["version"].as_str().unwrap_or("");
            let vulnerabilities = match package_entry["vulnerabilities"].as_array() {
                Some(v) => v,
                None => continue,
            };

            for vuln in vulnerabilities {
                let vuln_id = vuln["id"].as_str().unwrap_or("OSV");
                let summary = vuln["summary"]
                    .as_str()
                    .or_else(|| vuln["details"].as_str())
                    .unwrap_or(vuln_id)
                    .to_string();

                let mut metadata = BTreeMap::new();
                metadata.insert("package".to_string(), pkg_name.to_string());
                metadata.insert("version".to_string(), pkg_version.to_string());
                metadata.insert("vulnerability_id".to_string(), vuln_id.to_string());
                metadata.insert("source".to_string(), "osv-scanner".to_string());

                findings.push(Finding {
                    title: format!("OSV: {}", vuln_id),
                    description: summary,
                    severity: severity_from_vuln(vuln),
                    file_path: source_path.to_string(),
                    line_number: 1,
                    recommendation: "Upgrade to a fixed version of the dependency.".to_string(),
                    metadata,
                });
            }
        }
    }

    findings
}

/// Resolution order: database-specific label, then max CVSS score,
/// then medium when no score exists at all.
fn severity_from_vuln(vuln: &serde_json::Value) -> Severity {
    if let Some(severity) = database_severity(vuln) {
        return severity;
    }
    score_severity(vuln)
}

fn database_severity(vuln: &serde_json::Value) -> Option<Severity> {
    let label = vuln["database_specific"]["severity"].as_str()?;
    match label.to_uppercase().as_str() {
        "CRITICAL" | "HIGH" => Some(Severity::High),
        "MEDIUM" => Some(Severity::Medium),
        "LOW" => Some(Severity::Low),
        _ => None,
    }
}

fn score_severity(vuln: &serde_json::Value) -> Severity {
    let scores = collect_scores(vuln["severity"].as_array());
    match scores.iter().cloned().fold(None::<f64>, |max, s| {
        Some(max.map_or(s, |m| m.max(s)))
    }) {
        Some(score) if score >= 7.0 => Severity::High,
        Some(score) if score >= 4.0 => Severity::Medium,
        Some(_) => Severity::Low,
        None => Severity::Medium,
    }
}

/// Extract numeric scores from the severity array, skipping anything
/// non-numeric.
fn collect_scores(entries: Option<&Vec<serde_json::Value>>) -> Vec<f64> {
    let entries = match entries {
        Some(e) => e,
        None => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(|entry| {
            let score = &entry["score"];
            score
                .as_f64()
                .or_else(|| score.as_str().and_then(|s| s.parse().ok()))
        })
        .collect()
}
