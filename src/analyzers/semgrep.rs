//! Multi-language performance heuristics via Semgrep.
//!
//! Runs Semgrep with a curated rule config (registry performance rules
//! by default); Semgrep owns language detection.

use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};

use super::{effective_timeout, run_tool};

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CONFIG_REF: &str = "r/performance";

/// Per-rule timeout passed through to Semgrep itself.
const SEMGREP_RULE_TIMEOUT: &str = "120";

pub struct SemgrepAnalyzer {
    config: AnalyzerConfig,
    config_ref: String,
}

impl SemgrepAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_config_ref(config, DEFAULT_CONFIG_REF)
    }

    pub fn with_config_ref(config: AnalyzerConfig, config_ref: impl Into<String>) -> Self {
        Self {
            config,
            config_ref: config_ref.into(),
        }
    }
}

impl Analyzer for SemgrepAnalyzer {
    fn key(&self) -> &'static str {
        "performance:semgrep"
    }

    fn category(&self) -> &'static str {
        "performance"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        let mut extra = BTreeMap::new();
        extra.insert("config".to_string(), serde_json::json!(self.config_ref));

        AnalyzerMetadata {
            name: "Semgrep Performance Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Multi-language performance/best-practice heuristics via Semgrep"
                .to_string(),
            category: "performance".to_string(),
            priority: "low".to_string(),
            extra,
        }
    }

    fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn tool(&self) -> Option<ToolRequirement> {
        Some(ToolRequirement::new(
            "semgrep",
            "Install it with `pip install semgrep`.",
        ))
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let target_str = target.to_string_lossy();
        let timeout = effective_timeout(self.config.timeout_seconds, DEFAULT_TIMEOUT_SECS);

        // Non-zero exit is tolerated when stdout still parses (1 means
        // findings exist).
        let output = run_tool(
            "semgrep",
            &[
                "--json",
                "--timeout",
                SEMGREP_RULE_TIMEOUT,
                "--config",
                &self.config_ref,
                &target_str,
            ],
            None,
            timeout,
            None,
        )?;

        let raw = output.stdout.trim();
        if raw.is_empty() {
            if output.exit_code != 0 {
                return Err(AnalyzerError::ToolExecutionFailed {
                    tool: "semgrep".to_string(),
                    code: output.exit_code,
                });
            }
            return Ok(Vec::new());
        }

        let payload: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| AnalyzerError::OutputParse {
                tool: "semgrep".to_string(),
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
        let check_id = result["check_id"].as_str().unwrap_or("semgrep");
        let file_path = result["path"].as_str().unwrap_or("unknown").to_string();
        let line_number = result["start"]["line"].as_u64().unwrap_or(1) as usize;
        let extra = &result["extra"];
        let description = extra["message"].as_str().unwrap_or(check_id).to_string();
        let raw_severity = extra["severity"]
            .as_str()
            .unwrap_or("INFO")
            .to_lowercase();
        let severity = match raw_severity.as_str() {
            "info" => Severity::Info,
            "warning" => Severity::Medium,
            "error" => Severity::High,
            _ => Severity::Low,
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("tool".to_string(), "semgrep".to_string());
        metadata.insert("check_id".to_string(), check_id.to_string());

        findings.push(Finding {
            title: format!("Semgrep: {}", check_id),
            description,
            severity,
            file_path,
            line_number,
            recommendation: "Review and optimize per rule guidance.".to_string(),
            metadata,
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(check_id: &str, severity: &str, line: u64) -> serde_json::Value {
        serde_json::json!({
            "check_id": check_id,
            "path": "src/app.js",
            "start": {"line": line},
            "extra": {"message": "matched", "severity": severity},
        })
    }

    #[test]
    fn test_severity_mapping() {
        let payload = serde_json::json!({
            "results": [
                result("r.info", "INFO", 1),
                result("r.warn", "WARNING", 2),
                result("r.err", "ERROR", 3),
                result("r.other", "EXPERIMENTAL", 4),
            ]
        });
        let severities: Vec<Severity> = convert_results(&payload)
            .iter()
            .map(|f| f.severity)
            .collect();
        assert_eq!(
            severities,
            vec![Severity::Info, Severity::Medium, Severity::High, Severity::Low]
        );
    }

    #[test]
    fn test_location_and_metadata() {
        let payload = serde_json::json!({"results": [result("perf.no-loop-copy", "WARNING", 12)]});
        let findings = convert_results(&payload);
        assert_eq!(findings[0].title, "Semgrep: perf.no-loop-copy");
        assert_eq!(findings[0].line_number, 12);
        assert_eq!(findings[0].metadata["check_id"], "perf.no-loop-copy");
    }

    #[test]
    fn test_empty_payload() {
        assert!(convert_results(&serde_json::json!({})).is_empty());
        assert!(convert_results(&serde_json::json!({"results": []})).is_empty());
    }
}
