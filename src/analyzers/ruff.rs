//! Python performance anti-patterns via Ruff.
//!
//! The alphabetic prefix of each rule code (PERF, C4, B, ...) selects
//! severity and a prefix-specific recommendation.

use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};

use super::{effective_timeout, run_tool};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub struct RuffAnalyzer {
    config: AnalyzerConfig,
}

impl RuffAnalyzer {
    pub fn new(mut config: AnalyzerConfig) -> Self {
        if config.code_extensions.is_empty() {
            config.code_extensions.insert(".py".to_string());
            config.code_extensions.insert(".pyi".to_string());
        }
        Self { config }
    }
}

impl Analyzer for RuffAnalyzer {
    fn key(&self) -> &'static str {
        "performance:ruff"
    }

    fn category(&self) -> &'static str {
        "performance"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        AnalyzerMetadata {
            name: "Ruff Performance Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Python performance analysis via Ruff (PERF/C4/B)".to_string(),
            category: "performance".to_string(),
            priority: "medium".to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn tool(&self) -> Option<ToolRequirement> {
        Some(ToolRequirement::new(
            "ruff",
            "Install it with `pip install ruff`.",
        ))
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let target_str = target.to_string_lossy();
        let timeout = effective_timeout(self.config.timeout_seconds, DEFAULT_TIMEOUT_SECS);

        // Ruff exits non-zero when findings exist; the exit code is not
        // classified - stdout decides.
        let output = run_tool(
            "ruff",
            &["check", "--output-format", "json", &target_str],
            None,
            timeout,
            None,
        )?;

        let raw = output.stdout.trim();
        if raw.is_empty() {
            if output.exit_code != 0 {
                return Err(AnalyzerError::ToolExecutionFailed {
                    tool: "ruff".to_string(),
                    code: output.exit_code,
                });
            }
            return Ok(Vec::new());
        }

        let items: Vec<serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| AnalyzerError::OutputParse {
                tool: "ruff".to_string(),
                message: e.to_string(),
            })?;

        Ok(items.iter().map(convert_item).collect())
    }
}

fn convert_item(item: &serde_json::Value) -> Finding {
    let code = item["code"].as_str().unwrap_or("");
    let prefix: String = code.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    let severity = match prefix.as_str() {
        "PERF" => Severity::High,
        "C" | "C4" => Severity::Medium,
        "B" => Severity::Medium,
        _ => Severity::Low,
    };
    let file_path = item["filename"].as_str().unwrap_or("unknown").to_string();
    let line_number = item["location"]["row"].as_u64().unwrap_or(1) as usize;
    let description = item["message"].as_str().unwrap_or(code).to_string();

    let mut metadata = BTreeMap::new();
    metadata.insert("ruff_code".to_string(), code.to_string());

    Finding {
        title: format!("Ruff {}", code),
        description,
        severity,
        file_path,
        line_number,
        recommendation: recommendation_for(code),
        metadata,
    }
}

fn recommendation_for(code: &str) -> String {
    if code.starts_with("PERF") {
        "Refactor to remove performance anti-pattern (PERF rule).".to_string()
    } else if code.starts_with("C4") {
        "Use comprehensions/literals appropriately to reduce overhead.".to_string()
    } else if code.starts_with('B') {
        "Address bugbear issue; consider performance implications.".to_string()
    } else {
        "Review and optimize the highlighted code path.".to_string()
    }
}
