//! Go performance and simplicity heuristics via golangci-lint.
//!
//! Runs a focused linter set with JSON output; each issue's source
//! linter drives the severity lookup.

use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};

use super::{effective_timeout, run_tool};

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 1];

/// Linters enabled when the caller does not choose their own set.
const DEFAULT_LINTERS: &[&str] = &["gocritic", "gosimple", "staticcheck", "prealloc"];

/// Severity per source linter; anything unlisted is low.
static LINTER_SEVERITY: phf::Map<&'static str, Severity> = phf::phf_map! {
    "staticcheck" => Severity::High,
    "gocritic" => Severity::Medium,
    "gosimple" => Severity::Low,
    "prealloc" => Severity::Medium,
};

pub struct GolangciLintAnalyzer {
    config: AnalyzerConfig,
    enabled_linters: Vec<String>,
}

impl GolangciLintAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_linters(config, DEFAULT_LINTERS.iter().map(|s| s.to_string()))
    }

    pub fn with_linters<I>(mut config: AnalyzerConfig, linters: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        if config.code_extensions.is_empty() {
            config.code_extensions.insert(".go".to_string());
        }
        Self {
            config,
            enabled_linters: linters.into_iter().collect(),
        }
    }
}

impl Analyzer for GolangciLintAnalyzer {
    fn key(&self) -> &'static str {
        "performance:golangci-lint"
    }

    fn category(&self) -> &'static str {
        "performance"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        let mut extra = BTreeMap::new();
        extra.insert(
            "linters".to_string(),
            serde_json::json!(self.enabled_linters),
        );

        AnalyzerMetadata {
            name: "GolangCI-Lint Performance Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Go performance analysis via golangci-lint".to_string(),
            category: "performance".to_string(),
            priority: "medium".to_string(),
            extra,
        }
    }

    fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn tool(&self) -> Option<ToolRequirement> {
        Some(ToolRequirement::new(
            "golangci-lint",
            "Install from https://golangci-lint.run/usage/install/",
        ))
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let target_str = target.to_string_lossy();
        let mut args: Vec<String> = vec![
            "run".to_string(),
            "--out-format".to_string(),
            "json".to_string(),
            "--disable-all".to_string(),
        ];
        args.extend(
            self.enabled_linters
                .iter()
                .map(|l| format!("--enable={}", l)),
        );
        args.push(target_str.to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let timeout = effective_timeout(self.config.timeout_seconds, DEFAULT_TIMEOUT_SECS);
        let output = run_tool(
            "golangci-lint",
            &arg_refs,
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
                tool: "golangci-lint".to_string(),
                message: e.to_string(),
            })?;

        Ok(convert_issues(&payload))
    }
}

fn convert_issues(payload: &serde_json::Value) -> Vec<Finding> {
    let issues = match payload["Issues"].as_array() {
        Some(issues) => issues,
        None => return Vec::new(),
    };

    let mut findings = Vec::new();
    for issue in issues {
        let linter = issue["FromLinter"].as_str().unwrap_or("golangci-lint");
        let pos = &issue["Pos"];
        let file_path = pos["Filename"].as_str().unwrap_or("unknown").to_string();
        let line_number = pos["Line"].as_u64().unwrap_or(1) as usize;
        let description = issue["Text"].as_str().unwrap_or(linter).to_string();
        let severity = LINTER_SEVERITY.get(linter).copied().unwrap_or(Severity::Low);

        let mut metadata = BTreeMap::new();
        metadata.insert("linter".to_string(), linter.to_string());
        metadata.insert("source".to_string(), "golangci-lint".to_string());

        findings.push(Finding {
            title: format!("GolangCI-Lint: {}", linter),
            description,
            severity,
            file_path,
            line_number,
            recommendation:
                "Address the lint finding to improve performance or simplicity.".to_string(),
            metadata,
        });
    }

    findings
}
