//! Rust performance hints via `cargo clippy`.
//!
//! Runs `cargo clippy --message-format=json` from the nearest directory
//! containing a `Cargo.toml` and maps `clippy::` lints into the
//! normalized finding schema.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};

use super::{effective_timeout, run_tool};

const DEFAULT_TIMEOUT_SECS: u64 = 900;
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 1];

pub struct ClippyAnalyzer {
    config: AnalyzerConfig,
}

impl ClippyAnalyzer {
    pub fn new(mut config: AnalyzerConfig) -> Self {
        if config.code_extensions.is_empty() {
            config.code_extensions.insert(".rs".to_string());
        }
        Self { config }
    }

    /// Walk `target` and its parents for the nearest `Cargo.toml`.
    fn find_cargo_root(target: &Path) -> Option<PathBuf> {
        let start = if target.is_file() {
            target.parent()?
        } else {
            target
        };

        for dir in start.ancestors() {
            if dir.join("Cargo.toml").is_file() {
                return Some(dir.to_path_buf());
            }
        }
        None
    }
}

impl Analyzer for ClippyAnalyzer {
    fn key(&self) -> &'static str {
        "performance:clippy"
    }

    fn category(&self) -> &'static str {
        "performance"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        AnalyzerMetadata {
            name: "Clippy Performance Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Rust performance analysis via Clippy".to_string(),
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
            "cargo",
            "Install the Rust toolchain from https://rustup.rs/",
        ))
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let cargo_root = Self::find_cargo_root(target).ok_or_else(|| {
            AnalyzerError::MissingManifest("Cargo.toml not found for target path".to_string())
        })?;

        let timeout = effective_timeout(self.config.timeout_seconds, DEFAULT_TIMEOUT_SECS);
        let output = run_tool(
            "cargo",
            &["clippy", "--message-format=json"],
            Some(cargo_root.as_path()),
            timeout,
            Some(ACCEPTED_EXIT_CODES),
        )?;

        Ok(parse_clippy_output(&output.stdout))
    }
}

/// Parse line-delimited compiler JSON. Each line is an independent
/// object; non-JSON lines and non-clippy diagnostics are skipped.
fn parse_clippy_output(output: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if message["reason"].as_str() != Some("compiler-message") {
            continue;
        }

        let diagnostic = &message["message"];
        let lint_code = diagnostic["code"]["code"].as_str().unwrap_or("");
        if !lint_code.starts_with("clippy::") {
            continue;
        }

        let severity = match diagnostic["level"].as_str().unwrap_or("warning") {
            "error" => Severity::High,
            "warning" => Severity::Medium,
            "note" => Severity::Low,
            _ => Severity::Low,
        };

        let span = select_primary_span(diagnostic["spans"].as_array());
        let file_path = span
            .and_then(|s| s["file_name"].as_str())
            .unwrap_or("unknown")
            .to_string();
        let line_number = span
            .and_then(|s| s["line_start"].as_u64())
            .unwrap_or(1) as usize;
        let description = diagnostic["message"]
            .as_str()
            .unwrap_or(lint_code)
            .to_string();

        let mut metadata = BTreeMap::new();
        metadata.insert("lint".to_string(), lint_code.to_string());
        metadata.insert("source".to_string(), "clippy".to_string());

        findings.push(Finding {
            title: format!("Clippy: {}", lint_code),
            description,
            severity,
            file_path,
            line_number,
            recommendation: "Address the Clippy performance lint.".to_string(),
            metadata,
        });
    }

    findings
}

/// The `is_primary` span, or the first span, or nothing.
fn select_primary_span(spans: Option<&Vec<serde_json::Value>>) -> Option<&serde_json::Value> {
    let spans = spans?;
    spans
        .iter()
        .find(|s| s["is_primary"].as_bool() == Some(true))
        .or_else(|| spans.first())
}
