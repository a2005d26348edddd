//! Core types shared by every analyzer and by the aggregation step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Severity levels for findings, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

impl Severity {
    /// All severities, least severe first.
    pub fn all() -> [Severity; 5] {
        [
            Severity::Info,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
    }
}

/// One normalized issue reported by an analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Human summary, usually "Tool: code".
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Tool-native or repo-relative path; "unknown" when the tool
    /// cannot attribute a location.
    pub file_path: String,
    /// 1-based; defaults to 1 when the tool gives no location.
    pub line_number: usize,
    /// Static per-rule-family advice, not tool output.
    pub recommendation: String,
    /// Tool name, rule code, raw severity, package/version. Opaque to
    /// the aggregator.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Output format for CLI reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

/// Immutable configuration passed to every adapter.
///
/// One instance is shared read-only by one adapter per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default = "default_target_path")]
    pub target_path: PathBuf,
    /// File extensions (with leading dot) counted by `scan_directory`.
    #[serde(default)]
    pub code_extensions: BTreeSet<String>,
    /// Subprocess timeout; adapter-specific default when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Cap on files counted per run; unbounded when unset.
    #[serde(default)]
    pub max_files: Option<usize>,
    /// Findings below this severity are dropped by the lifecycle driver.
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_target_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            target_path: default_target_path(),
            code_extensions: BTreeSet::new(),
            timeout_seconds: None,
            max_files: None,
            min_severity: Severity::Info,
            output_format: OutputFormat::Pretty,
        }
    }
}

impl AnalyzerConfig {
    /// Config with the given code extensions (e.g. `[".rs"]`).
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code_extensions: extensions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AnalyzerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Static metadata describing an analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    /// Adapter-specific entries (rule lists, enabled linters, config ref).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Result of one adapter invocation.
///
/// Created empty by the lifecycle driver, populated exactly once by
/// the adapter body, finalized by `complete_analysis`. Downstream
/// consumers treat a finalized result as immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analyzer_category: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub target_path: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Derived at completion.
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub files_processed: usize,
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Count of findings per severity, computed at completion.
    #[serde(default)]
    pub summary: BTreeMap<Severity, usize>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AnalysisResult {
    /// Allocate an empty result for an analysis that just started.
    pub fn new(category: &str, target_path: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            analyzer_category: category.to_string(),
            success: true,
            error_message: None,
            target_path: target_path.to_string(),
            started_at,
            completed_at: None,
            duration_seconds: 0.0,
            files_processed: 0,
            findings: Vec::new(),
            summary: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Record a failure. The result still completes normally.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.success = false;
        self.error_message = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_roundtrip() {
        for sev in Severity::all() {
            let parsed: Severity = sev.to_string().parse().unwrap();
            assert_eq!(parsed, sev);
        }
        assert!("blocker".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_serde_lowercase() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"high\"");
        let back: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(back, Severity::Critical);
    }

    #[test]
    fn test_config_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.target_path, PathBuf::from("."));
        assert_eq!(config.min_severity, Severity::Info);
        assert!(config.timeout_seconds.is_none());
        assert!(config.max_files.is_none());
    }

    #[test]
    fn test_config_parse_yaml() {
        let yaml = r#"
target_path: src
code_extensions: [".rs", ".go"]
timeout_seconds: 120
min_severity: medium
output_format: json
"#;
        let config: AnalyzerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.target_path, PathBuf::from("src"));
        assert!(config.code_extensions.contains(".rs"));
        assert_eq!(config.timeout_seconds, Some(120));
        assert_eq!(config.min_severity, Severity::Medium);
        assert_eq!(config.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_result_serializes_findings() {
        let mut result = AnalysisResult::new("performance", "src", Utc::now());
        result.findings.push(Finding {
            title: "Ruff PERF401".to_string(),
            description: "Use a list comprehension".to_string(),
            severity: Severity::High,
            file_path: "app.py".to_string(),
            line_number: 3,
            recommendation: "Refactor".to_string(),
            metadata: BTreeMap::new(),
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["findings"][0]["severity"], "high");
        assert_eq!(json["findings"][0]["line_number"], 3);
    }
}
