//! Integration tests for the adapter lifecycle contract.
//!
//! These validate the boundaries every adapter shares: missing
//! targets, missing executables, min-severity filtering, and result
//! finalization - without requiring any external tool to be
//! installed.

use std::collections::BTreeMap;
use std::path::Path;

use tempfile::TempDir;
use uniscan::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use uniscan::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};
use uniscan::registry;

/// Adapter whose external tool can never exist, for exercising the
/// tool-availability path.
struct MissingToolAnalyzer {
    config: AnalyzerConfig,
}

impl Analyzer for MissingToolAnalyzer {
    fn key(&self) -> &'static str {
        "test:missing-tool"
    }

    fn category(&self) -> &'static str {
        "test"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        AnalyzerMetadata {
            name: "Missing Tool Analyzer".to_string(),
            version: "0.0.0".to_string(),
            description: "test fixture".to_string(),
            category: "test".to_string(),
            priority: "low".to_string(),
            extra: BTreeMap::new(),
        }
    }

    fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn tool(&self) -> Option<ToolRequirement> {
        Some(ToolRequirement::new(
            "uniscan-definitely-not-installed",
            "Install uniscan-definitely-not-installed from nowhere.",
        ))
    }

    fn analyze_target(&self, _target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        panic!("analyze_target must not run when the tool is missing");
    }
}

fn sql_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("report.sql"),
        "SELECT * FROM orders;\nSELECT id FROM users LIMIT 10;\n",
    )
    .unwrap();
    temp
}

#[test]
fn test_sql_analyzer_full_lifecycle() {
    let temp = sql_fixture();
    let registry = registry::bootstrap();
    let analyzer = registry
        .create("performance:sql", AnalyzerConfig::default())
        .unwrap();

    let result = analyzer.analyze(Some(temp.path()));

    assert!(result.success);
    assert!(result.error_message.is_none());
    assert!(!result.findings.is_empty());
    assert!(result.completed_at.is_some());
    assert!(result.duration_seconds >= 0.0);
    assert_eq!(result.files_processed, 1);
    assert_eq!(result.analyzer_category, "performance");

    // Summary counts match findings exactly
    let total: usize = result.summary.values().sum();
    assert_eq!(total, result.findings.len());
    for finding in &result.findings {
        assert!(Severity::all().contains(&finding.severity));
    }

    // Metadata carries the analyzer identity for the aggregator
    assert_eq!(
        result.metadata["name"],
        serde_json::json!("SQL Performance Analyzer")
    );
    assert_eq!(result.metadata["analyzer_type"], serde_json::json!("performance"));
}

#[test]
fn test_missing_target_is_error_result() {
    let registry = registry::bootstrap();
    let analyzer = registry
        .create("performance:sql", AnalyzerConfig::default())
        .unwrap();

    let result = analyzer.analyze(Some(Path::new("/no/such/target/path")));

    assert!(!result.success);
    let message = result.error_message.unwrap();
    assert!(message.contains("Target path not found"), "got: {}", message);
    // Completion still happens on error
    assert!(result.completed_at.is_some());
}

#[test]
fn test_missing_tool_is_error_result_with_hint() {
    let temp = sql_fixture();
    let analyzer = MissingToolAnalyzer {
        config: AnalyzerConfig::default(),
    };

    let result = analyzer.analyze(Some(temp.path()));

    assert!(!result.success);
    let message = result.error_message.unwrap();
    assert!(
        message.contains("uniscan-definitely-not-installed is required"),
        "got: {}",
        message
    );
    assert!(message.contains("Install"), "hint missing: {}", message);
    assert!(result.findings.is_empty());
    assert!(result.completed_at.is_some());
}

#[test]
fn test_one_failing_adapter_does_not_block_siblings() {
    let temp = sql_fixture();
    let registry = registry::bootstrap();

    let broken = MissingToolAnalyzer {
        config: AnalyzerConfig::default(),
    };
    let working = registry
        .create("performance:sql", AnalyzerConfig::default())
        .unwrap();

    let broken_result = broken.analyze(Some(temp.path()));
    let working_result = working.analyze(Some(temp.path()));

    assert!(!broken_result.success);
    assert!(working_result.success);
    assert!(!working_result.findings.is_empty());
}

#[test]
fn test_min_severity_filters_findings() {
    let temp = sql_fixture();
    let registry = registry::bootstrap();

    let config = AnalyzerConfig {
        min_severity: Severity::High,
        ..AnalyzerConfig::default()
    };
    let analyzer = registry.create("performance:sql", config).unwrap();
    let result = analyzer.analyze(Some(temp.path()));

    assert!(result.success);
    // The fixture produces medium findings at most; all filtered
    assert!(result.findings.iter().all(|f| f.severity >= Severity::High));
}

#[test]
fn test_config_default_target_used_when_argument_absent() {
    let temp = sql_fixture();
    let registry = registry::bootstrap();

    let config = AnalyzerConfig {
        target_path: temp.path().to_path_buf(),
        ..AnalyzerConfig::default()
    };
    let analyzer = registry.create("performance:sql", config).unwrap();
    let result = analyzer.analyze(None);

    assert!(result.success);
    assert_eq!(result.target_path, temp.path().to_string_lossy());
}
