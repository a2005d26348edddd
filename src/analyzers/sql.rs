//! SQL performance anti-patterns from config-driven indicators.
//!
//! Two passes per file: per-line regex indicators loaded from a
//! pattern config, then a statement pass that flags `SELECT` without a
//! `LIMIT` clause. The statement pass reports at line 1 - it is
//! statement-level, not line-accurate.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};
use crate::patterns::{ConfigError, PatternConfig};

lazy_static! {
    static ref SELECT_RE: Regex = Regex::new(r"(?i)\bSELECT\b").expect("select pattern");
    static ref LIMIT_RE: Regex = Regex::new(r"(?i)\bLIMIT\b").expect("limit pattern");
}

/// One compiled pattern family.
struct CompiledPattern {
    name: String,
    indicators: Vec<Regex>,
    severity: Severity,
    description: String,
}

pub struct SqlAnalyzer {
    config: AnalyzerConfig,
    patterns: Vec<CompiledPattern>,
}

impl SqlAnalyzer {
    /// Analyzer with the embedded default pattern table.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::from_patterns(config, PatternConfig::default_database())
            .expect("embedded pattern config is validated")
    }

    /// Analyzer with a caller-supplied pattern file.
    pub fn from_patterns_file(
        config: AnalyzerConfig,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        let patterns = PatternConfig::parse_file(path)?;
        Self::from_patterns(config, patterns)
    }

    pub fn from_patterns(
        mut config: AnalyzerConfig,
        patterns: PatternConfig,
    ) -> Result<Self, ConfigError> {
        if config.code_extensions.is_empty() {
            config.code_extensions.insert(".sql".to_string());
        }

        let mut compiled = Vec::new();
        for (name, spec) in patterns.patterns {
            let indicators = spec
                .indicators
                .iter()
                .map(|ind| {
                    Regex::new(&format!("(?i){}", ind)).map_err(|e| ConfigError::Schema {
                        path: "<pattern config>".to_string(),
                        message: format!("pattern '{}': {}", name, e),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(CompiledPattern {
                description: spec.description.clone().unwrap_or_else(|| name.clone()),
                severity: spec.severity,
                indicators,
                name,
            });
        }

        Ok(Self {
            config,
            patterns: compiled,
        })
    }

    fn analyze_file(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let content = std::fs::read_to_string(target)?;
        let target_str = target.to_string_lossy().to_string();
        let mut findings = Vec::new();

        // Pass 1: config-driven regex indicators, cheap and deterministic.
        for pattern in &self.patterns {
            for (i, line) in content.lines().enumerate() {
                if pattern.indicators.iter().any(|re| re.is_match(line)) {
                    let mut metadata = BTreeMap::new();
                    metadata.insert("pattern".to_string(), pattern.name.clone());

                    findings.push(Finding {
                        title: format!("SQL Pattern: {}", pattern.name),
                        description: pattern.description.clone(),
                        severity: pattern.severity,
                        file_path: target_str.clone(),
                        line_number: i + 1,
                        recommendation: recommendation_for(&pattern.name),
                        metadata,
                    });
                }
            }
        }

        // Pass 2: statement-level scan for unbounded SELECTs.
        for statement in split_sql_statements(&content) {
            if SELECT_RE.is_match(statement) && !LIMIT_RE.is_match(statement) {
                let mut metadata = BTreeMap::new();
                metadata.insert("check".to_string(), "no_limit".to_string());

                findings.push(Finding {
                    title: "SQL: SELECT without LIMIT".to_string(),
                    description: "Statement may return an unbounded result set".to_string(),
                    severity: Severity::Medium,
                    file_path: target_str.clone(),
                    line_number: 1,
                    recommendation: "Consider LIMIT/OFFSET or pagination where appropriate."
                        .to_string(),
                    metadata,
                });
            }
        }

        Ok(findings)
    }
}

impl Analyzer for SqlAnalyzer {
    fn key(&self) -> &'static str {
        "performance:sql"
    }

    fn category(&self) -> &'static str {
        "performance"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        let mut extra = BTreeMap::new();
        let names: Vec<&str> = self.patterns.iter().map(|p| p.name.as_str()).collect();
        extra.insert("patterns".to_string(), serde_json::json!(names));

        AnalyzerMetadata {
            name: "SQL Performance Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "SQL performance analysis using config-driven patterns".to_string(),
            category: "performance".to_string(),
            priority: "medium".to_string(),
            extra,
        }
    }

    fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        if target.is_file() {
            return self.analyze_file(target);
        }

        // Directory targets: analyze every contained .sql file.
        let mut findings = Vec::new();
        let mut files: Vec<_> = walkdir::WalkDir::new(target)
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("sql"))
            .collect();
        files.sort();

        for file in files {
            findings.extend(self.analyze_file(&file)?);
        }
        Ok(findings)
    }
}

fn recommendation_for(name: &str) -> String {
    match name {
        "large_result_sets" => "Add LIMIT/OFFSET or pagination to avoid full scans.",
        "missing_indexes" => "Ensure columns in WHERE/ORDER BY are indexed as needed.",
        "n_plus_one" => "Batch queries or use eager loading to avoid N+1 pattern.",
        "no_pagination" => "Add pagination to endpoints returning large collections.",
        _ => "Review and optimize the SQL statement.",
    }
    .to_string()
}

/// Split on `;`, dropping empty fragments.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn analyzer() -> SqlAnalyzer {
        SqlAnalyzer::new(AnalyzerConfig::default())
    }

    #[test]
    fn test_select_without_limit_flagged_once_per_statement() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("q.sql");
        std::fs::write(&file, "SELECT id FROM users;\nSELECT id FROM posts LIMIT 10;").unwrap();

        let findings = analyzer().analyze_file(&file).unwrap();
        let no_limit: Vec<_> = findings
            .iter()
            .filter(|f| f.metadata.get("check").map(String::as_str) == Some("no_limit"))
            .collect();
        assert_eq!(no_limit.len(), 1);
        assert_eq!(no_limit[0].line_number, 1);
        assert_eq!(no_limit[0].severity, Severity::Medium);
    }

    #[test]
    fn test_indicator_pattern_reports_line() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("q.sql");
        std::fs::write(&file, "-- header\nselect * from orders limit 5;").unwrap();

        let findings = analyzer().analyze_file(&file).unwrap();
        let hits: Vec<_> = findings
            .iter()
            .filter(|f| f.metadata.get("pattern").map(String::as_str) == Some("large_result_sets"))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line_number, 2);
    }

    #[test]
    fn test_directory_target_scans_sql_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.sql"), "SELECT 1 FROM t;").unwrap();
        std::fs::write(temp.path().join("b.sql"), "SELECT 2 FROM t;").unwrap();
        std::fs::write(temp.path().join("ignore.txt"), "SELECT 3 FROM t;").unwrap();

        let findings = analyzer().analyze_target(temp.path()).unwrap();
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_custom_patterns_drive_severity() {
        let config = PatternConfig {
            patterns: [(
                "cartesian".to_string(),
                crate::patterns::PatternSpec {
                    indicators: vec![r"CROSS\s+JOIN".to_string()],
                    severity: Severity::High,
                    description: Some("cartesian product".to_string()),
                },
            )]
            .into_iter()
            .collect(),
        };
        let analyzer = SqlAnalyzer::from_patterns(AnalyzerConfig::default(), config).unwrap();

        let temp = TempDir::new().unwrap();
        let file = temp.path().join("q.sql");
        std::fs::write(&file, "SELECT a FROM x CROSS JOIN y LIMIT 1;").unwrap();

        let findings = analyzer.analyze_file(&file).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].description, "cartesian product");
    }

    #[test]
    fn test_split_sql_statements() {
        let stmts = split_sql_statements("SELECT 1; ; SELECT 2;\n");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }
}
