//! Output formatting for analyzer runs.
//!
//! Two formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//!
//! Per-run result artifacts are always written as JSON files so the
//! aggregation step can consume them later.

use colored::*;
use std::path::{Path, PathBuf};

use crate::model::{AnalysisResult, Severity};

/// Write one result artifact under `dir`, named after the registry key
/// (`performance:clippy` becomes `performance_clippy.json`).
pub fn write_result_file(dir: &Path, key: &str, result: &AnalysisResult) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let file_name = format!("{}.json", key.replace(':', "_"));
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Write all results as one JSON array on stdout.
pub fn write_json(results: &[(String, AnalysisResult)]) -> anyhow::Result<()> {
    let payload: Vec<&AnalysisResult> = results.iter().map(|(_, r)| r).collect();
    let json = serde_json::to_string_pretty(&payload)?;
    println!("{}", json);
    Ok(())
}

/// Write a colored human-readable run summary.
pub fn write_pretty(target: &str, results: &[(String, AnalysisResult)]) {
    println!();
    print!("  ");
    print!("{}", "uniscan".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Target: ".dimmed());
    println!("{}", target);
    println!();

    for (key, result) in results {
        write_result_line(key, result);
    }
    println!();

    write_totals(results);
    println!();
}

fn write_result_line(key: &str, result: &AnalysisResult) {
    if result.success {
        print!("  {} ", "✓".green());
    } else {
        print!("  {} ", "✗".red());
    }
    print!("{:<28}", key);

    if let Some(message) = &result.error_message {
        println!("{}", message.red());
        return;
    }

    let count = result.findings.len();
    let plural = if count != 1 { "s" } else { "" };
    print!("{} finding{}", count, plural);
    print!(
        "{}",
        format!(
            "  ({} files, {:.1}s)",
            result.files_processed, result.duration_seconds
        )
        .dimmed()
    );
    println!();

    for finding in &result.findings {
        write_severity_tag(finding.severity);
        print!("{}", finding.file_path.blue());
        if finding.line_number > 0 {
            print!("{}", format!(":{}", finding.line_number).dimmed());
        }
        println!("  {}", finding.title);
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Critical => print!("      {} ", "CRIT ".red().bold()),
        Severity::High => print!("      {} ", "HIGH ".red()),
        Severity::Medium => print!("      {} ", "MED  ".yellow()),
        Severity::Low => print!("      {} ", "LOW  ".blue()),
        Severity::Info => print!("      {} ", "INFO ".dimmed()),
    }
}

fn write_totals(results: &[(String, AnalysisResult)]) {
    let failed = results.iter().filter(|(_, r)| !r.success).count();
    let total_findings: usize = results.iter().map(|(_, r)| r.findings.len()).sum();

    let mut by_severity = std::collections::BTreeMap::new();
    for (_, result) in results {
        for (severity, count) in &result.summary {
            *by_severity.entry(*severity).or_insert(0usize) += count;
        }
    }

    print!("  {}", "Totals: ".bold());
    print!("{} finding(s)", total_findings);
    // Most severe first
    for severity in Severity::all().iter().rev() {
        if let Some(count) = by_severity.get(severity) {
            print!("  {}={}", severity, count);
        }
    }
    if failed > 0 {
        print!("  {}", format!("{} analyzer(s) failed", failed).red());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_write_result_file_replaces_key_separator() {
        let temp = TempDir::new().unwrap();
        let result = AnalysisResult::new("performance", "src", Utc::now());

        let path = write_result_file(temp.path(), "performance:clippy", &result).unwrap();
        assert!(path.ends_with("performance_clippy.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["analyzer_category"], "performance");
        assert_eq!(parsed["success"], true);
    }

    #[test]
    fn test_write_result_file_creates_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("artifacts").join("run1");
        let result = AnalysisResult::new("security", "x", Utc::now());

        let path = write_result_file(&nested, "security:osv", &result).unwrap();
        assert!(path.exists());
    }
}
