//! C# performance hints via `dotnet build` analyzers.
//!
//! Builds the nearest solution or project with analyzers enabled and
//! keeps only the performance-related CA rules from the build text.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analyzer::{Analyzer, AnalyzerError, ToolRequirement};
use crate::model::{AnalyzerConfig, AnalyzerMetadata, Finding, Severity};

use super::{effective_timeout, run_tool};

const DEFAULT_TIMEOUT_SECS: u64 = 900;
const ACCEPTED_EXIT_CODES: &[i32] = &[0];

/// Performance-related CA rules kept from the build output.
static PERF_CA_CODES: phf::Set<&'static str> = phf::phf_set! {
    "CA1806", "CA1810", "CA1812", "CA1822", "CA1823", "CA1824",
    "CA1825", "CA1826", "CA1827", "CA1828", "CA1830", "CA1841",
    "CA1845", "CA1851", "CA1852", "CA1859",
};

lazy_static! {
    static ref WARNING_PATTERN: Regex = Regex::new(
        r"^(?P<file>[^()]+)\((?P<line>\d+),(?P<col>\d+)\):\s+(?P<level>warning|error)\s+(?P<code>CA\d+):\s+(?P<message>.+?)\s+\[(?P<project>.+)\]$"
    )
    .expect("dotnet warning pattern");
}

pub struct DotnetAnalyzer {
    config: AnalyzerConfig,
}

impl DotnetAnalyzer {
    pub fn new(mut config: AnalyzerConfig) -> Self {
        if config.code_extensions.is_empty() {
            config.code_extensions.insert(".cs".to_string());
        }
        Self { config }
    }

    /// Resolve the solution or project to build: a direct `.sln` or
    /// `.csproj` argument, else the first such file found shallow then
    /// recursive (sorted, solutions preferred).
    fn resolve_build_target(target: &Path) -> Option<PathBuf> {
        if target.is_file() {
            match target.extension().and_then(|e| e.to_str()) {
                Some("sln") | Some("csproj") => return Some(target.to_path_buf()),
                _ => {}
            }
        }

        let root = if target.is_dir() {
            target
        } else {
            target.parent()?
        };

        for ext in ["sln", "csproj"] {
            if let Some(found) = find_shallow(root, ext) {
                return Some(found);
            }
        }
        for ext in ["sln", "csproj"] {
            if let Some(found) = find_recursive(root, ext) {
                return Some(found);
            }
        }
        None
    }
}

fn find_shallow(root: &Path, ext: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

fn find_recursive(root: &Path, ext: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

impl Analyzer for DotnetAnalyzer {
    fn key(&self) -> &'static str {
        "performance:dotnet"
    }

    fn category(&self) -> &'static str {
        "performance"
    }

    fn metadata(&self) -> AnalyzerMetadata {
        let mut extra = BTreeMap::new();
        let mut rules: Vec<&str> = PERF_CA_CODES.iter().copied().collect();
        rules.sort_unstable();
        extra.insert("rules".to_string(), serde_json::json!(rules));

        AnalyzerMetadata {
            name: "Dotnet Performance Analyzer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "C# performance analysis via dotnet build analyzers".to_string(),
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
            "dotnet",
            "Install the .NET SDK from https://dotnet.microsoft.com/download",
        ))
    }

    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError> {
        let build_target = Self::resolve_build_target(target).ok_or_else(|| {
            AnalyzerError::MissingManifest(
                "No .sln or .csproj found for target path".to_string(),
            )
        })?;

        let timeout = effective_timeout(self.config.timeout_seconds, DEFAULT_TIMEOUT_SECS);
        let build_target_str = build_target.to_string_lossy();
        let output = run_tool(
            "dotnet",
            &[
                "build",
                &build_target_str,
                "/p:RunAnalyzers=true",
                "/p:EnforceCodeStyleInBuild=true",
            ],
            None,
            timeout,
            Some(ACCEPTED_EXIT_CODES),
        )?;

        let combined = format!("{}\n{}", output.stdout, output.stderr);
        Ok(parse_build_output(&combined, &build_target))
    }
}

/// Match MSBuild diagnostic lines and keep the performance allow-list.
fn parse_build_output(output: &str, fallback_path: &Path) -> Vec<Finding> {
    let mut findings = Vec::new();

    for line in output.lines() {
        let captures = match WARNING_PATTERN.captures(line.trim()) {
            Some(c) => c,
            None => continue,
        };

        let code = &captures["code"];
        if !PERF_CA_CODES.contains(code) {
            continue;
        }

        let severity = if &captures["level"] == "error" {
            Severity::High
        } else {
            Severity::Medium
        };
        let file = captures["file"].trim();
        let file_path = if file.is_empty() {
            fallback_path.to_string_lossy().to_string()
        } else {
            file.to_string()
        };
        let line_number: usize = captures["line"].parse().unwrap_or(1);

        let mut metadata = BTreeMap::new();
        metadata.insert("rule".to_string(), code.to_string());
        metadata.insert("source".to_string(), "dotnet".to_string());

        findings.push(Finding {
            title: format!("Dotnet Analyzer: {}", code),
            description: captures["message"].to_string(),
            severity,
            file_path,
            line_number,
            recommendation: "Address the analyzer warning to improve performance.".to_string(),
            metadata,
        });
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_only_perf_codes() {
        let output = "\
Program.cs(10,5): warning CA1822: Member can be static [App.csproj]
Program.cs(12,5): warning CA2000: Dispose objects before losing scope [App.csproj]
";
        let findings = parse_build_output(output, Path::new("App.csproj"));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line_number, 10);
        assert_eq!(findings[0].metadata["rule"], "CA1822");
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_parse_error_level_is_high() {
        let output = "Svc/Cache.cs(3,1): error CA1825: Avoid zero-length array allocations [Svc.csproj]";
        let findings = parse_build_output(output, Path::new("Svc.csproj"));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].file_path, "Svc/Cache.cs");
    }

    #[test]
    fn test_parse_ignores_unrelated_lines() {
        let output = "\
Build started.
  Determining projects to restore...
Build succeeded.
";
        assert!(parse_build_output(output, Path::new("x")).is_empty());
    }

    #[test]
    fn test_resolve_build_target_prefers_solution() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.csproj"), "").unwrap();
        std::fs::write(temp.path().join("a.sln"), "").unwrap();

        let target = DotnetAnalyzer::resolve_build_target(temp.path()).unwrap();
        assert_eq!(target.extension().unwrap(), "sln");
    }

    #[test]
    fn test_resolve_build_target_recursive_fallback() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("src").join("app");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("app.csproj"), "").unwrap();

        let target = DotnetAnalyzer::resolve_build_target(temp.path()).unwrap();
        assert!(target.ends_with("app.csproj"));
    }

    #[test]
    fn test_resolve_build_target_direct_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let proj = temp.path().join("direct.csproj");
        std::fs::write(&proj, "").unwrap();

        let target = DotnetAnalyzer::resolve_build_target(&proj).unwrap();
        assert_eq!(target, proj);
    }
}
