//! The adapter lifecycle contract shared by every analyzer.
//!
//! Concrete adapters implement [`Analyzer::analyze_target`] (tool
//! invocation and parsing); the lifecycle driver owns everything else:
//! target resolution, tool availability, error capture, and result
//! finalization. Expected failures are captured into the result
//! (`success=false`, descriptive `error_message`) and never propagate
//! past [`Analyzer::analyze`], so a batch of independent analyzer runs
//! tolerates partial failure.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use walkdir::WalkDir;

use crate::exec;
use crate::model::{AnalysisResult, AnalyzerConfig, AnalyzerMetadata, Finding};

/// Directories never descended into when counting files.
const SKIP_DIRS: &[&str] = &["vendor", "node_modules", "target", "__pycache__", ".git"];

/// Expected per-adapter failures, captured into the result object.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Target path not found: {0}")]
    TargetNotFound(String),
    #[error("{tool} is required but not available. {hint}")]
    ToolUnavailable { tool: String, hint: String },
    #[error("{tool} timed out after {elapsed_secs}s (limit {limit_secs}s)")]
    ToolTimeout {
        tool: String,
        elapsed_secs: u64,
        limit_secs: u64,
    },
    #[error("{tool} failed with exit code {code}")]
    ToolExecutionFailed { tool: String, code: i32 },
    #[error("Failed to parse {tool} output: {message}")]
    OutputParse { tool: String, message: String },
    #[error("{0}")]
    MissingManifest(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An external executable an adapter depends on.
#[derive(Debug, Clone)]
pub struct ToolRequirement {
    /// Executable name looked up on PATH.
    pub binary: &'static str,
    /// Remediation text surfaced in `error_message` when absent.
    pub hint: &'static str,
}

impl ToolRequirement {
    pub fn new(binary: &'static str, hint: &'static str) -> Self {
        Self { binary, hint }
    }
}

/// Component wrapping exactly one external analysis tool behind the
/// shared lifecycle contract.
pub trait Analyzer: Send + Sync {
    /// Registry key, namespaced `"<category>:<tool>"`.
    fn key(&self) -> &'static str;

    /// Category recorded on results (e.g. "performance", "security").
    fn category(&self) -> &'static str;

    fn metadata(&self) -> AnalyzerMetadata;

    fn config(&self) -> &AnalyzerConfig;

    /// External executable this adapter needs, if any.
    fn tool(&self) -> Option<ToolRequirement> {
        None
    }

    /// Invoke the tool against `target` and parse its output.
    ///
    /// The only method a concrete adapter must implement. Environment
    /// discovery (nearest build manifest, project file resolution)
    /// happens here; failures surface as [`AnalyzerError`] variants.
    fn analyze_target(&self, target: &Path) -> Result<Vec<Finding>, AnalyzerError>;

    /// Run the full lifecycle. The one method external callers invoke.
    fn analyze(&self, target: Option<&Path>) -> AnalysisResult {
        run_lifecycle(self, target)
    }
}

/// Timestamps for one analysis run, with a double-start guard.
#[derive(Debug)]
pub struct AnalysisSession {
    started_at: Option<DateTime<Utc>>,
    started_instant: Option<Instant>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            started_at: None,
            started_instant: None,
        }
    }

    /// Record the start timestamp. A second call keeps the original.
    pub fn start(&mut self) -> DateTime<Utc> {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
            self.started_instant = Some(Instant::now());
        }
        self.started_at.expect("just set")
    }

    pub fn elapsed(&self) -> Duration {
        self.started_instant
            .map(|i| i.elapsed())
            .unwrap_or_default()
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocate an empty result for this session.
pub fn create_result(
    category: &str,
    target_path: &Path,
    session: &AnalysisSession,
) -> AnalysisResult {
    AnalysisResult::new(
        category,
        &target_path.to_string_lossy(),
        session.started_at.unwrap_or_else(Utc::now),
    )
}

/// Stamp completion time and compute the per-severity summary.
///
/// Always called exactly once per run, on success and on error.
pub fn complete_analysis(
    mut result: AnalysisResult,
    session: &AnalysisSession,
) -> AnalysisResult {
    result.completed_at = Some(Utc::now());
    result.duration_seconds = session.elapsed().as_secs_f64();

    let mut summary = std::collections::BTreeMap::new();
    for finding in &result.findings {
        *summary.entry(finding.severity).or_insert(0) += 1;
    }
    result.summary = summary;
    result
}

/// The shared lifecycle: start, resolve target, tool check, execute,
/// populate, complete.
pub fn run_lifecycle<A: Analyzer + ?Sized>(
    analyzer: &A,
    target: Option<&Path>,
) -> AnalysisResult {
    let mut session = AnalysisSession::new();
    session.start();

    let config = analyzer.config();
    let analyze_path: PathBuf = target
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.target_path.clone());

    let mut result = create_result(analyzer.category(), &analyze_path, &session);
    attach_metadata(&mut result, analyzer);

    if !analyze_path.exists() {
        result.set_error(
            AnalyzerError::TargetNotFound(analyze_path.display().to_string()).to_string(),
        );
        return complete_analysis(result, &session);
    }

    if let Some(req) = analyzer.tool() {
        let check = exec::find_tool(req.binary);
        if !check.available {
            result.set_error(
                AnalyzerError::ToolUnavailable {
                    tool: req.binary.to_string(),
                    hint: req.hint.to_string(),
                }
                .to_string(),
            );
            return complete_analysis(result, &session);
        }
    }

    match analyzer.analyze_target(&analyze_path) {
        Ok(findings) => {
            let min = config.min_severity;
            result.findings = findings
                .into_iter()
                .filter(|f| f.severity >= min)
                .collect();
            result.files_processed =
                scan_directory(&analyze_path, &config.code_extensions, config.max_files);
        }
        Err(e) => {
            result.set_error(e.to_string());
        }
    }

    complete_analysis(result, &session)
}

fn attach_metadata<A: Analyzer + ?Sized>(result: &mut AnalysisResult, analyzer: &A) {
    let meta = analyzer.metadata();
    result
        .metadata
        .insert("name".to_string(), meta.name.clone().into());
    result
        .metadata
        .insert("version".to_string(), meta.version.clone().into());
    result
        .metadata
        .insert("description".to_string(), meta.description.clone().into());
    result
        .metadata
        .insert("analyzer_type".to_string(), meta.category.clone().into());
    result
        .metadata
        .insert("priority".to_string(), meta.priority.clone().into());
    for (k, v) in meta.extra {
        result.metadata.insert(k, v);
    }
}

/// Count files under `root` matching `extensions`, up to `max_files`.
///
/// A file target counts as one file. Hidden directories and the usual
/// vendor/build directories are skipped.
pub fn scan_directory(
    root: &Path,
    extensions: &BTreeSet<String>,
    max_files: Option<usize>,
) -> usize {
    if root.is_file() {
        return 1;
    }

    let limit = max_files.unwrap_or(usize::MAX);
    let mut count = 0usize;

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            // The walk root itself is always entered
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir()
                && (name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref()))
            {
                return false;
            }
            true
        })
        .flatten()
    {
        if count >= limit {
            break;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        if extensions.is_empty() {
            count += 1;
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.contains(&format!(".{}", e)))
            .unwrap_or(false);
        if matches {
            count += 1;
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_double_start_keeps_original() {
        let mut session = AnalysisSession::new();
        let first = session.start();
        std::thread::sleep(Duration::from_millis(5));
        let second = session.start();
        assert_eq!(first, second);
    }

    #[test]
    fn test_complete_computes_summary() {
        use crate::model::Severity;
        let mut session = AnalysisSession::new();
        session.start();
        let mut result = create_result("performance", Path::new("x"), &session);
        for sev in [Severity::High, Severity::High, Severity::Low] {
            result.findings.push(Finding {
                title: "t".to_string(),
                description: "d".to_string(),
                severity: sev,
                file_path: "f".to_string(),
                line_number: 1,
                recommendation: "r".to_string(),
                metadata: Default::default(),
            });
        }

        let done = complete_analysis(result, &session);
        assert_eq!(done.summary.get(&Severity::High), Some(&2));
        assert_eq!(done.summary.get(&Severity::Low), Some(&1));
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_scan_directory_counts_by_extension() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::write(temp.path().join("b.rs"), "").unwrap();
        std::fs::write(temp.path().join("c.go"), "package main").unwrap();
        std::fs::create_dir(temp.path().join("vendor")).unwrap();
        std::fs::write(temp.path().join("vendor").join("d.rs"), "").unwrap();

        let exts: BTreeSet<String> = [".rs".to_string()].into_iter().collect();
        assert_eq!(scan_directory(temp.path(), &exts, None), 2);
        assert_eq!(scan_directory(temp.path(), &exts, Some(1)), 1);
    }

    #[test]
    fn test_scan_directory_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("only.sql");
        std::fs::write(&file, "SELECT 1;").unwrap();
        assert_eq!(scan_directory(&file, &BTreeSet::new(), None), 1);
    }
}
