//! Tool adapter implementations.
//!
//! Each adapter wraps one external analysis tool behind the shared
//! lifecycle contract: it builds the command line, classifies the exit
//! code against its accepted set, and parses tool output into
//! normalized findings. Parsing is tolerant per item - a malformed
//! line or entry is skipped; only an unparsable top-level payload
//! fails the run.

mod clippy;
mod dotnet;
mod golangci;
mod osv;
mod ruff;
mod semgrep;
mod sql;

pub use clippy::ClippyAnalyzer;
pub use dotnet::DotnetAnalyzer;
pub use golangci::GolangciLintAnalyzer;
pub use osv::OsvScannerAnalyzer;
pub use ruff::RuffAnalyzer;
pub use semgrep::SemgrepAnalyzer;
pub use sql::SqlAnalyzer;

use std::path::Path;
use std::time::Duration;

use crate::analyzer::AnalyzerError;
use crate::exec::{self, CommandOutput};

/// Run an external tool and classify the outcome.
///
/// `accepted` is the per-tool set of exit codes meaning "ran
/// successfully, findings may exist"; `None` skips exit-code
/// classification entirely (the caller decides from stdout). Timeouts
/// always fail, carrying the elapsed time.
pub(crate) fn run_tool(
    tool: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout_secs: u64,
    accepted: Option<&[i32]>,
) -> Result<CommandOutput, AnalyzerError> {
    let output = exec::run_command(tool, args, cwd, Duration::from_secs(timeout_secs))?;

    if output.timed_out {
        return Err(AnalyzerError::ToolTimeout {
            tool: tool.to_string(),
            elapsed_secs: output.elapsed.as_secs(),
            limit_secs: timeout_secs,
        });
    }

    if let Some(codes) = accepted {
        if !codes.contains(&output.exit_code) {
            return Err(AnalyzerError::ToolExecutionFailed {
                tool: tool.to_string(),
                code: output.exit_code,
            });
        }
    }

    Ok(output)
}

/// Effective subprocess timeout: configured value or adapter default.
pub(crate) fn effective_timeout(configured: Option<u64>, default_secs: u64) -> u64 {
    configured.unwrap_or(default_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timeout_prefers_configured() {
        assert_eq!(effective_timeout(Some(42), 900), 42);
        assert_eq!(effective_timeout(None, 900), 900);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_accepted_exit_code() {
        let out = run_tool("sh", &["-c", "echo hi; exit 1"], None, 10, Some(&[0, 1])).unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.stdout.trim(), "hi");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_unaccepted_exit_code() {
        let err = run_tool("sh", &["-c", "exit 2"], None, 10, Some(&[0, 1])).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::ToolExecutionFailed { code: 2, .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_unclassified_exit_code() {
        let out = run_tool("sh", &["-c", "exit 7"], None, 10, None).unwrap();
        assert_eq!(out.exit_code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_timeout_is_error() {
        let err = run_tool("sh", &["-c", "sleep 30"], None, 1, Some(&[0])).unwrap_err();
        match err {
            AnalyzerError::ToolTimeout { limit_secs, .. } => assert_eq!(limit_secs, 1),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
