//! Command-line interface for uniscan.

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::PathBuf;

use crate::analyzers::SqlAnalyzer;
use crate::model::{AnalysisResult, AnalyzerConfig, OutputFormat, Severity};
use crate::registry;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Unified analyzer adapter framework.
///
/// uniscan runs external analysis tools (linters, vulnerability
/// scanners, compiler diagnostics) behind one lifecycle contract and
/// normalizes their output into a single finding schema. Per-run
/// results are written as JSON artifacts; the convert subcommand
/// aggregates them into one deduplicated CodeClimate-style report.
#[derive(Parser)]
#[command(name = "uniscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run analyzers against a target path
    Run(RunArgs),
    /// Aggregate result artifacts into a CodeClimate report
    Convert(ConvertArgs),
    /// List registered analyzers
    List,
}

/// Arguments for the run command.
#[derive(Parser)]
pub struct RunArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Analyzer key to run (repeatable; default: all registered)
    #[arg(short, long = "analyzer")]
    pub analyzers: Vec<String>,

    /// Directory for per-run result artifacts
    #[arg(short, long, default_value = "artifacts")]
    pub output_dir: PathBuf,

    /// Path to an analyzer config YAML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Subprocess timeout in seconds (overrides adapter defaults)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Drop findings below this severity
    #[arg(short, long)]
    pub min_severity: Option<Severity>,

    /// Cap on files counted per run
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Custom SQL pattern config (performance:sql only)
    #[arg(long)]
    pub sql_patterns: Option<PathBuf>,
}

/// Arguments for the convert command.
#[derive(Parser)]
pub struct ConvertArgs {
    /// Directory with analyzer result JSONs
    #[arg(default_value = "artifacts")]
    pub artifacts: PathBuf,
}

fn debug_enabled() -> bool {
    std::env::var("UNISCAN_DEBUG").is_ok()
}

/// Build the effective config from file and flags; flags win.
fn build_config(args: &RunArgs) -> anyhow::Result<AnalyzerConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::parse_file(path)?,
        None => AnalyzerConfig::default(),
    };

    config.target_path = args.path.clone();
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = Some(timeout);
    }
    if let Some(min) = args.min_severity {
        config.min_severity = min;
    }
    if let Some(max) = args.max_files {
        config.max_files = Some(max);
    }
    config.output_format = match args.format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Pretty,
    };

    Ok(config)
}

/// Run the run command.
pub fn run_analyze(args: &RunArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let config = match build_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    // Registration completes before any lookup; the registry is
    // read-only from here on.
    let registry = registry::bootstrap();

    let keys: Vec<String> = if args.analyzers.is_empty() {
        registry.keys().iter().map(|k| k.to_string()).collect()
    } else {
        args.analyzers.clone()
    };

    // Construct every adapter up front so config problems fail the
    // whole run before any tool executes.
    let mut adapters = Vec::with_capacity(keys.len());
    for key in &keys {
        let sql_override = if key == "performance:sql" {
            args.sql_patterns.as_deref()
        } else {
            None
        };
        let adapter = match sql_override {
            Some(path) => match SqlAnalyzer::from_patterns_file(config.clone(), path) {
                Ok(a) => Box::new(a) as Box<dyn crate::analyzer::Analyzer>,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(EXIT_ERROR);
                }
            },
            None => match registry.create(key, config.clone()) {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return Ok(EXIT_ERROR);
                }
            },
        };
        adapters.push((key.clone(), adapter));
    }

    // Each adapter owns its own subprocess and result; runs are
    // independent, so fan out.
    let results: Vec<(String, AnalysisResult)> = adapters
        .par_iter()
        .map(|(key, adapter)| (key.clone(), adapter.analyze(None)))
        .collect();

    for (key, result) in &results {
        let path = report::write_result_file(&args.output_dir, key, result)?;
        if debug_enabled() {
            eprintln!("[debug] wrote {}", path.display());
        }
    }

    match config.output_format {
        OutputFormat::Json => report::write_json(&results)?,
        OutputFormat::Pretty => {
            report::write_pretty(&args.path.to_string_lossy(), &results)
        }
    }

    if results.iter().any(|(_, r)| !r.success) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the convert command.
pub fn run_convert(args: &ConvertArgs) -> anyhow::Result<i32> {
    let items = crate::convert::convert_dir(&args.artifacts);
    println!("{}", serde_json::to_string(&items)?);
    Ok(EXIT_SUCCESS)
}

/// Run the list command.
pub fn run_list() -> anyhow::Result<i32> {
    let registry = registry::bootstrap();

    println!("Registered analyzers:");
    println!();
    for key in registry.keys() {
        match registry.create(key, AnalyzerConfig::default()) {
            Ok(adapter) => {
                let meta = adapter.metadata();
                println!("  {:<28} {}", key, meta.description);
            }
            Err(e) => {
                println!("  {:<28} (unavailable: {})", key, e);
            }
        }
    }
    println!();
    println!("Usage:");
    println!("  uniscan run <path> --analyzer <key>");

    Ok(EXIT_SUCCESS)
}
