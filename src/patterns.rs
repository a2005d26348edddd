//! Config-driven pattern tables for the SQL analyzer.
//!
//! Pattern files are JSON with a strict top-level schema: a numeric
//! `schema_version` plus a `patterns` map. Malformed files fail at load
//! time, before any adapter executes.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::model::Severity;

/// Default pattern table shipped with the binary.
const DEFAULT_DATABASE_PATTERNS: &str = include_str!("patterns/database.json");

/// Errors raised while loading pattern configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing keys in {path}: {keys:?}")]
    MissingKeys { path: String, keys: Vec<String> },
    #[error("invalid pattern config in {path}: {message}")]
    Schema { path: String, message: String },
}

/// One named pattern family: regex indicators plus the finding fields
/// they produce.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternSpec {
    pub indicators: Vec<String>,
    #[serde(default = "default_pattern_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_pattern_severity() -> Severity {
    Severity::Medium
}

/// A validated pattern table.
#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub patterns: BTreeMap<String, PatternSpec>,
}

impl PatternConfig {
    /// The embedded default table.
    pub fn default_database() -> Self {
        // The embedded file is validated by tests; a parse failure here
        // is a packaging bug.
        parse(DEFAULT_DATABASE_PATTERNS, "<embedded database.json>")
            .unwrap_or_else(|e| panic!("embedded pattern config invalid: {}", e))
    }

    /// Load and validate a pattern table from a JSON file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::NotFound(display));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Schema {
                path: display.clone(),
                message: e.to_string(),
            })?;
        parse(&content, &display)
    }
}

fn parse(content: &str, path: &str) -> Result<PatternConfig, ConfigError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: path.to_string(),
            source,
        })?;

    let obj = value.as_object().ok_or_else(|| ConfigError::Schema {
        path: path.to_string(),
        message: "top level must be an object".to_string(),
    })?;

    let missing: Vec<String> = ["schema_version", "patterns"]
        .iter()
        .filter(|k| !obj.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingKeys {
            path: path.to_string(),
            keys: missing,
        });
    }

    let patterns: BTreeMap<String, PatternSpec> =
        serde_json::from_value(obj["patterns"].clone()).map_err(|e| {
            ConfigError::Schema {
                path: path.to_string(),
                message: e.to_string(),
            }
        })?;

    for (name, spec) in &patterns {
        if spec.indicators.is_empty() {
            return Err(ConfigError::Schema {
                path: path.to_string(),
                message: format!("pattern '{}' has no indicators", name),
            });
        }
        for indicator in &spec.indicators {
            if let Err(e) = regex::Regex::new(&format!("(?i){}", indicator)) {
                return Err(ConfigError::Schema {
                    path: path.to_string(),
                    message: format!("pattern '{}': {}", name, e),
                });
            }
        }
    }

    Ok(PatternConfig { patterns })
}
