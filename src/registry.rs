//! Registry mapping analyzer keys to constructors.
//!
//! Keys are namespaced `"<category>:<tool>"` (e.g.
//! `"performance:clippy"`). The process-wide table is populated once by
//! an explicit [`bootstrap`] call and is read-only thereafter: the
//! bootstrap phase must happen-before all lookups (documented, not
//! enforced - there is no internal locking beyond the one-time
//! initialization).

use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::analyzer::Analyzer;
use crate::analyzers::{
    ClippyAnalyzer, DotnetAnalyzer, GolangciLintAnalyzer, OsvScannerAnalyzer, RuffAnalyzer,
    SemgrepAnalyzer, SqlAnalyzer,
};
use crate::model::AnalyzerConfig;

/// Builds one adapter instance from a config.
pub type Constructor = fn(AnalyzerConfig) -> anyhow::Result<Box<dyn Analyzer>>;

/// Errors from registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("analyzer key already registered: {0}")]
    DuplicateKey(String),
    #[error("unknown analyzer: {0}")]
    UnknownAnalyzer(String),
    #[error("failed to construct analyzer {key}: {source}")]
    Construction {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Table of analyzer constructors keyed by `"<category>:<tool>"`.
#[derive(Default)]
pub struct AnalyzerRegistry {
    entries: BTreeMap<String, Constructor>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a unique key.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        constructor: Constructor,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateKey(key));
        }
        self.entries.insert(key, constructor);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Constructor> {
        self.entries.get(key)
    }

    /// Construct an adapter for `key`.
    pub fn create(
        &self,
        key: &str,
        config: AnalyzerConfig,
    ) -> Result<Box<dyn Analyzer>, RegistryError> {
        let constructor = self
            .entries
            .get(key)
            .ok_or_else(|| RegistryError::UnknownAnalyzer(key.to_string()))?;
        constructor(config).map_err(|source| RegistryError::Construction {
            key: key.to_string(),
            source,
        })
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static REGISTRY: OnceCell<AnalyzerRegistry> = OnceCell::new();

/// Build the default registry table.
///
/// Kept separate from [`bootstrap`] so tests can build isolated
/// registries.
pub fn build_default_registry() -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();

    let entries: &[(&str, Constructor)] = &[
        ("performance:clippy", |c| Ok(Box::new(ClippyAnalyzer::new(c)))),
        ("performance:dotnet", |c| Ok(Box::new(DotnetAnalyzer::new(c)))),
        ("performance:golangci-lint", |c| {
            Ok(Box::new(GolangciLintAnalyzer::new(c)))
        }),
        ("performance:ruff", |c| Ok(Box::new(RuffAnalyzer::new(c)))),
        ("performance:semgrep", |c| Ok(Box::new(SemgrepAnalyzer::new(c)))),
        ("performance:sql", |c| Ok(Box::new(SqlAnalyzer::new(c)))),
        ("security:osv", |c| Ok(Box::new(OsvScannerAnalyzer::new(c)))),
    ];

    for (key, constructor) in entries {
        registry
            .register(*key, *constructor)
            .expect("default registry keys are unique");
    }

    registry
}

/// Populate the process-wide registry once and return it.
///
/// Idempotent; later calls return the same table.
pub fn bootstrap() -> &'static AnalyzerRegistry {
    REGISTRY.get_or_init(build_default_registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_registers_all_analyzers() {
        let registry = bootstrap();
        for key in [
            "performance:clippy",
            "performance:dotnet",
            "performance:golangci-lint",
            "performance:ruff",
            "performance:semgrep",
            "performance:sql",
            "security:osv",
        ] {
            assert!(registry.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_bootstrap_idempotent() {
        let a = bootstrap() as *const AnalyzerRegistry;
        let b = bootstrap() as *const AnalyzerRegistry;
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = AnalyzerRegistry::new();
        registry
            .register("performance:sql", |c| Ok(Box::new(SqlAnalyzer::new(c))))
            .unwrap();
        let err = registry
            .register("performance:sql", |c| Ok(Box::new(SqlAnalyzer::new(c))))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey(_)));
    }

    #[test]
    fn test_unknown_key_errors() {
        let registry = build_default_registry();
        let err = registry
            .create("performance:no-such-tool", AnalyzerConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::UnknownAnalyzer(_)));
    }

    #[test]
    fn test_create_builds_adapter() {
        let registry = build_default_registry();
        let analyzer = registry
            .create("performance:sql", AnalyzerConfig::default())
            .unwrap();
        assert_eq!(analyzer.key(), "performance:sql");
        assert_eq!(analyzer.category(), "performance");
    }

    #[test]
    fn test_keys_sorted() {
        let registry = build_default_registry();
        let keys = registry.keys();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(registry.len(), 7);
    }
}
