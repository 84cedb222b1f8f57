//! Engine configuration support
//!
//! Loads configuration from `oometrics.toml` or `.oometricsrc.json` in a
//! directory, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # oometrics.toml
//!
//! [engine]
//! workers = 8
//! disabled_analyzers = ["halstead"]
//!
//! [inheritance]
//! max_depth = 64
//! count_local_children = false
//!
//! [cohesion]
//! shared_global_state = true
//!
//! [coupling]
//! count_global_entities = true
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::analyzers::AnalyzerConfig;
use crate::error::{MetricsError, MetricsResult};

/// Upper bound on worker threads when `workers = 0`
const MAX_AUTO_WORKERS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub inheritance: InheritanceConfig,
    #[serde(default)]
    pub cohesion: CohesionConfig,
    #[serde(default)]
    pub coupling: CouplingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Worker threads for the analyzer pool (0 = auto)
    #[serde(default)]
    pub workers: usize,
    /// Analyzers to skip, by name (`cohesion`, `CouplingAnalyzer`, ...)
    #[serde(default)]
    pub disabled_analyzers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InheritanceConfig {
    /// Depth at which inheritance traversals give up
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Local classes count towards NOC and NOD of their bases
    #[serde(default)]
    pub count_local_children: bool,
}

fn default_max_depth() -> usize {
    64
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            count_local_children: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohesionConfig {
    /// Static attributes and globals connect the methods touching them
    #[serde(default = "default_true")]
    pub shared_global_state: bool,
}

impl Default for CohesionConfig {
    fn default() -> Self {
        Self {
            shared_global_state: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Global functions and variables count as coupling targets
    #[serde(default = "default_true")]
    pub count_global_entities: bool,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            count_global_entities: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Load engine configuration from a directory.
///
/// Searches for configuration files in this order:
/// 1. `oometrics.toml`
/// 2. `.oometricsrc.json`
///
/// A file that fails to parse is skipped with a warning. Returns the default
/// configuration if nothing loads.
pub fn load_config(dir: &Path) -> EngineConfig {
    let toml_path = dir.join("oometrics.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", toml_path.display(), e);
            }
        }
    }

    let json_path = dir.join(".oometricsrc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", json_path.display(), e);
            }
        }
    }

    debug!("No config found in {}, using defaults", dir.display());
    EngineConfig::default()
}

/// Load configuration from an explicit file; `.json` is parsed as JSON,
/// anything else as TOML. Errors propagate.
pub fn load_config_file(path: &Path) -> anyhow::Result<EngineConfig> {
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json_config(path)?,
        _ => load_toml_config(path)?,
    };
    config.validate()?;
    Ok(config)
}

fn load_toml_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: EngineConfig =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: EngineConfig =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

impl EngineConfig {
    pub fn validate(&self) -> MetricsResult<()> {
        if self.inheritance.max_depth == 0 {
            return Err(MetricsError::Config(
                "inheritance.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker count with `0` resolved to the machine's parallelism
    pub fn effective_workers(&self) -> usize {
        if self.engine.workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(MAX_AUTO_WORKERS)
        } else {
            self.engine.workers
        }
    }

    /// Check if an analyzer is enabled (defaults to true)
    pub fn is_analyzer_enabled(&self, name: &str) -> bool {
        let normalized = normalize_analyzer_name(name);
        !self
            .engine
            .disabled_analyzers
            .iter()
            .any(|d| normalize_analyzer_name(d) == normalized)
    }

    /// Options handed to the analyzer registered under `name`
    pub fn analyzer_config(&self, name: &str) -> AnalyzerConfig {
        let config = AnalyzerConfig::new();
        match normalize_analyzer_name(name).as_str() {
            "inheritance" => config
                .with_option("max_depth", serde_json::json!(self.inheritance.max_depth))
                .with_option(
                    "count_local_children",
                    serde_json::json!(self.inheritance.count_local_children),
                ),
            "cohesion" => config
                .with_option(
                    "shared_global_state",
                    serde_json::json!(self.cohesion.shared_global_state),
                )
                .with_option("max_depth", serde_json::json!(self.inheritance.max_depth)),
            "coupling" => config.with_option(
                "count_global_entities",
                serde_json::json!(self.coupling.count_global_entities),
            ),
            _ => config,
        }
    }
}

/// Normalize an analyzer name for config lookup.
///
/// `CohesionAnalyzer`, `cohesion-analyzer` and `Cohesion` all become `cohesion`.
pub fn normalize_analyzer_name(name: &str) -> String {
    let lower: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    match lower.strip_suffix("analyzer") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.engine.workers, 0);
        assert_eq!(config.inheritance.max_depth, 64);
        assert!(config.cohesion.shared_global_state);
        assert!(config.coupling.count_global_entities);
        assert!(config.is_analyzer_enabled("CohesionAnalyzer"));
    }

    #[test]
    fn test_normalize_analyzer_name() {
        assert_eq!(normalize_analyzer_name("CohesionAnalyzer"), "cohesion");
        assert_eq!(normalize_analyzer_name("halstead"), "halstead");
        assert_eq!(normalize_analyzer_name("Size-Analyzer"), "size");
        assert_eq!(normalize_analyzer_name("analyzer"), "analyzer");
    }

    #[test]
    fn test_load_toml_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("oometrics.toml"),
            r#"
[engine]
workers = 3
disabled_analyzers = ["HalsteadAnalyzer"]

[cohesion]
shared_global_state = false
"#,
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.engine.workers, 3);
        assert_eq!(config.effective_workers(), 3);
        assert!(!config.is_analyzer_enabled("halstead"));
        assert!(config.is_analyzer_enabled("size"));
        assert!(!config.cohesion.shared_global_state);
        // Untouched sections keep their defaults
        assert_eq!(config.inheritance.max_depth, 64);
    }

    #[test]
    fn test_load_json_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".oometricsrc.json"),
            r#"{ "inheritance": { "max_depth": 5 } }"#,
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.inheritance.max_depth, 5);
        let options = config.analyzer_config("InheritanceAnalyzer");
        assert_eq!(options.get_option::<usize>("max_depth"), Some(5));
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("oometrics.toml"), "[engine\nworkers = ").unwrap();

        let config = load_config(dir.path());
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_explicit_file_errors_propagate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[inheritance]\nmax_depth = 0\n").unwrap();
        assert!(load_config_file(&path).is_err());
        assert!(load_config_file(&dir.path().join("missing.toml")).is_err());
    }
}
