//! Base analyzer trait and types
//!
//! This module defines the core abstractions for metric computation:
//! - `Analyzer` trait that every metric family implements
//! - `AnalysisContext` bundling the frozen model with the shared sinks
//! - `AnalyzerResult` for capturing execution results
//! - `AnalyzerInfo` describing a registered analyzer in reports

use crate::error::MetricsResult;
use crate::metrics::{Anomaly, AnomalyLog, Metric, ResultsTable};
use crate::model::{EntityId, SemanticModel};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Result from running a single analyzer
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerResult {
    /// Name of the analyzer that produced these results
    pub analyzer_name: String,
    /// Metric family of the analyzer
    pub category: String,
    /// Number of (entity, metric) values written
    pub values_recorded: usize,
    /// Execution time in milliseconds
    pub duration_ms: u64,
    /// Whether the analyzer completed successfully
    pub success: bool,
    /// Error message if the analyzer failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerResult {
    pub fn success(analyzer_name: String, values_recorded: usize, duration_ms: u64) -> Self {
        Self {
            analyzer_name,
            category: String::new(),
            values_recorded,
            duration_ms,
            success: true,
            error: None,
        }
    }

    pub fn failure(analyzer_name: String, error: String, duration_ms: u64) -> Self {
        Self {
            analyzer_name,
            category: String::new(),
            values_recorded: 0,
            duration_ms,
            success: false,
            error: Some(error),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }
}

/// What a registered analyzer measures and the options it runs with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerInfo {
    pub name: String,
    pub category: String,
    pub description: String,
    pub metrics: Vec<Metric>,
    /// Options sorted by key; empty for analyzers without configuration
    pub options: BTreeMap<String, serde_json::Value>,
}

impl AnalyzerInfo {
    pub fn of(analyzer: &dyn Analyzer) -> Self {
        Self {
            name: analyzer.name().to_string(),
            category: analyzer.category().to_string(),
            description: analyzer.description().to_string(),
            metrics: analyzer.metrics().to_vec(),
            options: analyzer
                .config()
                .map(|c| c.options.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
        }
    }
}

/// Configuration options for analyzers
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Analyzer-specific options
    pub options: HashMap<String, serde_json::Value>,
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Get a typed option value
    pub fn get_option<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get an option with a default value
    pub fn get_option_or<T: serde::de::DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_option(key).unwrap_or(default)
    }
}

/// What an analyzer sees while it runs: the frozen model plus the two
/// append-only sinks shared with every other analyzer.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub model: &'a SemanticModel,
    pub results: &'a ResultsTable,
    pub anomalies: &'a AnomalyLog,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        model: &'a SemanticModel,
        results: &'a ResultsTable,
        anomalies: &'a AnomalyLog,
    ) -> Self {
        Self {
            model,
            results,
            anomalies,
        }
    }

    pub fn record(&self, entity: EntityId, metric: Metric, value: f64) -> MetricsResult<()> {
        self.results.record(entity, metric, value)
    }

    pub fn record_count(&self, entity: EntityId, metric: Metric, value: usize) -> MetricsResult<()> {
        self.results.record_count(entity, metric, value)
    }

    pub fn anomaly(&self, anomaly: Anomaly) {
        self.anomalies.record(anomaly);
    }
}

/// Trait for all metric analyzers
///
/// An analyzer is a read-only pass over the semantic model. It writes one
/// value per (entity, metric) for the metrics it owns and nothing else; the
/// engine rejects two analyzers that claim the same metric.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MethodCountAnalyzer;
///
/// impl Analyzer for MethodCountAnalyzer {
///     fn name(&self) -> &'static str {
///         "MethodCountAnalyzer"
///     }
///
///     fn description(&self) -> &'static str {
///         "Counts methods per class"
///     }
///
///     fn metrics(&self) -> &'static [Metric] {
///         &[Metric::Nm]
///     }
///
///     fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize> {
///         let mut recorded = 0;
///         for class in ctx.model.classes() {
///             ctx.record_count(class.id, Metric::Nm, ctx.model.methods(class.id).count())?;
///             recorded += 1;
///         }
///         Ok(recorded)
///     }
/// }
/// ```
pub trait Analyzer: Send + Sync {
    /// Unique identifier for this analyzer (e.g. "CohesionAnalyzer")
    fn name(&self) -> &'static str;

    /// Human-readable description of what this analyzer measures
    fn description(&self) -> &'static str;

    /// Metrics this analyzer writes; disjoint across registered analyzers
    fn metrics(&self) -> &'static [Metric];

    /// Compute and record metric values, returning how many were written
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize>;

    /// Metric family, used for grouping in reports
    fn category(&self) -> &'static str {
        "metrics"
    }

    fn config(&self) -> Option<&AnalyzerConfig> {
        None
    }
}

/// Summary statistics from running all analyzers
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisSummary {
    pub analyzers_run: usize,
    pub analyzers_succeeded: usize,
    pub analyzers_failed: usize,
    pub values_recorded: usize,
    pub total_duration_ms: u64,
}

impl AnalysisSummary {
    pub fn add_result(&mut self, result: &AnalyzerResult) {
        self.analyzers_run += 1;
        self.total_duration_ms += result.duration_ms;

        if result.success {
            self.analyzers_succeeded += 1;
            self.values_recorded += result.values_recorded;
        } else {
            self.analyzers_failed += 1;
        }
    }
}
