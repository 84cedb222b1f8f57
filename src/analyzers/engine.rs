//! Analysis engine with parallel support
//!
//! The AnalysisEngine orchestrates a full metrics run:
//! - Runs every enabled analyzer in parallel using rayon
//! - Collects per-analyzer timings and failures
//! - Runs the scope rollup once all analyzers are done
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    AnalysisEngine                       │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Register analyzers (metric ownership checked)       │
//! │  2. Run enabled analyzers in parallel (rayon)           │
//! │  3. Barrier                                             │
//! │  4. Roll up into namespaces and the program             │
//! │  5. Snapshot results and anomalies                      │
//! └─────────────────────────────────────────────────────────┘
//! ```

use crate::aggregate::MetricsAggregator;
use crate::analyzers::base::{
    AnalysisContext, AnalysisSummary, Analyzer, AnalyzerInfo, AnalyzerResult,
};
use crate::analyzers::{
    CohesionAnalyzer, CouplingAnalyzer, HalsteadAnalyzer, InheritanceAnalyzer, SizeAnalyzer,
};
use crate::config::EngineConfig;
use crate::error::{MetricsError, MetricsResult};
use crate::metrics::{Anomaly, AnomalyLog, Metric, ResultsSnapshot, ResultsTable};
use crate::model::{EntityId, ModelStats, SemanticModel};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

const AGGREGATOR_NAME: &str = "MetricsAggregator";
const AGGREGATOR_CATEGORY: &str = "rollup";

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub program: String,
    pub model: ModelStats,
    /// Qualified name of every entity that has results
    pub entity_names: BTreeMap<EntityId, String>,
    /// Analyzers that took part in the run
    pub analyzers: Vec<AnalyzerInfo>,
    pub results: ResultsSnapshot,
    pub anomalies: Vec<Anomaly>,
    pub timings: Vec<AnalyzerResult>,
    pub summary: AnalysisSummary,
}

/// Orchestrates metric computation across all registered analyzers
pub struct AnalysisEngine {
    analyzers: Vec<Arc<dyn Analyzer>>,
    /// Which analyzer owns each metric
    owners: FxHashMap<Metric, &'static str>,
    workers: usize,
    config: EngineConfig,
}

impl AnalysisEngine {
    /// Create an engine with the five standard analyzers registered
    pub fn new(config: EngineConfig) -> MetricsResult<Self> {
        config.validate()?;
        let mut engine = Self::empty(config);

        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(InheritanceAnalyzer::with_config(
                engine.config.analyzer_config("inheritance"),
            )),
            Arc::new(CohesionAnalyzer::with_config(
                engine.config.analyzer_config("cohesion"),
            )),
            Arc::new(CouplingAnalyzer::with_config(
                engine.config.analyzer_config("coupling"),
            )),
            Arc::new(HalsteadAnalyzer::with_config(
                engine.config.analyzer_config("halstead"),
            )),
            Arc::new(SizeAnalyzer::with_config(engine.config.analyzer_config("size"))),
        ];
        engine.register_all(analyzers)?;
        Ok(engine)
    }

    /// Create an engine with no analyzers registered
    pub fn empty(config: EngineConfig) -> Self {
        let workers = config.effective_workers();
        let mut owners = FxHashMap::default();
        for &metric in MetricsAggregator::metrics() {
            owners.insert(metric, AGGREGATOR_NAME);
        }
        Self {
            analyzers: Vec::new(),
            owners,
            workers,
            config,
        }
    }

    /// Register an analyzer; fails if one of its metrics is already owned
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> MetricsResult<()> {
        for &metric in analyzer.metrics() {
            if let Some(first) = self.owners.get(&metric) {
                return Err(MetricsError::MetricOwnedTwice {
                    metric: metric.to_string(),
                    first: first.to_string(),
                    second: analyzer.name().to_string(),
                });
            }
        }
        for &metric in analyzer.metrics() {
            self.owners.insert(metric, analyzer.name());
        }
        debug!("Registering analyzer: {}", analyzer.name());
        self.analyzers.push(analyzer);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        analyzers: impl IntoIterator<Item = Arc<dyn Analyzer>>,
    ) -> MetricsResult<()> {
        for analyzer in analyzers {
            self.register(analyzer)?;
        }
        Ok(())
    }

    pub fn analyzer_count(&self) -> usize {
        self.analyzers.len()
    }

    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Name, category, description, metrics and options of every registered analyzer
    pub fn describe(&self) -> Vec<AnalyzerInfo> {
        self.analyzers
            .iter()
            .map(|a| AnalyzerInfo::of(a.as_ref()))
            .collect()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all enabled analyzers, then the rollup, over a frozen model
    pub fn run(&self, model: &SemanticModel) -> anyhow::Result<AnalysisReport> {
        let start = Instant::now();

        let enabled: Vec<Arc<dyn Analyzer>> = self
            .analyzers
            .iter()
            .filter(|a| {
                let on = self.config.is_analyzer_enabled(a.name());
                if !on {
                    debug!("Skipping disabled analyzer: {}", a.name());
                }
                on
            })
            .cloned()
            .collect();

        info!(
            "Starting analysis with {} analyzers on {} workers",
            enabled.len(),
            self.workers
        );

        let results = ResultsTable::new();
        let anomalies = AnomalyLog::new();
        anomalies.extend(model.anomalies().iter().cloned());
        let ctx = AnalysisContext::new(model, &results, &anomalies);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        let mut timings: Vec<AnalyzerResult> = pool.install(|| {
            enabled
                .par_iter()
                .map(|analyzer| self.run_single_analyzer(analyzer, &ctx))
                .collect()
        });

        // Every analyzer has finished; rollup reads completed values only
        let produced: FxHashSet<Metric> = enabled
            .iter()
            .zip(&timings)
            .filter(|(_, result)| result.success)
            .flat_map(|(analyzer, _)| analyzer.metrics().iter().copied())
            .collect();

        let rollup_start = Instant::now();
        let rollup = MetricsAggregator::new().rollup(model, &results, &produced);
        let rollup_ms = rollup_start.elapsed().as_millis() as u64;
        let rollup_result = match rollup {
            Ok(n) => AnalyzerResult::success(AGGREGATOR_NAME.to_string(), n, rollup_ms),
            Err(e) => {
                warn!("Rollup failed: {}", e);
                AnalyzerResult::failure(AGGREGATOR_NAME.to_string(), e.to_string(), rollup_ms)
            }
        };
        timings.push(rollup_result.with_category(AGGREGATOR_CATEGORY));

        let mut summary = AnalysisSummary::default();
        for result in &timings {
            summary.add_result(result);
            if let Some(err) = &result.error {
                warn!("Analyzer {} failed: {}", result.analyzer_name, err);
            }
        }

        let snapshot = results.snapshot();
        let entity_names = snapshot
            .entities
            .keys()
            .map(|&id| (id, model.qualified_name(id).to_string()))
            .collect();

        let report = AnalysisReport {
            program: model.qualified_name(model.program()).to_string(),
            model: model.stats(),
            entity_names,
            analyzers: enabled.iter().map(|a| AnalyzerInfo::of(a.as_ref())).collect(),
            results: snapshot,
            anomalies: anomalies.into_sorted(),
            timings,
            summary,
        };

        info!(
            "Analysis complete: {} values for {} entities, {} anomalies in {:?}",
            report.results.len(),
            report.results.entities.len(),
            report.anomalies.len(),
            start.elapsed()
        );

        Ok(report)
    }

    /// Run a single analyzer, turning errors and panics into a failed result
    fn run_single_analyzer(
        &self,
        analyzer: &Arc<dyn Analyzer>,
        ctx: &AnalysisContext<'_>,
    ) -> AnalyzerResult {
        let name = analyzer.name().to_string();
        let category = analyzer.category();
        let start = Instant::now();

        debug!("Running analyzer: {}", name);

        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| analyzer.analyze(ctx)));
        let duration = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(recorded)) => {
                debug!(
                    "Analyzer {} recorded {} values in {}ms",
                    name, recorded, duration
                );
                AnalyzerResult::success(name, recorded, duration)
            }
            Ok(Err(e)) => {
                debug!("Analyzer {} stopped: {}", name, e);
                AnalyzerResult::failure(name, e.to_string(), duration)
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!("Analyzer {} panicked: {}", name, panic_msg);
                AnalyzerResult::failure(name, format!("Panic: {}", panic_msg), duration)
            }
        };
        result.with_category(category)
    }
}
