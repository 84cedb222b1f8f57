//! oometrics - object-oriented quality metrics
//!
//! Computes cohesion (LCOM5), coupling (CBO), inheritance (NOA, NOC, NOP),
//! Halstead and size/documentation metrics from the semantic model of an
//! analyzed program, and rolls them up to namespaces and the program.

pub mod aggregate;
pub mod analyzers;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;

pub use aggregate::MetricsAggregator;
pub use analyzers::{AnalysisEngine, AnalysisReport};
pub use config::EngineConfig;
pub use error::{MetricsError, MetricsResult, ModelError, ModelResult};
pub use metrics::{Anomaly, Metric, ResultsSnapshot, ResultsTable};
pub use model::{EdgeKind, EntityDecl, EntityId, EntityKind, SemanticModel};
