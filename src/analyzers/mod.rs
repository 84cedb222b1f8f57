//! Metric analyzers
//!
//! Each analyzer is a read-only pass over the frozen `SemanticModel` that
//! owns a disjoint set of metrics. The engine runs them in parallel and then
//! hands the results to the scope rollup.

pub mod base;
pub mod cohesion;
pub mod coupling;
pub mod engine;
pub mod halstead;
pub mod inheritance;
pub mod size;

pub use base::{
    AnalysisContext, AnalysisSummary, Analyzer, AnalyzerConfig, AnalyzerInfo, AnalyzerResult,
};
pub use cohesion::CohesionAnalyzer;
pub use coupling::CouplingAnalyzer;
pub use engine::{AnalysisEngine, AnalysisReport};
pub use halstead::{HalsteadAnalyzer, HalsteadCounts};
pub use inheritance::InheritanceAnalyzer;
pub use size::SizeAnalyzer;
