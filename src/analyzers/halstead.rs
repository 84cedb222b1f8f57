//! Lexical complexity analyzer - the Halstead family
//!
//! Works on the pre-tokenized stream of each method and global function.
//! Operators are distinct when their `Operator` values differ; operands are
//! distinct when their resolved declarations differ, so a shadowing
//! parameter is a new operand even if it reuses an outer name.

use crate::analyzers::base::{AnalysisContext, Analyzer, AnalyzerConfig};
use crate::error::MetricsResult;
use crate::metrics::Metric;
use crate::model::{EntityId, LexToken, LexicalStream, OperandKey, Operator};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Raw operator and operand counts of one token stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HalsteadCounts {
    /// N1
    pub total_operators: usize,
    /// n1
    pub distinct_operators: usize,
    /// N2
    pub total_operands: usize,
    /// n2
    pub distinct_operands: usize,
}

impl HalsteadCounts {
    pub fn from_stream(stream: &LexicalStream) -> Self {
        let mut operators: FxHashSet<&Operator> = FxHashSet::default();
        let mut operands: FxHashSet<OperandKey> = FxHashSet::default();
        let mut counts = Self::default();

        for token in &stream.tokens {
            match token {
                LexToken::Operator(op) => {
                    counts.total_operators += 1;
                    operators.insert(op);
                }
                LexToken::Operand(operand) => {
                    counts.total_operands += 1;
                    operands.insert(operand.key());
                }
            }
        }

        counts.distinct_operators = operators.len();
        counts.distinct_operands = operands.len();
        counts
    }

    /// N = N1 + N2
    pub fn length(&self) -> usize {
        self.total_operators + self.total_operands
    }

    /// n = n1 + n2
    pub fn vocabulary(&self) -> usize {
        self.distinct_operators + self.distinct_operands
    }

    /// V = N * log2(n)
    pub fn volume(&self) -> f64 {
        let n = self.vocabulary();
        if n == 0 {
            return 0.0;
        }
        self.length() as f64 * (n as f64).log2()
    }

    /// n1 * log2(n1) + n2 * log2(n2)
    pub fn calculated_length(&self) -> f64 {
        x_log2_x(self.distinct_operators) + x_log2_x(self.distinct_operands)
    }

    /// D = (n1 / 2) * (N2 / n2)
    pub fn difficulty(&self) -> f64 {
        if self.distinct_operands == 0 {
            return 0.0;
        }
        (self.distinct_operators as f64 / 2.0)
            * (self.total_operands as f64 / self.distinct_operands as f64)
    }

    /// E = D * V
    pub fn effort(&self) -> f64 {
        self.difficulty() * self.volume()
    }

    /// T = E / 18, in seconds
    pub fn time_to_program(&self) -> f64 {
        self.effort() / 18.0
    }

    /// B = V / 3000
    pub fn delivered_bugs(&self) -> f64 {
        self.volume() / 3000.0
    }
}

fn x_log2_x(x: usize) -> f64 {
    if x == 0 {
        0.0
    } else {
        x as f64 * (x as f64).log2()
    }
}

pub struct HalsteadAnalyzer {
    config: AnalyzerConfig,
}

impl HalsteadAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::new())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    fn record_counts(
        &self,
        ctx: &AnalysisContext<'_>,
        id: EntityId,
        counts: &HalsteadCounts,
    ) -> MetricsResult<usize> {
        let values = [
            (Metric::TotalOperators, counts.total_operators as f64),
            (Metric::DistinctOperators, counts.distinct_operators as f64),
            (Metric::TotalOperands, counts.total_operands as f64),
            (Metric::DistinctOperands, counts.distinct_operands as f64),
            (Metric::Hpl, counts.length() as f64),
            (Metric::Hpv, counts.vocabulary() as f64),
            (Metric::Hvol, counts.volume()),
            (Metric::Hcpl, counts.calculated_length()),
            (Metric::Hdif, counts.difficulty()),
            (Metric::Heff, counts.effort()),
            (Metric::Htrp, counts.time_to_program()),
            (Metric::Hndb, counts.delivered_bugs()),
        ];
        for (metric, value) in values {
            ctx.record(id, metric, value)?;
        }
        Ok(values.len())
    }
}

impl Default for HalsteadAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for HalsteadAnalyzer {
    fn name(&self) -> &'static str {
        "HalsteadAnalyzer"
    }

    fn description(&self) -> &'static str {
        "Counts operators and operands of each callable and derives Halstead measures"
    }

    fn metrics(&self) -> &'static [Metric] {
        &[
            Metric::TotalOperators,
            Metric::DistinctOperators,
            Metric::TotalOperands,
            Metric::DistinctOperands,
            Metric::Hpl,
            Metric::Hpv,
            Metric::Hvol,
            Metric::Hcpl,
            Metric::Hdif,
            Metric::Heff,
            Metric::Htrp,
            Metric::Hndb,
        ]
    }

    fn category(&self) -> &'static str {
        "complexity"
    }

    fn config(&self) -> Option<&AnalyzerConfig> {
        Some(&self.config)
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize> {
        let callables: Vec<(EntityId, &LexicalStream)> = ctx
            .model
            .entities()
            .filter(|e| e.kind.is_callable())
            .filter_map(|e| e.lexical.as_ref().map(|l| (e.id, l)))
            .collect();
        let recorded = AtomicUsize::new(0);

        callables.par_iter().try_for_each(|&(id, stream)| -> MetricsResult<()> {
            let counts = HalsteadCounts::from_stream(stream);
            let n = self.record_counts(ctx, id, &counts)?;
            recorded.fetch_add(n, Ordering::Relaxed);
            Ok(())
        })?;

        debug!("Halstead metrics for {} callables", callables.len());
        Ok(recorded.into_inner())
    }
}
