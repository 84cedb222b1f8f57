//! Scope rollup of per-entity metrics
//!
//! Runs after every analyzer has finished. Namespaces and the program
//! receive totals over what they contain, visited deepest scope first so a
//! namespace's total is complete before it is folded into its parent.
//! Ratios (CD) and per-class structural counts are never rolled up.

use crate::error::MetricsResult;
use crate::metrics::{Metric, ResultsTable};
use crate::model::{Entity, EntityId, EntityKind, SemanticModel};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Which entities of a scope feed a rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contributors {
    /// Entities whose lines are not folded into an enclosing entity: every
    /// class-like entity, nested ones included, plus globals
    LineOwners,
    /// Every class-like entity whose nearest scope is this one
    Classes,
    /// Every method and global function whose nearest scope is this one
    Callables,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    /// Sum of a per-entity metric
    Sum(Metric),
    /// Number of contributing entities
    Count,
}

#[derive(Debug, Clone, Copy)]
struct Rollup {
    target: Metric,
    source: Source,
    over: Contributors,
}

const ROLLUPS: [Rollup; 6] = [
    Rollup {
        target: Metric::Tlloc,
        source: Source::Sum(Metric::Lloc),
        over: Contributors::LineOwners,
    },
    Rollup {
        target: Metric::Tcloc,
        source: Source::Sum(Metric::Cloc),
        over: Contributors::LineOwners,
    },
    Rollup {
        target: Metric::Tdloc,
        source: Source::Sum(Metric::Dloc),
        over: Contributors::LineOwners,
    },
    Rollup {
        target: Metric::Tcbo,
        source: Source::Sum(Metric::Cbo),
        over: Contributors::Classes,
    },
    Rollup {
        target: Metric::Tncl,
        source: Source::Count,
        over: Contributors::Classes,
    },
    Rollup {
        target: Metric::Tnm,
        source: Source::Count,
        over: Contributors::Callables,
    },
];

impl Contributors {
    fn includes(self, model: &SemanticModel, entity: &Entity) -> bool {
        match self {
            Contributors::LineOwners => {
                entity.kind.is_class_like()
                    || (entity.kind.is_global()
                        && entity
                            .scope
                            .and_then(|s| model.kind(s))
                            .is_some_and(EntityKind::is_scope))
            }
            Contributors::Classes => entity.kind.is_class_like(),
            Contributors::Callables => entity.kind.is_callable(),
        }
    }
}

/// Rolls per-entity values up to namespaces and the program
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Metrics written by the rollup pass
    pub fn metrics() -> &'static [Metric] {
        &[
            Metric::Tlloc,
            Metric::Tcloc,
            Metric::Tdloc,
            Metric::Tcbo,
            Metric::Tncl,
            Metric::Tnm,
        ]
    }

    /// Roll up into every namespace and the program.
    ///
    /// `produced` lists the per-entity metrics the analyzer pass wrote; a sum
    /// whose source metric was not produced is skipped rather than reported
    /// as zero.
    pub fn rollup(
        &self,
        model: &SemanticModel,
        results: &ResultsTable,
        produced: &FxHashSet<Metric>,
    ) -> MetricsResult<usize> {
        let active: Vec<Rollup> = ROLLUPS
            .iter()
            .copied()
            .filter(|r| match r.source {
                Source::Sum(m) => produced.contains(&m),
                Source::Count => true,
            })
            .collect();

        // Local contributions per scope, indexed like `active`
        let mut totals: FxHashMap<EntityId, Vec<f64>> = FxHashMap::default();
        let mut scopes: Vec<(usize, EntityId)> = Vec::new();

        for entity in model.entities() {
            if entity.kind.is_scope() {
                scopes.push((model.scope_depth(entity.id), entity.id));
                totals
                    .entry(entity.id)
                    .or_insert_with(|| vec![0.0; active.len()]);
                continue;
            }
            let Some(scope) = model.enclosing_scope(entity.id) else {
                continue;
            };
            let slot = totals
                .entry(scope)
                .or_insert_with(|| vec![0.0; active.len()]);
            for (i, rule) in active.iter().enumerate() {
                if !rule.over.includes(model, entity) {
                    continue;
                }
                slot[i] += match rule.source {
                    Source::Sum(metric) => results.get(entity.id, metric).unwrap_or(0.0),
                    Source::Count => 1.0,
                };
            }
        }

        // Deepest first; ties by id keep the pass deterministic
        scopes.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut recorded = 0;
        for &(_, scope) in &scopes {
            let values = totals
                .get(&scope)
                .cloned()
                .unwrap_or_else(|| vec![0.0; active.len()]);
            for (rule, value) in active.iter().zip(&values) {
                results.record(scope, rule.target, *value)?;
                recorded += 1;
            }
            if let Some(parent) = model.enclosing_scope(scope) {
                let slot = totals
                    .entry(parent)
                    .or_insert_with(|| vec![0.0; active.len()]);
                for (acc, value) in slot.iter_mut().zip(&values) {
                    *acc += value;
                }
            }
        }

        debug!(
            "Rolled up {} metrics into {} scopes",
            active.len(),
            scopes.len()
        );
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDecl, SizeInfo};

    fn all_produced() -> FxHashSet<Metric> {
        [Metric::Lloc, Metric::Cloc, Metric::Dloc, Metric::Cbo]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_nested_namespaces_fold_into_program() {
        let mut model = SemanticModel::new("p");
        let outer = model.add_entity(EntityDecl::namespace("outer"));
        let inner = model.add_entity(EntityDecl::namespace("outer::inner").in_scope(outer));
        let a = model.add_entity(
            EntityDecl::class("outer::inner::A")
                .in_scope(inner)
                .with_size(SizeInfo::new(10)),
        );
        let m = model.add_entity(EntityDecl::method("outer::inner::A::m").in_scope(a));
        let f = model.add_entity(EntityDecl::global_function("outer::f").in_scope(outer));

        let results = ResultsTable::new();
        results.record(a, Metric::Lloc, 10.0).unwrap();
        results.record(m, Metric::Lloc, 4.0).unwrap();
        results.record(f, Metric::Lloc, 3.0).unwrap();
        results.record(a, Metric::Cbo, 2.0).unwrap();

        MetricsAggregator::new()
            .rollup(&model, &results, &all_produced())
            .unwrap();

        // Method lines are part of the class body and are not added twice
        assert_eq!(results.get(inner, Metric::Tlloc), Some(10.0));
        assert_eq!(results.get(outer, Metric::Tlloc), Some(13.0));
        assert_eq!(results.get(model.program(), Metric::Tlloc), Some(13.0));
        assert_eq!(results.get(outer, Metric::Tncl), Some(1.0));
        assert_eq!(results.get(outer, Metric::Tnm), Some(2.0));
        assert_eq!(results.get(inner, Metric::Tnm), Some(1.0));
        assert_eq!(results.get(model.program(), Metric::Tcbo), Some(2.0));
        assert_eq!(results.get(a, Metric::Tlloc), None);
    }

    #[test]
    fn test_nested_class_lines_reach_the_namespace() {
        let mut model = SemanticModel::new("p");
        let ns = model.add_entity(EntityDecl::namespace("ns"));
        let outer = model.add_entity(EntityDecl::class("ns::Outer").in_scope(ns));
        let inner = model.add_entity(EntityDecl::class("ns::Outer::Inner").in_scope(outer));
        let run = model.add_entity(EntityDecl::method("ns::Outer::run").in_scope(outer));
        let local = model.add_entity(EntityDecl::class("ns::Outer::run::Local").in_scope(run).local());

        let results = ResultsTable::new();
        results.record(outer, Metric::Lloc, 6.0).unwrap();
        results.record(inner, Metric::Lloc, 2.0).unwrap();
        results.record(run, Metric::Lloc, 3.0).unwrap();
        results.record(local, Metric::Lloc, 1.0).unwrap();
        results.record(outer, Metric::Dloc, 1.0).unwrap();
        results.record(inner, Metric::Dloc, 2.0).unwrap();

        MetricsAggregator::new()
            .rollup(&model, &results, &all_produced())
            .unwrap();

        assert_eq!(results.get(ns, Metric::Tlloc), Some(9.0));
        assert_eq!(results.get(ns, Metric::Tdloc), Some(3.0));
        assert_eq!(results.get(model.program(), Metric::Tlloc), Some(9.0));
        assert_eq!(results.get(ns, Metric::Tncl), Some(3.0));
    }

    #[test]
    fn test_missing_source_metric_is_skipped() {
        let mut model = SemanticModel::new("p");
        model.add_entity(EntityDecl::class("A"));
        let results = ResultsTable::new();

        MetricsAggregator::new()
            .rollup(&model, &results, &FxHashSet::default())
            .unwrap();

        assert_eq!(results.get(model.program(), Metric::Tlloc), None);
        assert_eq!(results.get(model.program(), Metric::Tncl), Some(1.0));
    }
}
