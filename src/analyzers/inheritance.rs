//! Inheritance analyzer - NOA, NOC, NOP, NOD and DIT
//!
//! All traversals go over `Inherits` edges by entity id with a visited set,
//! so a diamond is counted once. Every walk is bounded by `max_depth`; a walk
//! that reaches the bound keeps its partial result and records a
//! `DegenerateRecursion` anomaly.

use crate::analyzers::base::{AnalysisContext, Analyzer, AnalyzerConfig};
use crate::error::MetricsResult;
use crate::metrics::{Anomaly, Metric};
use crate::model::{EntityId, SemanticModel};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

const DEFAULT_MAX_DEPTH: usize = 64;

/// Outcome of a bounded inheritance walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Traversal {
    /// Entities reached, excluding the start
    pub reached: Vec<EntityId>,
    /// Set when the walk stopped at the depth bound with work left
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    /// Towards subclasses; the flag admits local classes
    Down { include_local: bool },
}

/// Direct subclasses, leaving out local classes unless asked for
pub(crate) fn subclasses(
    model: &SemanticModel,
    class: EntityId,
    include_local: bool,
) -> impl Iterator<Item = EntityId> + '_ {
    model
        .child_classes(class)
        .filter(move |&c| include_local || !model.entity(c).is_some_and(|e| e.is_local))
}

fn neighbours(model: &SemanticModel, id: EntityId, dir: Direction) -> Vec<EntityId> {
    match dir {
        Direction::Up => model.parents(id).collect(),
        Direction::Down { include_local } => subclasses(model, id, include_local).collect(),
    }
}

fn walk(model: &SemanticModel, start: EntityId, max_depth: usize, dir: Direction) -> Traversal {
    let mut visited: FxHashSet<EntityId> = FxHashSet::default();
    visited.insert(start);
    let mut reached = Vec::new();
    let mut frontier = vec![start];
    let mut depth = 0;

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for &id in &frontier {
            for n in neighbours(model, id, dir) {
                if visited.insert(n) {
                    next.push(n);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        if depth == max_depth {
            return Traversal {
                reached,
                truncated: true,
            };
        }
        reached.extend_from_slice(&next);
        frontier = next;
        depth += 1;
    }

    Traversal {
        reached,
        truncated: false,
    }
}

/// All transitive base classes of `class`
pub(crate) fn ancestors(model: &SemanticModel, class: EntityId, max_depth: usize) -> Traversal {
    walk(model, class, max_depth, Direction::Up)
}

/// All transitive subclasses of `class`
pub(crate) fn descendants(
    model: &SemanticModel,
    class: EntityId,
    max_depth: usize,
    include_local: bool,
) -> Traversal {
    walk(model, class, max_depth, Direction::Down { include_local })
}

/// Length of the longest `Inherits` path from `class` to a root.
///
/// Layers are deduplicated but not visited-filtered, so a longer path through
/// an already seen class still counts. A cycle never empties the layer and
/// stops at the bound.
pub(crate) fn inheritance_depth(
    model: &SemanticModel,
    class: EntityId,
    max_depth: usize,
) -> (usize, bool) {
    let mut layer: FxHashSet<EntityId> = FxHashSet::default();
    layer.insert(class);
    let mut depth = 0;

    loop {
        let next: FxHashSet<EntityId> = layer.iter().flat_map(|&c| model.parents(c)).collect();
        if next.is_empty() {
            return (depth, false);
        }
        if depth == max_depth {
            return (depth, true);
        }
        layer = next;
        depth += 1;
    }
}

/// Number of ancestors, children, parents, descendants and depth of inheritance
pub struct InheritanceAnalyzer {
    config: AnalyzerConfig,
    max_depth: usize,
    /// Local classes (declared in a method or class body) count as children
    count_local_children: bool,
}

impl InheritanceAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::new())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        let max_depth = config.get_option_or("max_depth", DEFAULT_MAX_DEPTH).max(1);
        let count_local_children = config.get_option_or("count_local_children", false);
        Self {
            config,
            max_depth,
            count_local_children,
        }
    }

    fn degenerate(&self, ctx: &AnalysisContext<'_>, class: EntityId, traversal: &str) {
        ctx.anomaly(Anomaly::DegenerateRecursion {
            entity: ctx.model.qualified_name(class).to_string(),
            traversal: traversal.to_string(),
            depth: self.max_depth,
        });
    }

    fn analyze_class(&self, ctx: &AnalysisContext<'_>, class: EntityId) -> MetricsResult<usize> {
        let model = ctx.model;

        let nop = model.parents(class).count();
        let noc = subclasses(model, class, self.count_local_children).count();

        let up = ancestors(model, class, self.max_depth);
        if up.truncated {
            self.degenerate(ctx, class, "ancestors");
        }
        let down = descendants(model, class, self.max_depth, self.count_local_children);
        if down.truncated {
            self.degenerate(ctx, class, "descendants");
        }
        let (dit, dit_truncated) = inheritance_depth(model, class, self.max_depth);
        if dit_truncated {
            self.degenerate(ctx, class, "depth");
        }

        ctx.record_count(class, Metric::Nop, nop)?;
        ctx.record_count(class, Metric::Noc, noc)?;
        ctx.record_count(class, Metric::Noa, up.reached.len())?;
        ctx.record_count(class, Metric::Nod, down.reached.len())?;
        ctx.record_count(class, Metric::Dit, dit)?;
        Ok(5)
    }
}

impl Default for InheritanceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for InheritanceAnalyzer {
    fn name(&self) -> &'static str {
        "InheritanceAnalyzer"
    }

    fn description(&self) -> &'static str {
        "Counts ancestors, children, parents and descendants over the inheritance DAG"
    }

    fn metrics(&self) -> &'static [Metric] {
        &[Metric::Noa, Metric::Noc, Metric::Nop, Metric::Nod, Metric::Dit]
    }

    fn category(&self) -> &'static str {
        "inheritance"
    }

    fn config(&self) -> Option<&AnalyzerConfig> {
        Some(&self.config)
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize> {
        let classes: Vec<EntityId> = ctx.model.classes().map(|c| c.id).collect();
        let recorded = AtomicUsize::new(0);

        classes.par_iter().try_for_each(|&class| -> MetricsResult<()> {
            let n = self.analyze_class(ctx, class)?;
            recorded.fetch_add(n, Ordering::Relaxed);
            Ok(())
        })?;

        debug!("Inheritance metrics for {} classes", classes.len());
        Ok(recorded.into_inner())
    }
}
