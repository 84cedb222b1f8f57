//! Cohesion analyzer - LCOM5
//!
//! For each class, the methods it declares become nodes of an undirected
//! graph. Two methods are joined when their touch sets share an element, or
//! when one calls the other. LCOM5 is the number of connected components.
//!
//! The touch set of a method, relative to its class `C`:
//! - attributes owned by `C` or by any ancestor of `C`
//! - static attributes of any class, globals (when `shared_global_state`)
//! - every method it calls, plus the direct touches of that callee
//!
//! Attributes of unrelated classes reached through a member object do not
//! count. A method touching nothing is a singleton component.

use crate::analyzers::base::{AnalysisContext, Analyzer, AnalyzerConfig};
use crate::analyzers::inheritance::ancestors;
use crate::error::MetricsResult;
use crate::metrics::{Anomaly, Metric};
use crate::model::{EdgeKind, EntityId, EntityKind, SemanticModel};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::debug;

const DEFAULT_MAX_DEPTH: usize = 64;

/// Edge kinds through which a method touches state or behaviour
const TOUCH_EDGES: [EdgeKind; 3] = [EdgeKind::AccessesAttribute, EdgeKind::Uses, EdgeKind::Calls];

pub struct CohesionAnalyzer {
    config: AnalyzerConfig,
    shared_global_state: bool,
    max_depth: usize,
}

/// Per-class view used while building touch sets
struct ClassScope {
    class: EntityId,
    ancestors: FxHashSet<EntityId>,
}

impl CohesionAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::new())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            shared_global_state: config.get_option_or("shared_global_state", true),
            max_depth: config.get_option_or("max_depth", DEFAULT_MAX_DEPTH).max(1),
            config,
        }
    }

    /// Whether a referenced entity belongs in a touch set of `scope.class`
    fn counts(&self, model: &SemanticModel, scope: &ClassScope, target: EntityId) -> bool {
        let Some(entity) = model.entity(target) else {
            return false;
        };
        match entity.kind {
            EntityKind::Attribute => {
                let owner = model.enclosing_class(target);
                match owner {
                    Some(o) if o == scope.class || scope.ancestors.contains(&o) => true,
                    _ => entity.is_static && self.shared_global_state,
                }
            }
            EntityKind::Method => true,
            EntityKind::GlobalFunction | EntityKind::GlobalVariable => self.shared_global_state,
            EntityKind::Program
            | EntityKind::Namespace
            | EntityKind::Class
            | EntityKind::TemplateClass
            | EntityKind::TemplateSpecialization => false,
        }
    }

    /// Elements `method` reaches through its own edges, excluding itself
    fn direct_touches(
        &self,
        model: &SemanticModel,
        scope: &ClassScope,
        method: EntityId,
    ) -> BTreeSet<EntityId> {
        TOUCH_EDGES
            .iter()
            .flat_map(|&kind| model.edges_from(method, Some(kind)))
            .map(|e| e.target)
            .filter(|&t| t != method && self.counts(model, scope, t))
            .collect()
    }

    /// Direct touches plus one level of callee touches
    fn touch_set(
        &self,
        model: &SemanticModel,
        scope: &ClassScope,
        method: EntityId,
    ) -> BTreeSet<EntityId> {
        let direct = self.direct_touches(model, scope, method);
        let mut touches = direct.clone();
        for &callee in &direct {
            if model.kind(callee).is_some_and(EntityKind::is_callable) {
                touches.extend(
                    self.direct_touches(model, scope, callee)
                        .into_iter()
                        .filter(|&t| t != method),
                );
            }
        }
        touches
    }

    /// Connected components over the declared methods of `class`
    pub fn lcom5(&self, model: &SemanticModel, class: EntityId) -> usize {
        self.components(model, class).0
    }

    /// LCOM5 plus whether the ancestor walk stopped at the depth bound
    fn components(&self, model: &SemanticModel, class: EntityId) -> (usize, bool) {
        let methods: Vec<EntityId> = model.methods(class).map(|m| m.id).collect();
        if methods.is_empty() {
            return (0, false);
        }

        let up = ancestors(model, class, self.max_depth);
        let scope = ClassScope {
            class,
            ancestors: up.reached.into_iter().collect(),
        };

        let mut graph: UnGraph<EntityId, ()> = UnGraph::default();
        let nodes: FxHashMap<EntityId, NodeIndex> =
            methods.iter().map(|&m| (m, graph.add_node(m))).collect();

        // First method seen touching each element
        let mut owner_of: FxHashMap<EntityId, NodeIndex> = FxHashMap::default();
        for &m in &methods {
            let node = nodes[&m];
            let touches = self.touch_set(model, &scope, m);
            if touches.is_empty() {
                debug!("{} touches nothing", model.qualified_name(m));
            }
            for element in touches {
                if let Some(&callee) = nodes.get(&element) {
                    graph.update_edge(node, callee, ());
                }
                match owner_of.get(&element) {
                    Some(&first) if first != node => {
                        graph.update_edge(first, node, ());
                    }
                    Some(_) => {}
                    None => {
                        owner_of.insert(element, node);
                    }
                }
            }
        }

        (connected_components(&graph), up.truncated)
    }
}

impl Default for CohesionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CohesionAnalyzer {
    fn name(&self) -> &'static str {
        "CohesionAnalyzer"
    }

    fn description(&self) -> &'static str {
        "Counts connected components of each class's method access graph (LCOM5)"
    }

    fn metrics(&self) -> &'static [Metric] {
        &[Metric::Lcom5]
    }

    fn category(&self) -> &'static str {
        "cohesion"
    }

    fn config(&self) -> Option<&AnalyzerConfig> {
        Some(&self.config)
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize> {
        let classes: Vec<EntityId> = ctx.model.classes().map(|c| c.id).collect();

        classes.par_iter().try_for_each(|&class| {
            let (lcom5, truncated) = self.components(ctx.model, class);
            if truncated {
                ctx.anomaly(Anomaly::DegenerateRecursion {
                    entity: ctx.model.qualified_name(class).to_string(),
                    traversal: "ancestors".to_string(),
                    depth: self.max_depth,
                });
            }
            ctx.record_count(class, Metric::Lcom5, lcom5)
        })?;

        debug!("LCOM5 for {} classes", classes.len());
        Ok(classes.len())
    }
}
