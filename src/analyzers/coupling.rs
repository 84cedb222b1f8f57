//! Coupling analyzer - CBO, CBOI, RFC, NOI and NII
//!
//! CBO counts the distinct external entities a class references through any
//! relation kind, from the class itself or from its direct members. Member
//! targets resolve to their owning class. Repeated references, whether by
//! multiplicity or through several edge kinds, count once. Each template
//! specialization is its own entity and counts separately.
//!
//! CBOI is the inverse: how many classes have this class in their CBO set.
//!
//! The invocation metrics read `Calls` edges only, and an entity calling
//! itself never counts:
//! - NOI: distinct entities invoked by a callable, or by any member of a class
//! - NII: distinct entities invoking a callable, or any method of a class
//! - RFC: the methods a class declares plus everything its members invoke

use crate::analyzers::base::{AnalysisContext, Analyzer, AnalyzerConfig};
use crate::error::MetricsResult;
use crate::metrics::Metric;
use crate::model::{EdgeKind, EntityId, EntityKind, SemanticModel};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Entities `caller` invokes directly; repeated calls are one edge
fn invoked(model: &SemanticModel, caller: EntityId) -> impl Iterator<Item = EntityId> + '_ {
    model
        .edges_from(caller, Some(EdgeKind::Calls))
        .map(|e| e.target)
        .filter(move |&t| t != caller)
}

/// Entities invoking `callee` directly
fn invokers(model: &SemanticModel, callee: EntityId) -> impl Iterator<Item = EntityId> + '_ {
    model
        .edges_to(callee, Some(EdgeKind::Calls))
        .map(|e| e.source)
        .filter(move |&s| s != callee)
}

/// Distinct entities invoked from the methods and attribute initializers of `class`
pub fn outgoing_invocations(model: &SemanticModel, class: EntityId) -> BTreeSet<EntityId> {
    model
        .members(class)
        .flat_map(|m| invoked(model, m.id))
        .collect()
}

/// Distinct entities invoking any method of `class`
pub fn incoming_invocations(model: &SemanticModel, class: EntityId) -> BTreeSet<EntityId> {
    model
        .methods(class)
        .flat_map(|m| invokers(model, m.id))
        .collect()
}

/// Declared methods of `class` together with everything its members invoke
pub fn response_set(model: &SemanticModel, class: EntityId) -> BTreeSet<EntityId> {
    let mut set = outgoing_invocations(model, class);
    set.extend(model.methods(class).map(|m| m.id));
    set
}

pub struct CouplingAnalyzer {
    config: AnalyzerConfig,
    count_global_entities: bool,
}

impl CouplingAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::new())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            count_global_entities: config.get_option_or("count_global_entities", true),
            config,
        }
    }

    /// The entity a reference to `target` is charged to, if any
    fn resolve_target(&self, model: &SemanticModel, target: EntityId) -> Option<EntityId> {
        match model.kind(target)? {
            EntityKind::Class | EntityKind::TemplateClass | EntityKind::TemplateSpecialization => {
                Some(target)
            }
            EntityKind::Method | EntityKind::Attribute => model.enclosing_class(target),
            EntityKind::GlobalFunction | EntityKind::GlobalVariable => {
                if self.count_global_entities {
                    Some(target)
                } else {
                    model.enclosing_class(target)
                }
            }
            EntityKind::Program | EntityKind::Namespace => None,
        }
    }

    /// Distinct external entities `class` is coupled to
    pub fn coupled_entities(&self, model: &SemanticModel, class: EntityId) -> BTreeSet<EntityId> {
        let sources = std::iter::once(class).chain(model.members(class).map(|m| m.id));

        sources
            .flat_map(|source| model.edges_from(source, None))
            .filter_map(|edge| self.resolve_target(model, edge.target))
            .filter(|&target| target != class)
            .collect()
    }
}

impl Default for CouplingAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CouplingAnalyzer {
    fn name(&self) -> &'static str {
        "CouplingAnalyzer"
    }

    fn description(&self) -> &'static str {
        "Counts the entities each class references (CBO, CBOI) and the invocations around it (RFC, NOI, NII)"
    }

    fn metrics(&self) -> &'static [Metric] {
        &[Metric::Cbo, Metric::Cboi, Metric::Rfc, Metric::Noi, Metric::Nii]
    }

    fn category(&self) -> &'static str {
        "coupling"
    }

    fn config(&self) -> Option<&AnalyzerConfig> {
        Some(&self.config)
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize> {
        let model = ctx.model;
        let classes: Vec<EntityId> = model.classes().map(|c| c.id).collect();

        let coupled: Vec<(EntityId, BTreeSet<EntityId>)> = classes
            .par_iter()
            .map(|&class| (class, self.coupled_entities(model, class)))
            .collect();

        let mut inverse: FxHashMap<EntityId, usize> = FxHashMap::default();
        for (class, targets) in &coupled {
            ctx.record_count(*class, Metric::Cbo, targets.len())?;
            for target in targets {
                *inverse.entry(*target).or_insert(0) += 1;
            }
        }
        for &class in &classes {
            ctx.record_count(class, Metric::Cboi, inverse.get(&class).copied().unwrap_or(0))?;
        }

        classes.par_iter().try_for_each(|&class| {
            ctx.record_count(class, Metric::Rfc, response_set(model, class).len())?;
            ctx.record_count(class, Metric::Noi, outgoing_invocations(model, class).len())?;
            ctx.record_count(class, Metric::Nii, incoming_invocations(model, class).len())
        })?;

        let callables: Vec<EntityId> = model
            .entities()
            .filter(|e| e.kind.is_callable())
            .map(|e| e.id)
            .collect();
        let recorded = AtomicUsize::new(classes.len() * 5);
        callables.par_iter().try_for_each(|&callable| -> MetricsResult<()> {
            ctx.record_count(callable, Metric::Noi, invoked(model, callable).count())?;
            ctx.record_count(callable, Metric::Nii, invokers(model, callable).count())?;
            recorded.fetch_add(2, Ordering::Relaxed);
            Ok(())
        })?;

        debug!(
            "Coupling for {} classes and {} callables",
            classes.len(),
            callables.len()
        );
        Ok(recorded.into_inner())
    }
}
