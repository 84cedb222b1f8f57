//! Arena-backed semantic model
//!
//! Entities live in a petgraph `DiGraph` arena; their `EntityId` is the node
//! position and never changes. Typed relations are graph edges whose weight
//! carries a multiplicity, so repeated (source, target, kind) triples map to
//! one edge. Nothing here follows pointers: every traversal goes through ids.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use super::interner::{StrKey, StringInterner};
use super::types::{EdgeKind, EdgeView, Entity, EntityDecl, EntityId, EntityKind, Relation};
use crate::error::{ModelError, ModelResult};
use crate::metrics::Anomaly;

/// The graph of program entities consumed by every analyzer.
///
/// Populated once through `add_entity` / `add_edge`, then shared immutably.
pub struct SemanticModel {
    graph: DiGraph<Entity, Relation>,
    names: StringInterner,
    /// Entity lookup by interned qualified name; the program root is not indexed
    by_name: FxHashMap<StrKey, EntityId>,
    /// Edge lookup by (source, target, kind) triple
    edge_index: FxHashMap<(EntityId, EntityId, EdgeKind), EdgeIndex>,
    /// Lexical children per scope, in declaration order
    children: FxHashMap<EntityId, Vec<EntityId>>,
    program: EntityId,
    anomalies: Vec<Anomaly>,
}

/// Entity and edge counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub entities: usize,
    pub classes: usize,
    pub methods: usize,
    pub attributes: usize,
    pub globals: usize,
    pub edges: usize,
    pub relations: u64,
}

fn node(id: EntityId) -> NodeIndex {
    NodeIndex::new(id.index())
}

impl SemanticModel {
    /// Create a model holding only the program root
    pub fn new(program_name: &str) -> Self {
        let names = StringInterner::new();
        let key = names.intern(program_name);
        let mut graph = DiGraph::new();
        let idx = graph.add_node(Entity {
            id: EntityId(0),
            kind: EntityKind::Program,
            name: key,
            qualified_name: key,
            scope: None,
            span: Default::default(),
            is_static: false,
            is_local: false,
            size: Default::default(),
            lexical: None,
        });
        let program = EntityId(idx.index() as u32);

        Self {
            graph,
            names,
            by_name: FxHashMap::default(),
            edge_index: FxHashMap::default(),
            children: FxHashMap::default(),
            program,
            anomalies: Vec::new(),
        }
    }

    pub fn program(&self) -> EntityId {
        self.program
    }

    // ==================== Entity Operations ====================

    /// Add an entity, or merge it into the entity already carrying its qualified name.
    ///
    /// A scope id that does not resolve is recorded as an `OrphanScope`
    /// anomaly and the entity is attached to the program instead. An entity
    /// named like the program becomes its own entity and a `ShadowsProgram`
    /// anomaly; the root is never merged into.
    pub fn add_entity(&mut self, decl: EntityDecl) -> EntityId {
        let qn_key = self.names.intern(&decl.qualified_name);
        let program_key = self.graph.node_weight(node(self.program)).map(|p| p.qualified_name);
        if program_key == Some(qn_key) && !self.by_name.contains_key(&qn_key) {
            self.record_anomaly(Anomaly::ShadowsProgram {
                entity: decl.qualified_name.clone(),
                entity_kind: decl.kind,
            });
        }

        if let Some(&existing) = self.by_name.get(&qn_key) {
            if let Some(entity) = self.graph.node_weight_mut(node(existing)) {
                debug!("Merging redeclaration of {}", decl.qualified_name);
                entity.merge(decl);
            }
            return existing;
        }

        let scope = match decl.scope {
            Some(scope) if self.contains(scope) => scope,
            Some(scope) => {
                self.anomalies.push(Anomaly::OrphanScope {
                    entity: decl.qualified_name.clone(),
                    scope: scope.to_string(),
                });
                self.program
            }
            None => self.program,
        };

        let name_key = self.names.intern(decl.simple_name());
        let id = EntityId(self.graph.node_count() as u32);
        let idx = self.graph.add_node(Entity {
            id,
            kind: decl.kind,
            name: name_key,
            qualified_name: qn_key,
            scope: Some(scope),
            span: decl.span,
            is_static: decl.is_static,
            is_local: decl.is_local,
            size: decl.size,
            lexical: decl.lexical,
        });
        debug_assert_eq!(idx.index(), id.index());

        self.by_name.insert(qn_key, id);
        self.children.entry(scope).or_default().push(id);
        id
    }

    /// Whether an id names an entity of this model
    pub fn contains(&self, id: EntityId) -> bool {
        id.index() < self.graph.node_count()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.graph.node_weight(node(id))
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        self.entity(id).map(|e| e.kind)
    }

    /// Entity id by qualified name
    pub fn lookup(&self, qualified_name: &str) -> Option<EntityId> {
        let key = self.names.get(qualified_name)?;
        self.by_name.get(&key).copied()
    }

    pub fn qualified_name(&self, id: EntityId) -> &str {
        match self.entity(id) {
            Some(e) => self.names.resolve(e.qualified_name),
            None => "<unknown>",
        }
    }

    pub fn name(&self, id: EntityId) -> &str {
        match self.entity(id) {
            Some(e) => self.names.resolve(e.name),
            None => "<unknown>",
        }
    }

    /// All entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.graph.node_weights()
    }

    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> + '_ {
        self.graph.node_weights().filter(move |e| e.kind == kind)
    }

    /// Classes, templates and template specializations
    pub fn classes(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.graph.node_weights().filter(|e| e.kind.is_class_like())
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    // ==================== Scope Queries ====================

    /// Lexical children of a scope, in declaration order
    pub fn children(&self, scope: EntityId) -> &[EntityId] {
        self.children.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Methods and attributes declared directly in a class
    pub fn members(&self, class: EntityId) -> impl Iterator<Item = &Entity> + '_ {
        self.children(class)
            .iter()
            .filter_map(|&c| self.entity(c))
            .filter(|e| e.kind.is_member())
    }

    pub fn methods(&self, class: EntityId) -> impl Iterator<Item = &Entity> + '_ {
        self.members(class).filter(|e| e.kind == EntityKind::Method)
    }

    pub fn attributes(&self, class: EntityId) -> impl Iterator<Item = &Entity> + '_ {
        self.members(class).filter(|e| e.kind == EntityKind::Attribute)
    }

    pub fn scope_of(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id).and_then(|e| e.scope)
    }

    /// Nearest class-like entity strictly enclosing `id`
    pub fn enclosing_class(&self, id: EntityId) -> Option<EntityId> {
        self.ancestors_in_scope(id)
            .find(|&s| self.kind(s).is_some_and(EntityKind::is_class_like))
    }

    /// Nearest namespace or program strictly enclosing `id`
    pub fn enclosing_scope(&self, id: EntityId) -> Option<EntityId> {
        self.ancestors_in_scope(id)
            .find(|&s| self.kind(s).is_some_and(EntityKind::is_scope))
    }

    /// Number of scopes between `id` and the program (program = 0)
    pub fn scope_depth(&self, id: EntityId) -> usize {
        self.ancestors_in_scope(id).count()
    }

    /// Walk the enclosing-scope chain outward, excluding `id` itself.
    /// Bounded by the entity count so a corrupt chain cannot loop.
    fn ancestors_in_scope(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let limit = self.entity_count();
        std::iter::successors(self.scope_of(id), move |&s| self.scope_of(s)).take(limit)
    }

    // ==================== Edge Operations ====================

    /// Add a relation; a repeated triple bumps the multiplicity of the existing edge.
    ///
    /// Unknown endpoints drop the edge, record a `DanglingReference` anomaly and
    /// return the error so ingestion can carry on with the next edge.
    pub fn add_edge(
        &mut self,
        source: EntityId,
        target: EntityId,
        kind: EdgeKind,
    ) -> ModelResult<EdgeView> {
        self.add_relation(source, target, kind, 1)
    }

    pub(crate) fn add_relation(
        &mut self,
        source: EntityId,
        target: EntityId,
        kind: EdgeKind,
        count: u32,
    ) -> ModelResult<EdgeView> {
        if !self.contains(source) || !self.contains(target) {
            let err = ModelError::DanglingReference {
                source_name: self.describe(source),
                target_name: self.describe(target),
                kind,
            };
            self.record_dangling(self.describe(source), self.describe(target), kind);
            return Err(err);
        }

        let count = count.max(1);
        let key = (source, target, kind);
        let multiplicity = match self.edge_index.get(&key) {
            Some(&edge) => {
                let weight = self
                    .graph
                    .edge_weight_mut(edge)
                    .ok_or(ModelError::UnknownEntity(source))?;
                weight.multiplicity = weight.multiplicity.saturating_add(count);
                weight.multiplicity
            }
            None => {
                let edge = self.graph.add_edge(
                    node(source),
                    node(target),
                    Relation {
                        kind,
                        multiplicity: count,
                    },
                );
                self.edge_index.insert(key, edge);
                count
            }
        };

        Ok(EdgeView {
            source,
            target,
            kind,
            multiplicity,
        })
    }

    /// Add a relation between entities named by qualified name
    pub fn add_edge_by_name(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
    ) -> ModelResult<EdgeView> {
        self.add_relation_by_name(source, target, kind, 1)
    }

    pub(crate) fn add_relation_by_name(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
        count: u32,
    ) -> ModelResult<EdgeView> {
        match (self.lookup(source), self.lookup(target)) {
            (Some(s), Some(t)) => self.add_relation(s, t, kind, count),
            _ => {
                self.record_dangling(source.to_string(), target.to_string(), kind);
                Err(ModelError::DanglingReference {
                    source_name: source.to_string(),
                    target_name: target.to_string(),
                    kind,
                })
            }
        }
    }

    fn record_dangling(&mut self, source: String, target: String, edge: EdgeKind) {
        debug!("Dropping dangling {:?} edge {} -> {}", edge, source, target);
        self.anomalies.push(Anomaly::DanglingReference {
            source,
            target,
            edge,
        });
    }

    fn describe(&self, id: EntityId) -> String {
        if self.contains(id) {
            self.qualified_name(id).to_string()
        } else {
            id.to_string()
        }
    }

    /// Outgoing edges of `id`, optionally restricted to one kind. O(degree).
    pub fn edges_from(
        &self,
        id: EntityId,
        kind: Option<EdgeKind>,
    ) -> impl Iterator<Item = EdgeView> + '_ {
        self.edges_directed(id, kind, Direction::Outgoing)
    }

    /// Incoming edges of `id`, optionally restricted to one kind. O(degree).
    pub fn edges_to(
        &self,
        id: EntityId,
        kind: Option<EdgeKind>,
    ) -> impl Iterator<Item = EdgeView> + '_ {
        self.edges_directed(id, kind, Direction::Incoming)
    }

    fn edges_directed(
        &self,
        id: EntityId,
        kind: Option<EdgeKind>,
        direction: Direction,
    ) -> impl Iterator<Item = EdgeView> + '_ {
        // Unknown ids yield nothing instead of panicking inside petgraph
        let edges = if self.contains(id) {
            Some(self.graph.edges_directed(node(id), direction))
        } else {
            None
        };
        edges
            .into_iter()
            .flatten()
            .filter(move |e| match kind {
                Some(k) => e.weight().kind == k,
                None => true,
            })
            .map(|e| EdgeView {
                source: EntityId(e.source().index() as u32),
                target: EntityId(e.target().index() as u32),
                kind: e.weight().kind,
                multiplicity: e.weight().multiplicity,
            })
    }

    /// Multiplicity of a triple (0 if absent)
    pub fn multiplicity(&self, source: EntityId, target: EntityId, kind: EdgeKind) -> u32 {
        self.edge_index
            .get(&(source, target, kind))
            .and_then(|&e| self.graph.edge_weight(e))
            .map_or(0, |r| r.multiplicity)
    }

    /// Direct base classes (targets of Inherits edges)
    pub fn parents(&self, class: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.edges_from(class, Some(EdgeKind::Inherits))
            .map(|e| e.target)
    }

    /// Direct subclasses (sources of Inherits edges)
    pub fn child_classes(&self, class: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.edges_to(class, Some(EdgeKind::Inherits))
            .map(|e| e.source)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ==================== Diagnostics ====================

    /// Anomalies recorded during ingestion
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub(crate) fn record_anomaly(&mut self, anomaly: Anomaly) {
        debug!("Ingestion anomaly: {}", anomaly);
        self.anomalies.push(anomaly);
    }

    pub fn stats(&self) -> ModelStats {
        let mut stats = ModelStats {
            entities: self.graph.node_count(),
            edges: self.graph.edge_count(),
            ..Default::default()
        };
        for entity in self.graph.node_weights() {
            match entity.kind {
                EntityKind::Class
                | EntityKind::TemplateClass
                | EntityKind::TemplateSpecialization => stats.classes += 1,
                EntityKind::Method => stats.methods += 1,
                EntityKind::Attribute => stats.attributes += 1,
                EntityKind::GlobalFunction | EntityKind::GlobalVariable => stats.globals += 1,
                EntityKind::Program | EntityKind::Namespace => {}
            }
        }
        stats.relations = self
            .graph
            .edge_weights()
            .map(|r| u64::from(r.multiplicity))
            .sum();
        stats
    }
}

#[cfg(test)]
mod tests;
