//! Serialized form of a semantic model
//!
//! This is the input boundary of the engine: a front end emits entities and
//! edges that reference each other by qualified name, and
//! `SemanticModel::from_document` turns that into the id-based arena.
//!
//! ```json
//! {
//!   "program": "noc",
//!   "entities": [
//!     { "kind": "Class", "qualified_name": "Car" },
//!     { "kind": "Class", "qualified_name": "PlayerCar" }
//!   ],
//!   "edges": [
//!     { "source": "PlayerCar", "target": "Car", "kind": "Inherits" }
//!   ]
//! }
//! ```

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::lexical::LexicalStream;
use super::store::SemanticModel;
use super::types::{DeclSpan, EdgeKind, EntityDecl, EntityKind, SizeInfo};
use crate::error::{ModelError, ModelResult};
use crate::metrics::Anomaly;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    pub program: String,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub qualified_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Qualified name of the enclosing scope; absent means the program
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub span: DeclSpan,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub size: SizeInfo,
    #[serde(default)]
    pub tokens: Option<LexicalStream>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(default = "default_multiplicity")]
    pub multiplicity: u32,
}

fn default_multiplicity() -> u32 {
    1
}

impl EntityRecord {
    fn to_decl(&self) -> EntityDecl {
        EntityDecl {
            kind: self.kind,
            qualified_name: self.qualified_name.clone(),
            name: self.name.clone(),
            scope: None,
            span: self.span.clone(),
            is_static: self.is_static,
            is_local: self.is_local,
            size: self.size.clone(),
            lexical: self.tokens.clone(),
        }
    }
}

impl ModelDocument {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        serde_json::from_str(json).map_err(|e| ModelError::InvalidDocument(e.to_string()))
    }

    pub fn from_path(path: &Path) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModelError::InvalidDocument(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

impl SemanticModel {
    /// Build a model from its serialized form.
    ///
    /// Entities may appear before their scope; they are added once the scope
    /// exists. An entity whose scope is named nowhere in the document becomes
    /// an `OrphanScope` anomaly and is attached to the program, after which
    /// its own members resolve normally. Edges with unknown endpoints become
    /// `DanglingReference` anomalies.
    pub fn from_document(doc: &ModelDocument) -> Self {
        let mut model = SemanticModel::new(&doc.program);
        let declared: FxHashSet<&str> = doc
            .entities
            .iter()
            .map(|r| r.qualified_name.as_str())
            .collect();

        let mut pending: Vec<&EntityRecord> = doc.entities.iter().collect();
        loop {
            pending = model.attach_resolvable(doc, &declared, pending);
            if pending.is_empty() {
                break;
            }

            let (mut orphans, waiting): (Vec<&EntityRecord>, Vec<&EntityRecord>) =
                pending.into_iter().partition(|r| {
                    r.scope
                        .as_deref()
                        .is_some_and(|scope| !declared.contains(scope))
                });
            let mut waiting = waiting.into_iter();
            if orphans.is_empty() {
                // Scopes that only name each other; the first entry breaks the cycle
                orphans.extend(waiting.next());
            }
            for record in orphans {
                model.record_anomaly(Anomaly::OrphanScope {
                    entity: record.qualified_name.clone(),
                    scope: record.scope.clone().unwrap_or_default(),
                });
                model.add_entity(record.to_decl());
            }
            pending = waiting.collect();
        }

        let mut dropped = 0usize;
        for edge in &doc.edges {
            if model
                .add_relation_by_name(&edge.source, &edge.target, edge.kind, edge.multiplicity)
                .is_err()
            {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("Dropped {} dangling edges", dropped);
        }

        info!(
            "Loaded model '{}': {} entities, {} edges",
            doc.program,
            model.entity_count(),
            model.edge_count()
        );
        model
    }

    /// Add every record whose scope is known, repeating until no more
    /// resolve. Returns the records still waiting for their scope. A scope
    /// named like the program means the program unless a record declares it.
    fn attach_resolvable<'d>(
        &mut self,
        doc: &ModelDocument,
        declared: &FxHashSet<&str>,
        mut pending: Vec<&'d EntityRecord>,
    ) -> Vec<&'d EntityRecord> {
        loop {
            let before = pending.len();
            let mut deferred = Vec::new();
            for record in pending {
                let scope = match record.scope.as_deref() {
                    None => None,
                    Some(name) => match self.lookup(name) {
                        Some(id) => Some(id),
                        None if name == doc.program && !declared.contains(name) => {
                            Some(self.program())
                        }
                        None => {
                            deferred.push(record);
                            continue;
                        }
                    },
                };
                let mut decl = record.to_decl();
                decl.scope = scope;
                self.add_entity(decl);
            }
            if deferred.is_empty() || deferred.len() == before {
                return deferred;
            }
            pending = deferred;
        }
    }
}
