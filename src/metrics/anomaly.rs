//! Non-fatal conditions met while ingesting or analyzing a model

use crate::model::{EdgeKind, EntityKind};
use serde::Serialize;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// An edge named an entity that does not exist; the edge was dropped
    DanglingReference {
        source: String,
        target: String,
        edge: EdgeKind,
    },
    /// An entity named an unknown enclosing scope; it was attached to the program
    OrphanScope { entity: String, scope: String },
    /// An entity carries the program's name; it was kept apart from the root
    ShadowsProgram {
        entity: String,
        entity_kind: EntityKind,
    },
    /// A traversal hit the depth bound; the partial result was kept
    DegenerateRecursion {
        entity: String,
        traversal: String,
        depth: usize,
    },
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::DanglingReference {
                source,
                target,
                edge,
            } => write!(f, "dangling {:?} edge {} -> {}", edge, source, target),
            Anomaly::OrphanScope { entity, scope } => {
                write!(f, "{} names unknown scope {}", entity, scope)
            }
            Anomaly::ShadowsProgram {
                entity,
                entity_kind,
            } => {
                write!(f, "{} {} has the same name as the program", entity_kind, entity)
            }
            Anomaly::DegenerateRecursion {
                entity,
                traversal,
                depth,
            } => write!(
                f,
                "{} traversal from {} stopped at depth {}",
                traversal, entity, depth
            ),
        }
    }
}

/// Append-only anomaly sink shared by concurrently running analyzers
#[derive(Debug, Default)]
pub struct AnomalyLog {
    entries: Mutex<Vec<Anomaly>>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, anomaly: Anomaly) {
        warn!("Anomaly: {}", anomaly);
        self.entries
            .lock()
            .expect("anomaly log lock poisoned")
            .push(anomaly);
    }

    pub fn extend(&self, anomalies: impl IntoIterator<Item = Anomaly>) {
        let mut entries = self.entries.lock().expect("anomaly log lock poisoned");
        entries.extend(anomalies);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("anomaly log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted, deduplicated entries; independent of analyzer scheduling
    pub fn into_sorted(self) -> Vec<Anomaly> {
        let mut entries = self
            .entries
            .into_inner()
            .expect("anomaly log lock poisoned");
        entries.sort();
        entries.dedup();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_sorted_is_order_independent() {
        let a = Anomaly::OrphanScope {
            entity: "b".into(),
            scope: "x".into(),
        };
        let b = Anomaly::OrphanScope {
            entity: "a".into(),
            scope: "x".into(),
        };

        let first = AnomalyLog::new();
        first.record(a.clone());
        first.record(b.clone());
        let second = AnomalyLog::new();
        second.record(b);
        second.record(a.clone());
        second.record(a);

        assert_eq!(first.into_sorted(), second.into_sorted());
    }
}
