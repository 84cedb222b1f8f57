//! Metric keys and the per-entity results table
//!
//! Analyzers append into a `ResultsTable` concurrently. Every
//! (entity, metric) key is written at most once; each analyzer owns a
//! disjoint set of metrics, so a second write is a bug and is rejected.

mod anomaly;

pub use anomaly::{Anomaly, AnomalyLog};

use crate::error::{MetricsError, MetricsResult};
use crate::model::EntityId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every metric the engine can produce
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Metric {
    // Cohesion
    #[serde(rename = "LCOM5")]
    Lcom5,

    // Coupling
    #[serde(rename = "CBO")]
    Cbo,
    #[serde(rename = "CBOI")]
    Cboi,
    #[serde(rename = "RFC")]
    Rfc,
    #[serde(rename = "NOI")]
    Noi,
    #[serde(rename = "NII")]
    Nii,

    // Inheritance
    #[serde(rename = "NOA")]
    Noa,
    #[serde(rename = "NOC")]
    Noc,
    #[serde(rename = "NOP")]
    Nop,
    #[serde(rename = "NOD")]
    Nod,
    #[serde(rename = "DIT")]
    Dit,

    // Halstead
    #[serde(rename = "N1")]
    TotalOperators,
    #[serde(rename = "n1")]
    DistinctOperators,
    #[serde(rename = "N2")]
    TotalOperands,
    #[serde(rename = "n2")]
    DistinctOperands,
    #[serde(rename = "HPL")]
    Hpl,
    #[serde(rename = "HPV")]
    Hpv,
    #[serde(rename = "HVOL")]
    Hvol,
    #[serde(rename = "HCPL")]
    Hcpl,
    #[serde(rename = "HDIF")]
    Hdif,
    #[serde(rename = "HEFF")]
    Heff,
    #[serde(rename = "HTRP")]
    Htrp,
    #[serde(rename = "HNDB")]
    Hndb,

    // Size and documentation
    #[serde(rename = "LLOC")]
    Lloc,
    #[serde(rename = "CLOC")]
    Cloc,
    #[serde(rename = "CD")]
    Cd,
    #[serde(rename = "DLOC")]
    Dloc,
    #[serde(rename = "NA")]
    Na,
    #[serde(rename = "NM")]
    Nm,

    // Scope rollups
    #[serde(rename = "TLLOC")]
    Tlloc,
    #[serde(rename = "TCLOC")]
    Tcloc,
    #[serde(rename = "TDLOC")]
    Tdloc,
    #[serde(rename = "TCBO")]
    Tcbo,
    #[serde(rename = "TNCL")]
    Tncl,
    #[serde(rename = "TNM")]
    Tnm,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Lcom5 => "LCOM5",
            Metric::Cbo => "CBO",
            Metric::Cboi => "CBOI",
            Metric::Rfc => "RFC",
            Metric::Noi => "NOI",
            Metric::Nii => "NII",
            Metric::Noa => "NOA",
            Metric::Noc => "NOC",
            Metric::Nop => "NOP",
            Metric::Nod => "NOD",
            Metric::Dit => "DIT",
            Metric::TotalOperators => "N1",
            Metric::DistinctOperators => "n1",
            Metric::TotalOperands => "N2",
            Metric::DistinctOperands => "n2",
            Metric::Hpl => "HPL",
            Metric::Hpv => "HPV",
            Metric::Hvol => "HVOL",
            Metric::Hcpl => "HCPL",
            Metric::Hdif => "HDIF",
            Metric::Heff => "HEFF",
            Metric::Htrp => "HTRP",
            Metric::Hndb => "HNDB",
            Metric::Lloc => "LLOC",
            Metric::Cloc => "CLOC",
            Metric::Cd => "CD",
            Metric::Dloc => "DLOC",
            Metric::Na => "NA",
            Metric::Nm => "NM",
            Metric::Tlloc => "TLLOC",
            Metric::Tcloc => "TCLOC",
            Metric::Tdloc => "TDLOC",
            Metric::Tcbo => "TCBO",
            Metric::Tncl => "TNCL",
            Metric::Tnm => "TNM",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concurrent, write-once table of metric values
#[derive(Debug, Default)]
pub struct ResultsTable {
    values: DashMap<(EntityId, Metric), f64>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; fails if the key was already written
    pub fn record(&self, entity: EntityId, metric: Metric, value: f64) -> MetricsResult<()> {
        match self.values.entry((entity, metric)) {
            Entry::Occupied(_) => Err(MetricsError::AlreadyRecorded {
                entity,
                metric: metric.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub fn record_count(&self, entity: EntityId, metric: Metric, value: usize) -> MetricsResult<()> {
        self.record(entity, metric, value as f64)
    }

    pub fn get(&self, entity: EntityId, metric: Metric) -> Option<f64> {
        self.values.get(&(entity, metric)).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ordered copy of the table; identical input always yields identical output
    pub fn snapshot(&self) -> ResultsSnapshot {
        let mut entities: BTreeMap<EntityId, BTreeMap<Metric, f64>> = BTreeMap::new();
        for entry in self.values.iter() {
            let (entity, metric) = *entry.key();
            entities
                .entry(entity)
                .or_default()
                .insert(metric, *entry.value());
        }
        ResultsSnapshot { entities }
    }
}

/// Frozen `entityId -> {metric: value}` view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultsSnapshot {
    pub entities: BTreeMap<EntityId, BTreeMap<Metric, f64>>,
}

impl ResultsSnapshot {
    pub fn get(&self, entity: EntityId, metric: Metric) -> Option<f64> {
        self.entities.get(&entity)?.get(&metric).copied()
    }

    pub fn metrics_of(&self, entity: EntityId) -> Option<&BTreeMap<Metric, f64>> {
        self.entities.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
