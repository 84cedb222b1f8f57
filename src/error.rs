//! Error types for model ingestion and metric recording
//!
//! Nothing in here is fatal to a whole analysis run: callers that hit a
//! `ModelError` during ingestion record an anomaly and keep going. The
//! application layer (CLI, config loading) wraps these in `anyhow`.

use crate::model::{EdgeKind, EntityId};
use thiserror::Error;

/// Errors raised while populating a `SemanticModel`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Dangling reference: {kind:?} edge from {source_name} to {target_name}")]
    DanglingReference {
        source_name: String,
        target_name: String,
        kind: EdgeKind,
    },

    #[error("Unknown entity id {0}")]
    UnknownEntity(EntityId),

    #[error("Invalid model document: {0}")]
    InvalidDocument(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by the results table and the analyzer registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Metric {metric} already recorded for entity {entity}")]
    AlreadyRecorded { entity: EntityId, metric: String },

    #[error("Metric {metric} is claimed by both {first} and {second}")]
    MetricOwnedTwice {
        metric: String,
        first: String,
        second: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type MetricsResult<T> = Result<T, MetricsError>;
