//! Error and warning taxonomy for the dispatch pipeline.
//!
//! [`PipelineError`] is fatal and aborts a run before any partial output is
//! produced. [`ServiceError`] is recorded per record and degraded into sentinel
//! values. [`PlanWarning`] is carried on the finished plan.

use serde::Serialize;
use thiserror::Error;

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input has no geometry from which a coordinate can be derived.
    #[error("schema error: {0}")]
    Schema(String),

    /// Clustering cannot run: no vehicles requested, or a coordinate handed
    /// to the partitioner is NaN or infinite.
    #[error("cannot cluster into {requested} vehicle groups: needs at least one vehicle and finite coordinates")]
    InvalidClusterCount { requested: i64 },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A routing or geocoding call that did not produce a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Network failure or timeout.
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Non-fatal conditions surfaced on a finished plan.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// Fewer distinct locations than vehicles; the remaining groups are omitted.
    #[error("requested {requested} vehicle groups but only {populated} could be populated")]
    DegenerateCluster { requested: usize, populated: usize },

    /// A feature was dropped during normalization.
    #[error("feature {index} skipped: {reason}")]
    SkippedFeature { index: usize, reason: String },

    /// The input declared a coordinate reference system we cannot reproject.
    #[error("unsupported CRS {name}; coordinates passed through unchanged")]
    UnsupportedCrs { name: String },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
