//! Error types for hexprofile.

use thiserror::Error;

/// Errors that can occur while building profiles or clustering them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// A character outside `0-9a-fA-F` was seen during accumulation.
    #[error("invalid symbol {symbol:?} at position {position} in group {group:?}")]
    InvalidSymbol {
        group: String,
        position: usize,
        symbol: char,
    },

    /// A sequence did not have the configured fixed length.
    #[error("sequence in group {group:?} has {actual} digits, expected {expected}")]
    InvalidSequence {
        group: String,
        expected: usize,
        actual: usize,
    },

    /// Vectors (or an eps vector) of inconsistent length.
    #[error("dimension mismatch: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Clustering was asked to run over no points.
    #[error("input point set is empty")]
    EmptyInput,

    /// `k` is zero or larger than the number of points.
    #[error("invalid k={k} for {points} points")]
    InvalidK { k: usize, points: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The worker handling a group terminated abnormally.
    #[error("worker for group {group:?} failed")]
    WorkerFailed { group: String },

    /// The OS refused to start a worker thread.
    #[error("failed to start worker thread: {reason}")]
    SpawnFailed { reason: String },
}

pub type Result<T> = std::result::Result<T, ProfileError>;
