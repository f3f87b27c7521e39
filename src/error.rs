//! Error types for the mining core

use serde::Serialize;
use thiserror::Error;

/// Result type alias for mining operations
pub type Result<T> = std::result::Result<T, MiningError>;

/// Machine-readable error kind handed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidThreshold,
    EmptyDataset,
    NoPriorRun,
    DegenerateRule,
    ReferenceImplementationFailure,
    Cancelled,
}

/// Errors raised by the miners, the rule generator and the session
#[derive(Debug, Clone, Error)]
pub enum MiningError {
    /// Support or confidence ratio outside (0, 1]
    #[error("{name} threshold must be in (0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    /// No transactions, or no items inside them
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Comparison requested before any run completed
    #[error("No previous mining run in this session. Run the miner first.")]
    NoPriorRun,

    /// Rule whose antecedent or consequent has no recorded support.
    /// Skipped by the rule generators, never returned to callers.
    #[error("Degenerate rule {antecedent} => {consequent}: zero support")]
    DegenerateRule {
        antecedent: String,
        consequent: String,
    },

    /// The reference miner failed or produced an incompatible result
    #[error("Reference implementation failure: {0}")]
    ReferenceImplementationFailure(String),

    /// Cancellation token fired or the deadline passed
    #[error("Mining cancelled during {stage}")]
    Cancelled { stage: String },
}

impl MiningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MiningError::InvalidThreshold { .. } => ErrorKind::InvalidThreshold,
            MiningError::EmptyDataset(_) => ErrorKind::EmptyDataset,
            MiningError::NoPriorRun => ErrorKind::NoPriorRun,
            MiningError::DegenerateRule { .. } => ErrorKind::DegenerateRule,
            MiningError::ReferenceImplementationFailure(_) => {
                ErrorKind::ReferenceImplementationFailure
            }
            MiningError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Structured form for the host layer
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Kind plus human-readable message, serializable for transport
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}
