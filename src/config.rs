//! Mining thresholds and cancellation

use crate::error::{MiningError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_SUPPORT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Validated support/confidence ratio pair, both in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    #[serde(rename = "support_threshold")]
    pub min_support: f64,
    #[serde(rename = "confidence_threshold")]
    pub min_confidence: f64,
}

impl Thresholds {
    pub fn new(min_support: f64, min_confidence: f64) -> Result<Self> {
        Ok(Self {
            min_support: validate_ratio("support", min_support)?,
            min_confidence: validate_ratio("confidence", min_confidence)?,
        })
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_SUPPORT_THRESHOLD,
            min_confidence: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// `count / total >= min_support`, compared as ratios so that e.g.
/// 3 of 10 meets a 0.3 threshold exactly
pub fn meets_support(count: u64, total: usize, min_support: f64) -> bool {
    total > 0 && count as f64 / total as f64 >= min_support
}

/// Reject NaN and anything outside (0, 1]
pub fn validate_ratio(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(MiningError::InvalidThreshold { name, value })
    }
}

/// Shared flag checked by the miners between levels. Clones observe the
/// same flag; an optional deadline cancels the run once it passes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also cancels once `limit` has elapsed from now
    pub fn with_deadline(limit: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + limit),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Bail out with `Cancelled` if the token fired
    pub fn check(&self, stage: impl Into<String>) -> Result<()> {
        if self.is_cancelled() {
            Err(MiningError::Cancelled {
                stage: stage.into(),
            })
        } else {
            Ok(())
        }
    }
}
