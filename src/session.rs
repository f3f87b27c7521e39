//! Mining session: runs the primary miner, caches its inputs, and replays
//! them through the reference miner on request

use crate::config::{CancellationToken, Thresholds};
use crate::error::{MiningError, Result};
use crate::itemset::TransactionSet;
use crate::result::{ComparisonResult, MiningResult};
use crate::strategy::{AprioriStrategy, FpGrowthStrategy, MiningStrategy, StrategyOutput};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inputs and output of the last completed run
#[derive(Debug)]
struct Snapshot {
    transactions: TransactionSet,
    thresholds: Thresholds,
    result: Arc<MiningResult>,
}

/// Per-host session state. Each session caches exactly one snapshot; a
/// completed run replaces it in one step, so `compare` never observes a
/// transaction set paired with another run's thresholds.
pub struct MiningSession {
    strategy: Box<dyn MiningStrategy>,
    reference: Box<dyn MiningStrategy>,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl MiningSession {
    /// Apriori as the primary miner, FP-Growth as the reference
    pub fn new() -> Self {
        Self::with_strategies(Box::new(AprioriStrategy), Box::new(FpGrowthStrategy))
    }

    pub fn with_strategies(
        strategy: Box<dyn MiningStrategy>,
        reference: Box<dyn MiningStrategy>,
    ) -> Self {
        Self {
            strategy,
            reference,
            snapshot: RwLock::new(None),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn reference_name(&self) -> &'static str {
        self.reference.name()
    }

    /// Mine `transactions` and cache them with the thresholds for `compare`
    pub fn run(
        &self,
        transactions: TransactionSet,
        min_support: f64,
        min_confidence: f64,
    ) -> Result<Arc<MiningResult>> {
        self.run_with_cancel(
            transactions,
            min_support,
            min_confidence,
            &CancellationToken::new(),
        )
    }

    /// Like [`run`](Self::run), aborting when `cancel` fires. A failed or
    /// cancelled run leaves the previous snapshot in place.
    pub fn run_with_cancel(
        &self,
        transactions: TransactionSet,
        min_support: f64,
        min_confidence: f64,
        cancel: &CancellationToken,
    ) -> Result<Arc<MiningResult>> {
        let thresholds = Thresholds::new(min_support, min_confidence)?;
        if transactions.is_empty() {
            return Err(MiningError::EmptyDataset(
                "transaction set has no transactions".to_string(),
            ));
        }

        info!(
            algorithm = self.strategy.name(),
            transactions = transactions.len(),
            min_support,
            min_confidence,
            "Mining run started"
        );
        let start = Instant::now();
        let output = self.strategy.mine(&transactions, &thresholds, cancel)?;
        let result = Arc::new(assemble(
            self.strategy.name(),
            thresholds,
            transactions.len(),
            output,
            start,
        ));
        info!(
            frequent_itemsets = result.frequent_itemsets.len(),
            rules = result.association_rules.len(),
            seconds = result.execution_time,
            "Mining run finished"
        );

        let reused = self
            .snapshot
            .read()
            .as_ref()
            .is_some_and(|previous| previous.transactions.shares_storage_with(&transactions));
        debug!(reused, "Caching transactions for comparison");
        let snapshot = Arc::new(Snapshot {
            transactions,
            thresholds,
            result: Arc::clone(&result),
        });
        *self.snapshot.write() = Some(snapshot);

        Ok(result)
    }

    /// Re-mine the cached data of the last run with the reference strategy
    pub fn compare(&self) -> Result<ComparisonResult> {
        self.compare_with_cancel(&CancellationToken::new())
    }

    pub fn compare_with_cancel(&self, cancel: &CancellationToken) -> Result<ComparisonResult> {
        let snapshot = self
            .snapshot
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(MiningError::NoPriorRun)?;

        info!(
            reference = self.reference.name(),
            transactions = snapshot.transactions.len(),
            "Reference comparison started"
        );
        let start = Instant::now();
        let output = self
            .reference
            .mine(&snapshot.transactions, &snapshot.thresholds, cancel)
            .map_err(|err| match err {
                MiningError::Cancelled { .. } => err,
                other => {
                    warn!(error = %other, "Reference miner failed");
                    MiningError::ReferenceImplementationFailure(other.to_string())
                }
            })?;
        let reference = assemble(
            self.reference.name(),
            snapshot.thresholds,
            snapshot.transactions.len(),
            output,
            start,
        );
        check_shape(&reference)?;

        info!(
            frequent_itemsets = reference.frequent_itemsets.len(),
            rules = reference.association_rules.len(),
            seconds = reference.execution_time,
            "Reference comparison finished"
        );
        Ok(ComparisonResult { reference })
    }

    pub fn last_result(&self) -> Option<Arc<MiningResult>> {
        self.snapshot.read().as_ref().map(|s| Arc::clone(&s.result))
    }

    pub fn cached_thresholds(&self) -> Option<Thresholds> {
        self.snapshot.read().as_ref().map(|s| s.thresholds)
    }

    pub fn cached_transactions(&self) -> Option<TransactionSet> {
        self.snapshot.read().as_ref().map(|s| s.transactions.clone())
    }
}

impl Default for MiningSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MiningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiningSession")
            .field("strategy", &self.strategy.name())
            .field("reference", &self.reference.name())
            .field("has_snapshot", &self.snapshot.read().is_some())
            .finish()
    }
}

fn assemble(
    algorithm: &'static str,
    thresholds: Thresholds,
    total_transactions: usize,
    output: StrategyOutput,
    start: Instant,
) -> MiningResult {
    MiningResult {
        algorithm,
        thresholds,
        total_transactions,
        frequent_itemsets: output.frequent_itemsets,
        association_rules: output.association_rules,
        execution_time: start.elapsed().as_secs_f64(),
        steps: output.steps,
    }
}

/// Reject reference output that could not be compared with a custom run
fn check_shape(result: &MiningResult) -> Result<()> {
    let incompatible = |reason: String| Err(MiningError::ReferenceImplementationFailure(reason));

    for frequent in &result.frequent_itemsets {
        if !(0.0..=1.0).contains(&frequent.support) {
            return incompatible(format!(
                "itemset {} has support {} outside [0, 1]",
                frequent.itemset, frequent.support
            ));
        }
    }
    for rule in &result.association_rules {
        if rule.consequent.iter().any(|item| rule.antecedent.contains(item)) {
            return incompatible(format!(
                "rule {} => {} has overlapping sides",
                rule.antecedent, rule.consequent
            ));
        }
        let confidence_ok = rule.confidence > 0.0 && rule.confidence <= 1.0;
        let lift_ok = rule.lift.is_finite() && rule.lift > 0.0;
        if !confidence_ok || !lift_ok {
            return incompatible(format!(
                "rule {} => {} has confidence {} and lift {}",
                rule.antecedent, rule.consequent, rule.confidence, rule.lift
            ));
        }
    }
    Ok(())
}
