//! Results of a mining run and of a reference comparison

use crate::config::Thresholds;
use crate::itemset::FrequentItemset;
use crate::rules::AssociationRule;

/// Everything one mining run produced. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// Name of the strategy that produced it
    pub algorithm: &'static str,
    pub thresholds: Thresholds,
    pub total_transactions: usize,
    pub frequent_itemsets: Vec<FrequentItemset>,
    pub association_rules: Vec<AssociationRule>,
    /// Wall-clock seconds for the whole pipeline
    pub execution_time: f64,
    /// Stage-by-stage trace
    pub steps: String,
}

/// Output of the reference miner over the cached data of the last run.
/// Differences against the custom run are derived by the consumer.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub reference: MiningResult,
}

impl ComparisonResult {
    pub fn thresholds(&self) -> &Thresholds {
        &self.reference.thresholds
    }
}
