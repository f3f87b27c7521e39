//! Interchangeable mining pipelines: itemset search followed by rule derivation

use crate::config::{CancellationToken, Thresholds};
use crate::error::Result;
use crate::itemset::{FrequentItemset, TransactionSet};
use crate::rules::AssociationRule;
use crate::{apriori, fpgrowth, rules};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// What a strategy hands back; timing is added by the session
#[derive(Debug, Clone)]
pub struct StrategyOutput {
    pub frequent_itemsets: Vec<FrequentItemset>,
    pub association_rules: Vec<AssociationRule>,
    pub steps: String,
}

/// A complete frequent-itemset + rule pipeline
pub trait MiningStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn mine(
        &self,
        transactions: &TransactionSet,
        thresholds: &Thresholds,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutput>;
}

/// Level-wise candidate generation with subset pruning
#[derive(Debug, Default, Clone, Copy)]
pub struct AprioriStrategy;

impl MiningStrategy for AprioriStrategy {
    fn name(&self) -> &'static str {
        "apriori"
    }

    fn mine(
        &self,
        transactions: &TransactionSet,
        thresholds: &Thresholds,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutput> {
        let (frequent_itemsets, mut trace) =
            apriori::mine(transactions, thresholds.min_support, cancel)?;
        cancel.check("rule generation")?;

        let association_rules = rules::generate(
            &frequent_itemsets,
            transactions.len(),
            thresholds.min_confidence,
        )?;

        trace.stage("GENERATING ASSOCIATION RULES");
        trace.line(format!(
            "Minimum confidence threshold: {}",
            thresholds.min_confidence
        ));
        let splittable = frequent_itemsets
            .iter()
            .filter(|f| f.itemset.len() >= 2)
            .count();
        trace.line(format!(
            "Split {} frequent itemsets with 2+ items: {} rules accepted",
            splittable,
            association_rules.len()
        ));

        Ok(StrategyOutput {
            frequent_itemsets,
            association_rules,
            steps: trace.into_string(),
        })
    }
}

/// Reference pipeline: one-hot encoding, FP-tree mining, table-driven rules
#[derive(Debug, Default, Clone, Copy)]
pub struct FpGrowthStrategy;

impl MiningStrategy for FpGrowthStrategy {
    fn name(&self) -> &'static str {
        "fp-growth"
    }

    fn mine(
        &self,
        transactions: &TransactionSet,
        thresholds: &Thresholds,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutput> {
        let (frequent_itemsets, mut trace) =
            fpgrowth::mine(transactions, thresholds.min_support, cancel)?;
        cancel.check("rule generation")?;

        let association_rules = fpgrowth::association_rules(
            &frequent_itemsets,
            transactions.len(),
            thresholds.min_confidence,
        )?;
        trace.line(format!(
            "Generated {} association rules (confidence >= {})",
            association_rules.len(),
            thresholds.min_confidence
        ));

        Ok(StrategyOutput {
            frequent_itemsets,
            association_rules,
            steps: trace.into_string(),
        })
    }
}

/// Host-facing choice of primary miner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    Apriori,
    FpGrowth,
}

impl Algorithm {
    pub fn strategy(self) -> Box<dyn MiningStrategy> {
        match self {
            Algorithm::Apriori => Box::new(AprioriStrategy),
            Algorithm::FpGrowth => Box::new(FpGrowthStrategy),
        }
    }
}
