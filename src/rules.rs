//! Association rule derivation from frequent itemsets

use crate::catalog::ProductCatalog;
use crate::config::validate_ratio;
use crate::error::{MiningError, Result};
use crate::itemset::{FrequentItemset, Itemset};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Largest itemset whose splits are enumerated with a 64-bit mask
const MAX_RULE_ITEMSET_LEN: usize = 63;

/// `antecedent => consequent` with its scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule {
    pub antecedent: Itemset,
    pub consequent: Itemset,
    /// Support of antecedent ∪ consequent
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl AssociationRule {
    /// Sentence for display, using product names when a catalog is given
    pub fn describe(&self, catalog: Option<&ProductCatalog>) -> String {
        let (antecedent, consequent) = match catalog {
            Some(catalog) => (catalog.names(&self.antecedent), catalog.names(&self.consequent)),
            None => (join_codes(&self.antecedent), join_codes(&self.consequent)),
        };
        format!(
            "If a customer buys {}, they are likely to buy {} (confidence {:.1}%)",
            antecedent,
            consequent,
            self.confidence * 100.0
        )
    }

    /// Identity of the rule, ignoring scores
    pub fn key(&self) -> (&Itemset, &Itemset) {
        (&self.antecedent, &self.consequent)
    }
}

fn join_codes(itemset: &Itemset) -> String {
    itemset
        .iter()
        .map(|item| item.code())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Derive every rule meeting `min_confidence` from the frequent itemsets
///
/// Each frequent itemset of two or more items is split into every
/// non-empty antecedent/consequent pair. Counts for both sides are looked
/// up among the frequent itemsets themselves; a split without a recorded
/// count is degenerate and skipped.
pub fn generate(
    frequent: &[FrequentItemset],
    total_transactions: usize,
    min_confidence: f64,
) -> Result<Vec<AssociationRule>> {
    let min_confidence = validate_ratio("confidence", min_confidence)?;
    if frequent.is_empty() {
        return Ok(Vec::new());
    }
    if total_transactions == 0 {
        return Err(MiningError::EmptyDataset(
            "cannot score rules against zero transactions".to_string(),
        ));
    }

    let counts: HashMap<&Itemset, u64> = frequent.iter().map(|f| (&f.itemset, f.count)).collect();
    let mut rules = Vec::new();

    for frequent_itemset in frequent.iter().filter(|f| f.itemset.len() >= 2) {
        let itemset = &frequent_itemset.itemset;
        if itemset.len() > MAX_RULE_ITEMSET_LEN {
            warn!(size = itemset.len(), "Itemset too large to split into rules, skipping");
            continue;
        }

        let full_mask = (1u64 << itemset.len()) - 1;
        for mask in 1..full_mask {
            let (Some(antecedent), Some(consequent)) =
                (itemset.select(mask), itemset.select(full_mask & !mask))
            else {
                continue;
            };

            match score_rule(
                antecedent,
                consequent,
                frequent_itemset.count,
                &counts,
                total_transactions,
            ) {
                Ok(rule) if rule.confidence >= min_confidence => rules.push(rule),
                Ok(_) => {}
                Err(err @ MiningError::DegenerateRule { .. }) => {
                    debug!(error = %err, "Skipping rule");
                }
                Err(err) => return Err(err),
            }
        }
    }

    debug!(rules = rules.len(), min_confidence, "Association rules generated");
    Ok(rules)
}

/// Compute support, confidence and lift for one split
fn score_rule(
    antecedent: Itemset,
    consequent: Itemset,
    union_count: u64,
    counts: &HashMap<&Itemset, u64>,
    total_transactions: usize,
) -> Result<AssociationRule> {
    let antecedent_count = counts.get(&antecedent).copied().unwrap_or(0);
    let consequent_count = counts.get(&consequent).copied().unwrap_or(0);
    if antecedent_count == 0 || consequent_count == 0 {
        return Err(MiningError::DegenerateRule {
            antecedent: antecedent.to_string(),
            consequent: consequent.to_string(),
        });
    }

    let total = total_transactions as f64;
    let confidence = union_count as f64 / antecedent_count as f64;
    let lift = confidence / (consequent_count as f64 / total);

    Ok(AssociationRule {
        antecedent,
        consequent,
        support: union_count as f64 / total,
        confidence,
        lift,
    })
}
