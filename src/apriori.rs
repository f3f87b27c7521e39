//! Level-wise frequent itemset search (Apriori)
//!
//! Each level joins the frequent (k-1)-itemsets that share a (k-2)-prefix,
//! drops candidates with an infrequent (k-1)-subset, and counts the rest
//! against the transaction set.

use crate::config::{meets_support, validate_ratio, CancellationToken};
use crate::error::{MiningError, Result};
use crate::itemset::{FrequentItemset, Item, Itemset, TransactionSet};
use crate::trace::Trace;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Maximum number of itemsets listed per level in the trace
const TRACE_LISTING_LIMIT: usize = 20;

/// Candidates produced for one level
#[derive(Debug, Default)]
pub(crate) struct CandidateLevel {
    pub candidates: Vec<Itemset>,
    /// Joined candidates discarded because a subset was infrequent
    pub pruned: usize,
}

/// Find every itemset whose support is at least `min_support`
///
/// # Arguments
/// * `transactions` - Transaction set to count against
/// * `min_support` - Support ratio in (0, 1]
/// * `cancel` - Checked before every level
///
/// # Returns
/// * Frequent itemsets ordered by size then lexicographically, and the trace
pub fn mine(
    transactions: &TransactionSet,
    min_support: f64,
    cancel: &CancellationToken,
) -> Result<(Vec<FrequentItemset>, Trace)> {
    search(transactions, min_support, cancel, |size, level| {
        info!(size, frequent = level.len(), "Apriori level complete");
    })
}

/// [`mine`], calling `on_level` with each completed level's survivors
/// before the next level starts
pub(crate) fn search<F>(
    transactions: &TransactionSet,
    min_support: f64,
    cancel: &CancellationToken,
    mut on_level: F,
) -> Result<(Vec<FrequentItemset>, Trace)>
where
    F: FnMut(usize, &[FrequentItemset]),
{
    let min_support = validate_ratio("support", min_support)?;
    if transactions.is_empty() {
        return Err(MiningError::EmptyDataset(
            "transaction set has no transactions".to_string(),
        ));
    }
    let total = transactions.len();

    let mut item_counts: HashMap<&Item, u64> = HashMap::new();
    for transaction in transactions.iter() {
        for item in transaction.items() {
            *item_counts.entry(item).or_default() += 1;
        }
    }
    if item_counts.is_empty() {
        return Err(MiningError::EmptyDataset(
            "transactions contain no items".to_string(),
        ));
    }

    let meets = |count: u64| meets_support(count, total, min_support);

    let mut trace = Trace::new();
    trace.line(format!("Support threshold: {}", min_support));
    trace.dataset_summary(transactions);
    info!(
        transactions = total,
        distinct_items = item_counts.len(),
        min_support,
        "Starting Apriori search"
    );

    cancel.check("level 1")?;
    trace.stage("Finding frequent 1-itemsets");
    let candidate_count = item_counts.len();
    let mut level: Vec<FrequentItemset> = item_counts
        .into_iter()
        .filter(|(_, count)| meets(*count))
        .map(|(item, count)| FrequentItemset::new(Itemset::single(item.clone()), count, total))
        .collect();
    level.sort_by(|a, b| a.itemset.cmp(&b.itemset));
    record_level(&mut trace, 1, candidate_count, 0, &level);
    on_level(1, &level);

    let mut frequent = Vec::new();
    let mut size = 2;
    while !level.is_empty() {
        cancel.check(format!("level {}", size))?;

        let generated = generate_candidates(&level);
        trace.stage(format!("Finding frequent {}-itemsets", size));
        if generated.candidates.is_empty() {
            trace.line("No candidates could be joined - search complete");
            frequent.append(&mut level);
            break;
        }

        let candidate_count = generated.candidates.len();
        let next: Vec<FrequentItemset> = generated
            .candidates
            .into_par_iter()
            .map(|candidate| {
                let count = transactions.support_count(&candidate);
                (candidate, count)
            })
            .filter(|(_, count)| meets(*count))
            .map(|(candidate, count)| FrequentItemset::new(candidate, count, total))
            .collect();
        record_level(&mut trace, size, candidate_count, generated.pruned, &next);
        on_level(size, &next);

        frequent.append(&mut level);
        level = next;
        size += 1;
    }

    frequent.sort_by(|a, b| a.itemset.canonical_cmp(&b.itemset));
    info!(frequent_itemsets = frequent.len(), "Apriori search finished");
    trace.stage("FREQUENT ITEMSETS SUMMARY");
    trace.line(format!("Total frequent itemsets: {}", frequent.len()));

    Ok((frequent, trace))
}

/// Join frequent (k-1)-itemsets sharing a (k-2)-prefix, then prune every
/// candidate that has an infrequent (k-1)-subset.
///
/// `level` must be sorted lexicographically, so itemsets sharing a prefix
/// are adjacent and each union is produced exactly once.
pub(crate) fn generate_candidates(level: &[FrequentItemset]) -> CandidateLevel {
    let frequent: HashSet<&Itemset> = level.iter().map(|f| &f.itemset).collect();
    let mut result = CandidateLevel::default();

    for (i, left) in level.iter().enumerate() {
        for right in &level[i + 1..] {
            let Some(candidate) = left.itemset.join(&right.itemset) else {
                break;
            };
            if candidate
                .immediate_subsets()
                .all(|subset| frequent.contains(&subset))
            {
                result.candidates.push(candidate);
            } else {
                result.pruned += 1;
            }
        }
    }

    debug!(
        candidates = result.candidates.len(),
        pruned = result.pruned,
        "Generated candidates"
    );
    result
}

fn record_level(
    trace: &mut Trace,
    size: usize,
    candidates: usize,
    pruned: usize,
    survivors: &[FrequentItemset],
) {
    debug!(size, candidates, pruned, survivors = survivors.len(), "Level counted");
    if pruned > 0 {
        trace.line(format!(
            "Pruned {} joined candidates with an infrequent subset",
            pruned
        ));
    }
    trace.line(format!(
        "Checked {} candidate {}-itemsets: {} frequent",
        candidates,
        size,
        survivors.len()
    ));
    for frequent in survivors.iter().take(TRACE_LISTING_LIMIT) {
        trace.line(format!(
            "  {} | count {} | support {:.3}",
            frequent.itemset, frequent.count, frequent.support
        ));
    }
    if survivors.len() > TRACE_LISTING_LIMIT {
        trace.line(format!(
            "  ... and {} more",
            survivors.len() - TRACE_LISTING_LIMIT
        ));
    }
    if survivors.is_empty() {
        trace.line("No frequent itemsets at this level - search complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn itemset(items: &[&str]) -> Itemset {
        Itemset::try_new(items.iter().copied()).unwrap()
    }

    fn groceries() -> TransactionSet {
        TransactionSet::from_baskets(vec![
            vec!["milk", "bread"],
            vec!["milk", "bread", "butter"],
            vec!["bread", "butter"],
            vec!["milk"],
        ])
    }

    fn support_of(found: &[FrequentItemset], items: &[&str]) -> Option<f64> {
        let target = itemset(items);
        found.iter().find(|f| f.itemset == target).map(|f| f.support)
    }

    #[test]
    fn test_grocery_scenario() {
        let (found, _) = mine(&groceries(), 0.5, &CancellationToken::new()).unwrap();

        assert_eq!(support_of(&found, &["bread"]), Some(0.75));
        assert_eq!(support_of(&found, &["milk"]), Some(0.75));
        assert_eq!(support_of(&found, &["butter"]), Some(0.5));
        assert_eq!(support_of(&found, &["milk", "bread"]), Some(0.5));
        assert_eq!(support_of(&found, &["bread", "butter"]), Some(0.5));
        assert_eq!(support_of(&found, &["milk", "butter"]), None);
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn test_output_is_canonically_ordered() {
        let (found, _) = mine(&groceries(), 0.5, &CancellationToken::new()).unwrap();
        let order: Vec<String> = found.iter().map(|f| f.itemset.to_string()).collect();
        assert_eq!(
            order,
            vec!["{bread}", "{butter}", "{milk}", "{bread, butter}", "{bread, milk}"]
        );
    }

    #[test]
    fn test_every_subset_of_a_frequent_itemset_is_frequent() {
        let transactions = TransactionSet::from_baskets(vec![
            vec!["a", "b", "c", "d"],
            vec!["a", "b", "c"],
            vec!["a", "b", "d"],
            vec!["a", "c", "d"],
            vec!["b", "c", "d"],
            vec!["a", "b", "c", "d", "e"],
        ]);
        let (found, _) = mine(&transactions, 0.3, &CancellationToken::new()).unwrap();
        let frequent: HashSet<&Itemset> = found.iter().map(|f| &f.itemset).collect();

        assert!(found.iter().any(|f| f.itemset.len() == 3));
        for f in &found {
            for subset in f.itemset.immediate_subsets() {
                assert!(frequent.contains(&subset), "{} missing subset {}", f.itemset, subset);
            }
        }
    }

    #[test]
    fn test_candidates_with_infrequent_subset_are_pruned() {
        let level: Vec<FrequentItemset> = [["a", "b"], ["a", "c"], ["a", "d"], ["b", "c"]]
            .iter()
            .map(|items| FrequentItemset::new(itemset(items), 2, 4))
            .collect();

        let generated = generate_candidates(&level);

        // abd needs bd, acd needs cd: neither is frequent
        assert_eq!(generated.candidates, vec![itemset(&["a", "b", "c"])]);
        assert_eq!(generated.pruned, 2);
    }

    #[test]
    fn test_each_union_generated_once() {
        let level: Vec<FrequentItemset> = [["a", "b"], ["a", "c"], ["b", "c"]]
            .iter()
            .map(|items| FrequentItemset::new(itemset(items), 1, 1))
            .collect();

        let generated = generate_candidates(&level);
        assert_eq!(generated.candidates, vec![itemset(&["a", "b", "c"])]);
        assert_eq!(generated.pruned, 0);
    }

    #[test]
    fn test_full_support_keeps_only_universal_items() {
        let transactions = TransactionSet::from_baskets(vec![
            vec!["a", "b", "x"],
            vec!["a", "c"],
            vec!["a", "b"],
        ]);
        let (found, _) = mine(&transactions, 1.0, &CancellationToken::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].itemset, itemset(&["a"]));
        assert_eq!(found[0].support, 1.0);
    }

    #[test]
    fn test_threshold_above_max_frequency_is_empty_not_error() {
        let (found, trace) = mine(&groceries(), 0.76, &CancellationToken::new()).unwrap();
        assert!(found.is_empty());
        assert!(trace.as_str().contains("search complete"));
    }

    #[test]
    fn test_invalid_threshold() {
        for bad in [0.0, 1.5, -0.2, f64::NAN] {
            let err = mine(&groceries(), bad, &CancellationToken::new()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidThreshold);
        }
    }

    #[test]
    fn test_empty_dataset() {
        let empty = TransactionSet::new(Vec::new());
        let err = mine(&empty, 0.5, &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDataset);

        let no_items = TransactionSet::from_baskets(vec![Vec::<&str>::new(), Vec::new()]);
        let err = mine(&no_items, 0.5, &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDataset);
    }

    #[test]
    fn test_cancelled_before_search() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = mine(&groceries(), 0.5, &cancel).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_cancelled_between_levels() {
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();
        let err = search(&groceries(), 0.5, &cancel, |size, level| {
            seen.push((size, level.len()));
            cancel.cancel();
        })
        .unwrap_err();

        assert_eq!(seen, vec![(1, 3)]);
        assert!(matches!(
            err,
            MiningError::Cancelled { ref stage } if stage == "level 2"
        ));
    }

    #[test]
    fn test_trace_records_levels() {
        let (_, trace) = mine(&groceries(), 0.5, &CancellationToken::new()).unwrap();
        let text = trace.as_str();
        assert!(text.contains("Finding frequent 1-itemsets"));
        assert!(text.contains("Checked 3 candidate 1-itemsets: 3 frequent"));
        assert!(text.contains("Checked 3 candidate 2-itemsets: 2 frequent"));
        assert!(text.contains("Total frequent itemsets: 5"));
    }
}
