//! FP-Growth reference miner
//!
//! An implementation independent from [`crate::apriori`]: transactions are
//! one-hot encoded into a boolean matrix, compressed into a prefix tree,
//! and mined recursively through conditional pattern bases. Rules are
//! derived from the resulting support table by enumerating antecedent
//! combinations. Used to cross-check the Apriori results.

use crate::config::{meets_support, validate_ratio, CancellationToken};
use crate::error::{MiningError, Result};
use crate::itemset::{FrequentItemset, Item, Itemset, TransactionSet};
use crate::rules::AssociationRule;
use crate::trace::Trace;
use ndarray::Array2;
use std::collections::HashMap;
use tracing::{debug, info};

/// Transactions as a boolean matrix: one row per transaction, one column
/// per distinct item (columns sorted by item code)
#[derive(Debug, Clone)]
pub struct OneHotEncoding {
    pub columns: Vec<Item>,
    pub matrix: Array2<bool>,
}

impl OneHotEncoding {
    pub fn fit_transform(transactions: &TransactionSet) -> Self {
        let columns: Vec<Item> = transactions.distinct_items().into_iter().cloned().collect();
        let index: HashMap<&Item, usize> = columns.iter().enumerate().map(|(i, item)| (item, i)).collect();

        let mut matrix = Array2::from_elem((transactions.len(), columns.len()), false);
        for (row, transaction) in transactions.iter().enumerate() {
            for item in transaction.items() {
                if let Some(&col) = index.get(item) {
                    matrix[[row, col]] = true;
                }
            }
        }

        Self { columns, matrix }
    }

    pub fn column_counts(&self) -> Vec<u64> {
        self.matrix
            .columns()
            .into_iter()
            .map(|column| column.iter().filter(|&&present| present).count() as u64)
            .collect()
    }
}

#[derive(Debug)]
struct FpNode {
    item: Option<usize>,
    count: u64,
    parent: Option<usize>,
    children: HashMap<usize, usize>,
}

/// Prefix tree over item columns, with a header table linking every node
/// of the same item
#[derive(Debug)]
struct FpTree {
    nodes: Vec<FpNode>,
    header: HashMap<usize, Vec<usize>>,
    item_counts: HashMap<usize, u64>,
}

impl FpTree {
    /// Build a tree from weighted patterns, keeping only items for which
    /// `is_frequent` holds. Items in each path are ordered by descending
    /// count, ties broken by column.
    fn build(patterns: &[(Vec<usize>, u64)], is_frequent: &impl Fn(u64) -> bool) -> Self {
        let mut counts: HashMap<usize, u64> = HashMap::new();
        for (pattern, weight) in patterns {
            for &item in pattern {
                *counts.entry(item).or_default() += weight;
            }
        }
        counts.retain(|_, count| is_frequent(*count));

        let mut tree = FpTree {
            nodes: vec![FpNode {
                item: None,
                count: 0,
                parent: None,
                children: HashMap::new(),
            }],
            header: HashMap::new(),
            item_counts: counts,
        };

        for (pattern, weight) in patterns {
            let mut path: Vec<usize> = pattern
                .iter()
                .copied()
                .filter(|item| tree.item_counts.contains_key(item))
                .collect();
            path.sort_by(|a, b| {
                tree.item_counts[b]
                    .cmp(&tree.item_counts[a])
                    .then_with(|| a.cmp(b))
            });
            tree.insert(&path, *weight);
        }

        tree
    }

    fn insert(&mut self, path: &[usize], weight: u64) {
        let mut current = 0;
        for &item in path {
            current = match self.nodes[current].children.get(&item) {
                Some(&child) => {
                    self.nodes[child].count += weight;
                    child
                }
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(FpNode {
                        item: Some(item),
                        count: weight,
                        parent: Some(current),
                        children: HashMap::new(),
                    });
                    self.nodes[current].children.insert(item, child);
                    self.header.entry(item).or_default().push(child);
                    child
                }
            };
        }
    }

    fn is_empty(&self) -> bool {
        self.item_counts.is_empty()
    }

    /// Paths from the root down to (excluding) every node of `item`,
    /// weighted by that node's count
    fn conditional_patterns(&self, item: usize) -> Vec<(Vec<usize>, u64)> {
        let Some(nodes) = self.header.get(&item) else {
            return Vec::new();
        };
        nodes
            .iter()
            .filter_map(|&node| {
                let mut path = Vec::new();
                let mut parent = self.nodes[node].parent;
                while let Some(index) = parent {
                    if let Some(ancestor) = self.nodes[index].item {
                        path.push(ancestor);
                    }
                    parent = self.nodes[index].parent;
                }
                (!path.is_empty()).then(|| (path, self.nodes[node].count))
            })
            .collect()
    }

    /// Header items, least frequent first
    fn items_ascending(&self) -> Vec<usize> {
        let mut items: Vec<usize> = self.item_counts.keys().copied().collect();
        items.sort_by(|a, b| {
            self.item_counts[a]
                .cmp(&self.item_counts[b])
                .then_with(|| a.cmp(b))
        });
        items
    }
}

fn grow(
    tree: &FpTree,
    suffix: &[usize],
    is_frequent: &impl Fn(u64) -> bool,
    found: &mut Vec<(Vec<usize>, u64)>,
) {
    for item in tree.items_ascending() {
        let mut pattern = suffix.to_vec();
        pattern.push(item);
        found.push((pattern.clone(), tree.item_counts[&item]));

        let conditional = FpTree::build(&tree.conditional_patterns(item), is_frequent);
        if !conditional.is_empty() {
            grow(&conditional, &pattern, is_frequent, found);
        }
    }
}

/// Mine frequent itemsets with FP-Growth
pub fn mine(
    transactions: &TransactionSet,
    min_support: f64,
    cancel: &CancellationToken,
) -> Result<(Vec<FrequentItemset>, Trace)> {
    let min_support = validate_ratio("support", min_support)?;
    if transactions.is_empty() {
        return Err(MiningError::EmptyDataset(
            "transaction set has no transactions".to_string(),
        ));
    }
    let total = transactions.len();

    let mut trace = Trace::new();
    trace.stage("FP-GROWTH REFERENCE");
    trace.line(format!("Support threshold: {}", min_support));
    trace.line(format!("Total transactions: {}", total));

    let encoding = OneHotEncoding::fit_transform(transactions);
    if encoding.columns.is_empty() {
        return Err(MiningError::EmptyDataset(
            "transactions contain no items".to_string(),
        ));
    }
    trace.line(format!(
        "Encoded {} transactions with {} unique items",
        encoding.matrix.nrows(),
        encoding.columns.len()
    ));
    debug!(columns = encoding.columns.len(), "One-hot encoding complete");

    let is_frequent = |count: u64| meets_support(count, total, min_support);
    let frequent_columns = encoding
        .column_counts()
        .into_iter()
        .filter(|&count| is_frequent(count))
        .count();
    trace.line(format!(
        "Frequent single items: {} of {}",
        frequent_columns,
        encoding.columns.len()
    ));
    let rows: Vec<(Vec<usize>, u64)> = encoding
        .matrix
        .rows()
        .into_iter()
        .map(|row| {
            let present = row
                .iter()
                .enumerate()
                .filter(|(_, present)| **present)
                .map(|(col, _)| col)
                .collect();
            (present, 1)
        })
        .collect();
    let tree = FpTree::build(&rows, &is_frequent);
    trace.line(format!(
        "FP-tree built: {} nodes, {} frequent items",
        tree.nodes.len() - 1,
        tree.item_counts.len()
    ));

    let mut found = Vec::new();
    for item in tree.items_ascending() {
        cancel.check(format!("FP-Growth on item {}", encoding.columns[item]))?;
        found.push((vec![item], tree.item_counts[&item]));
        let conditional = FpTree::build(&tree.conditional_patterns(item), &is_frequent);
        if !conditional.is_empty() {
            grow(&conditional, &[item], &is_frequent, &mut found);
        }
    }

    let mut frequent: Vec<FrequentItemset> = found
        .into_iter()
        .filter_map(|(columns, count)| {
            let itemset = Itemset::try_new(columns.into_iter().map(|col| encoding.columns[col].clone()))?;
            Some(FrequentItemset::new(itemset, count, total))
        })
        .collect();
    frequent.sort_by(|a, b| a.itemset.canonical_cmp(&b.itemset));

    trace.line(format!("Found {} frequent itemsets", frequent.len()));
    info!(frequent_itemsets = frequent.len(), "FP-Growth search finished");
    Ok((frequent, trace))
}

/// Rules from an FP-Growth support table: for each itemset, every
/// antecedent of size 1..n-1 is taken in turn and scored against the table
pub fn association_rules(
    frequent: &[FrequentItemset],
    total_transactions: usize,
    min_confidence: f64,
) -> Result<Vec<AssociationRule>> {
    let min_confidence = validate_ratio("confidence", min_confidence)?;
    let table: HashMap<&Itemset, u64> = frequent.iter().map(|f| (&f.itemset, f.count)).collect();
    let total = total_transactions as f64;
    let mut rules = Vec::new();

    for entry in frequent.iter().filter(|f| f.itemset.len() >= 2) {
        let items = entry.itemset.items();
        for size in 1..items.len() {
            for picked in combinations(items.len(), size) {
                let antecedent = Itemset::try_new(picked.iter().map(|&i| items[i].clone()));
                let consequent = Itemset::try_new(
                    (0..items.len())
                        .filter(|i| !picked.contains(i))
                        .map(|i| items[i].clone()),
                );
                let (Some(antecedent), Some(consequent)) = (antecedent, consequent) else {
                    continue;
                };

                let lookup = |itemset: &Itemset| {
                    table.get(itemset).copied().ok_or_else(|| {
                        MiningError::ReferenceImplementationFailure(format!(
                            "support of {} missing from the FP-Growth table",
                            itemset
                        ))
                    })
                };
                let antecedent_count = lookup(&antecedent)?;
                let consequent_count = lookup(&consequent)?;

                let confidence = entry.count as f64 / antecedent_count as f64;
                if confidence < min_confidence {
                    continue;
                }
                rules.push(AssociationRule {
                    support: entry.count as f64 / total,
                    lift: confidence / (consequent_count as f64 / total),
                    confidence,
                    antecedent,
                    consequent,
                });
            }
        }
    }

    Ok(rules)
}

/// Index combinations of `r` out of `n`, in lexicographic order
fn combinations(n: usize, r: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, n: usize, r: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == r {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            extend(i + 1, n, r, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    if r <= n {
        extend(0, n, r, &mut Vec::with_capacity(r), &mut out);
    }
    out
}
