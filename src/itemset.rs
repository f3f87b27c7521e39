//! Items, itemsets and the transaction set they are counted against

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Opaque product identifier (a retail stock code)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Item(String);

impl Item {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Item {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for Item {
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// Non-empty set of items, kept sorted so equal sets compare equal
/// regardless of discovery order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Itemset(Vec<Item>);

impl Itemset {
    /// Build an itemset from any collection of items; `None` if it is empty
    pub fn try_new<I, T>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let mut items: Vec<Item> = items.into_iter().map(Into::into).collect();
        items.sort_unstable();
        items.dedup();
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn single(item: Item) -> Self {
        Self(vec![item])
    }

    /// Wrap items that are already sorted and unique
    fn from_sorted(items: Vec<Item>) -> Option<Self> {
        debug_assert!(items.windows(2).all(|w| w[0] < w[1]));
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.0.binary_search(item).is_ok()
    }

    /// True if every item of `self` is in `other`
    pub fn is_subset_of(&self, other: &Itemset) -> bool {
        sorted_contains_all(&other.0, &self.0)
    }

    /// Apriori join: two k-itemsets sharing their first k-1 items, where
    /// `self` has the smaller last item, produce the (k+1)-itemset union.
    pub fn join(&self, other: &Itemset) -> Option<Itemset> {
        let k = self.len();
        if k == 0 || other.len() != k || self.0[..k - 1] != other.0[..k - 1] {
            return None;
        }
        if self.0[k - 1] >= other.0[k - 1] {
            return None;
        }
        let mut items = self.0.clone();
        items.push(other.0[k - 1].clone());
        Some(Self(items))
    }

    /// Every subset with exactly one item removed
    pub fn immediate_subsets(&self) -> impl Iterator<Item = Itemset> + '_ {
        (0..self.len()).filter_map(move |skip| {
            let items = self
                .0
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, item)| item.clone())
                .collect();
            Self::from_sorted(items)
        })
    }

    /// Subset picked by a bit mask over item positions
    pub fn select(&self, mask: u64) -> Option<Itemset> {
        let items = self
            .0
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < 64 && mask & (1u64 << i) != 0)
            .map(|(_, item)| item.clone())
            .collect();
        Self::from_sorted(items)
    }

    /// Size first, then lexicographic: the order itemsets are reported in
    pub fn canonical_cmp(&self, other: &Itemset) -> Ordering {
        self.len().cmp(&other.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for Itemset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("}")
    }
}

/// Merge walk over two sorted slices
fn sorted_contains_all(haystack: &[Item], needles: &[Item]) -> bool {
    if needles.len() > haystack.len() {
        return false;
    }
    let mut hay = haystack.iter();
    'outer: for needle in needles {
        for candidate in hay.by_ref() {
            match candidate.cmp(needle) {
                Ordering::Less => continue,
                Ordering::Equal => continue 'outer,
                Ordering::Greater => return false,
            }
        }
        return false;
    }
    true
}

/// One basket: a set of items, sorted and de-duplicated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction(Vec<Item>);

impl Transaction {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        let mut items: Vec<Item> = items.into_iter().map(Into::into).collect();
        items.sort_unstable();
        items.dedup();
        Self(items)
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_all(&self, itemset: &Itemset) -> bool {
        sorted_contains_all(&self.0, itemset.items())
    }
}

/// Ordered, immutable collection of transactions. Cloning shares the
/// underlying storage, so a session can cache it without copying.
#[derive(Debug, Clone)]
pub struct TransactionSet {
    transactions: Arc<[Transaction]>,
}

impl TransactionSet {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions: transactions.into(),
        }
    }

    /// Build from raw baskets, e.g. `[["milk", "bread"], ["milk"]]`
    pub fn from_baskets<B, I, T>(baskets: B) -> Self
    where
        B: IntoIterator<Item = I>,
        I: IntoIterator<Item = T>,
        T: Into<Item>,
    {
        Self::new(baskets.into_iter().map(Transaction::new).collect())
    }

    /// `total_transactions`
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn as_slice(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of transactions containing every item of `itemset`
    pub fn support_count(&self, itemset: &Itemset) -> u64 {
        self.transactions
            .iter()
            .filter(|t| t.contains_all(itemset))
            .count() as u64
    }

    pub fn distinct_items(&self) -> BTreeSet<&Item> {
        self.transactions
            .iter()
            .flat_map(|t| t.items().iter())
            .collect()
    }

    /// True when both handles point at the same cached storage
    pub fn shares_storage_with(&self, other: &TransactionSet) -> bool {
        Arc::ptr_eq(&self.transactions, &other.transactions)
    }
}

/// An itemset that met the support threshold, with its absolute count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentItemset {
    pub itemset: Itemset,
    pub count: u64,
    pub support: f64,
}

impl FrequentItemset {
    pub fn new(itemset: Itemset, count: u64, total_transactions: usize) -> Self {
        let support = if total_transactions == 0 {
            0.0
        } else {
            count as f64 / total_transactions as f64
        };
        Self {
            itemset,
            count,
            support,
        }
    }
}
