//! Property tests for the miners and the rule generator

use basketforge::{apriori, fpgrowth, rules, CancellationToken, Itemset, TransactionSet};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};

const ALPHABET: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn baskets() -> impl Strategy<Value = TransactionSet> {
    prop::collection::vec(prop::collection::btree_set(0usize..ALPHABET.len(), 1..5), 1..9)
        .prop_map(|rows| {
            TransactionSet::from_baskets(
                rows.into_iter()
                    .map(|row| row.into_iter().map(|i| ALPHABET[i]).collect::<Vec<_>>()),
            )
        })
}

fn thresholds() -> impl Strategy<Value = (f64, f64)> {
    (1u32..=10, 1u32..=10).prop_map(|(s, c)| (s as f64 / 10.0, c as f64 / 10.0))
}

fn counts(frequent: &[basketforge::FrequentItemset]) -> HashMap<Itemset, u64> {
    frequent
        .iter()
        .map(|f| (f.itemset.clone(), f.count))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every subset of a frequent itemset is itself reported
    #[test]
    fn test_anti_monotonicity(transactions in baskets(), (support, _) in thresholds()) {
        let (frequent, _) = apriori::mine(&transactions, support, &CancellationToken::new()).unwrap();
        let found: HashSet<&Itemset> = frequent.iter().map(|f| &f.itemset).collect();

        for f in &frequent {
            for subset in f.itemset.immediate_subsets() {
                prop_assert!(found.contains(&subset), "{} missing for {}", subset, f.itemset);
            }
            prop_assert!(f.support >= support);
            prop_assert_eq!(f.count, transactions.support_count(&f.itemset));
        }
    }

    /// A subset never has lower support than its superset
    #[test]
    fn test_support_bound(transactions in baskets(), (support, _) in thresholds()) {
        let (frequent, _) = apriori::mine(&transactions, support, &CancellationToken::new()).unwrap();

        for small in &frequent {
            for large in &frequent {
                if small.itemset.is_subset_of(&large.itemset) {
                    prop_assert!(small.support >= large.support);
                }
            }
        }
    }

    /// Confidence lands in (0, 1], lift is positive, and every rule clears the threshold
    #[test]
    fn test_rule_bounds(transactions in baskets(), (support, confidence) in thresholds()) {
        let (frequent, _) = apriori::mine(&transactions, support, &CancellationToken::new()).unwrap();
        let found = rules::generate(&frequent, transactions.len(), confidence).unwrap();

        for rule in &found {
            prop_assert!(rule.confidence > 0.0 && rule.confidence <= 1.0);
            prop_assert!(rule.confidence >= confidence);
            prop_assert!(rule.lift > 0.0);
            prop_assert!(!rule.antecedent.is_empty() && !rule.consequent.is_empty());
            for item in rule.antecedent.iter() {
                prop_assert!(!rule.consequent.contains(item));
            }
        }
    }

    /// Two runs over the same data agree
    #[test]
    fn test_determinism(transactions in baskets(), (support, confidence) in thresholds()) {
        let cancel = CancellationToken::new();
        let (first, _) = apriori::mine(&transactions, support, &cancel).unwrap();
        let (second, _) = apriori::mine(&transactions, support, &cancel).unwrap();
        prop_assert_eq!(&first, &second);

        let keys = |found: Vec<basketforge::AssociationRule>| -> HashSet<(Itemset, Itemset)> {
            found.into_iter().map(|r| (r.antecedent, r.consequent)).collect()
        };
        let first_rules = rules::generate(&first, transactions.len(), confidence).unwrap();
        let second_rules = rules::generate(&second, transactions.len(), confidence).unwrap();
        prop_assert_eq!(keys(first_rules), keys(second_rules));
    }

    /// The level-wise search and the FP-tree agree on itemsets, counts and rules
    #[test]
    fn test_apriori_matches_fp_growth(transactions in baskets(), (support, confidence) in thresholds()) {
        let cancel = CancellationToken::new();
        let (apriori_sets, _) = apriori::mine(&transactions, support, &cancel).unwrap();
        let (fp_sets, _) = fpgrowth::mine(&transactions, support, &cancel).unwrap();
        prop_assert_eq!(counts(&apriori_sets), counts(&fp_sets));

        let apriori_rules: HashSet<(Itemset, Itemset)> =
            rules::generate(&apriori_sets, transactions.len(), confidence)
                .unwrap()
                .into_iter()
                .map(|r| (r.antecedent, r.consequent))
                .collect();
        let fp_rules: HashSet<(Itemset, Itemset)> =
            fpgrowth::association_rules(&fp_sets, transactions.len(), confidence)
                .unwrap()
                .into_iter()
                .map(|r| (r.antecedent, r.consequent))
                .collect();
        prop_assert_eq!(apriori_rules, fp_rules);
    }

    /// Support 1 keeps exactly the combinations of items present in every basket
    #[test]
    fn test_full_support_keeps_universal_items(transactions in baskets()) {
        let (frequent, _) = apriori::mine(&transactions, 1.0, &CancellationToken::new()).unwrap();

        let universal: BTreeSet<&str> = ALPHABET
            .iter()
            .copied()
            .filter(|item| transactions.iter().all(|t| t.items().iter().any(|i| i.code() == *item)))
            .collect();

        for f in &frequent {
            prop_assert_eq!(f.count as usize, transactions.len());
            for item in f.itemset.iter() {
                prop_assert!(universal.contains(item.code()));
            }
        }
        let expected = (1usize << universal.len()) - 1;
        prop_assert_eq!(frequent.len(), expected);
    }

    /// A threshold above the most frequent item finds nothing
    #[test]
    fn test_threshold_above_max_frequency(transactions in baskets()) {
        let max_count = transactions
            .distinct_items()
            .into_iter()
            .map(|item| transactions.support_count(&Itemset::single(item.clone())))
            .max()
            .unwrap_or(0);
        prop_assume!((max_count as usize) < transactions.len());

        let support = (max_count as f64 + 0.5) / transactions.len() as f64;
        let (frequent, _) = apriori::mine(&transactions, support, &CancellationToken::new()).unwrap();
        prop_assert!(frequent.is_empty());
    }
}
