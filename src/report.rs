//! Report rendering: JSON output, display ordering, console summaries and
//! custom-vs-reference deltas

use crate::catalog::ProductCatalog;
use crate::config::Thresholds;
use crate::itemset::{FrequentItemset, Itemset};
use crate::result::{ComparisonResult, MiningResult};
use crate::rules::AssociationRule;
use anyhow::Context;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Itemsets ranked by descending support, ties in canonical order
pub fn itemsets_by_support(result: &MiningResult) -> Vec<&FrequentItemset> {
    let mut itemsets: Vec<&FrequentItemset> = result.frequent_itemsets.iter().collect();
    itemsets.sort_by(|a, b| {
        b.support
            .partial_cmp(&a.support)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.itemset.canonical_cmp(&b.itemset))
    });
    itemsets
}

/// Rules by descending confidence, then descending lift
pub fn rules_by_confidence(result: &MiningResult) -> Vec<&AssociationRule> {
    let mut rules: Vec<&AssociationRule> = result.association_rules.iter().collect();
    rules.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.lift.partial_cmp(&a.lift).unwrap_or(Ordering::Equal))
            .then_with(|| a.key().cmp(&b.key()))
    });
    rules
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Support as shown to consumers: a number, or "N/A" when it is unknown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SupportValue {
    Ratio(f64),
    NotAvailable(&'static str),
}

impl From<f64> for SupportValue {
    fn from(support: f64) -> Self {
        if support.is_finite() {
            SupportValue::Ratio(round4(support))
        } else {
            SupportValue::NotAvailable("N/A")
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemsetRow {
    pub rank: usize,
    pub itemset: Itemset,
    pub support: SupportValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleRow {
    pub antecedent: Itemset,
    pub consequent: Itemset,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub description: String,
}

/// `MiningResult` in the shape consumed by renderers
#[derive(Debug, Clone, Serialize)]
pub struct MiningReport {
    pub algorithm: &'static str,
    pub parameters: Thresholds,
    pub total_transactions: usize,
    pub frequent_itemsets: Vec<ItemsetRow>,
    pub association_rules: Vec<RuleRow>,
    pub execution_time: f64,
    pub steps: String,
}

impl MiningReport {
    pub fn from_result(result: &MiningResult, catalog: Option<&ProductCatalog>) -> Self {
        let frequent_itemsets = itemsets_by_support(result)
            .into_iter()
            .enumerate()
            .map(|(i, frequent)| ItemsetRow {
                rank: i + 1,
                itemset: frequent.itemset.clone(),
                support: frequent.support.into(),
            })
            .collect();

        let association_rules = rules_by_confidence(result)
            .into_iter()
            .map(|rule| RuleRow {
                antecedent: rule.antecedent.clone(),
                consequent: rule.consequent.clone(),
                support: round4(rule.support),
                confidence: round4(rule.confidence),
                lift: round4(rule.lift),
                description: rule.describe(catalog),
            })
            .collect();

        Self {
            algorithm: result.algorithm,
            parameters: result.thresholds,
            total_transactions: result.total_transactions,
            frequent_itemsets,
            association_rules,
            execution_time: round4(result.execution_time),
            steps: result.steps.clone(),
        }
    }
}

/// Differences between a custom run and the reference run over the same data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub custom_algorithm: &'static str,
    pub reference_algorithm: &'static str,
    /// custom minus reference
    pub itemset_count_difference: i64,
    pub rule_count_difference: i64,
    /// custom time divided by reference time; `None` if the reference took no measurable time
    pub time_ratio: Option<f64>,
    pub itemsets_match: bool,
    pub rules_match: bool,
    pub itemsets_missing_from_custom: usize,
    pub itemsets_missing_from_reference: usize,
}

impl ComparisonSummary {
    pub fn between(custom: &MiningResult, reference: &MiningResult) -> Self {
        let custom_sets: HashSet<&Itemset> =
            custom.frequent_itemsets.iter().map(|f| &f.itemset).collect();
        let reference_sets: HashSet<&Itemset> =
            reference.frequent_itemsets.iter().map(|f| &f.itemset).collect();
        let custom_rules: HashSet<_> = custom.association_rules.iter().map(|r| r.key()).collect();
        let reference_rules: HashSet<_> =
            reference.association_rules.iter().map(|r| r.key()).collect();

        let time_ratio = (reference.execution_time > 0.0)
            .then(|| custom.execution_time / reference.execution_time);

        Self {
            custom_algorithm: custom.algorithm,
            reference_algorithm: reference.algorithm,
            itemset_count_difference: custom.frequent_itemsets.len() as i64
                - reference.frequent_itemsets.len() as i64,
            rule_count_difference: custom.association_rules.len() as i64
                - reference.association_rules.len() as i64,
            time_ratio,
            itemsets_match: custom_sets == reference_sets,
            rules_match: custom_rules == reference_rules,
            itemsets_missing_from_custom: reference_sets.difference(&custom_sets).count(),
            itemsets_missing_from_reference: custom_sets.difference(&reference_sets).count(),
        }
    }
}

/// Custom report, reference report and their summary, written together
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub custom: MiningReport,
    pub reference: MiningReport,
    pub summary: ComparisonSummary,
}

impl ComparisonReport {
    pub fn new(
        custom: &MiningResult,
        comparison: &ComparisonResult,
        catalog: Option<&ProductCatalog>,
    ) -> Self {
        Self {
            custom: MiningReport::from_result(custom, catalog),
            reference: MiningReport::from_result(&comparison.reference, catalog),
            summary: ComparisonSummary::between(custom, &comparison.reference),
        }
    }
}

/// Write any report as pretty-printed JSON
pub fn write_json<T: Serialize>(report: &T, output_path: &Path) -> crate::Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create report file {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Print headline numbers and the top rows of a result
pub fn print_summary(result: &MiningResult, catalog: Option<&ProductCatalog>, top: usize) {
    println!("\n=== {} Results ===", result.algorithm);
    println!("Total transactions: {}", result.total_transactions);
    println!(
        "Thresholds: support >= {}, confidence >= {}",
        result.thresholds.min_support, result.thresholds.min_confidence
    );
    println!("Frequent itemsets: {}", result.frequent_itemsets.len());
    println!("Association rules: {}", result.association_rules.len());
    println!("Execution time: {:.4}s", result.execution_time);

    if !result.frequent_itemsets.is_empty() {
        println!("\nTop itemsets by support:");
        for (i, frequent) in itemsets_by_support(result).into_iter().take(top).enumerate() {
            println!("  {:>3}. {} support = {:.4}", i + 1, frequent.itemset, frequent.support);
        }
    }

    if result.association_rules.is_empty() {
        println!("\nNo association rules found with the given thresholds.");
    } else {
        println!("\nTop rules by confidence:");
        for rule in rules_by_confidence(result).into_iter().take(top) {
            println!(
                "  {} => {} | conf {:.4} | lift {:.4}",
                rule.antecedent, rule.consequent, rule.confidence, rule.lift
            );
            println!("      {}", rule.describe(catalog));
        }
    }
}

pub fn print_comparison(summary: &ComparisonSummary) {
    println!(
        "\n=== Comparison: {} vs {} ===",
        summary.custom_algorithm, summary.reference_algorithm
    );
    println!(
        "Itemsets match: {} (difference {:+})",
        summary.itemsets_match, summary.itemset_count_difference
    );
    if !summary.itemsets_match {
        println!(
            "  missing from {}: {}, missing from {}: {}",
            summary.custom_algorithm,
            summary.itemsets_missing_from_custom,
            summary.reference_algorithm,
            summary.itemsets_missing_from_reference
        );
    }
    println!(
        "Rules match: {} (difference {:+})",
        summary.rules_match, summary.rule_count_difference
    );
    match summary.time_ratio {
        Some(ratio) => println!(
            "Time ratio ({} / {}): {:.2}x",
            summary.custom_algorithm, summary.reference_algorithm, ratio
        ),
        None => println!("Time ratio: n/a"),
    }
}
