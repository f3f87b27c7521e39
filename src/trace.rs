//! Human-readable record of the stages a miner went through

use crate::itemset::TransactionSet;
use std::fmt::Write;

const RULE: &str = "============================================================";

/// Accumulates the `steps` text returned with every mining result
#[derive(Debug, Default, Clone)]
pub struct Trace {
    text: String,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a titled section
    pub fn stage(&mut self, title: impl AsRef<str>) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        let _ = writeln!(self.text, "{RULE}\n{}\n{RULE}", title.as_ref());
    }

    pub fn line(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    /// Dataset overview: counts and the first few baskets
    pub fn dataset_summary(&mut self, transactions: &TransactionSet) {
        self.stage("DATA PREPROCESSING");
        self.line(format!("Total transactions: {}", transactions.len()));
        self.line(format!(
            "Unique items found: {}",
            transactions.distinct_items().len()
        ));
        self.line("Sample transactions:");
        for (i, transaction) in transactions.iter().take(5).enumerate() {
            let shown: Vec<&str> = transaction
                .items()
                .iter()
                .take(5)
                .map(|item| item.code())
                .collect();
            let mut line = format!("  Transaction {}: [{}]", i + 1, shown.join(", "));
            if transaction.len() > 5 {
                let _ = write!(line, " ... (+{} more items)", transaction.len() - 5);
            }
            self.line(line);
        }
        if transactions.len() > 5 {
            self.line(format!("  ... and {} more transactions", transactions.len() - 5));
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}
