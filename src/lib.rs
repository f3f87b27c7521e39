//! BasketForge: market-basket analysis over retail transactions
//!
//! Frequent itemsets are found with a level-wise Apriori search, association
//! rules are scored by support, confidence and lift, and an independent
//! FP-Growth miner can re-run the same data to cross-check the results.

pub mod apriori;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod fpgrowth;
pub mod itemset;
pub mod report;
pub mod result;
pub mod rules;
pub mod session;
pub mod strategy;
pub mod trace;

// Re-export public items for easier access
pub use catalog::ProductCatalog;
pub use cli::Args;
pub use config::{CancellationToken, Thresholds};
pub use data::{load_catalog, load_transactions, InputFormat, LoadedData};
pub use error::{ErrorKind, ErrorReport, MiningError};
pub use itemset::{FrequentItemset, Item, Itemset, Transaction, TransactionSet};
pub use report::{ComparisonReport, ComparisonSummary, MiningReport};
pub use result::{ComparisonResult, MiningResult};
pub use rules::AssociationRule;
pub use session::MiningSession;
pub use strategy::{Algorithm, AprioriStrategy, FpGrowthStrategy, MiningStrategy};

/// Result type used by the loading, reporting and CLI layers
pub type Result<T> = anyhow::Result<T>;
