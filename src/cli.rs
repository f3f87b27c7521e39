//! Command-line interface definitions and argument parsing

use crate::config::{Thresholds, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_SUPPORT_THRESHOLD};
use crate::data::InputFormat;
use crate::strategy::Algorithm;
use clap::Parser;
use std::time::Duration;

/// Market-basket analysis: frequent itemsets and association rules
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, env = "BASKET_INPUT", default_value = "data.csv")]
    pub input: String,

    /// Input layout: raw retail invoice lines or pre-grouped baskets
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Minimum support ratio in (0, 1]
    #[arg(short, long, env = "BASKET_SUPPORT", default_value_t = DEFAULT_SUPPORT_THRESHOLD)]
    pub support: f64,

    /// Minimum confidence ratio in (0, 1]
    #[arg(short, long, env = "BASKET_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence: f64,

    /// CSV with `StockCode` and `Description` columns used to name products
    #[arg(long, env = "BASKET_CATALOG")]
    pub catalog: Option<String>,

    /// Mining algorithm for the main run
    #[arg(short, long, value_enum, default_value_t = Algorithm::Apriori)]
    pub algorithm: Algorithm,

    /// Output path for the JSON report
    #[arg(short, long, default_value = "mining_result.json")]
    pub output: String,

    /// Re-run the data through the FP-Growth reference and report the differences
    #[arg(long)]
    pub compare: bool,

    /// Abort mining after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Number of itemsets and rules shown in the console summary
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Validate the support/confidence pair
    pub fn thresholds(&self) -> crate::Result<Thresholds> {
        Ok(Thresholds::new(self.support, self.confidence)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Report path used for the comparison output
    pub fn comparison_output(&self) -> String {
        match self.output.strip_suffix(".json") {
            Some(stem) => format!("{}_comparison.json", stem),
            None => format!("{}_comparison.json", self.output),
        }
    }
}
