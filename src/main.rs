//! BasketForge: market-basket analysis CLI
//!
//! Loads transactions, mines frequent itemsets and association rules,
//! writes the JSON report, and optionally compares against the FP-Growth
//! reference miner.

use anyhow::Result;
use basketforge::report::{self, ComparisonReport, MiningReport};
use basketforge::{
    load_catalog, load_transactions, Args, CancellationToken, ErrorKind, FpGrowthStrategy,
    MiningSession,
};
use clap::Parser;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        println!("BasketForge - Market-Basket Analysis");
        println!("====================================\n");
    }

    let thresholds = args.thresholds()?;
    let start_time = Instant::now();

    // Step 1: Load transactions
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
    }
    let data_start = Instant::now();
    let loaded = load_transactions(&args.input, args.format)?;
    println!(
        "✓ Data loaded: {} transactions, {} distinct items",
        loaded.transactions.len(),
        loaded.transactions.distinct_items().len()
    );
    let mut products = loaded.catalog;
    if let Some(catalog_path) = &args.catalog {
        products.merge(load_catalog(catalog_path)?);
        println!("✓ Product catalog loaded: {} descriptions", products.len());
    }
    if args.verbose {
        println!("  Loading time: {:.2}s", data_start.elapsed().as_secs_f64());
    }

    // Step 2: Mine
    let session = MiningSession::with_strategies(
        args.algorithm.strategy(),
        Box::new(FpGrowthStrategy),
    );
    if args.verbose {
        println!("\nStep 2: Mining with {}", session.strategy_name());
        println!("  Support threshold: {}", thresholds.min_support);
        println!("  Confidence threshold: {}", thresholds.min_confidence);
    }
    let cancel = match args.timeout() {
        Some(limit) => CancellationToken::with_deadline(limit),
        None => CancellationToken::new(),
    };
    let result = match session.run_with_cancel(
        loaded.transactions,
        thresholds.min_support,
        thresholds.min_confidence,
        &cancel,
    ) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err.report())?);
            return Err(err.into());
        }
    };
    println!(
        "✓ Mining complete: {} frequent itemsets, {} rules",
        result.frequent_itemsets.len(),
        result.association_rules.len()
    );

    // Step 3: Report
    let catalog = (!products.is_empty()).then_some(&products);
    report::print_summary(&result, catalog, args.top);
    report::write_json(&MiningReport::from_result(&result, catalog), Path::new(&args.output))?;
    println!("\nReport saved to: {}", args.output);

    // Step 4: Reference comparison
    if args.compare {
        if args.verbose {
            println!("\nStep 4: Comparing with {}", session.reference_name());
        }
        match session.compare_with_cancel(&cancel) {
            Ok(comparison) => {
                let comparison_report = ComparisonReport::new(&result, &comparison, catalog);
                report::print_comparison(&comparison_report.summary);
                let path = args.comparison_output();
                report::write_json(&comparison_report, Path::new(&path))?;
                println!("Comparison saved to: {}", path);
            }
            Err(err) if err.kind() == ErrorKind::ReferenceImplementationFailure => {
                warn!(error = %err, "Comparison unavailable");
                println!("\n✗ Comparison unavailable: {}", err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(seconds = start_time.elapsed().as_secs_f64(), "Pipeline complete");
    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("basketforge={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
