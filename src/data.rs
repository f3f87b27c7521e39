//! Transaction loading from CSV using Polars

use crate::catalog::ProductCatalog;
use crate::itemset::{Transaction, TransactionSet};
use anyhow::Context;
use clap::ValueEnum;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Columns a raw retail export must provide
const RETAIL_COLUMNS: [&str; 5] = ["InvoiceNo", "StockCode", "Quantity", "UnitPrice", "CustomerID"];

/// Column holding one comma-separated basket per row
const BASKET_COLUMN: &str = "ListItem";

/// Read as text regardless of what the first rows look like: invoice
/// numbers turn alphanumeric (`C` prefix) and stock codes gain letter
/// suffixes well past the inference window
const TEXT_COLUMNS: [&str; 4] = ["InvoiceNo", "StockCode", "Description", BASKET_COLUMN];

/// Layout of the input CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputFormat {
    /// Baskets if a `ListItem` column exists, retail lines otherwise
    #[default]
    Auto,
    /// One row per invoice line (`InvoiceNo`, `StockCode`, ...)
    Retail,
    /// One row per basket in a `ListItem` column
    Baskets,
}

/// Transactions ready for mining, plus whatever product names the file had
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub transactions: TransactionSet,
    pub catalog: ProductCatalog,
}

/// Load a CSV file and turn it into a transaction set
///
/// # Arguments
/// * `file_path` - Path to the CSV file
/// * `format` - Input layout, or `Auto` to detect it from the header
///
/// # Returns
/// * `LoadedData` with the transactions and a product catalog (empty for baskets)
pub fn load_transactions(file_path: &str, format: InputFormat) -> crate::Result<LoadedData> {
    let df = read_csv(file_path)?;

    let format = match format {
        InputFormat::Auto if df.get_column_names().contains(&BASKET_COLUMN) => InputFormat::Baskets,
        InputFormat::Auto => InputFormat::Retail,
        explicit => explicit,
    };
    debug!(?format, rows = df.height(), "CSV loaded");

    let loaded = match format {
        InputFormat::Baskets => LoadedData {
            transactions: baskets_from_lists(&df)?,
            catalog: ProductCatalog::new(),
        },
        _ => transactions_from_retail(df)?,
    };

    if loaded.transactions.is_empty() {
        anyhow::bail!("No valid transactions found after data cleaning");
    }
    info!(
        transactions = loaded.transactions.len(),
        products = loaded.catalog.len(),
        "Transactions loaded"
    );
    Ok(loaded)
}

/// Load a `StockCode`/`Description` lookup file; rows with a blank code
/// or description are skipped
pub fn load_catalog(file_path: &str) -> crate::Result<ProductCatalog> {
    let df = read_csv(file_path)?;
    let codes = df
        .column("StockCode")
        .with_context(|| format!("Catalog {} is missing column 'StockCode'", file_path))?
        .str()?;
    let descriptions = df
        .column("Description")
        .with_context(|| format!("Catalog {} is missing column 'Description'", file_path))?
        .str()?;

    let catalog: ProductCatalog = codes
        .into_iter()
        .zip(descriptions.into_iter())
        .filter_map(|(code, description)| Some((code?.trim(), description?)))
        .filter(|(code, _)| !code.is_empty())
        .collect();
    info!(products = catalog.len(), path = file_path, "Product catalog loaded");
    Ok(catalog)
}

/// Read a CSV with the text columns pinned to `String`
fn read_csv(file_path: &str) -> crate::Result<DataFrame> {
    let header = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .finish()
        .and_then(|mut frame| frame.schema())
        .with_context(|| format!("Failed to read CSV file {}", file_path))?;
    let text_schema: Schema = TEXT_COLUMNS
        .iter()
        .filter(|name| header.get(name).is_some())
        .map(|name| Field::new(name, DataType::String))
        .collect();

    LazyCsvReader::new(file_path)
        .with_has_header(true)
        .with_dtype_overwrite(Some(Arc::new(text_schema)))
        .finish()
        .and_then(LazyFrame::collect)
        .with_context(|| format!("Failed to read CSV file {}", file_path))
}

/// Clean raw invoice lines and group stock codes by invoice
///
/// Drops rows without a customer, cancelled invoices (`C` prefix),
/// non-positive quantity or price, and the postage/manual codes.
fn transactions_from_retail(df: DataFrame) -> crate::Result<LoadedData> {
    let columns = df.get_column_names();
    for required in RETAIL_COLUMNS {
        if !columns.contains(&required) {
            anyhow::bail!("Input is missing required column '{}'", required);
        }
    }
    let has_description = columns.contains(&"Description");

    let mut selected = vec![col("InvoiceNo"), col("StockCode")];
    if has_description {
        selected.push(col("Description").cast(DataType::String));
    }

    let cleaned = df
        .lazy()
        .with_columns([
            col("InvoiceNo").cast(DataType::String),
            col("StockCode").cast(DataType::String),
        ])
        .filter(
            col("CustomerID")
                .is_not_null()
                .and(col("InvoiceNo").str().starts_with(lit("C")).not())
                .and(col("Quantity").gt(lit(0)))
                .and(col("UnitPrice").gt(lit(0.0)))
                .and(col("StockCode").neq(lit("POST")))
                .and(col("StockCode").neq(lit("M"))),
        )
        .select(selected)
        .collect()?;
    debug!(rows = cleaned.height(), "Retail rows after cleaning");

    let invoices = cleaned.column("InvoiceNo")?.str()?;
    let codes = cleaned.column("StockCode")?.str()?;

    let mut baskets: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (invoice, code) in invoices.into_iter().zip(codes.into_iter()) {
        if let (Some(invoice), Some(code)) = (invoice, code) {
            let code = code.trim();
            if !code.is_empty() {
                baskets.entry(invoice.trim()).or_default().insert(code);
            }
        }
    }

    let mut catalog = ProductCatalog::new();
    if has_description {
        let descriptions = cleaned.column("Description")?.str()?;
        for (code, description) in codes.into_iter().zip(descriptions.into_iter()) {
            if let (Some(code), Some(description)) = (code, description) {
                catalog.insert(code, description);
            }
        }
    }

    let transactions = baskets.into_values().map(Transaction::new).collect();
    Ok(LoadedData {
        transactions: TransactionSet::new(transactions),
        catalog,
    })
}

/// Split each `ListItem` cell on commas; empty baskets are skipped
fn baskets_from_lists(df: &DataFrame) -> crate::Result<TransactionSet> {
    let lists = df
        .column(BASKET_COLUMN)
        .with_context(|| format!("Input is missing required column '{}'", BASKET_COLUMN))?
        .cast(&DataType::String)?;

    let transactions: Vec<Transaction> = lists
        .str()?
        .into_iter()
        .flatten()
        .map(|line| {
            Transaction::new(
                line.split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty()),
            )
        })
        .filter(|transaction| !transaction.is_empty())
        .collect();

    Ok(TransactionSet::new(transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::itemset::{Item, Itemset};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RETAIL_HEADER: &str =
        "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country";

    /// Two bakery orders that survive cleaning, plus one row for each
    /// cleaning rule
    fn create_retail_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", RETAIL_HEADER).unwrap();
        // Order 540010: cake cases and a cakestand, cases listed twice
        writeln!(file, "540010,21212,PACK OF 72 RETROSPOT CAKE CASES,24,2011-01-04T10:00:00Z,0.55,14911,EIRE").unwrap();
        writeln!(file, "540010,22423,REGENCY CAKESTAND 3 TIER,1,2011-01-04T10:00:00Z,12.75,14911,EIRE").unwrap();
        writeln!(file, "540010,21212,PACK OF 72 RETROSPOT CAKE CASES,12,2011-01-04T10:00:00Z,0.55,14911,EIRE").unwrap();
        // Order 540011: bunting only, postage dropped
        writeln!(file, "540011,47566,PARTY BUNTING,4,2011-01-04T10:05:00Z,4.95,12583,France").unwrap();
        writeln!(file, "540011,POST,POSTAGE,3,2011-01-04T10:05:00Z,18.00,12583,France").unwrap();
        // Dropped: cancellation, no customer, zero quantity, zero price, manual
        writeln!(file, "C540012,47566,PARTY BUNTING,-2,2011-01-04T10:09:00Z,4.95,12583,France").unwrap();
        writeln!(file, "540013,84879,ASSORTED COLOUR BIRD ORNAMENT,8,2011-01-04T10:12:00Z,1.69,,United Kingdom").unwrap();
        writeln!(file, "540014,22720,SET OF 3 CAKE TINS PANTRY DESIGN,0,2011-01-04T10:15:00Z,4.95,15311,United Kingdom").unwrap();
        writeln!(file, "540015,22960,JAM MAKING SET WITH JARS,6,2011-01-04T10:18:00Z,0.0,15311,United Kingdom").unwrap();
        writeln!(file, "540016,M,Manual,1,2011-01-04T10:20:00Z,2.10,15311,United Kingdom").unwrap();
        file
    }

    #[test]
    fn test_load_retail_transactions() {
        let test_file = create_retail_csv();
        let file_path = test_file.path().to_str().unwrap();

        let loaded = load_transactions(file_path, InputFormat::Auto).unwrap();

        assert_eq!(loaded.transactions.len(), 2);
        let first = &loaded.transactions.as_slice()[0];
        assert_eq!(first.len(), 2);
        assert!(first.contains_all(&Itemset::try_new(["21212", "22423"]).unwrap()));

        let second = &loaded.transactions.as_slice()[1];
        assert_eq!(second.items(), &[Item::from("47566")]);

        assert_eq!(loaded.catalog.name(&Item::from("22423")), "REGENCY CAKESTAND 3 TIER");
        let items = loaded.transactions.distinct_items();
        assert!(!items.contains(&Item::from("POST")));
        assert!(!items.contains(&Item::from("M")));
        assert!(!items.contains(&Item::from("84879")));
    }

    #[test]
    fn test_late_alphanumeric_codes_are_read_as_text() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", RETAIL_HEADER).unwrap();
        for invoice in 0..150 {
            writeln!(
                file,
                "{},{},CHRISTMAS CRAFT TREE,{},2011-11-20T09:00:00Z,1.25,{},Germany",
                560000 + invoice,
                23000 + invoice % 7,
                1 + invoice % 3,
                12600 + invoice % 11
            )
            .unwrap();
        }
        writeln!(file, "C560200,23001,CHRISTMAS CRAFT TREE,-1,2011-11-21T09:00:00Z,1.25,12601,Germany").unwrap();
        writeln!(file, "560201,85099B,JUMBO BAG RED RETROSPOT,10,2011-11-21T09:05:00Z,1.95,12602,Germany").unwrap();
        let file_path = file.path().to_str().unwrap();

        let loaded = load_transactions(file_path, InputFormat::Auto).unwrap();

        assert_eq!(loaded.transactions.len(), 151);
        let last = loaded.transactions.as_slice().last().unwrap();
        assert_eq!(last.items(), &[Item::from("85099B")]);
        assert_eq!(
            loaded.catalog.name(&Item::from("85099B")),
            "JUMBO BAG RED RETROSPOT"
        );
    }

    #[test]
    fn test_load_catalog_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "StockCode,Description").unwrap();
        writeln!(file, "21212,PACK OF 72 RETROSPOT CAKE CASES").unwrap();
        writeln!(file, "22423,").unwrap();
        writeln!(file, ",ORPHAN DESCRIPTION").unwrap();
        writeln!(file, "47566, PARTY BUNTING ").unwrap();
        let file_path = file.path().to_str().unwrap();

        let catalog = load_catalog(file_path).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.name(&Item::from("47566")), "PARTY BUNTING");
        assert_eq!(catalog.name(&Item::from("22423")), "Unknown Product (22423)");
    }

    #[test]
    fn test_catalog_requires_description_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "StockCode,Name").unwrap();
        writeln!(file, "21212,cake cases").unwrap();
        let file_path = file.path().to_str().unwrap();

        let err = load_catalog(file_path).unwrap_err();
        assert!(err.to_string().contains("Description"));
    }

    #[test]
    fn test_load_basket_lists() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "InvoiceNo,ListItem").unwrap();
        writeln!(file, "1,\"milk,bread\"").unwrap();
        writeln!(file, "2,\"milk, bread ,butter\"").unwrap();
        writeln!(file, "3,\"bread,butter,bread\"").unwrap();
        writeln!(file, "4,milk").unwrap();
        let file_path = file.path().to_str().unwrap();

        let loaded = load_transactions(file_path, InputFormat::Auto).unwrap();

        assert_eq!(loaded.transactions.len(), 4);
        assert_eq!(loaded.transactions.as_slice()[2].len(), 2);
        assert_eq!(
            loaded
                .transactions
                .support_count(&Itemset::try_new(["bread"]).unwrap()),
            3
        );
        assert!(loaded.catalog.is_empty());
    }

    #[test]
    fn test_missing_columns_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "InvoiceNo,StockCode").unwrap();
        writeln!(file, "1,A").unwrap();
        let file_path = file.path().to_str().unwrap();

        let err = load_transactions(file_path, InputFormat::Retail).unwrap_err();
        assert!(err.to_string().contains("Quantity"));
    }

    #[test]
    fn test_everything_filtered_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "InvoiceNo,StockCode,Quantity,UnitPrice,CustomerID").unwrap();
        writeln!(file, "C1,A,1,1.0,100").unwrap();
        writeln!(file, "2,B,-1,1.0,100").unwrap();
        let file_path = file.path().to_str().unwrap();

        assert!(load_transactions(file_path, InputFormat::Retail).is_err());
    }
}
