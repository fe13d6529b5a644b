//! CSV ingestion for the prediction table and item metadata.
//!
//! Expected prediction columns: `item_id, shop_id, item_cnt_month`.
//! Expected metadata columns: `item_id, item_category_id`.
//! Extra columns (e.g. `ID`, `item_name`) are ignored.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::types::{ForecastError, ItemCatalog, ItemInfo, PredictionRow, PredictionTable};

/// Counters from a single prediction load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub accepted: usize,
    pub quarantined: usize,
    /// Rows whose (item_id, shop_id) pair was already seen.
    pub duplicate_pairs: usize,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn csv_error(source: &str, line: u64, e: csv::Error) -> ForecastError {
    ForecastError::Csv {
        path: source.to_string(),
        message: format!("line {line}: {e}"),
    }
}

/// Parse a prediction CSV.
///
/// Rows that fail to parse abort the load. Rows that parse but carry a
/// negative or non-finite quantity are quarantined and skipped.
pub fn parse_predictions<R: Read>(
    reader: R,
    source: &str,
) -> Result<(PredictionTable, LoadReport), ForecastError> {
    let mut rdr = csv_reader(reader);
    let mut report = LoadReport::default();
    let mut rows = Vec::new();
    let mut seen_pairs = HashSet::new();

    for (idx, result) in rdr.deserialize::<PredictionRow>().enumerate() {
        // Header occupies line 1.
        let line = idx as u64 + 2;
        let row = result.map_err(|e| csv_error(source, line, e))?;
        report.rows_read += 1;

        if let Err(reason) = row.validate() {
            warn!(source, line, item_id = row.item_id, shop_id = row.shop_id, %reason, "Quarantined prediction row");
            report.quarantined += 1;
            continue;
        }

        if !seen_pairs.insert((row.item_id, row.shop_id)) {
            debug!(source, line, item_id = row.item_id, shop_id = row.shop_id, "Duplicate item/shop pair");
            report.duplicate_pairs += 1;
        }

        rows.push(row);
    }

    report.accepted = rows.len();
    if report.duplicate_pairs > 0 {
        warn!(source, duplicates = report.duplicate_pairs, "Prediction table has duplicate item/shop pairs");
    }

    let table = PredictionTable::new(rows)?;
    info!(
        source,
        rows_read = report.rows_read,
        accepted = report.accepted,
        quarantined = report.quarantined,
        "Predictions loaded"
    );
    Ok((table, report))
}

/// Read and parse a prediction CSV from disk, bypassing the cache.
///
/// For callers that want a one-off table without a `DatasetCache`, such
/// as offline scripts and tests. The dashboard loads through `Dataset::load`.
pub fn load_predictions(path: &Path) -> Result<PredictionTable, ForecastError> {
    let source = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| ForecastError::Io {
        path: source.clone(),
        message: e.to_string(),
    })?;
    parse_predictions(file, &source).map(|(table, _)| table)
}

/// Parse an item metadata CSV.
pub fn parse_item_catalog<R: Read>(reader: R, source: &str) -> Result<ItemCatalog, ForecastError> {
    let mut rdr = csv_reader(reader);
    let mut infos = Vec::new();
    for (idx, result) in rdr.deserialize::<ItemInfo>().enumerate() {
        let info = result.map_err(|e| csv_error(source, idx as u64 + 2, e))?;
        infos.push(info);
    }

    let (catalog, duplicates) = ItemCatalog::from_rows(infos);
    if duplicates > 0 {
        warn!(source, duplicates, "Item metadata has duplicate item ids, keeping first");
    }
    info!(source, items = catalog.len(), "Item metadata loaded");
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
