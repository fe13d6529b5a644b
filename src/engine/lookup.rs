//! Lookup engine: per-item aggregation and ranking over the prediction table.
//!
//! All functions are pure reads of an immutable `PredictionTable`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::types::{
    ForecastError, ItemId, PredictionTable, PredictionSummary, ShopSales, TableStats,
};

/// Number of shops kept in `PredictionSummary::top_shops`.
pub const TOP_SHOPS: usize = 5;

/// Sample slice sizes: best sellers, middle of the ranking, worst sellers.
pub const SAMPLE_TOP: usize = 3;
pub const SAMPLE_MID: usize = 4;
pub const SAMPLE_BOTTOM: usize = 3;

// ---------------------------------------------------------------------------
// Per-item queries
// ---------------------------------------------------------------------------

/// Aggregate the forecast for one item across every shop that carries it.
pub fn summarize(table: &PredictionTable, item_id: ItemId) -> Result<PredictionSummary, ForecastError> {
    let shops = shops_for_item(table, item_id);
    if shops.is_empty() {
        return Err(ForecastError::ItemNotFound(item_id));
    }

    let total_sales: f64 = table.rows_for(item_id).map(|r| r.item_cnt_month).sum();
    let shop_count = shops.len();
    let average_per_shop = if shop_count > 0 {
        total_sales / shop_count as f64
    } else {
        0.0
    };

    let mut top_shops = shops;
    top_shops.truncate(TOP_SHOPS);

    let summary = PredictionSummary {
        item_id,
        total_sales,
        shop_count,
        average_per_shop,
        top_shops,
    };
    debug!(%summary, "Summarized item");
    Ok(summary)
}

/// Every shop forecast for an item, highest first.
///
/// Ties keep table order. Returns an empty vec for unknown items.
pub fn shops_for_item(table: &PredictionTable, item_id: ItemId) -> Vec<ShopSales> {
    let mut shops: Vec<ShopSales> = table
        .rows_for(item_id)
        .map(|r| ShopSales {
            shop_id: r.shop_id,
            item_cnt_month: r.item_cnt_month,
        })
        .collect();
    // Vec::sort_by is stable. partial_cmp keeps -0.0 and 0.0 tied.
    shops.sort_by(|a, b| {
        b.item_cnt_month
            .partial_cmp(&a.item_cnt_month)
            .unwrap_or(Ordering::Equal)
    });
    shops
}

// ---------------------------------------------------------------------------
// Item selection
// ---------------------------------------------------------------------------

/// Item ids spread across the sales ranking: top three, four from the
/// middle, bottom three (lowest first).
///
/// Slices are clamped to the number of distinct items, so small tables
/// yield fewer ids and may repeat one across groups.
pub fn diverse_sample(table: &PredictionTable) -> Vec<ItemId> {
    let ranked = ranked_item_totals(table);
    let n = ranked.len();

    let top = &ranked[..SAMPLE_TOP.min(n)];
    let mid_start = n / 2;
    let mid = &ranked[mid_start..(mid_start + SAMPLE_MID).min(n)];
    let bottom = &ranked[n - SAMPLE_BOTTOM.min(n)..];

    top.iter()
        .chain(mid)
        .map(|(id, _)| *id)
        .chain(bottom.iter().rev().map(|(id, _)| *id))
        .collect()
}

/// (item_id, total) for every item, sorted by total descending.
///
/// Items are grouped in ascending id order before the stable sort, so
/// equal totals rank by id.
pub fn ranked_item_totals(table: &PredictionTable) -> Vec<(ItemId, f64)> {
    let mut totals: BTreeMap<ItemId, f64> = BTreeMap::new();
    for row in table.rows() {
        *totals.entry(row.item_id).or_insert(0.0) += row.item_cnt_month;
    }
    let mut ranked: Vec<(ItemId, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
}

/// Choices offered to the user. `None` is the "no selection" placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOptions {
    /// Diverse sample with repeats removed.
    pub featured: Vec<ItemId>,
    /// Placeholder, then featured items, then every other item ascending.
    pub options: Vec<Option<ItemId>>,
}

pub fn item_options(table: &PredictionTable) -> ItemOptions {
    let mut seen = HashSet::new();
    let featured: Vec<ItemId> = diverse_sample(table)
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();

    let mut options = Vec::with_capacity(table.len() + 1);
    options.push(None);
    options.extend(featured.iter().copied().map(Some));
    options.extend(
        table
            .distinct_items()
            .into_iter()
            .filter(|id| !seen.contains(id))
            .map(Some),
    );

    ItemOptions { featured, options }
}

/// Item, shop, and row counts for the whole table.
pub fn table_stats(table: &PredictionTable) -> TableStats {
    TableStats {
        total_items: table.distinct_items().len(),
        total_shops: table.distinct_shop_count(),
        total_predictions: table.len(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
