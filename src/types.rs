//! Shared types for the sales forecast dashboard.
//!
//! The prediction table and item catalog are loaded once and then only
//! read. Summaries are derived per query and thrown away after rendering.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub type ItemId = i64;
pub type ShopId = i64;

// ---------------------------------------------------------------------------
// Prediction rows
// ---------------------------------------------------------------------------

/// One forecast: predicted units of `item_id` sold at `shop_id`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub item_id: ItemId,
    pub shop_id: ShopId,
    /// Forecasted quantity for the target month (>= 0).
    pub item_cnt_month: f64,
}

impl PredictionRow {
    /// Range check applied at load time. Rows failing it are quarantined.
    pub fn validate(&self) -> Result<(), String> {
        if !self.item_cnt_month.is_finite() {
            return Err(format!("item_cnt_month is not finite ({})", self.item_cnt_month));
        }
        if self.item_cnt_month < 0.0 {
            return Err(format!("item_cnt_month is negative ({})", self.item_cnt_month));
        }
        Ok(())
    }

    /// Copy with `-0.0` folded into `0.0`, so equal quantities compare equal
    /// under every ordering.
    pub fn normalized(self) -> Self {
        Self {
            item_cnt_month: self.item_cnt_month + 0.0,
            ..self
        }
    }
}

/// The full, ordered prediction table. Never empty once constructed.
#[derive(Debug, Clone)]
pub struct PredictionTable {
    rows: Vec<PredictionRow>,
}

impl PredictionTable {
    /// Build a table from rows. Every row must pass `PredictionRow::validate`;
    /// the first failure is reported with its 1-based position in `rows`.
    /// Quantities are normalized on the way in.
    pub fn new(rows: Vec<PredictionRow>) -> Result<Self, ForecastError> {
        if rows.is_empty() {
            return Err(ForecastError::EmptyTable);
        }
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                row.validate()
                    .map(|_| row.normalized())
                    .map_err(|reason| ForecastError::InvalidRow {
                        line: idx as u64 + 1,
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for one item, in table order.
    pub fn rows_for(&self, item_id: ItemId) -> impl Iterator<Item = &PredictionRow> + '_ {
        self.rows.iter().filter(move |r| r.item_id == item_id)
    }

    /// Distinct item ids, ascending.
    pub fn distinct_items(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .rows
            .iter()
            .map(|r| r.item_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn distinct_shop_count(&self) -> usize {
        self.rows.iter().map(|r| r.shop_id).collect::<HashSet<_>>().len()
    }
}

// ---------------------------------------------------------------------------
// Item metadata
// ---------------------------------------------------------------------------

/// Optional per-item metadata row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub item_id: ItemId,
    pub item_category_id: i64,
}

/// Item metadata keyed by item id.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    categories: HashMap<ItemId, i64>,
}

impl ItemCatalog {
    /// Build from rows. The first row seen for an item wins; the number
    /// of later duplicates is returned alongside.
    pub fn from_rows(rows: impl IntoIterator<Item = ItemInfo>) -> (Self, usize) {
        let mut categories = HashMap::new();
        let mut duplicates = 0;
        for info in rows {
            if categories.contains_key(&info.item_id) {
                duplicates += 1;
                continue;
            }
            categories.insert(info.item_id, info.item_category_id);
        }
        (Self { categories }, duplicates)
    }

    pub fn category_of(&self, item_id: ItemId) -> Option<i64> {
        self.categories.get(&item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// A shop and its forecast for a single item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShopSales {
    pub shop_id: ShopId,
    pub item_cnt_month: f64,
}

/// Aggregate forecast for one item across all shops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSummary {
    pub item_id: ItemId,
    pub total_sales: f64,
    pub shop_count: usize,
    pub average_per_shop: f64,
    /// Up to five shops, highest forecast first.
    pub top_shops: Vec<ShopSales>,
}

impl fmt::Display for PredictionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Item {}: total {:.2} across {} shops (avg {:.2}/shop)",
            self.item_id, self.total_sales, self.shop_count, self.average_per_shop,
        )
    }
}

/// Headline numbers for the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub total_items: usize,
    pub total_shops: usize,
    pub total_predictions: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain errors for loading and querying forecasts.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Item ID {0} not found in predictions")]
    ItemNotFound(ItemId),

    #[error("Prediction table is empty")]
    EmptyTable,

    #[error("Invalid row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("CSV error ({path}): {message}")]
    Csv { path: String, message: String },

    #[error("I/O error ({path}): {message}")]
    Io { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
