//! Input data: CSV loading, memoization, and the read-only dataset handle.

pub mod cache;
pub mod loader;

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DataConfig;
use crate::types::{ForecastError, ItemCatalog, ItemId, PredictionTable};
use cache::FileCache;

/// Memo caches for both input files. One instance per process.
#[derive(Default)]
pub struct DatasetCache {
    predictions: FileCache<PredictionTable>,
    items: FileCache<ItemCatalog>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Everything the lookup engine reads. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub predictions: Arc<PredictionTable>,
    /// `None` when item metadata is absent or unusable.
    pub items: Option<Arc<ItemCatalog>>,
    pub predictions_digest: String,
    pub items_digest: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Build a dataset from in-memory parts (tests, embedding).
    pub fn from_parts(predictions: PredictionTable, items: Option<ItemCatalog>) -> Self {
        Self {
            predictions: Arc::new(predictions),
            items: items.map(Arc::new),
            predictions_digest: String::new(),
            items_digest: None,
            loaded_at: Utc::now(),
        }
    }

    /// Load both files through the cache.
    ///
    /// The prediction file is required; any failure there is returned.
    /// The item metadata file degrades to `None`.
    pub fn load(cache: &mut DatasetCache, cfg: &DataConfig) -> Result<Self, ForecastError> {
        let predictions_path = Path::new(&cfg.predictions_path);
        let source = predictions_path.display().to_string();
        let predictions = cache.predictions.get_or_load(predictions_path, |bytes| {
            loader::parse_predictions(bytes, &source).map(|(table, _)| table)
        })?;

        let (items, items_digest) = match cfg.items_path.as_deref() {
            Some(path) => load_items(cache, Path::new(path)),
            None => (None, None),
        };

        info!(
            rows = predictions.value.len(),
            digest = %predictions.digest,
            reparsed = predictions.parsed,
            item_metadata = items.is_some(),
            "Dataset ready"
        );

        Ok(Self {
            predictions: predictions.value,
            items,
            predictions_digest: predictions.digest,
            items_digest,
            loaded_at: Utc::now(),
        })
    }

    /// Whether `other` was built from different file contents.
    pub fn differs_from(&self, other: &Dataset) -> bool {
        self.predictions_digest != other.predictions_digest || self.items_digest != other.items_digest
    }

    pub fn category_of(&self, item_id: ItemId) -> Option<i64> {
        self.items.as_ref().and_then(|c| c.category_of(item_id))
    }
}

fn load_items(cache: &mut DatasetCache, path: &Path) -> (Option<Arc<ItemCatalog>>, Option<String>) {
    if !path.exists() {
        info!(path = %path.display(), "No item metadata file, category display disabled");
        return (None, None);
    }
    let source = path.display().to_string();
    match cache
        .items
        .get_or_load(path, |bytes| loader::parse_item_catalog(bytes, &source))
    {
        Ok(cached) => (Some(cached.value), Some(cached.digest)),
        Err(e) => {
            warn!(error = %e, "Item metadata unusable, category display disabled");
            (None, None)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
