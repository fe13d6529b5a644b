//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`;
//! the dataset behind it is only ever swapped whole, never mutated.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::config::{AppSection, DataConfig};
use crate::data::{Dataset, DatasetCache};
use crate::engine::lookup;
use crate::types::{ForecastError, ItemId, ShopId, ShopSales};

pub const PLACEHOLDER_LABEL: &str = "-- Select an Item ID --";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub app: AppSection,
    pub data_config: DataConfig,
    pub dataset: RwLock<Arc<Dataset>>,
    pub cache: Arc<Mutex<DatasetCache>>,
}

impl DashboardState {
    pub fn new(app: AppSection, data_config: DataConfig, dataset: Dataset, cache: DatasetCache) -> Self {
        Self {
            app,
            data_config,
            dataset: RwLock::new(Arc::new(dataset)),
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Current dataset handle. Cheap; holds the lock only to clone the `Arc`.
    pub async fn dataset(&self) -> Arc<Dataset> {
        Arc::clone(&*self.dataset.read().await)
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub title: String,
    pub forecast_period: String,
    pub model_description: String,
    pub total_items: usize,
    pub total_shops: usize,
    pub total_predictions: usize,
    pub item_metadata: bool,
    pub loaded_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemOption {
    /// `None` for the placeholder entry.
    pub item_id: Option<ItemId>,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemsResponse {
    pub featured: Vec<ItemId>,
    pub options: Vec<ItemOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedShop {
    pub rank: usize,
    pub shop_id: ShopId,
    /// Rounded to 2 decimals.
    pub predicted_sales: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionView {
    pub item_id: ItemId,
    pub total_sales: f64,
    pub shop_count: usize,
    pub average_per_shop: f64,
    pub category_id: Option<i64>,
    pub top_shops: Vec<RankedShop>,
    pub all_shops: Vec<RankedShop>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub predictions_digest: String,
    pub total_predictions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced to the page. Only `Internal` is a system fault.
#[derive(Debug)]
pub enum ApiError {
    NoSelection,
    BadItemId(String),
    NotFound(ItemId),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NoSelection => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    kind: "no_selection",
                    message: "Please select a sample item or enter a valid Item ID".into(),
                    hint: None,
                },
            ),
            ApiError::BadItemId(raw) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    kind: "bad_item_id",
                    message: format!("'{raw}' is not a valid Item ID"),
                    hint: Some("Item IDs are whole numbers.".into()),
                },
            ),
            ApiError::NotFound(item_id) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    kind: "not_found",
                    message: format!("Item ID {item_id} not found in predictions!"),
                    hint: Some(
                        "This item may not exist in the test set or has no prediction data.".into(),
                    ),
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    kind: "internal",
                    message,
                    hint: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        match e {
            ForecastError::ItemNotFound(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn ranked(shops: &[ShopSales]) -> Vec<RankedShop> {
    shops
        .iter()
        .enumerate()
        .map(|(i, s)| RankedShop {
            rank: i + 1,
            shop_id: s.shop_id,
            predicted_sales: round2(s.item_cnt_month),
        })
        .collect()
}

/// Parse the `item_id` query value. Empty or absent means nothing was picked.
pub fn parse_selection(raw: Option<&str>) -> Result<ItemId, ApiError> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(ApiError::NoSelection);
    }
    raw.parse::<ItemId>()
        .map_err(|_| ApiError::BadItemId(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let dataset = state.dataset().await;
    let stats = lookup::table_stats(&dataset.predictions);
    Json(StatsResponse {
        title: state.app.title.clone(),
        forecast_period: state.app.forecast_period.clone(),
        model_description: state.app.model_description.clone(),
        total_items: stats.total_items,
        total_shops: stats.total_shops,
        total_predictions: stats.total_predictions,
        item_metadata: dataset.items.is_some(),
        loaded_at: dataset.loaded_at.to_rfc3339(),
    })
}

/// GET /api/items
pub async fn get_items(State(state): State<AppState>) -> Json<ItemsResponse> {
    let dataset = state.dataset().await;
    let opts = lookup::item_options(&dataset.predictions);
    let options = opts
        .options
        .into_iter()
        .map(|item_id| ItemOption {
            item_id,
            label: match item_id {
                Some(id) => format!("Item ID: {id}"),
                None => PLACEHOLDER_LABEL.to_string(),
            },
        })
        .collect();
    Json(ItemsResponse {
        featured: opts.featured,
        options,
    })
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    pub item_id: Option<String>,
}

/// GET /api/predict?item_id=N
pub async fn predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
) -> Result<Json<PredictionView>, ApiError> {
    let item_id = parse_selection(params.item_id.as_deref())?;
    let dataset = state.dataset().await;

    let summary = lookup::summarize(&dataset.predictions, item_id).map_err(|e| {
        info!(item_id, "Prediction requested for unknown item");
        ApiError::from(e)
    })?;
    let all_shops = lookup::shops_for_item(&dataset.predictions, item_id);

    info!(item_id, total = summary.total_sales, shops = summary.shop_count, "Prediction served");

    Ok(Json(PredictionView {
        item_id,
        total_sales: round2(summary.total_sales),
        shop_count: summary.shop_count,
        average_per_shop: round2(summary.average_per_shop),
        category_id: dataset.category_of(item_id),
        top_shops: ranked(&summary.top_shops),
        all_shops: ranked(&all_shops),
    }))
}

/// POST /api/reload
///
/// Re-runs the memoized load. The live dataset is replaced only when a
/// file's content digest changed.
///
/// File reads and parsing run on the blocking pool so lookups on the
/// same runtime keep being served.
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let mut cache = Arc::clone(&state.cache).lock_owned().await;
    let data_config = state.data_config.clone();
    let fresh = tokio::task::spawn_blocking(move || Dataset::load(&mut cache, &data_config))
        .await
        .map_err(|e| {
            error!(error = %e, "Reload task failed");
            ApiError::Internal(format!("Reload task failed: {e}"))
        })?
        .map_err(|e| {
            error!(error = %e, "Reload failed, keeping current dataset");
            ApiError::from(e)
        })?;

    let mut current = state.dataset.write().await;
    let reloaded = fresh.differs_from(&current);
    if reloaded {
        info!(digest = %fresh.predictions_digest, "Dataset replaced");
        *current = Arc::new(fresh);
    }

    Ok(Json(ReloadResponse {
        reloaded,
        predictions_digest: current.predictions_digest.clone(),
        total_predictions: current.predictions.len(),
    }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
