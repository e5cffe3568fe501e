use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

use crate::constants::DEFAULT_FORECAST_DAYS;
use crate::server::AppState;

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Provider period token: 1d, 5d, 1mo, 6mo, ytd, 1y, 5y
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "1y".to_string()
}

/// GET /stocks - every tracked stock, refreshed as needed, with sector
/// averages attached
#[instrument(skip(state))]
pub async fn get_stocks_handler(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Received request for all stocks");

    match state.refresher.get_all_stocks().await {
        Ok(stocks) => {
            info!(count = stocks.len(), "Returning stocks");
            (StatusCode::OK, Json(stocks)).into_response()
        }
        Err(e) => {
            error!("Failed to load stocks: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// GET /stock/{ticker}/history - closing prices for charting
///
/// Examples:
/// - /stock/ALE.WA/history (defaults to one year of dailies)
/// - /stock/ALE.WA/history?period=1d (intraday, 5-minute bars)
#[instrument(skip(state))]
pub async fn get_history_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    debug!(
        "Received history request for {} (period={})",
        ticker, params.period
    );

    let history = state.history.get_history(&ticker, &params.period).await;
    if history.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "Stock history not found"
            })),
        )
            .into_response();
    }

    info!(ticker = %ticker, count = history.len(), "Returning history");
    (StatusCode::OK, Json(history)).into_response()
}

/// GET /stock/{ticker}/predict - linear-trend price forecast
#[instrument(skip(state))]
pub async fn get_predict_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> impl IntoResponse {
    debug!("Received forecast request for {}", ticker);

    match state.forecast.predict(&ticker, DEFAULT_FORECAST_DAYS).await {
        Some(forecast) => {
            info!(ticker = %ticker, trend = %forecast.trend, "Returning forecast");
            (StatusCode::OK, Json(forecast)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "Prediction failed or insufficient data"
            })),
        )
            .into_response(),
    }
}

/// GET /update - run a refresh cycle and report how many stocks came back
#[instrument(skip(state))]
pub async fn update_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Manual refresh requested");

    match state.refresher.get_all_stocks().await {
        Ok(stocks) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "stocks": stocks.len()
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Refresh failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": e.to_string()
                })),
            )
                .into_response()
        }
    }
}
