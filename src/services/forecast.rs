use tracing::debug;

use crate::constants::{FORECAST_TRAINING_PERIOD, MIN_FORECAST_POINTS};
use crate::models::{Forecast, Trend};
use crate::services::history::HistoryService;
use crate::utils::round2;

/// Linear-trend price forecaster backed by the history service.
#[derive(Clone)]
pub struct ForecastService {
    history: HistoryService,
}

impl ForecastService {
    pub fn new(history: HistoryService) -> Self {
        Self { history }
    }

    /// Least-squares price forecast `forecast_days` days out, fitted over
    /// six months of daily closes.
    ///
    /// `None` when fewer than ten closes are available or the latest close
    /// is zero.
    pub async fn predict(&self, ticker: &str, forecast_days: usize) -> Option<Forecast> {
        let history = self
            .history
            .get_history(ticker, FORECAST_TRAINING_PERIOD)
            .await;
        if history.len() < MIN_FORECAST_POINTS {
            debug!(
                "Not enough history to forecast {} ({} points)",
                ticker,
                history.len()
            );
            return None;
        }

        let closes: Vec<f64> = history.iter().map(|p| p.close).collect();
        let (slope, intercept) = linear_fit(&closes)?;

        let current_price = *closes.last()?;
        if current_price == 0.0 {
            return None;
        }

        let future_index = (closes.len() + forecast_days) as f64;
        let predicted_price = intercept + slope * future_index;
        let trend_pct = (predicted_price - current_price) / current_price * 100.0;

        // Classify on the unrounded percentage
        Some(Forecast {
            ticker: ticker.to_string(),
            current_price: round2(current_price),
            predicted_price: round2(predicted_price),
            trend_pct: round2(trend_pct),
            trend: Trend::from_pct(trend_pct),
            forecast_days,
        })
    }
}

/// Ordinary least squares over `values` against their 0-based index.
/// Returns `(slope, intercept)`, or `None` for fewer than two points.
fn linear_fit(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }
    if denominator == 0.0 {
        return None;
    }

    let slope = numerator / denominator;
    Some((slope, mean_y - slope * mean_x))
}
