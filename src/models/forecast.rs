use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::TREND_NEUTRAL_BAND_PCT;

/// Direction of the projected price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    /// Classify a projected percentage move. Moves whose magnitude stays
    /// at or under the band width are Neutral; classification happens on
    /// the unrounded percentage.
    pub fn from_pct(pct: f64) -> Trend {
        if pct > TREND_NEUTRAL_BAND_PCT {
            Trend::Up
        } else if pct < -TREND_NEUTRAL_BAND_PCT {
            Trend::Down
        } else {
            Trend::Neutral
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Neutral => "neutral",
        };
        write!(f, "{}", label)
    }
}

/// Linear-trend price projection for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    /// Ticker symbol with exchange suffix
    pub ticker: String,

    /// Most recent closing price the model saw
    pub current_price: f64,

    /// Price the fitted trend line reaches `forecast_days` ahead
    pub predicted_price: f64,

    /// Projected move as a percentage of the current price, rounded to 2dp
    pub trend_pct: f64,

    /// Direction bucket for the projected move
    pub trend: Trend,

    /// Horizon of the projection in trading days
    pub forecast_days: usize,
}
