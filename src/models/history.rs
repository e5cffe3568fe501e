use serde::{Deserialize, Serialize};
use std::fmt;

/// Candle interval used when requesting price history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 5-minute candles
    Minute5,
    /// 15-minute candles
    Minute15,
    /// Daily candles
    Daily,
    /// Weekly candles
    Weekly,
}

impl Interval {
    /// Pick the interval that keeps a chart over the given period readable.
    /// Unrecognized periods get daily candles; the period string itself is
    /// still forwarded to the provider untouched.
    pub fn for_period(period: &str) -> Interval {
        match period {
            "1d" => Interval::Minute5,
            "5d" => Interval::Minute15,
            "1mo" | "6mo" | "ytd" | "1y" => Interval::Daily,
            "5y" => Interval::Weekly,
            _ => Interval::Daily,
        }
    }

    /// Provider interval string
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Daily => "1d",
            Interval::Weekly => "1wk",
        }
    }

    /// Intraday intervals label points with time of day, daily and coarser
    /// with the date alone.
    pub fn is_intraday(&self) -> bool {
        matches!(self, Interval::Minute5 | Interval::Minute15)
    }

    /// chrono format string for point labels at this granularity
    pub fn label_format(&self) -> &'static str {
        if self.is_intraday() {
            "%Y-%m-%d %H:%M"
        } else {
            "%Y-%m-%d"
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Daily
    }
}

/// One point on a price chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Point label, `%Y-%m-%d` or `%Y-%m-%d %H:%M` for intraday intervals
    pub date: String,

    /// Closing price
    pub close: f64,
}
