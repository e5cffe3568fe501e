use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{HistoryPoint, Interval};
use crate::provider::MarketDataProvider;

/// Serves closing-price series for the chart endpoints.
#[derive(Clone)]
pub struct HistoryService {
    provider: Arc<dyn MarketDataProvider>,
}

impl HistoryService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Closing prices for `ticker` over `period`, oldest first, with date
    /// labels matching the sampling interval (minutes for intraday, plain
    /// dates otherwise). Any provider failure yields an empty series.
    pub async fn get_history(&self, ticker: &str, period: &str) -> Vec<HistoryPoint> {
        let interval = Interval::for_period(period);
        debug!(
            "Fetching history for {} with period={}, interval={}",
            ticker, period, interval
        );

        let mut points = match self.provider.fetch_history(ticker, period, interval).await {
            Ok(points) => points,
            Err(e) => {
                warn!("History fetch failed for {} ({}): {}", ticker, period, e);
                return Vec::new();
            }
        };

        points.sort_by_key(|p| p.time);
        points
            .into_iter()
            .map(|p| HistoryPoint {
                date: p.time.format(interval.label_format()).to_string(),
                close: p.close,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::FakeProvider;
    use crate::provider::PricePoint;
    use chrono::{TimeZone, Utc};

    fn point(y: i32, mo: u32, d: u32, h: u32, mi: u32, close: f64) -> PricePoint {
        PricePoint {
            time: Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap(),
            close,
        }
    }

    #[tokio::test]
    async fn test_intraday_labels_carry_time() {
        let provider = Arc::new(FakeProvider::new().with_history(
            "ALE.WA",
            vec![point(2024, 3, 1, 9, 0, 30.0), point(2024, 3, 1, 9, 5, 30.2)],
        ));
        let service = HistoryService::new(Arc::clone(&provider) as Arc<dyn MarketDataProvider>);

        let history = service.get_history("ALE.WA", "1d").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, "2024-03-01 09:00");
        assert_eq!(history[1].date, "2024-03-01 09:05");
        assert_eq!(history[1].close, 30.2);

        let calls = provider.history_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("ALE.WA".to_string(), "1d".to_string(), Interval::Minute5)]
        );
    }

    #[tokio::test]
    async fn test_daily_labels_omit_time() {
        let provider = Arc::new(FakeProvider::new().with_history(
            "ALE.WA",
            vec![point(2024, 3, 1, 0, 0, 30.0), point(2024, 3, 4, 0, 0, 31.0)],
        ));
        let service = HistoryService::new(provider as Arc<dyn MarketDataProvider>);

        let history = service.get_history("ALE.WA", "1y").await;
        assert_eq!(history[0].date, "2024-03-01");
        assert_eq!(history[1].date, "2024-03-04");
    }

    #[tokio::test]
    async fn test_points_come_back_chronological() {
        let provider = Arc::new(FakeProvider::new().with_history(
            "ALE.WA",
            vec![
                point(2024, 3, 4, 0, 0, 31.0),
                point(2024, 3, 1, 0, 0, 30.0),
                point(2024, 3, 2, 0, 0, 30.5),
            ],
        ));
        let service = HistoryService::new(provider as Arc<dyn MarketDataProvider>);

        let history = service.get_history("ALE.WA", "1mo").await;
        let dates: Vec<&str> = history.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-04"]);
    }

    #[tokio::test]
    async fn test_unknown_period_falls_back_to_daily() {
        let provider = Arc::new(
            FakeProvider::new().with_history("ALE.WA", vec![point(2024, 3, 1, 0, 0, 30.0)]),
        );
        let service = HistoryService::new(Arc::clone(&provider) as Arc<dyn MarketDataProvider>);

        let history = service.get_history("ALE.WA", "3mo").await;
        assert_eq!(history[0].date, "2024-03-01");

        let calls = provider.history_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("ALE.WA".to_string(), "3mo".to_string(), Interval::Daily)]
        );
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty_series() {
        let provider = Arc::new(FakeProvider::new().failing_history("ALE.WA"));
        let service = HistoryService::new(provider as Arc<dyn MarketDataProvider>);

        let history = service.get_history("ALE.WA", "1y").await;
        assert!(history.is_empty());
    }
}
