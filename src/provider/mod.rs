use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::Interval;

mod yahoo;

pub use yahoo::YahooClient;

/// A quote-plus-fundamentals snapshot for one ticker, as the provider
/// reported it. Every field is optional: upstream payloads routinely omit
/// keys, and normalization happens downstream in the refresher.
#[derive(Debug, Clone, Default)]
pub struct FundamentalsSnapshot {
    pub name: Option<String>,
    pub current_price: Option<f64>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub recommendation: Option<String>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub sector: Option<String>,
    pub operating_margin: Option<f64>,
    pub ebitda: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_cash: Option<f64>,
}

/// Annual statement line items keyed by label, values most-recent first.
/// Periods the provider reported without a value are simply absent.
#[derive(Debug, Clone, Default)]
pub struct FinancialStatements {
    pub income: HashMap<String, Vec<f64>>,
    pub balance: HashMap<String, Vec<f64>>,
}

impl FinancialStatements {
    /// Most recent income-statement value for a line item
    pub fn latest_income(&self, label: &str) -> Option<f64> {
        self.income.get(label).and_then(|v| v.first()).copied()
    }

    /// Most recent balance-sheet value for a line item
    pub fn latest_balance(&self, label: &str) -> Option<f64> {
        self.balance.get(label).and_then(|v| v.first()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance.is_empty()
    }
}

/// One close on a price chart, in UTC
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub close: f64,
}

/// Upstream market-data source.
///
/// Everything that talks to the outside world goes through this trait, so
/// services can be driven by a deterministic fake in tests. Implementations
/// must be shareable across tasks (`Arc<dyn MarketDataProvider>`).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current quote and fundamentals for one ticker
    async fn fetch_snapshot(&self, ticker: &str) -> Result<FundamentalsSnapshot>;

    /// Annual financial statements; may be empty when the provider has none
    async fn fetch_financials(&self, ticker: &str) -> Result<FinancialStatements>;

    /// Closing prices over `period` at `interval`; may be empty
    async fn fetch_history(
        &self,
        ticker: &str,
        period: &str,
        interval: Interval,
    ) -> Result<Vec<PricePoint>>;
}

/// Scriptable in-memory provider shared by service tests
#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeProvider {
        pub snapshots: HashMap<String, FundamentalsSnapshot>,
        pub financials: HashMap<String, FinancialStatements>,
        pub history: HashMap<String, Vec<PricePoint>>,
        pub fail_snapshots: HashSet<String>,
        pub fail_history: HashSet<String>,
        pub snapshot_calls: Mutex<Vec<String>>,
        pub financials_calls: Mutex<Vec<String>>,
        pub history_calls: Mutex<Vec<(String, String, Interval)>>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl FakeProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_snapshot(mut self, ticker: &str, snapshot: FundamentalsSnapshot) -> Self {
            self.snapshots.insert(ticker.to_string(), snapshot);
            self
        }

        pub fn with_financials(mut self, ticker: &str, statements: FinancialStatements) -> Self {
            self.financials.insert(ticker.to_string(), statements);
            self
        }

        pub fn with_history(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
            self.history.insert(ticker.to_string(), points);
            self
        }

        pub fn failing_snapshot(mut self, ticker: &str) -> Self {
            self.fail_snapshots.insert(ticker.to_string());
            self
        }

        pub fn failing_history(mut self, ticker: &str) -> Self {
            self.fail_history.insert(ticker.to_string());
            self
        }

        pub fn snapshot_call_count(&self) -> usize {
            self.snapshot_calls.lock().unwrap().len()
        }

        pub fn financials_call_count(&self) -> usize {
            self.financials_calls.lock().unwrap().len()
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn fetch_snapshot(&self, ticker: &str) -> Result<FundamentalsSnapshot> {
            self.snapshot_calls.lock().unwrap().push(ticker.to_string());

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_snapshots.contains(ticker) {
                return Err(AppError::Network(format!("scripted failure for {}", ticker)));
            }
            self.snapshots
                .get(ticker)
                .cloned()
                .ok_or_else(|| AppError::Provider(format!("no snapshot scripted for {}", ticker)))
        }

        async fn fetch_financials(&self, ticker: &str) -> Result<FinancialStatements> {
            self.financials_calls.lock().unwrap().push(ticker.to_string());
            Ok(self.financials.get(ticker).cloned().unwrap_or_default())
        }

        async fn fetch_history(
            &self,
            ticker: &str,
            period: &str,
            interval: Interval,
        ) -> Result<Vec<PricePoint>> {
            self.history_calls
                .lock()
                .unwrap()
                .push((ticker.to_string(), period.to_string(), interval));

            if self.fail_history.contains(ticker) {
                return Err(AppError::Network(format!("scripted failure for {}", ticker)));
            }
            Ok(self.history.get(ticker).cloned().unwrap_or_default())
        }
    }
}
