use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::constants::{NO_RECOMMENDATION, UNKNOWN_SECTOR};
use crate::error::Result;
use crate::models::{current_timestamp, CachedStock, StockRecord, Universe};
use crate::provider::{FundamentalsSnapshot, MarketDataProvider};
use crate::services::sectors::SectorAverages;
use crate::services::store::StockStore;

/// Keeps the cached universe up to date.
///
/// Reads come from the store while rows are fresh and structurally
/// complete; everything else is refetched from the provider in bounded
/// groups and written back before results are returned.
pub struct Refresher {
    store: Arc<StockStore>,
    provider: Arc<dyn MarketDataProvider>,
    universe: Universe,
    fetch_concurrency: usize,
}

impl Refresher {
    pub fn new(
        store: Arc<StockStore>,
        provider: Arc<dyn MarketDataProvider>,
        universe: Universe,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            store,
            provider,
            universe,
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    /// Every stock in the universe, sorted by ticker, with sector averages
    /// attached.
    ///
    /// Tickers whose cached row is stale, incomplete, or missing are
    /// refetched first. A ticker that cannot be fetched is left out of the
    /// result rather than failing the whole batch; a store write failure
    /// is an error.
    pub async fn get_all_stocks(&self) -> Result<Vec<StockRecord>> {
        let now = Utc::now();

        let mut cached: HashMap<String, CachedStock> = self
            .store
            .all()
            .await?
            .into_iter()
            .map(|row| (row.ticker.clone(), row))
            .collect();

        let mut records = Vec::new();
        let mut stale = Vec::new();
        for ticker in self.universe.tickers() {
            match cached.remove(&ticker) {
                Some(row) if row.is_usable(now) => {
                    if let Some(record) = row.into_complete() {
                        records.push(record);
                    }
                }
                _ => stale.push(ticker),
            }
        }

        if !stale.is_empty() {
            let fetched = self.fetch_batch(&stale).await;
            for record in &fetched {
                self.store.upsert(record).await?;
            }
            records.extend(fetched);
        }

        let averages = SectorAverages::compute(&records);
        averages.attach(&mut records);
        records.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(records)
    }

    /// Fetch a set of tickers in groups of at most `fetch_concurrency`
    /// concurrent requests. Tickers that fail are dropped from the result;
    /// nothing is written to the store here.
    async fn fetch_batch(&self, tickers: &[String]) -> Vec<StockRecord> {
        let groups: Vec<&[String]> = tickers.chunks(self.fetch_concurrency).collect();
        info!(
            "Refreshing {} tickers in {} groups of up to {}",
            tickers.len(),
            groups.len(),
            self.fetch_concurrency
        );

        let mut fetched = Vec::new();
        for (group_idx, group) in groups.iter().enumerate() {
            debug!("Fetching group {}/{}", group_idx + 1, groups.len());

            let mut handles = Vec::new();
            for ticker in group.iter() {
                let provider = Arc::clone(&self.provider);
                let name_override = self.universe.name_override(ticker).map(str::to_string);
                handles.push(tokio::spawn(fetch_one(
                    provider,
                    ticker.clone(),
                    name_override,
                )));
            }

            for (result, ticker) in join_all(handles).await.into_iter().zip(group.iter()) {
                match result {
                    Ok(Some(record)) => fetched.push(record),
                    Ok(None) => {}
                    Err(e) => error!("Fetch task for {} panicked: {}", ticker, e),
                }
            }
        }

        info!("Fetched {}/{} tickers", fetched.len(), tickers.len());
        fetched
    }
}

/// Fetch and normalize one ticker. Provider failures are logged and
/// swallowed so one bad ticker never sinks the batch.
async fn fetch_one(
    provider: Arc<dyn MarketDataProvider>,
    ticker: String,
    name_override: Option<String>,
) -> Option<StockRecord> {
    let snapshot = match provider.fetch_snapshot(&ticker).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Failed to fetch {}: {}", ticker, e);
            return None;
        }
    };

    let mut record = normalize_snapshot(&ticker, &snapshot, name_override.as_deref());
    if record.roe == 0.0 {
        if let Some(roe) = roe_from_statements(provider.as_ref(), &ticker).await {
            record.roe = roe;
        }
    }
    Some(record)
}

/// Turn a raw provider snapshot into a cacheable record, filling gaps
/// with the neutral defaults the rest of the service expects.
fn normalize_snapshot(
    ticker: &str,
    snapshot: &FundamentalsSnapshot,
    name_override: Option<&str>,
) -> StockRecord {
    // Zero prices are placeholders, fall through to the next source
    let price = snapshot
        .current_price
        .filter(|p| *p != 0.0)
        .or(snapshot.regular_market_price.filter(|p| *p != 0.0))
        .or(snapshot.previous_close.filter(|p| *p != 0.0))
        .unwrap_or(0.0);

    let name = name_override
        .map(str::to_string)
        .or_else(|| snapshot.name.clone().filter(|n| !n.is_empty()))
        .unwrap_or_else(|| ticker.split('.').next().unwrap_or(ticker).to_string());

    // Yields arrive in mixed units; above 0.5 the value is a percentage
    let mut div_yield = snapshot.dividend_yield.unwrap_or(0.0);
    if div_yield > 0.5 {
        div_yield /= 100.0;
    }

    StockRecord {
        ticker: ticker.to_string(),
        name,
        price,
        pe: snapshot.trailing_pe.unwrap_or(0.0),
        pbv: snapshot.price_to_book.unwrap_or(0.0),
        roe: snapshot.return_on_equity.unwrap_or(0.0),
        div_yield,
        operating_margin: snapshot.operating_margin.unwrap_or(0.0),
        ebitda: snapshot.ebitda.unwrap_or(0.0),
        total_debt: snapshot.total_debt.unwrap_or(0.0),
        total_cash: snapshot.total_cash.unwrap_or(0.0),
        recommendation: snapshot
            .recommendation
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| NO_RECOMMENDATION.to_string()),
        market_cap: snapshot.market_cap.unwrap_or(0.0),
        beta: snapshot.beta.unwrap_or(0.0),
        sector: snapshot
            .sector
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SECTOR.to_string()),
        sector_pe_avg: 0.0,
        sector_margin_avg: 0.0,
        last_updated: current_timestamp(),
    }
}

/// Derive ROE from the latest annual statements when the summary field is
/// missing or zero. Lookup failures leave the summary value untouched.
async fn roe_from_statements(provider: &dyn MarketDataProvider, ticker: &str) -> Option<f64> {
    let statements = match provider.fetch_financials(ticker).await {
        Ok(statements) => statements,
        Err(e) => {
            debug!("No financial statements for {}: {}", ticker, e);
            return None;
        }
    };

    let net_income = statements.latest_income("Net Income")?;
    let equity = statements.latest_balance("Stockholders Equity")?;
    if equity == 0.0 {
        return None;
    }
    Some(net_income / equity)
}
